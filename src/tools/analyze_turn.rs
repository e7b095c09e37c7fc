//! MCP `analyze_turn` tool parameter definition.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Parameters for the `analyze_turn` MCP tool.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct AnalyzeTurnParams {
    /// The user's message for this turn.
    #[schemars(description = "The user's message for this turn")]
    pub message: String,

    /// Turns sharing an id share emotional and discourse continuity.
    #[schemars(description = "Conversation id. Defaults to 'default'.")]
    pub conversation_id: Option<String>,

    /// Previous assistant reply, appended to the history before analysis.
    #[schemars(description = "The assistant's reply to the previous turn, if any")]
    pub previous_reply: Option<String>,
}
