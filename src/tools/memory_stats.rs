//! MCP `memory_stats` tool parameter definition.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Parameters for the `memory_stats` MCP tool.
#[derive(Debug, Default, Serialize, Deserialize, JsonSchema)]
pub struct MemoryStatsParams {
    /// Restrict the category breakdown to these categories.
    #[schemars(description = "Optional categories to include in the breakdown")]
    pub categories: Option<Vec<String>>,
}
