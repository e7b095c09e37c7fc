//! MCP `recall_memory` tool parameter definition.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct RecallMemoryParams {
    #[schemars(description = "Natural language query")]
    pub query: String,

    #[schemars(description = "Only return memories in these categories")]
    pub categories: Option<Vec<String>>,

    #[schemars(description = "Maximum number of results. Defaults to the configured limit.")]
    pub max_results: Option<usize>,

    #[schemars(description = "Minimum relevance score 0.0-1.0. Defaults to the configured floor.")]
    pub min_score: Option<f64>,
}
