use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct StoreMemoryParams {
    #[schemars(description = "The natural language content of the memory")]
    pub content: String,

    #[schemars(
        description = "Category: 'preference', 'fact', 'instruction', 'context', 'goal', 'persona', 'skill', 'entity' or 'episodic'"
    )]
    pub category: String,

    #[schemars(description = "Optional keywords. Extracted from the content when omitted.")]
    pub keywords: Option<Vec<String>>,

    #[schemars(description = "Importance 1-5. Defaults to 3.")]
    pub importance: Option<u8>,
}
