pub mod analyze_turn;
pub mod memory_stats;
pub mod recall_memory;
pub mod store_memory;

use analyze_turn::AnalyzeTurnParams;
use chrono::Utc;
use memory_stats::MemoryStatsParams;
use recall_memory::RecallMemoryParams;
use rmcp::handler::server::tool::ToolRouter;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::{tool, tool_handler, tool_router, ServerHandler};
use std::sync::{Arc, Mutex};
use store_memory::StoreMemoryParams;

use crate::memory::repository::SqliteRepository;
use crate::memory::search::{to_recall_view, SearchFilter};
use crate::memory::store::NewMemory;
use crate::memory::types::{MemoryCategory, MemorySource};
use crate::session::Session;

/// Session state shared by every tool handler and transport.
pub type SharedSession = Arc<Mutex<Session<SqliteRepository>>>;

const DEFAULT_CONVERSATION: &str = "default";

/// The Reverie MCP tool handler. Holds the shared session and exposes all MCP
/// tools via the `#[tool_router]` macro.
#[derive(Clone)]
pub struct ReverieTools {
    tool_router: ToolRouter<Self>,
    session: SharedSession,
}

/// Parse category names, rejecting unknown ones.
pub fn parse_categories(names: Option<Vec<String>>) -> Result<Option<Vec<MemoryCategory>>, String> {
    names
        .map(|list| {
            list.iter()
                .map(|n| n.parse::<MemoryCategory>())
                .collect::<Result<Vec<_>, _>>()
        })
        .transpose()
}

/// Run `f` against the locked session on the blocking pool.
async fn with_session<T, F>(session: &SharedSession, f: F) -> Result<T, String>
where
    T: Send + 'static,
    F: FnOnce(&mut Session<SqliteRepository>) -> Result<T, String> + Send + 'static,
{
    let session = Arc::clone(session);
    tokio::task::spawn_blocking(move || {
        let mut guard = session
            .lock()
            .map_err(|e| format!("session lock poisoned: {e}"))?;
        f(&mut guard)
    })
    .await
    .map_err(|e| format!("session task failed: {e}"))?
}

#[tool_router]
impl ReverieTools {
    pub fn new(session: SharedSession) -> Self {
        Self {
            tool_router: Self::tool_router(),
            session,
        }
    }

    /// Store a new memory and link it to related ones.
    #[tool(description = "Store a memory about the user. Categories: preference, fact, instruction, context, goal, persona, skill, entity, episodic. Returns a short acknowledgment.")]
    async fn store_memory(
        &self,
        Parameters(params): Parameters<StoreMemoryParams>,
    ) -> Result<String, String> {
        let category: MemoryCategory = params.category.parse()?;
        tracing::info!(
            content_len = params.content.len(),
            category = %category,
            "store_memory called"
        );

        let mut new = NewMemory::new(params.content, category).with_source(MemorySource::Conversation);
        if let Some(keywords) = params.keywords {
            new = new.with_keywords(keywords);
        }
        if let Some(importance) = params.importance {
            new = new.with_importance(importance);
        }

        let remembered = with_session(&self.session, move |session| {
            session
                .remember(new, Utc::now())
                .map_err(|e| format!("store failed: {e}"))
        })
        .await?;

        tracing::info!(
            id = %remembered.entry.id,
            links = remembered.links_created,
            deduplicated = remembered.deduplicated,
            "memory stored"
        );
        Ok(remembered.acknowledgment)
    }

    /// Search memories with multi-signal retrieval.
    #[tool(description = "Search memories by natural language query. Returns a JSON array ranked by a blend of keyword, semantic, recency and link scores.")]
    async fn recall_memory(
        &self,
        Parameters(params): Parameters<RecallMemoryParams>,
    ) -> Result<String, String> {
        let categories = parse_categories(params.categories)?;
        if let Some(min) = params.min_score {
            if !(0.0..=1.0).contains(&min) {
                return Err("min_score must be between 0.0 and 1.0".into());
            }
        }
        tracing::info!(query = %params.query, "recall_memory called");

        let query = params.query;
        let max_results = params.max_results;
        let min_score = params.min_score;
        let view = with_session(&self.session, move |session| {
            let filter = SearchFilter {
                categories,
                min_score: min_score.unwrap_or(session.config().retrieval.min_score),
            };
            let results = session.recall(&query, &filter, max_results, Utc::now());
            Ok(to_recall_view(&results))
        })
        .await?;

        serde_json::to_string(&view).map_err(|e| format!("serialization failed: {e}"))
    }

    /// Run the cognition pipeline for one user message.
    #[tool(description = "Analyze a user message: emotion, metacognition, thought tree, curiosity, intent, discourse, reasoning, salience, retrieved memories and the prioritized context injections. Returns JSON.")]
    async fn analyze_turn(
        &self,
        Parameters(params): Parameters<AnalyzeTurnParams>,
    ) -> Result<String, String> {
        let conversation_id = params
            .conversation_id
            .unwrap_or_else(|| DEFAULT_CONVERSATION.to_string());
        tracing::info!(
            conversation = %conversation_id,
            message_len = params.message.len(),
            "analyze_turn called"
        );

        let message = params.message;
        let previous_reply = params.previous_reply;
        with_session(&self.session, move |session| {
            if let Some(reply) = previous_reply.as_deref() {
                session.record_reply(&conversation_id, reply);
            }
            let frame = session.process_turn(&conversation_id, &message, Utc::now());
            serde_json::to_string(&frame.report()).map_err(|e| format!("serialization failed: {e}"))
        })
        .await
    }

    /// Get statistics about the memory store.
    #[tool(description = "Get memory store statistics: counts by category and link type, decay and access totals.")]
    async fn memory_stats(
        &self,
        Parameters(params): Parameters<MemoryStatsParams>,
    ) -> Result<String, String> {
        let categories = parse_categories(params.categories)?;
        tracing::info!("memory_stats called");

        let mut stats = with_session(&self.session, |session| Ok(session.stats(Utc::now()))).await?;
        if let Some(keep) = categories {
            stats
                .by_category
                .retain(|name, _| keep.iter().any(|c| c.as_str() == name.as_str()));
        }
        serde_json::to_string(&stats).map_err(|e| format!("serialization failed: {e}"))
    }
}

#[tool_handler]
impl ServerHandler for ReverieTools {
    fn get_info(&self) -> rmcp::model::ServerInfo {
        rmcp::model::ServerInfo {
            instructions: Some(
                "Reverie is an associative memory for chat agents. Use store_memory to save what \
                 the user tells you, recall_memory to search, and analyze_turn on each user \
                 message to get context injections for your reply."
                    .into(),
            ),
            capabilities: rmcp::model::ServerCapabilities::builder()
                .enable_tools()
                .build(),
            ..Default::default()
        }
    }
}
