//! Orchestration over a [`MemoryRepository`].
//!
//! A [`Session`] owns the in-memory memory and link collections, one
//! [`ConversationContext`] plus history per conversation, and the repository they
//! are persisted to. Persistence is best-effort: a failed load starts empty, a
//! failed save is logged, and neither fails the caller.

use chrono::{DateTime, Utc};
use lru::LruCache;
use std::collections::HashSet;
use std::num::NonZeroUsize;

use crate::cognition::{run_cognition_engine, CognitionFrame, ConversationContext, ConversationTurn};
use crate::config::ReverieConfig;
use crate::error::CoreResult;
use crate::memory::links::{infer_links, merge_links, reinforce_coactivated};
use crate::memory::repository::MemoryRepository;
use crate::memory::search::{search_memories, SearchConfig, SearchFilter};
use crate::memory::stats::{memory_stats, StatsResponse};
use crate::memory::store::{
    consolidate_memories, create_memory, ensure_embedding, reinforce_memory, store_acknowledgment,
    truncate_preview, NewMemory,
};
use crate::memory::types::{AssociativeLink, MemoryEntry, RetrievalResult};

/// Turns of history kept per conversation.
const MAX_HISTORY_TURNS: usize = 50;

#[derive(Debug, Default)]
struct Conversation {
    context: ConversationContext,
    history: Vec<ConversationTurn>,
}

/// The conversation for `id`, created if missing. A new conversation in a full
/// cache replaces the least recently used one.
fn conversation_entry<'a>(
    conversations: &'a mut LruCache<String, Conversation>,
    id: &str,
) -> &'a mut Conversation {
    if !conversations.contains(id) && conversations.len() >= conversations.cap().get() {
        if let Some((evicted, _)) = conversations.pop_lru() {
            tracing::debug!(conversation = %evicted, "dropped least recently used conversation");
        }
    }
    conversations.get_or_insert_mut(id.to_string(), || Conversation {
        context: ConversationContext::new(id),
        history: Vec::new(),
    })
}

/// Outcome of [`Session::remember`].
#[derive(Debug, Clone)]
pub struct Remembered {
    pub entry: MemoryEntry,
    pub links_created: usize,
    /// True when identical content already existed and was reinforced instead.
    pub deduplicated: bool,
    pub acknowledgment: String,
}

pub struct Session<R: MemoryRepository> {
    repo: R,
    config: ReverieConfig,
    memories: Vec<MemoryEntry>,
    links: Vec<AssociativeLink>,
    conversations: LruCache<String, Conversation>,
}

impl<R: MemoryRepository> Session<R> {
    /// Load the collections from `repo`. Load failures are logged and leave the
    /// collection empty.
    pub fn open(repo: R, config: ReverieConfig) -> Self {
        let memories = repo.load_memories().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "failed to load memories; starting empty");
            Vec::new()
        });
        let links = repo.load_links().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "failed to load associative links; starting empty");
            Vec::new()
        });
        tracing::info!(
            memories = memories.len(),
            links = links.len(),
            "session opened"
        );
        let capacity =
            NonZeroUsize::new(config.conversations.max_conversations).unwrap_or(NonZeroUsize::MIN);
        Self {
            repo,
            config,
            memories,
            links,
            conversations: LruCache::new(capacity),
        }
    }

    pub fn memories(&self) -> &[MemoryEntry] {
        &self.memories
    }

    pub fn links(&self) -> &[AssociativeLink] {
        &self.links
    }

    pub fn config(&self) -> &ReverieConfig {
        &self.config
    }

    pub fn repository(&self) -> &R {
        &self.repo
    }

    /// Create and link a new memory.
    ///
    /// Invalid input fails with [`crate::error::CoreError::MalformedEntry`] before
    /// anything changes. Content identical to an existing memory of the same
    /// category reinforces that memory instead of duplicating it.
    pub fn remember(&mut self, new: NewMemory, now: DateTime<Utc>) -> CoreResult<Remembered> {
        let mut entry = create_memory(new, now)?;

        let normalized = entry.content.to_lowercase();
        let duplicate = self
            .memories
            .iter()
            .find(|m| m.category == entry.category && m.content.to_lowercase() == normalized)
            .map(|m| m.id.clone());
        if let Some(id) = duplicate {
            reinforce_memory(
                &mut self.memories,
                &id,
                self.config.memory.reinforcement_boost,
                now,
            );
            self.persist_memories(std::slice::from_ref(&id));
            let entry = self
                .memories
                .iter()
                .find(|m| m.id == id)
                .cloned()
                .unwrap_or(entry);
            tracing::info!(id = %entry.id, "duplicate memory reinforced");
            let acknowledgment = format!(
                "Already remembered {} memory: \"{}\" (reinforced)",
                entry.category,
                truncate_preview(&entry.content, 80)
            );
            return Ok(Remembered {
                entry,
                links_created: 0,
                deduplicated: true,
                acknowledgment,
            });
        }

        ensure_embedding(&mut entry);
        let inferred = infer_links(&entry, &self.memories, &self.config.associations, now);
        entry.relations = inferred.iter().map(|l| l.target_id.clone()).collect();
        let merged = merge_links(
            &mut self.links,
            inferred,
            self.config.associations.reinforcement_step,
        );

        tracing::info!(
            id = %entry.id,
            category = %entry.category,
            links_created = merged.created,
            "memory stored"
        );

        let acknowledgment = store_acknowledgment(&entry, merged.created);
        self.memories.push(entry.clone());
        self.persist_memories(std::slice::from_ref(&entry.id));
        if merged.created + merged.reinforced > 0 {
            self.persist_links();
        }

        Ok(Remembered {
            entry,
            links_created: merged.created,
            deduplicated: false,
            acknowledgment,
        })
    }

    /// Search and reinforce what was found. An empty result is a valid answer.
    pub fn recall(
        &mut self,
        query: &str,
        filter: &SearchFilter,
        max_results: Option<usize>,
        now: DateTime<Utc>,
    ) -> Vec<RetrievalResult> {
        let config = SearchConfig {
            max_results: max_results.unwrap_or(self.config.retrieval.default_max_results),
            retrieval: &self.config.retrieval,
            memory: &self.config.memory,
            symmetric_links: self.config.associations.symmetric_traversal,
        };
        let results = search_memories(&self.memories, &self.links, query, filter, &config, now);
        let ids: Vec<String> = results.iter().map(|r| r.memory.id.clone()).collect();
        tracing::info!(query = %query, results = results.len(), "recall");
        self.reinforce(&ids, &ids, now);
        results
    }

    /// Run the cognition pipeline for one user message in `conversation_id`,
    /// reinforce what it retrieved, and record the message in that conversation's
    /// history.
    pub fn process_turn(
        &mut self,
        conversation_id: &str,
        message: &str,
        now: DateTime<Utc>,
    ) -> CognitionFrame {
        let conversation = conversation_entry(&mut self.conversations, conversation_id);

        let frame = run_cognition_engine(
            &mut conversation.context,
            message,
            &conversation.history,
            &self.memories,
            &self.links,
            &self.config,
            now,
        );

        conversation.history.push(ConversationTurn::user(message));
        trim_history(&mut conversation.history);

        let direct: Vec<String> = frame.retrieved.iter().map(|r| r.memory.id.clone()).collect();
        self.reinforce(&direct, &frame.activated_ids(), now);
        frame
    }

    /// Append the assistant's reply so the next turn sees it in the history.
    pub fn record_reply(&mut self, conversation_id: &str, content: &str) {
        let conversation = conversation_entry(&mut self.conversations, conversation_id);
        conversation.history.push(ConversationTurn::assistant(content));
        trim_history(&mut conversation.history);
    }

    pub fn history(&self, conversation_id: &str) -> &[ConversationTurn] {
        self.conversations
            .peek(conversation_id)
            .map(|c| c.history.as_slice())
            .unwrap_or(&[])
    }

    /// Number of conversations currently tracked.
    pub fn conversation_count(&self) -> usize {
        self.conversations.len()
    }

    pub fn stats(&self, now: DateTime<Utc>) -> StatsResponse {
        memory_stats(&self.memories, &self.links, &self.config.memory, now)
    }

    /// Reinforce `retrieved`, strengthen links among `activated`, consolidate, and
    /// save whatever changed.
    fn reinforce(&mut self, retrieved: &[String], activated: &[String], now: DateTime<Utc>) {
        if retrieved.is_empty() && activated.is_empty() {
            return;
        }
        let boost = self.config.memory.reinforcement_boost;
        for id in retrieved {
            reinforce_memory(&mut self.memories, id, boost, now);
        }
        let strengthened = reinforce_coactivated(
            &mut self.links,
            activated,
            self.config.associations.reinforcement_step,
        );
        let consolidated = consolidate_memories(&mut self.memories, &self.config.memory, now);
        tracing::debug!(
            reinforced = retrieved.len(),
            links_strengthened = strengthened,
            consolidated = consolidated.len(),
            "reinforcement applied"
        );

        // Consolidation can touch entries outside the retrieval set
        let mut touched: Vec<String> = retrieved.to_vec();
        touched.extend(consolidated.into_iter().filter(|id| !retrieved.contains(id)));
        self.persist_memories(&touched);
        if strengthened > 0 {
            self.persist_links();
        }
    }

    fn persist_memories(&mut self, ids: &[String]) {
        let wanted: HashSet<&str> = ids.iter().map(String::as_str).collect();
        let changed: Vec<MemoryEntry> = self
            .memories
            .iter()
            .filter(|m| wanted.contains(m.id.as_str()))
            .cloned()
            .collect();
        if changed.is_empty() {
            return;
        }
        if let Err(e) = self.repo.save_memories(&changed) {
            tracing::warn!(error = %e, count = changed.len(), "failed to save memories");
        }
    }

    fn persist_links(&mut self) {
        if let Err(e) = self.repo.save_links(&self.links) {
            tracing::warn!(error = %e, count = self.links.len(), "failed to save associative links");
        }
    }
}

fn trim_history(history: &mut Vec<ConversationTurn>) {
    if history.len() > MAX_HISTORY_TURNS {
        let excess = history.len() - MAX_HISTORY_TURNS;
        history.drain(..excess);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CoreError;
    use crate::memory::repository::SqliteRepository;
    use crate::memory::types::MemoryCategory;

    fn session() -> Session<SqliteRepository> {
        Session::open(
            SqliteRepository::open_in_memory().unwrap(),
            ReverieConfig::default(),
        )
    }

    #[test]
    fn remember_persists_and_acknowledges() {
        let mut s = session();
        let out = s
            .remember(
                NewMemory::new("User prefers dark roast coffee", MemoryCategory::Preference),
                Utc::now(),
            )
            .unwrap();
        assert!(out.acknowledgment.starts_with("Stored preference memory"));
        assert!(!out.deduplicated);
        assert_eq!(s.repository().load_memories().unwrap().len(), 1);
    }

    #[test]
    fn remember_rejects_empty_content() {
        let mut s = session();
        let err = s
            .remember(NewMemory::new("   ", MemoryCategory::Fact), Utc::now())
            .unwrap_err();
        assert!(matches!(err, CoreError::MalformedEntry(_)));
        assert!(s.memories().is_empty());
    }

    #[test]
    fn identical_content_is_reinforced_not_duplicated() {
        let mut s = session();
        let now = Utc::now();
        s.remember(NewMemory::new("Standup is at 9am", MemoryCategory::Context), now)
            .unwrap();
        let again = s
            .remember(NewMemory::new("standup is at 9am ", MemoryCategory::Context), now)
            .unwrap();
        assert!(again.deduplicated);
        assert_eq!(s.memories().len(), 1);
        assert_eq!(s.memories()[0].access_count, 1);
    }

    #[test]
    fn related_memories_get_linked() {
        let mut s = session();
        let now = Utc::now();
        s.remember(
            NewMemory::new("diagnostic capability probe local capture", MemoryCategory::Skill),
            now,
        )
        .unwrap();
        let second = s
            .remember(
                NewMemory::new("capability probe device diagnostics capture", MemoryCategory::Skill),
                now,
            )
            .unwrap();
        assert_eq!(second.links_created, 1);
        assert_eq!(second.entry.relations.len(), 1);
        assert_eq!(s.repository().load_links().unwrap().len(), 1);
    }

    #[test]
    fn recall_reinforces_hits() {
        let mut s = session();
        let now = Utc::now();
        s.remember(NewMemory::new("The wifi password is on the fridge", MemoryCategory::Fact), now)
            .unwrap();
        let results = s.recall("wifi password", &SearchFilter::default(), None, now);
        assert_eq!(results.len(), 1);
        assert_eq!(s.memories()[0].access_count, 1);
        let stored = s.repository().load_memories().unwrap();
        assert_eq!(stored[0].access_count, 1);
    }

    /// Delegates to SQLite and records the ids passed to each memory save.
    struct RecordingRepository {
        inner: SqliteRepository,
        saves: Vec<Vec<String>>,
    }

    impl MemoryRepository for RecordingRepository {
        fn load_memories(&self) -> CoreResult<Vec<MemoryEntry>> {
            self.inner.load_memories()
        }

        fn save_memories(&mut self, entries: &[MemoryEntry]) -> CoreResult<()> {
            self.saves.push(entries.iter().map(|e| e.id.clone()).collect());
            self.inner.save_memories(entries)
        }

        fn load_links(&self) -> CoreResult<Vec<AssociativeLink>> {
            self.inner.load_links()
        }

        fn save_links(&mut self, links: &[AssociativeLink]) -> CoreResult<()> {
            self.inner.save_links(links)
        }
    }

    #[test]
    fn consolidation_saves_only_new_consolidations() {
        let repo = RecordingRepository {
            inner: SqliteRepository::open_in_memory().unwrap(),
            saves: Vec::new(),
        };
        let mut s = Session::open(repo, ReverieConfig::default());
        let now = Utc::now();
        let wifi = s
            .remember(NewMemory::new("The wifi password is on the fridge", MemoryCategory::Fact), now)
            .unwrap()
            .entry
            .id;
        let coffee = s
            .remember(NewMemory::new("User prefers dark roast coffee", MemoryCategory::Preference), now)
            .unwrap()
            .entry
            .id;

        let threshold = s.config().memory.consolidation_access_threshold;
        for _ in 0..threshold {
            s.recall("wifi password", &SearchFilter::default(), None, now);
        }
        for _ in 0..threshold {
            s.recall("dark roast coffee", &SearchFilter::default(), None, now);
        }

        assert!(s.memories().iter().all(|m| m.consolidated));
        let last = s.repository().saves.last().unwrap();
        assert_eq!(last, &vec![coffee]);
        assert!(!last.contains(&wifi));
    }

    #[test]
    fn process_turn_tracks_history_per_conversation() {
        let mut s = session();
        let now = Utc::now();
        s.process_turn("a", "hello there", now);
        s.record_reply("a", "hi! how can I help?");
        s.process_turn("a", "what is the weather like", now);
        s.process_turn("b", "unrelated", now);
        assert_eq!(s.history("a").len(), 3);
        assert_eq!(s.history("b").len(), 1);
        assert!(s.history("missing").is_empty());
    }

    #[test]
    fn idle_conversations_are_dropped_first() {
        let mut config = ReverieConfig::default();
        config.conversations.max_conversations = 2;
        let mut s = Session::open(SqliteRepository::open_in_memory().unwrap(), config);
        let now = Utc::now();

        s.process_turn("a", "first conversation", now);
        s.process_turn("b", "second conversation", now);
        s.record_reply("a", "still talking in a");
        s.process_turn("c", "third conversation", now);

        assert_eq!(s.conversation_count(), 2);
        assert_eq!(s.history("a").len(), 2);
        assert!(s.history("b").is_empty());
        assert_eq!(s.history("c").len(), 1);

        for i in 0..50 {
            s.process_turn(&format!("burst-{i}"), "hello", now);
        }
        assert_eq!(s.conversation_count(), 2);
    }

    #[test]
    fn history_is_bounded() {
        let mut history: Vec<ConversationTurn> = (0..60)
            .map(|i| ConversationTurn::user(format!("turn {i}")))
            .collect();
        trim_history(&mut history);
        assert_eq!(history.len(), MAX_HISTORY_TURNS);
        assert_eq!(history[0].content, "turn 10");
    }
}
