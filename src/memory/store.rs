//! Write path and lifecycle of a single memory.
//!
//! [`create_memory`] validates caller input and builds a [`MemoryEntry`]; it is the only
//! way entries come into existence. After that an entry changes only through
//! [`reinforce_memory`] (retrieval strengthens it) and [`consolidate_memories`].
//! Forgetting is applied at read time by [`effective_decay`]; the stored `decay` only
//! ever grows.

use chrono::{DateTime, Utc};
use std::collections::BTreeSet;

use crate::cognition::emotion;
use crate::config::MemoryConfig;
use crate::embedding::{compute_embedding, fnv1a_hash, tokenize};
use crate::error::{CoreError, CoreResult};
use crate::memory::types::{clamp_unit, MemoryCategory, MemoryEntry, MemorySource};

/// Keywords kept per memory when the caller supplies none.
const MAX_EXTRACTED_KEYWORDS: usize = 8;

/// Shortest token kept as a keyword.
const MIN_KEYWORD_LEN: usize = 3;

/// Activation given to a fresh memory and added on each reinforcement.
const ACTIVATION_ON_CREATE: f64 = 0.5;
const ACTIVATION_ON_REINFORCE: f64 = 0.25;

/// Episodic memories forget at this multiple of the base rate.
const EPISODIC_FORGETTING_FACTOR: f64 = 2.0;

/// Consolidated memories forget at this fraction of the base rate.
const CONSOLIDATED_FORGETTING_FACTOR: f64 = 0.25;

/// Effective decay a memory must retain to be consolidated.
const CONSOLIDATION_MIN_RETENTION: f64 = 0.5;

pub const STOP_WORDS: &[&str] = &[
    "a", "about", "after", "all", "also", "am", "an", "and", "any", "are", "as", "at", "be",
    "because", "been", "before", "but", "by", "can", "could", "did", "do", "does", "doing",
    "dont", "for", "from", "get", "got", "had", "has", "have", "he", "her", "here", "him",
    "his", "how", "i", "if", "im", "in", "into", "is", "it", "its", "ive", "just", "like",
    "me", "more", "my", "no", "not", "now", "of", "on", "one", "or", "our", "out", "really",
    "she", "should", "so", "some", "than", "that", "the", "their", "them", "then", "there",
    "these", "they", "this", "those", "to", "too", "up", "us", "very", "was", "we", "were",
    "what", "when", "where", "which", "who", "why", "will", "with", "would", "you", "your",
];

pub fn is_stop_word(token: &str) -> bool {
    STOP_WORDS.contains(&token)
}

/// Caller-supplied fields for a new memory.
#[derive(Debug, Clone)]
pub struct NewMemory {
    pub content: String,
    pub category: MemoryCategory,
    /// `None` extracts keywords from the content.
    pub keywords: Option<Vec<String>>,
    pub importance: u8,
    pub source: MemorySource,
}

impl NewMemory {
    pub fn new(content: impl Into<String>, category: MemoryCategory) -> Self {
        Self {
            content: content.into(),
            category,
            keywords: None,
            importance: 3,
            source: MemorySource::Conversation,
        }
    }

    pub fn with_importance(mut self, importance: u8) -> Self {
        self.importance = importance;
        self
    }

    pub fn with_keywords(mut self, keywords: Vec<String>) -> Self {
        self.keywords = Some(keywords);
        self
    }

    pub fn with_source(mut self, source: MemorySource) -> Self {
        self.source = source;
        self
    }
}

/// Validate and build a memory. Rejects empty content and importance outside 1–5
/// with [`CoreError::MalformedEntry`] rather than coercing.
pub fn create_memory(new: NewMemory, now: DateTime<Utc>) -> CoreResult<MemoryEntry> {
    let content = new.content.trim();
    if content.is_empty() {
        return Err(CoreError::MalformedEntry("content must not be empty".into()));
    }
    if !(1..=5).contains(&new.importance) {
        return Err(CoreError::MalformedEntry(format!(
            "importance must be between 1 and 5, got {}",
            new.importance
        )));
    }

    let keywords = match new.keywords {
        Some(given) => normalize_keywords(&given),
        None => extract_keywords(content),
    };

    Ok(MemoryEntry {
        id: uuid::Uuid::now_v7().to_string(),
        content: content.to_string(),
        context_signature: context_signature(&keywords),
        keywords,
        category: new.category,
        timestamp: now,
        importance: new.importance,
        source: new.source,
        access_count: 0,
        last_accessed: now,
        embedding: None,
        relations: Vec::new(),
        consolidated: false,
        decay: initial_decay(new.importance),
        activation_level: ACTIVATION_ON_CREATE,
        emotional_valence: emotion::score_valence(content),
    })
}

/// Starting strength: important memories start closer to full strength.
pub fn initial_decay(importance: u8) -> f64 {
    clamp_unit(0.5 + f64::from(importance) * 0.1)
}

/// Most frequent non-stop-word tokens, ties broken by first occurrence.
pub fn extract_keywords(content: &str) -> Vec<String> {
    let tokens = tokenize(content);
    let mut counts: Vec<(String, usize, usize)> = Vec::new();
    for (pos, token) in tokens.into_iter().enumerate() {
        if token.len() < MIN_KEYWORD_LEN || is_stop_word(&token) {
            continue;
        }
        match counts.iter_mut().find(|(t, _, _)| *t == token) {
            Some(entry) => entry.1 += 1,
            None => counts.push((token, 1, pos)),
        }
    }
    counts.sort_by(|a, b| b.1.cmp(&a.1).then(a.2.cmp(&b.2)));
    let top: Vec<String> = counts
        .into_iter()
        .take(MAX_EXTRACTED_KEYWORDS)
        .map(|(t, _, _)| t)
        .collect();
    normalize_keywords(&top)
}

fn normalize_keywords(keywords: &[String]) -> Vec<String> {
    keywords
        .iter()
        .map(|k| k.trim().to_lowercase())
        .filter(|k| !k.is_empty())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Hex hash of the sorted keyword set.
pub fn context_signature(keywords: &[String]) -> String {
    format!("{:08x}", fnv1a_hash(&keywords.join(" ")))
}

/// Fill in the embedding if it has not been computed yet.
pub fn ensure_embedding(entry: &mut MemoryEntry) -> &[f32] {
    entry
        .embedding
        .get_or_insert_with(|| compute_embedding(&entry.content))
}

/// Strengthen one memory: one more access, touched now, decay raised by `boost`.
pub fn reinforce_entry(entry: &mut MemoryEntry, boost: f64, now: DateTime<Utc>) {
    entry.access_count = entry.access_count.saturating_add(1);
    entry.last_accessed = now;
    entry.decay = clamp_unit(entry.decay + boost.max(0.0));
    entry.activation_level = clamp_unit(entry.activation_level + ACTIVATION_ON_REINFORCE);
}

/// Reinforce the memory with `id`. Unknown ids are a no-op; returns whether an entry
/// was found.
pub fn reinforce_memory(
    entries: &mut [MemoryEntry],
    id: &str,
    boost: f64,
    now: DateTime<Utc>,
) -> bool {
    match entries.iter_mut().find(|e| e.id == id) {
        Some(entry) => {
            reinforce_entry(entry, boost, now);
            true
        }
        None => {
            tracing::debug!(id = %id, "reinforce skipped: unknown memory id");
            false
        }
    }
}

/// Read-time retained strength: stored decay scaled by the forgetting curve
/// `0.5^(idle_days / half_life)`.
pub fn effective_decay(entry: &MemoryEntry, config: &MemoryConfig, now: DateTime<Utc>) -> f64 {
    let idle_days = idle_days(entry.last_touched(), now);
    let mut half_life = config.forgetting_half_life_days.max(f64::EPSILON);
    if entry.category == MemoryCategory::Episodic {
        half_life /= EPISODIC_FORGETTING_FACTOR;
    }
    if entry.consolidated {
        half_life /= CONSOLIDATED_FORGETTING_FACTOR;
    }
    clamp_unit(entry.decay * forgetting_curve(idle_days, half_life))
}

/// Fraction retained after `idle_days` with the given half-life.
pub fn forgetting_curve(idle_days: f64, half_life_days: f64) -> f64 {
    0.5f64.powf(idle_days.max(0.0) / half_life_days)
}

pub(crate) fn idle_days(since: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    (now - since).num_seconds().max(0) as f64 / 86_400.0
}

/// Mark frequently accessed, still-strong memories as consolidated. Returns the ids
/// consolidated by this call.
pub fn consolidate_memories(
    entries: &mut [MemoryEntry],
    config: &MemoryConfig,
    now: DateTime<Utc>,
) -> Vec<String> {
    let mut changed = Vec::new();
    for entry in entries.iter_mut().filter(|e| !e.consolidated) {
        if entry.access_count >= config.consolidation_access_threshold
            && effective_decay(entry, config, now) >= CONSOLIDATION_MIN_RETENTION
        {
            entry.consolidated = true;
            tracing::debug!(id = %entry.id, "memory consolidated");
            changed.push(entry.id.clone());
        }
    }
    changed
}

/// Plain-text acknowledgment returned by the store-memory tool.
pub fn store_acknowledgment(entry: &MemoryEntry, links_created: usize) -> String {
    let preview = truncate_preview(&entry.content, 80);
    let linked = match links_created {
        0 => String::new(),
        1 => ", linked to 1 related memory".to_string(),
        n => format!(", linked to {n} related memories"),
    };
    format!(
        "Stored {} memory: \"{}\" (importance {}{})",
        entry.category, preview, entry.importance, linked
    )
}

/// Truncate to at most `max_chars` characters, appending "..." if cut.
pub fn truncate_preview(content: &str, max_chars: usize) -> String {
    if content.chars().count() <= max_chars {
        content.to_string()
    } else {
        let cut: String = content.chars().take(max_chars).collect();
        format!("{}...", cut.trim_end())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn entry(now: DateTime<Utc>) -> MemoryEntry {
        create_memory(
            NewMemory::new("User prefers Rust for systems programming", MemoryCategory::Preference),
            now,
        )
        .unwrap()
    }

    #[test]
    fn create_rejects_empty_content() {
        let err = create_memory(NewMemory::new("   ", MemoryCategory::Fact), Utc::now()).unwrap_err();
        assert!(matches!(err, CoreError::MalformedEntry(_)));
    }

    #[test]
    fn create_rejects_out_of_range_importance() {
        for importance in [0, 6] {
            let new = NewMemory::new("fact", MemoryCategory::Fact).with_importance(importance);
            assert!(matches!(
                create_memory(new, Utc::now()),
                Err(CoreError::MalformedEntry(_))
            ));
        }
    }

    #[test]
    fn create_extracts_keywords_and_initial_state() {
        let now = Utc::now();
        let e = entry(now);
        assert!(e.keywords.contains(&"rust".to_string()));
        assert!(e.keywords.contains(&"systems".to_string()));
        assert!(!e.keywords.contains(&"for".to_string()));
        assert_eq!(e.access_count, 0);
        assert_eq!(e.timestamp, now);
        assert!(e.embedding.is_none());
        assert!((e.decay - 0.8).abs() < 1e-9);
    }

    #[test]
    fn explicit_keywords_are_normalized() {
        let new = NewMemory::new("note", MemoryCategory::Fact)
            .with_keywords(vec!["Rust".into(), " rust ".into(), "".into(), "Cargo".into()]);
        let e = create_memory(new, Utc::now()).unwrap();
        assert_eq!(e.keywords, vec!["cargo", "rust"]);
    }

    #[test]
    fn reinforce_increments_and_boosts() {
        let now = Utc::now();
        let mut entries = vec![entry(now - Duration::days(3))];
        let id = entries[0].id.clone();
        let before = entries[0].clone();

        assert!(reinforce_memory(&mut entries, &id, 0.1, now));

        assert_eq!(entries[0].access_count, before.access_count + 1);
        assert!(entries[0].decay >= before.decay);
        assert_eq!(entries[0].last_accessed, now);
    }

    #[test]
    fn reinforce_caps_decay_at_one() {
        let now = Utc::now();
        let mut e = entry(now);
        for _ in 0..10 {
            reinforce_entry(&mut e, 0.5, now);
        }
        assert_eq!(e.decay, 1.0);
        assert_eq!(e.access_count, 10);
    }

    #[test]
    fn reinforce_unknown_id_is_noop() {
        let now = Utc::now();
        let mut entries = vec![entry(now)];
        let before = entries.clone();
        assert!(!reinforce_memory(&mut entries, "missing", 0.1, now));
        assert_eq!(entries, before);
    }

    #[test]
    fn effective_decay_falls_with_idle_time() {
        let config = MemoryConfig::default();
        let now = Utc::now();
        let fresh = entry(now);
        let mut stale = fresh.clone();
        stale.last_accessed = now - Duration::days(60);
        stale.timestamp = now - Duration::days(60);

        let fresh_decay = effective_decay(&fresh, &config, now);
        let stale_decay = effective_decay(&stale, &config, now);
        assert!((fresh_decay - fresh.decay).abs() < 1e-9);
        assert!(stale_decay < fresh_decay);
        // two half-lives
        assert!((stale_decay - fresh.decay * 0.25).abs() < 1e-6);
    }

    #[test]
    fn episodic_forgets_faster_than_fact() {
        let config = MemoryConfig::default();
        let now = Utc::now();
        let then = now - Duration::days(20);
        let mut fact = create_memory(NewMemory::new("a fact", MemoryCategory::Fact), then).unwrap();
        let mut episode =
            create_memory(NewMemory::new("an event", MemoryCategory::Episodic), then).unwrap();
        fact.decay = 1.0;
        episode.decay = 1.0;
        assert!(effective_decay(&episode, &config, now) < effective_decay(&fact, &config, now));
    }

    #[test]
    fn consolidation_requires_access_threshold() {
        let config = MemoryConfig::default();
        let now = Utc::now();
        let mut entries = vec![entry(now), entry(now)];
        for _ in 0..config.consolidation_access_threshold {
            reinforce_entry(&mut entries[0], 0.1, now);
        }

        assert_eq!(consolidate_memories(&mut entries, &config, now), vec![entries[0].id.clone()]);
        assert!(entries[0].consolidated);
        assert!(!entries[1].consolidated);
        // already consolidated entries are not reported again
        assert!(consolidate_memories(&mut entries, &config, now).is_empty());
    }

    #[test]
    fn acknowledgment_mentions_category_and_links() {
        let e = entry(Utc::now());
        let ack = store_acknowledgment(&e, 2);
        assert!(ack.starts_with("Stored preference memory"));
        assert!(ack.contains("linked to 2 related memories"));
    }

    #[test]
    fn ensure_embedding_is_lazy_and_cached() {
        let mut e = entry(Utc::now());
        let first = ensure_embedding(&mut e).to_vec();
        assert_eq!(first, compute_embedding(&e.content));
        assert_eq!(e.embedding.as_deref(), Some(first.as_slice()));
    }
}
