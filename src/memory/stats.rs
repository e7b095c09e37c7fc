use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

use crate::config::MemoryConfig;
use crate::memory::store::effective_decay;
use crate::memory::types::{AssociativeLink, MemoryEntry};

/// Corpus statistics.
#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub total_memories: u64,
    pub consolidated_memories: u64,
    pub by_category: BTreeMap<String, u64>,
    pub associative_links: u64,
    pub by_link_type: BTreeMap<String, u64>,
    /// Mean stored decay.
    pub average_decay: f64,
    /// Mean read-time decay after forgetting.
    pub average_effective_decay: f64,
    pub total_accesses: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub oldest_memory: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub newest_memory: Option<DateTime<Utc>>,
}

/// Compute statistics over loaded collections.
pub fn memory_stats(
    memories: &[MemoryEntry],
    links: &[AssociativeLink],
    config: &MemoryConfig,
    now: DateTime<Utc>,
) -> StatsResponse {
    let mut by_category = BTreeMap::new();
    for m in memories {
        *by_category.entry(m.category.as_str().to_string()).or_insert(0) += 1;
    }
    let mut by_link_type = BTreeMap::new();
    for l in links {
        *by_link_type.entry(l.link_type.as_str().to_string()).or_insert(0) += 1;
    }

    let count = memories.len();
    let mean = |sum: f64| if count == 0 { 0.0 } else { sum / count as f64 };

    StatsResponse {
        total_memories: count as u64,
        consolidated_memories: memories.iter().filter(|m| m.consolidated).count() as u64,
        by_category,
        associative_links: links.len() as u64,
        by_link_type,
        average_decay: mean(memories.iter().map(|m| m.decay).sum()),
        average_effective_decay: mean(
            memories
                .iter()
                .map(|m| effective_decay(m, config, now))
                .sum(),
        ),
        total_accesses: memories.iter().map(|m| u64::from(m.access_count)).sum(),
        oldest_memory: memories.iter().map(|m| m.timestamp).min(),
        newest_memory: memories.iter().map(|m| m.timestamp).max(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::store::{create_memory, NewMemory};
    use crate::memory::types::MemoryCategory;

    #[test]
    fn empty_corpus_stats() {
        let stats = memory_stats(&[], &[], &MemoryConfig::default(), Utc::now());
        assert_eq!(stats.total_memories, 0);
        assert_eq!(stats.average_decay, 0.0);
        assert!(stats.oldest_memory.is_none());
    }

    #[test]
    fn counts_by_category() {
        let now = Utc::now();
        let memories = vec![
            create_memory(NewMemory::new("likes tea", MemoryCategory::Preference), now).unwrap(),
            create_memory(NewMemory::new("likes jazz", MemoryCategory::Preference), now).unwrap(),
            create_memory(NewMemory::new("lives in Oslo", MemoryCategory::Fact), now).unwrap(),
        ];
        let stats = memory_stats(&memories, &[], &MemoryConfig::default(), now);
        assert_eq!(stats.total_memories, 3);
        assert_eq!(stats.by_category["preference"], 2);
        assert_eq!(stats.by_category["fact"], 1);
        assert!((stats.average_decay - 0.8).abs() < 1e-9);
        assert_eq!(stats.oldest_memory, Some(now));
    }
}
