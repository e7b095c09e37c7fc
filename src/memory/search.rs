use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{HashMap, HashSet};

use crate::config::{MemoryConfig, RetrievalConfig};
use crate::embedding::{compute_embedding, cosine_similarity, tokenize};
use crate::memory::links::LinkGraph;
use crate::memory::store::{effective_decay, idle_days, is_stop_word};
use crate::memory::types::{
    clamp_unit, AssociativeLink, MatchType, MemoryCategory, MemoryEntry, RetrievalResult,
};

// ── Public types ──────────────────────────────────────────────────────────────

/// Filters applied after scoring.
#[derive(Debug, Clone, Default)]
pub struct SearchFilter {
    /// Only entries whose category is listed. `None` admits every category.
    pub categories: Option<Vec<MemoryCategory>>,
    pub min_score: f64,
}

/// Search configuration knobs.
pub struct SearchConfig<'a> {
    pub max_results: usize,
    pub retrieval: &'a RetrievalConfig,
    pub memory: &'a MemoryConfig,
    /// Whether links boost in both directions or only `source -> target`.
    pub symmetric_links: bool,
}

/// One entry of the recall tool response.
#[derive(Debug, Clone, Serialize)]
pub struct RecalledMemory {
    pub content: String,
    pub category: MemoryCategory,
    pub keywords: Vec<String>,
    pub importance: u8,
    /// Rounded to 3 decimals.
    pub score: f64,
    #[serde(rename = "matchType")]
    pub match_type: MatchType,
}

// ── Scoring internals ─────────────────────────────────────────────────────────

/// Query words that shift weight toward recency.
const TEMPORAL_QUERY_MARKERS: &[&str] = &[
    "recent",
    "recently",
    "latest",
    "yesterday",
    "today",
    "earlier",
    "last",
    "lately",
    "ago",
];

/// Multiplier on the temporal weight when the query asks about time.
const TEMPORAL_QUERY_BOOST: f64 = 2.0;

/// Factor on semantic similarity when the entry shares no query term. With hashed
/// bag-of-words vectors such similarity comes from bucket collisions only.
const COLLISION_DISCOUNT: f64 = 0.25;

/// Share of the score that always survives forgetting; the rest scales with
/// effective decay.
const RETENTION_FLOOR: f64 = 0.75;

#[derive(Debug, Clone, Copy, Default)]
struct Signals {
    keyword: f64,
    semantic: f64,
    temporal: f64,
    relational: f64,
}

struct Candidate<'m> {
    memory: &'m MemoryEntry,
    signals: Signals,
    base: f64,
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Multi-signal search: keyword overlap, semantic similarity, recency, and a
/// relational boost for entries linked to strong hits.
///
/// Results are filtered by category and `min_score`, ordered by score (then
/// importance, then recency), and truncated to `max_results`. No match is an
/// empty `Vec`.
pub fn search_memories(
    corpus: &[MemoryEntry],
    links: &[AssociativeLink],
    query: &str,
    filter: &SearchFilter,
    config: &SearchConfig<'_>,
    now: DateTime<Utc>,
) -> Vec<RetrievalResult> {
    if corpus.is_empty() || config.max_results == 0 {
        return Vec::new();
    }

    let weights = config.retrieval.weights;
    let query_tokens = query_terms(query);
    let query_embedding = compute_embedding(query);
    let temporal_query = query_tokens
        .iter()
        .any(|t| TEMPORAL_QUERY_MARKERS.contains(&t.as_str()));
    let temporal_weight = if temporal_query {
        weights.temporal * TEMPORAL_QUERY_BOOST
    } else {
        weights.temporal
    };

    // 1. Direct signals for every entry
    let mut candidates: Vec<Candidate<'_>> = corpus
        .iter()
        .map(|memory| {
            let keyword = keyword_overlap(&query_tokens, memory);
            let mut semantic = semantic_similarity(&query_embedding, memory);
            if keyword == 0.0 {
                semantic *= COLLISION_DISCOUNT;
            }
            // Recency ranks relevant entries; alone it only matters for "recent" queries
            let temporal = if keyword > 0.0 || temporal_query {
                recency(memory, config.retrieval.recency_half_life_days, now)
            } else {
                0.0
            };
            let signals = Signals {
                keyword,
                semantic,
                temporal,
                relational: 0.0,
            };
            let base = weights.keyword * signals.keyword
                + weights.semantic * signals.semantic
                + temporal_weight * signals.temporal;
            Candidate {
                memory,
                signals,
                base,
            }
        })
        .collect();

    // 2. Relational boost from strong linked neighbours
    apply_relational(
        &mut candidates,
        links,
        config.retrieval.relational_anchor,
        config.symmetric_links,
    );

    // 3. Combine, filter
    let mut results: Vec<RetrievalResult> = candidates
        .into_iter()
        .filter(|c| match &filter.categories {
            Some(allowed) => allowed.contains(&c.memory.category),
            None => true,
        })
        .filter_map(|c| {
            let mut signals = c.signals;
            let mut combined = c.base + weights.relational * signals.relational;
            if signals.temporal == 0.0 && signals.relational > 0.0 {
                signals.temporal = recency(c.memory, config.retrieval.recency_half_life_days, now);
                combined += temporal_weight * signals.temporal;
            }
            let retention =
                RETENTION_FLOOR + (1.0 - RETENTION_FLOOR) * effective_decay(c.memory, config.memory, now);
            let score = clamp_unit(combined * retention);
            if score <= 0.0 || score < filter.min_score {
                return None;
            }
            Some(RetrievalResult {
                memory: c.memory.clone(),
                score,
                match_type: dominant_signal(&signals, weights.keyword, weights.semantic, temporal_weight, weights.relational),
            })
        })
        .collect();

    // 4. Order and truncate
    results.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(b.memory.importance.cmp(&a.memory.importance))
            .then(b.memory.last_touched().cmp(&a.memory.last_touched()))
    });
    results.truncate(config.max_results);

    tracing::debug!(query_len = query.len(), results = results.len(), "memory search");
    results
}

/// Convert results to the recall tool's JSON shape.
pub fn to_recall_view(results: &[RetrievalResult]) -> Vec<RecalledMemory> {
    results
        .iter()
        .map(|r| RecalledMemory {
            content: r.memory.content.clone(),
            category: r.memory.category,
            keywords: r.memory.keywords.clone(),
            importance: r.memory.importance,
            score: round3(r.score),
            match_type: r.match_type,
        })
        .collect()
}

fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

// ── Internal helpers ──────────────────────────────────────────────────────────

/// Distinct query tokens, without stop words unless the query has nothing else.
fn query_terms(query: &str) -> Vec<String> {
    let tokens = tokenize(query);
    let mut seen = HashSet::new();
    let content: Vec<String> = tokens
        .iter()
        .filter(|t| !is_stop_word(t))
        .filter(|t| seen.insert(t.as_str()))
        .cloned()
        .collect();
    if content.is_empty() {
        let mut seen = HashSet::new();
        tokens.into_iter().filter(|t| seen.insert(t.clone())).collect()
    } else {
        content
    }
}

/// Fraction of query terms found in the entry's keywords or content.
fn keyword_overlap(query_tokens: &[String], memory: &MemoryEntry) -> f64 {
    if query_tokens.is_empty() {
        return 0.0;
    }
    let content_tokens = tokenize(&memory.content);
    let vocabulary: HashSet<&str> = memory
        .keywords
        .iter()
        .map(String::as_str)
        .chain(content_tokens.iter().map(String::as_str))
        .collect();
    let hits = query_tokens
        .iter()
        .filter(|t| vocabulary.contains(t.as_str()))
        .count();
    hits as f64 / query_tokens.len() as f64
}

fn semantic_similarity(query_embedding: &[f32], memory: &MemoryEntry) -> f64 {
    let computed;
    let embedding = match &memory.embedding {
        Some(e) => e.as_slice(),
        None => {
            computed = compute_embedding(&memory.content);
            computed.as_slice()
        }
    };
    match cosine_similarity(query_embedding, embedding) {
        Ok(sim) => f64::from(sim).max(0.0),
        Err(e) => {
            tracing::warn!(id = %memory.id, error = %e, "stored embedding has wrong dimensions");
            let fresh = compute_embedding(&memory.content);
            cosine_similarity(query_embedding, &fresh)
                .map(|s| f64::from(s).max(0.0))
                .unwrap_or(0.0)
        }
    }
}

/// `0.5^(days since last touch / half_life)`.
fn recency(memory: &MemoryEntry, half_life_days: f64, now: DateTime<Utc>) -> f64 {
    let idle = idle_days(memory.last_touched(), now);
    0.5f64.powf(idle / half_life_days.max(f64::EPSILON))
}

/// Boost entries linked from an anchor (an entry whose base score reaches
/// `anchor`). In directed mode only `source -> target` links carry the boost.
fn apply_relational(
    candidates: &mut [Candidate<'_>],
    links: &[AssociativeLink],
    anchor: f64,
    symmetric: bool,
) {
    if links.is_empty() {
        return;
    }
    let graph = match LinkGraph::build(links, symmetric) {
        Ok(graph) => graph,
        Err(e) => {
            tracing::warn!(error = %e, "relational boost skipped");
            return;
        }
    };
    let mut boosts: HashMap<&str, f64> = HashMap::new();
    for c in candidates.iter().filter(|c| c.base >= anchor) {
        for (id, strength) in graph.neighbours(&c.memory.id) {
            let boost = boosts.entry(id.as_str()).or_insert(0.0);
            *boost = boost.max(c.base * strength);
        }
    }
    if boosts.is_empty() {
        return;
    }
    let boosts: Vec<f64> = candidates
        .iter()
        .map(|c| boosts.get(c.memory.id.as_str()).copied().unwrap_or(0.0))
        .collect();
    for (candidate, boost) in candidates.iter_mut().zip(boosts) {
        candidate.signals.relational = clamp_unit(boost);
    }
}

fn dominant_signal(
    signals: &Signals,
    keyword_weight: f64,
    semantic_weight: f64,
    temporal_weight: f64,
    relational_weight: f64,
) -> MatchType {
    let contributions = [
        (keyword_weight * signals.keyword, MatchType::Keyword),
        (semantic_weight * signals.semantic, MatchType::Semantic),
        (temporal_weight * signals.temporal, MatchType::Temporal),
        (relational_weight * signals.relational, MatchType::Relational),
    ];
    contributions
        .iter()
        .fold((f64::MIN, MatchType::Keyword), |best, &(value, kind)| {
            if value > best.0 {
                (value, kind)
            } else {
                best
            }
        })
        .1
}
