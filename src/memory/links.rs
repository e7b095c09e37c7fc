//! Associative link graph.
//!
//! Links are inferred when a memory is created ([`infer_links`]), merged into the
//! existing set without duplicating a `(source, target, type)` triple
//! ([`merge_links`]), and strengthened when both endpoints are recalled together
//! ([`reinforce_coactivated`]). [`get_associative_memories`] runs a bounded
//! breadth-first spreading activation from an initial result set over a
//! [`LinkGraph`] adjacency map.

use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet, VecDeque};

use crate::config::AssociationConfig;
use crate::embedding::{compute_embedding, cosine_similarity};
use crate::error::{CoreError, CoreResult};
use crate::memory::types::{
    clamp_unit, AssociativeLink, LinkType, MatchType, MemoryEntry, RetrievalResult,
};

/// Signal weights for the initial strength of an inferred link.
const SEMANTIC_LINK_WEIGHT: f64 = 0.4;
const KEYWORD_LINK_WEIGHT: f64 = 0.3;
const CATEGORY_LINK_WEIGHT: f64 = 0.15;
const TEMPORAL_LINK_WEIGHT: f64 = 0.15;

/// Memories created within this many seconds of each other count as temporally close.
const TEMPORAL_WINDOW_SECS: i64 = 3600;

/// Phrases that mark the new memory as a cause or effect of something already known.
const CAUSAL_MARKERS: &[&str] = &[
    "because",
    "therefore",
    "caused",
    "causes",
    "due to",
    "leads to",
    "led to",
    "results in",
    "as a result",
    "so that",
];

/// Compare a new memory against the corpus and emit links for related entries,
/// strongest first, at most `max_links_per_memory`.
pub fn infer_links(
    new: &MemoryEntry,
    corpus: &[MemoryEntry],
    config: &AssociationConfig,
    now: DateTime<Utc>,
) -> Vec<AssociativeLink> {
    let new_embedding = new
        .embedding
        .clone()
        .unwrap_or_else(|| compute_embedding(&new.content));
    let lowered = new.content.to_lowercase();
    let causal = CAUSAL_MARKERS.iter().any(|m| lowered.contains(m));

    let mut links: Vec<AssociativeLink> = corpus
        .iter()
        .filter(|existing| existing.id != new.id)
        .filter_map(|existing| {
            let existing_embedding = existing
                .embedding
                .clone()
                .unwrap_or_else(|| compute_embedding(&existing.content));
            let semantic = cosine_similarity(&new_embedding, &existing_embedding)
                .map(|s| f64::from(s).max(0.0))
                .unwrap_or(0.0);
            let overlap = keyword_jaccard(&new.keywords, &existing.keywords);
            let same_category = if new.category == existing.category { 1.0 } else { 0.0 };
            let temporal = temporal_proximity(new.timestamp, existing.timestamp);

            let strength = clamp_unit(
                SEMANTIC_LINK_WEIGHT * semantic
                    + KEYWORD_LINK_WEIGHT * overlap
                    + CATEGORY_LINK_WEIGHT * same_category
                    + TEMPORAL_LINK_WEIGHT * temporal,
            );
            if strength < config.link_threshold {
                return None;
            }

            let link_type = if causal && overlap > 0.0 {
                LinkType::Causal
            } else if new.context_signature == existing.context_signature {
                LinkType::Contextual
            } else {
                dominant_link_type(semantic, overlap, same_category, temporal)
            };

            Some(AssociativeLink {
                source_id: new.id.clone(),
                target_id: existing.id.clone(),
                strength,
                link_type,
                created_at: now,
                reinforcements: 0,
            })
        })
        .collect();

    links.sort_by(|a, b| {
        b.strength
            .partial_cmp(&a.strength)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    links.truncate(config.max_links_per_memory);
    links
}

fn dominant_link_type(semantic: f64, overlap: f64, same_category: f64, temporal: f64) -> LinkType {
    let candidates = [
        (SEMANTIC_LINK_WEIGHT * semantic, LinkType::Semantic),
        (KEYWORD_LINK_WEIGHT * overlap, LinkType::Topical),
        (TEMPORAL_LINK_WEIGHT * temporal, LinkType::Temporal),
        (CATEGORY_LINK_WEIGHT * same_category, LinkType::Contextual),
    ];
    candidates
        .iter()
        .fold((f64::MIN, LinkType::Semantic), |best, &(value, kind)| {
            if value > best.0 {
                (value, kind)
            } else {
                best
            }
        })
        .1
}

/// Jaccard similarity of two keyword sets.
pub fn keyword_jaccard(a: &[String], b: &[String]) -> f64 {
    let a: HashSet<&str> = a.iter().map(String::as_str).collect();
    let b: HashSet<&str> = b.iter().map(String::as_str).collect();
    let union = a.union(&b).count();
    if union == 0 {
        return 0.0;
    }
    a.intersection(&b).count() as f64 / union as f64
}

fn temporal_proximity(a: DateTime<Utc>, b: DateTime<Utc>) -> f64 {
    let gap = (a - b).num_seconds().abs();
    if gap >= TEMPORAL_WINDOW_SECS {
        0.0
    } else {
        1.0 - gap as f64 / TEMPORAL_WINDOW_SECS as f64
    }
}

/// Outcome of merging new links into an existing set.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct LinkMergeResult {
    pub created: usize,
    pub reinforced: usize,
}

/// Raise a link's strength by `step` (capped at 1) and count the reinforcement.
pub fn reinforce_link(link: &mut AssociativeLink, step: f64) {
    link.strength = clamp_unit(link.strength + step.max(0.0));
    link.reinforcements = link.reinforcements.saturating_add(1);
}

/// Add `incoming` to `existing`. A link whose triple already exists reinforces the
/// existing one instead of being appended. Self-links are dropped.
pub fn merge_links(
    existing: &mut Vec<AssociativeLink>,
    incoming: Vec<AssociativeLink>,
    step: f64,
) -> LinkMergeResult {
    let mut result = LinkMergeResult::default();
    for link in incoming {
        if link.source_id == link.target_id {
            tracing::debug!(id = %link.source_id, "dropping self-link");
            continue;
        }
        match existing.iter_mut().find(|l| l.key() == link.key()) {
            Some(current) => {
                reinforce_link(current, step);
                result.reinforced += 1;
            }
            None => {
                existing.push(AssociativeLink {
                    strength: clamp_unit(link.strength),
                    ..link
                });
                result.created += 1;
            }
        }
    }
    result
}

/// Reinforce every link whose endpoints were both activated in the same retrieval.
/// Returns how many links were strengthened.
pub fn reinforce_coactivated(links: &mut [AssociativeLink], activated: &[String], step: f64) -> usize {
    let active: HashSet<&str> = activated.iter().map(String::as_str).collect();
    let mut count = 0;
    for link in links.iter_mut() {
        if active.contains(link.source_id.as_str()) && active.contains(link.target_id.as_str()) {
            reinforce_link(link, step);
            count += 1;
        }
    }
    count
}

/// Adjacency map over memory ids. Each neighbour keeps the strongest link to it.
#[derive(Debug, Default)]
pub struct LinkGraph {
    adjacency: HashMap<String, Vec<(String, f64)>>,
}

impl LinkGraph {
    /// Build the adjacency map. With `symmetric`, every link is traversable in both
    /// directions. Fails on self-links or non-finite strengths.
    pub fn build(links: &[AssociativeLink], symmetric: bool) -> CoreResult<Self> {
        let mut graph = LinkGraph::default();
        for link in links {
            if link.source_id == link.target_id {
                return Err(CoreError::MalformedEntry(format!(
                    "self-link on memory {}",
                    link.source_id
                )));
            }
            if !link.strength.is_finite() {
                return Err(CoreError::MalformedEntry(format!(
                    "link {} -> {} has non-finite strength",
                    link.source_id, link.target_id
                )));
            }
            let strength = clamp_unit(link.strength);
            graph.add_edge(&link.source_id, &link.target_id, strength);
            if symmetric {
                graph.add_edge(&link.target_id, &link.source_id, strength);
            }
        }
        Ok(graph)
    }

    fn add_edge(&mut self, from: &str, to: &str, strength: f64) {
        let edges = self.adjacency.entry(from.to_string()).or_default();
        match edges.iter_mut().find(|(id, _)| id == to) {
            Some(edge) => edge.1 = edge.1.max(strength),
            None => edges.push((to.to_string(), strength)),
        }
    }

    pub fn neighbours(&self, id: &str) -> &[(String, f64)] {
        self.adjacency.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Whether `a` has an edge to `b`.
    pub fn is_linked(&self, a: &str, b: &str) -> bool {
        self.neighbours(a).iter().any(|(id, _)| id == b)
    }
}

/// Breadth-first spreading activation from `seeds`.
///
/// Activation starts at each seed's score and is multiplied by link strength and
/// `hop_decay` per hop. Ids already visited (including every seed) are never emitted
/// again, so cycles terminate. Depth-1 hits are [`MatchType::Associative`], deeper
/// ones [`MatchType::Primed`]. Links pointing at ids absent from `corpus` are skipped.
pub fn spread_activation(
    graph: &LinkGraph,
    seeds: &[RetrievalResult],
    corpus: &[MemoryEntry],
    config: &AssociationConfig,
) -> Vec<RetrievalResult> {
    let by_id: HashMap<&str, &MemoryEntry> = corpus.iter().map(|m| (m.id.as_str(), m)).collect();
    let mut visited: HashSet<String> = seeds.iter().map(|s| s.memory.id.clone()).collect();
    let mut queue: VecDeque<(String, f64, usize)> = seeds
        .iter()
        .map(|s| (s.memory.id.clone(), s.score, 0))
        .collect();
    let mut results = Vec::new();

    while let Some((id, activation, depth)) = queue.pop_front() {
        if depth >= config.max_depth {
            continue;
        }
        for (neighbour, strength) in graph.neighbours(&id) {
            let spread = activation * strength * config.hop_decay;
            if spread < config.min_activation || visited.contains(neighbour) {
                continue;
            }
            let Some(memory) = by_id.get(neighbour.as_str()) else {
                tracing::debug!(id = %neighbour, "link target missing from corpus");
                continue;
            };
            visited.insert(neighbour.clone());
            results.push(RetrievalResult {
                memory: (*memory).clone(),
                score: clamp_unit(spread),
                match_type: if depth == 0 {
                    MatchType::Associative
                } else {
                    MatchType::Primed
                },
            });
            queue.push_back((neighbour.clone(), spread, depth + 1));
        }
    }

    results.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    results.truncate(config.max_associative_results);
    results
}

/// Best-effort associative expansion. A corrupt link set is logged and yields no
/// extra results; it never fails the caller.
pub fn get_associative_memories(
    seeds: &[RetrievalResult],
    corpus: &[MemoryEntry],
    links: &[AssociativeLink],
    config: &AssociationConfig,
) -> Vec<RetrievalResult> {
    if seeds.is_empty() || links.is_empty() {
        return Vec::new();
    }
    match LinkGraph::build(links, config.symmetric_traversal) {
        Ok(graph) => spread_activation(&graph, seeds, corpus, config),
        Err(e) => {
            tracing::warn!(error = %e, "associative traversal skipped");
            Vec::new()
        }
    }
}
