//! Competing response strategies for a turn, kept in an arena.
//!
//! Branches live in one `Vec` and refer to each other by index (`parent`,
//! `children`). After construction the arena is sorted by descending confidence
//! and every index is remapped, so a branch's `id` is always its position.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

use crate::cognition::injection::{ContextInjection, InjectionSource};
use crate::cognition::metacognition::{MetacognitionState, ReasoningComplexity};
use crate::memory::types::{clamp_unit, RetrievalResult};

pub const PRUNE_THRESHOLD: f64 = 0.25;
pub const BEST_PATH_THRESHOLD: f64 = 0.4;
pub const MAX_BEST_PATH: usize = 3;
const MAX_EVIDENCE: usize = 3;
const EVIDENCE_CHARS: usize = 80;
const MEMORY_BRANCH_CAP: f64 = 0.9;
const MEMORY_BRANCH_LIFT: f64 = 0.3;
const DECOMPOSE_BASE: f64 = 0.6;
const DECOMPOSE_COMPLEX_BONUS: f64 = 0.1;
const SUBQUESTION_FACTOR: f64 = 0.9;
const SUBQUESTION_MIN_WORDS: usize = 3;
const THOUGHT_TREE_PRIORITY: i32 = 6;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThoughtBranch {
    pub id: usize,
    pub parent: Option<usize>,
    pub children: Vec<usize>,
    pub hypothesis: String,
    pub reasoning: String,
    pub confidence: f64,
    pub evidence: Vec<String>,
    pub counterpoints: Vec<String>,
    pub depth: u32,
    pub pruned: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThoughtTree {
    pub root_query: String,
    /// Sorted by non-increasing confidence.
    pub branches: Vec<ThoughtBranch>,
    /// Ids of the strongest surviving top-level strategies.
    pub best_path: Vec<usize>,
    /// Mean confidence of the top-level strategies.
    pub convergence_score: f64,
    pub exploration_depth: u32,
}

impl ThoughtTree {
    pub fn branch(&self, id: usize) -> Option<&ThoughtBranch> {
        self.branches.get(id)
    }

    /// Top-level branches in confidence order.
    pub fn roots(&self) -> impl Iterator<Item = &ThoughtBranch> {
        self.branches.iter().filter(|b| b.parent.is_none())
    }

    pub fn children_of(&self, id: usize) -> impl Iterator<Item = &ThoughtBranch> + '_ {
        self.branches
            .get(id)
            .into_iter()
            .flat_map(|b| b.children.iter())
            .filter_map(|child| self.branches.get(*child))
    }
}

static SUBQUESTION_SPLIT: LazyLock<Option<Regex>> = LazyLock::new(|| {
    match Regex::new(r"(?i)[?;.]|\band then\b|\balso\b") {
        Ok(re) => Some(re),
        Err(e) => {
            tracing::error!(error = %e, "invalid sub-question pattern");
            None
        }
    }
});

fn subquestions(query: &str) -> Vec<String> {
    let Some(re) = SUBQUESTION_SPLIT.as_ref() else {
        return Vec::new();
    };
    re.split(query)
        .map(str::trim)
        .filter(|part| part.split_whitespace().count() >= SUBQUESTION_MIN_WORDS)
        .map(str::to_string)
        .collect()
}

fn snippet(content: &str) -> String {
    if content.chars().count() <= EVIDENCE_CHARS {
        content.to_string()
    } else {
        let cut: String = content.chars().take(EVIDENCE_CHARS).collect();
        format!("{cut}...")
    }
}

fn leaf(hypothesis: impl Into<String>, reasoning: impl Into<String>, confidence: f64) -> ThoughtBranch {
    ThoughtBranch {
        id: 0,
        parent: None,
        children: Vec::new(),
        hypothesis: hypothesis.into(),
        reasoning: reasoning.into(),
        confidence: clamp_unit(confidence),
        evidence: Vec::new(),
        counterpoints: Vec::new(),
        depth: 0,
        pruned: false,
    }
}

/// Build the candidate strategies for answering `query`.
pub fn build_thought_tree(
    query: &str,
    retrieved: &[RetrievalResult],
    meta: &MetacognitionState,
) -> ThoughtTree {
    let evidence: Vec<String> = retrieved
        .iter()
        .take(MAX_EVIDENCE)
        .map(|r| snippet(&r.memory.content))
        .collect();

    let mut arena: Vec<ThoughtBranch> = Vec::new();

    let mut direct = leaf(
        "Answer directly",
        format!(
            "A {} request; respond from general knowledge and context.",
            meta.reasoning_complexity.as_str()
        ),
        meta.confidence_calibration,
    );
    direct.evidence = evidence.clone();
    if meta.should_seek_clarification {
        direct
            .counterpoints
            .push("The request is ambiguous; a direct answer may miss the point.".into());
    }
    if meta.should_search_web {
        direct
            .counterpoints
            .push("The answer may depend on information newer than what is known.".into());
    }
    arena.push(direct);

    if meta.should_decompose {
        let bonus = if meta.reasoning_complexity >= ReasoningComplexity::Complex {
            DECOMPOSE_COMPLEX_BONUS
        } else {
            0.0
        };
        let mut decompose = leaf(
            "Decompose into sub-problems",
            "The request has several parts or is complex enough to answer step by step.",
            DECOMPOSE_BASE + bonus,
        );
        if meta.cognitive_load < 0.2 {
            decompose
                .counterpoints
                .push("The message itself is short; splitting may over-engineer it.".into());
        }
        let parent_confidence = decompose.confidence;
        let parent = arena.len();
        arena.push(decompose);

        let parts = subquestions(query);
        if parts.len() >= 2 {
            for part in parts {
                let mut child = leaf(
                    part,
                    "Sub-question of the decomposed request.",
                    parent_confidence * SUBQUESTION_FACTOR,
                );
                child.parent = Some(parent);
                child.depth = 1;
                let id = arena.len();
                arena.push(child);
                arena[parent].children.push(id);
            }
        }
    }

    if let Some(top) = retrieved.first() {
        let mut memory = leaf(
            "Leverage remembered context",
            format!(
                "{} related memories were retrieved; ground the answer in them.",
                retrieved.len()
            ),
            (top.score + MEMORY_BRANCH_LIFT).min(MEMORY_BRANCH_CAP),
        );
        memory.evidence = evidence;
        arena.push(memory);
    }

    let mut branches = sort_arena(arena);
    prune(&mut branches);

    // Sub-questions refine a strategy; only top-level strategies compete
    let best_path: Vec<usize> = branches
        .iter()
        .filter(|b| b.parent.is_none() && !b.pruned && b.confidence > BEST_PATH_THRESHOLD)
        .take(MAX_BEST_PATH)
        .map(|b| b.id)
        .collect();

    let (total, strategies) = branches
        .iter()
        .filter(|b| b.parent.is_none())
        .fold((0.0, 0usize), |(sum, n), b| (sum + b.confidence, n + 1));
    let convergence_score = if strategies == 0 {
        0.5
    } else {
        clamp_unit(total / strategies as f64)
    };

    ThoughtTree {
        root_query: query.to_string(),
        branches,
        best_path,
        convergence_score,
        exploration_depth: if meta.should_decompose { 2 } else { 1 },
    }
}

/// Stable sort by descending confidence, rewriting ids and links to the new positions.
fn sort_arena(arena: Vec<ThoughtBranch>) -> Vec<ThoughtBranch> {
    let mut order: Vec<usize> = (0..arena.len()).collect();
    order.sort_by(|a, b| arena[*b].confidence.total_cmp(&arena[*a].confidence));

    let mut new_index = vec![0usize; arena.len()];
    for (new, old) in order.iter().enumerate() {
        new_index[*old] = new;
    }

    let mut slots: Vec<Option<ThoughtBranch>> = arena.into_iter().map(Some).collect();
    order
        .iter()
        .enumerate()
        .filter_map(|(new, old)| {
            let mut branch = slots[*old].take()?;
            branch.id = new;
            branch.parent = branch.parent.map(|p| new_index[p]);
            for child in &mut branch.children {
                *child = new_index[*child];
            }
            Some(branch)
        })
        .collect()
}

/// Mark weak branches, and every descendant of a pruned branch.
fn prune(branches: &mut [ThoughtBranch]) {
    for branch in branches.iter_mut() {
        if branch.confidence < PRUNE_THRESHOLD {
            branch.pruned = true;
        }
    }
    let mut stack: Vec<usize> = branches
        .iter()
        .filter(|b| b.pruned)
        .flat_map(|b| b.children.clone())
        .collect();
    while let Some(id) = stack.pop() {
        if let Some(branch) = branches.get_mut(id) {
            if !branch.pruned {
                branch.pruned = true;
                stack.extend(branch.children.iter().copied());
            }
        }
    }
}

/// Summarize the surviving strategies. Nothing to say when no branch clears the bar.
pub fn format_thought_tree_injection(tree: &ThoughtTree) -> Option<ContextInjection> {
    if tree.best_path.is_empty() {
        return None;
    }
    let steps: Vec<String> = tree
        .best_path
        .iter()
        .filter_map(|id| tree.branch(*id))
        .enumerate()
        .map(|(i, b)| format!("{}. {} ({:.2})", i + 1, b.hypothesis, b.confidence))
        .collect();
    Some(ContextInjection::new(
        InjectionSource::ThoughtTree,
        format!(
            "Candidate approaches: {}. Convergence {:.2}.",
            steps.join("; "),
            tree.convergence_score
        ),
        THOUGHT_TREE_PRIORITY,
    ))
}
