//! Context injections: prioritized prompt fragments produced by the analyzers.

use serde::{Deserialize, Serialize};

/// Rough characters-per-token ratio for English prose.
const CHARS_PER_TOKEN: f64 = 3.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InjectionSource {
    Emotion,
    Curiosity,
    ThoughtTree,
    Meta,
    Intent,
    Discourse,
    Reasoning,
    Salience,
    Priming,
    Memory,
}

impl InjectionSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Emotion => "emotion",
            Self::Curiosity => "curiosity",
            Self::ThoughtTree => "thought_tree",
            Self::Meta => "meta",
            Self::Intent => "intent",
            Self::Discourse => "discourse",
            Self::Reasoning => "reasoning",
            Self::Salience => "salience",
            Self::Priming => "priming",
            Self::Memory => "memory",
        }
    }
}

impl std::fmt::Display for InjectionSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One block of text destined for the system prompt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextInjection {
    pub source: InjectionSource,
    pub content: String,
    /// Higher sorts first.
    pub priority: i32,
    /// Estimated prompt tokens.
    pub token_cost: usize,
}

impl ContextInjection {
    pub fn new(source: InjectionSource, content: impl Into<String>, priority: i32) -> Self {
        let content = content.into();
        let token_cost = estimate_tokens(&content);
        Self {
            source,
            content,
            priority,
            token_cost,
        }
    }
}

/// `ceil(chars / 3.5)`.
pub fn estimate_tokens(text: &str) -> usize {
    (text.chars().count() as f64 / CHARS_PER_TOKEN).ceil() as usize
}

/// Drop empty fragments and order by descending priority. Equal priorities keep
/// their production order.
pub fn assemble_injections(candidates: Vec<Option<ContextInjection>>) -> Vec<ContextInjection> {
    let mut injections: Vec<ContextInjection> = candidates
        .into_iter()
        .flatten()
        .filter(|i| !i.content.trim().is_empty())
        .collect();
    // sort_by is stable
    injections.sort_by(|a, b| b.priority.cmp(&a.priority));
    injections
}

pub fn total_token_cost(injections: &[ContextInjection]) -> usize {
    injections.iter().map(|i| i.token_cost).sum()
}

/// Render injections as one prompt section, highest priority first.
pub fn render_injections(injections: &[ContextInjection]) -> String {
    injections
        .iter()
        .map(|i| format!("[{}] {}", i.source, i.content))
        .collect::<Vec<_>>()
        .join("\n")
}
