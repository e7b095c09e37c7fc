//! Self-assessment of a message before answering: how hard it is, how ambiguous,
//! and whether it needs fresh information.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

use crate::cognition::injection::{ContextInjection, InjectionSource};
use crate::embedding::tokenize;
use crate::memory::types::clamp_unit;

/// Messages longer than this are decomposed regardless of complexity.
pub const DECOMPOSE_LENGTH: usize = 400;
pub const CLARIFICATION_THRESHOLD: f64 = 0.6;

const LEADING_PRONOUN_WEIGHT: f64 = 0.3;
const VERY_SHORT_WEIGHT: f64 = 0.35;
const VERY_SHORT_WORDS: usize = 3;
const BARE_IMPERATIVE_WEIGHT: f64 = 0.3;
const UNRESOLVED_REFERENCE_WEIGHT: f64 = 0.2;

const SEARCH_UNCERTAINTY: f64 = 0.2;
const TIME_UNCERTAINTY: f64 = 0.1;
const AMBIGUITY_UNCERTAINTY: f64 = 0.3;
const CALIBRATION_FACTOR: f64 = 0.5;

const LOAD_LENGTH_CHARS: f64 = 500.0;
const LOAD_LENGTH_WEIGHT: f64 = 0.4;
const LOAD_CONJUNCTION_CAP: f64 = 4.0;
const LOAD_CONJUNCTION_WEIGHT: f64 = 0.3;
const LOAD_QUESTION_CAP: f64 = 3.0;
const LOAD_QUESTION_WEIGHT: f64 = 0.3;

const META_PRIORITY_CLARIFY: i32 = 9;
const META_PRIORITY_DEFAULT: i32 = 7;

const REFERENTIAL_PRONOUNS: &[&str] = &[
    "it", "this", "that", "they", "them", "these", "those", "he", "she", "him", "her",
];
const VAGUE_OBJECTS: &[&str] = &["it", "this", "that", "them", "these", "those", "stuff", "things"];
const IMPERATIVE_VERBS: &[&str] = &[
    "fix", "do", "make", "change", "update", "run", "check", "send", "redo", "finish", "handle",
    "continue", "try", "use", "add", "remove", "delete", "improve",
];
const CONJUNCTIONS: &[&str] = &[
    "and", "or", "but", "because", "although", "while", "then", "also", "if", "unless",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReasoningComplexity {
    Simple,
    Moderate,
    Complex,
    Expert,
}

impl ReasoningComplexity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Simple => "simple",
            Self::Moderate => "moderate",
            Self::Complex => "complex",
            Self::Expert => "expert",
        }
    }

    fn baseline_uncertainty(self) -> f64 {
        match self {
            Self::Simple => 0.1,
            Self::Moderate => 0.25,
            Self::Complex => 0.4,
            Self::Expert => 0.55,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetacognitionState {
    pub uncertainty_level: f64,
    pub reasoning_complexity: ReasoningComplexity,
    pub should_decompose: bool,
    pub should_seek_clarification: bool,
    pub should_search_web: bool,
    pub is_time_sensitive: bool,
    pub ambiguity_score: f64,
    pub ambiguity_reasons: Vec<String>,
    pub confidence_calibration: f64,
    pub cognitive_load: f64,
}

/// Indicator patterns, checked in order. A later match only ever raises the level.
static COMPLEXITY_TABLE: LazyLock<Vec<(Regex, ReasoningComplexity)>> = LazyLock::new(|| {
    compile_table(&[
        (
            r"\b(how (do|does|can|to)|explain|compare|difference between|why (does|is|do)|steps?|summari[sz]e)\b",
            ReasoningComplexity::Moderate,
        ),
        (
            r"\b(how should|approach|strateg(y|ies)|design|architect\w*|restructur\w*|refactor\w*|plan(ning)?|trade-?offs?|optimi[sz]\w*|migrat\w*|prioriti[sz]\w*)\b",
            ReasoningComplexity::Complex,
        ),
        (
            r"\b(prove|proof|theorem|formal verification|distributed consensus|memory model|cryptograph\w*|quantum|differential equations?|complexity class)\b",
            ReasoningComplexity::Expert,
        ),
    ])
});

static TIME_SENSITIVE: LazyLock<Option<Regex>> = LazyLock::new(|| {
    compile(
        r"\b(urgent(ly)?|asap|deadline|today|tonight|tomorrow|right now|this week|immediately|by (monday|tuesday|wednesday|thursday|friday|eod|end of day))\b",
    )
});

static KNOWLEDGE_LIMIT: LazyLock<Option<Regex>> = LazyLock::new(|| {
    compile(
        r"\b(latest|news|current (price|version|events?|status)|stock price|weather|exchange rate|recently released|as of 20\d\d|this year's|who won)\b",
    )
});

fn compile(pattern: &str) -> Option<Regex> {
    match Regex::new(pattern) {
        Ok(re) => Some(re),
        Err(e) => {
            tracing::error!(pattern, error = %e, "invalid metacognition pattern");
            None
        }
    }
}

fn compile_table<T: Copy>(table: &[(&str, T)]) -> Vec<(Regex, T)> {
    table
        .iter()
        .filter_map(|(pattern, value)| compile(pattern).map(|re| (re, *value)))
        .collect()
}

fn is_match(re: &Option<Regex>, text: &str) -> bool {
    re.as_ref().is_some_and(|re| re.is_match(text))
}

/// Assess `message` given how many turns precede it in the conversation.
pub fn assess_metacognition(message: &str, conversation_length: usize) -> MetacognitionState {
    let lowered = message.to_lowercase();
    let tokens = tokenize(message);

    let mut complexity = ReasoningComplexity::Simple;
    for (re, level) in COMPLEXITY_TABLE.iter() {
        if *level > complexity && re.is_match(&lowered) {
            complexity = *level;
        }
    }

    let should_decompose = complexity >= ReasoningComplexity::Complex
        || message.chars().count() > DECOMPOSE_LENGTH;

    let (ambiguity_score, ambiguity_reasons) = assess_ambiguity(&tokens, conversation_length);
    let should_seek_clarification = ambiguity_score >= CLARIFICATION_THRESHOLD;

    let is_time_sensitive = is_match(&TIME_SENSITIVE, &lowered);
    let should_search_web = is_match(&KNOWLEDGE_LIMIT, &lowered);

    let mut uncertainty = complexity.baseline_uncertainty() + ambiguity_score * AMBIGUITY_UNCERTAINTY;
    if should_search_web {
        uncertainty += SEARCH_UNCERTAINTY;
    }
    if is_time_sensitive {
        uncertainty += TIME_UNCERTAINTY;
    }
    let uncertainty_level = clamp_unit(uncertainty);

    MetacognitionState {
        uncertainty_level,
        reasoning_complexity: complexity,
        should_decompose,
        should_seek_clarification,
        should_search_web,
        is_time_sensitive,
        ambiguity_score,
        ambiguity_reasons,
        confidence_calibration: clamp_unit(1.0 - uncertainty_level * CALIBRATION_FACTOR),
        cognitive_load: cognitive_load(message, &tokens),
    }
}

fn assess_ambiguity(tokens: &[String], conversation_length: usize) -> (f64, Vec<String>) {
    let mut score = 0.0;
    let mut reasons = Vec::new();
    let Some(first) = tokens.first() else {
        return (1.0, vec!["empty_message".to_string()]);
    };

    if REFERENTIAL_PRONOUNS.contains(&first.as_str()) {
        score += LEADING_PRONOUN_WEIGHT;
        reasons.push("leading_pronoun".to_string());
    }
    if tokens.len() <= VERY_SHORT_WORDS {
        score += VERY_SHORT_WEIGHT;
        reasons.push("very_short".to_string());
    }
    let rest_is_vague = tokens[1..].iter().all(|t| VAGUE_OBJECTS.contains(&t.as_str()));
    if IMPERATIVE_VERBS.contains(&first.as_str()) && rest_is_vague {
        score += BARE_IMPERATIVE_WEIGHT;
        reasons.push("bare_imperative".to_string());
    }
    if conversation_length == 0
        && tokens
            .iter()
            .any(|t| REFERENTIAL_PRONOUNS.contains(&t.as_str()))
    {
        score += UNRESOLVED_REFERENCE_WEIGHT;
        reasons.push("unresolved_reference".to_string());
    }
    (clamp_unit(score), reasons)
}

fn cognitive_load(message: &str, tokens: &[String]) -> f64 {
    let length = (message.chars().count() as f64 / LOAD_LENGTH_CHARS).min(1.0);
    let conjunctions = tokens
        .iter()
        .filter(|t| CONJUNCTIONS.contains(&t.as_str()))
        .count() as f64;
    let questions = message.matches('?').count() as f64;
    clamp_unit(
        length * LOAD_LENGTH_WEIGHT
            + (conjunctions / LOAD_CONJUNCTION_CAP).min(1.0) * LOAD_CONJUNCTION_WEIGHT
            + (questions / LOAD_QUESTION_CAP).min(1.0) * LOAD_QUESTION_WEIGHT,
    )
}

/// Guidance on how to pace the answer. Emitted for anything beyond a simple,
/// unambiguous, timeless message.
pub fn format_meta_injection(state: &MetacognitionState) -> Option<ContextInjection> {
    let mut lines = Vec::new();
    if state.reasoning_complexity >= ReasoningComplexity::Moderate {
        lines.push(format!(
            "This is a {} question (confidence calibration {:.2}).",
            state.reasoning_complexity.as_str(),
            state.confidence_calibration
        ));
    }
    if state.should_decompose {
        lines.push("Break the problem into parts and address them in order.".to_string());
    }
    if state.should_seek_clarification {
        lines.push(format!(
            "The request is ambiguous ({}); ask a clarifying question before acting.",
            state.ambiguity_reasons.join(", ")
        ));
    }
    if state.is_time_sensitive {
        lines.push("The user is under time pressure; lead with the most actionable step.".to_string());
    }
    if state.should_search_web {
        lines.push(
            "This may depend on information newer than your knowledge; say so or look it up."
                .to_string(),
        );
    }
    if lines.is_empty() {
        return None;
    }

    let priority = if state.should_seek_clarification {
        META_PRIORITY_CLARIFY
    } else {
        META_PRIORITY_DEFAULT
    };
    Some(ContextInjection::new(
        InjectionSource::Meta,
        lines.join(" "),
        priority,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fix_it_needs_clarification() {
        let state = assess_metacognition("fix it", 0);
        assert!(state.ambiguity_score >= 0.6);
        assert!(state.should_seek_clarification);
        assert!(state.ambiguity_reasons.contains(&"bare_imperative".to_string()));
        assert!(state.ambiguity_reasons.contains(&"very_short".to_string()));
    }

    #[test]
    fn complexity_escalates_and_never_downgrades() {
        let simple = assess_metacognition("what time is the standup", 2);
        assert_eq!(simple.reasoning_complexity, ReasoningComplexity::Simple);

        let moderate = assess_metacognition("explain how the cache works", 2);
        assert_eq!(moderate.reasoning_complexity, ReasoningComplexity::Moderate);

        // Matches moderate and expert indicators; the higher wins.
        let expert = assess_metacognition("explain the proof of this theorem", 2);
        assert_eq!(expert.reasoning_complexity, ReasoningComplexity::Expert);
        assert!(expert.should_decompose);
    }

    #[test]
    fn restructuring_question_decomposes() {
        let state =
            assess_metacognition("How should I approach restructuring this urgent project?", 0);
        assert_eq!(state.reasoning_complexity, ReasoningComplexity::Complex);
        assert!(state.should_decompose);
        assert!(state.is_time_sensitive);
        assert!(!state.should_seek_clarification);
    }

    #[test]
    fn long_messages_decompose() {
        let message = "word ".repeat(100);
        let state = assess_metacognition(&message, 3);
        assert!(state.should_decompose);
    }

    #[test]
    fn knowledge_limit_raises_uncertainty() {
        let plain = assess_metacognition("what is a monad in haskell", 1);
        let fresh = assess_metacognition("what is the latest rust version", 1);
        assert!(fresh.should_search_web);
        assert!(!plain.should_search_web);
        assert!(fresh.uncertainty_level > plain.uncertainty_level);
        assert!(fresh.confidence_calibration < plain.confidence_calibration);
    }

    #[test]
    fn calibration_tracks_uncertainty() {
        let state = assess_metacognition("design a migration plan for the billing service", 4);
        let expected = 1.0 - state.uncertainty_level * 0.5;
        assert!((state.confidence_calibration - expected).abs() < 1e-9);
    }

    #[test]
    fn cognitive_load_is_clipped() {
        let message = format!(
            "{} and or but because? while? then? if? also?",
            "x".repeat(900)
        );
        let state = assess_metacognition(&message, 1);
        assert!(state.cognitive_load <= 1.0);
        assert!(state.cognitive_load > 0.9);
    }

    #[test]
    fn pronoun_without_history_is_flagged() {
        let first_turn = assess_metacognition("can you summarize that document for me", 0);
        let later_turn = assess_metacognition("can you summarize that document for me", 4);
        assert!(first_turn.ambiguity_score > later_turn.ambiguity_score);
    }

    #[test]
    fn meta_injection_gating() {
        let simple = assess_metacognition("what time is the standup", 2);
        assert!(format_meta_injection(&simple).is_none());

        let vague = assess_metacognition("fix it", 0);
        let injection = format_meta_injection(&vague).unwrap();
        assert_eq!(injection.priority, 9);
        assert!(injection.content.contains("clarifying"));

        let complex = assess_metacognition("How should I approach restructuring this urgent project?", 0);
        assert_eq!(format_meta_injection(&complex).unwrap().priority, 7);
    }
}
