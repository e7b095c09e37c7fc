//! What the user wants from this turn.
//!
//! Keyword heuristics score every intent, scores are normalized to sum to 1, and
//! the largest share is the primary intent. Deterministic and model-free.

use serde::{Deserialize, Serialize};

use crate::cognition::injection::{ContextInjection, InjectionSource};
use crate::cognition::ConversationTurn;

/// Primary share needed before the intent is worth mentioning in the prompt.
pub const INJECTION_CONFIDENCE: f64 = 0.45;
/// Minimum share for a runner-up to count as a secondary intent.
const SECONDARY_SHARE: f64 = 0.2;
const INTENT_PRIORITY_DEFAULT: i32 = 3;
const INTENT_PRIORITY_CORRECTIVE: i32 = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    Question,
    TaskRequest,
    Information,
    Feedback,
    Social,
    Support,
    Brainstorm,
}

impl Intent {
    pub const ALL: [Intent; 7] = [
        Self::Question,
        Self::TaskRequest,
        Self::Information,
        Self::Feedback,
        Self::Social,
        Self::Support,
        Self::Brainstorm,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Question => "question",
            Self::TaskRequest => "task_request",
            Self::Information => "information",
            Self::Feedback => "feedback",
            Self::Social => "social",
            Self::Support => "support",
            Self::Brainstorm => "brainstorm",
        }
    }

    fn guidance(&self) -> &'static str {
        match self {
            Self::Question => "Answer the question first, then add context if useful.",
            Self::TaskRequest => "Produce the requested artifact rather than describing how to.",
            Self::Information => "The user is sharing information; acknowledge it and note what matters.",
            Self::Feedback => "The user is correcting or rating the last answer; adjust rather than repeat it.",
            Self::Social => "Keep it light and brief.",
            Self::Support => "The user wants support more than solutions; listen first.",
            Self::Brainstorm => "Offer several distinct options instead of a single answer.",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntentFrame {
    pub primary: Intent,
    pub secondary: Option<Intent>,
    /// Normalized share of the primary intent.
    pub confidence: f64,
    /// Normalized share per intent, in [`Intent::ALL`] order.
    pub scores: Vec<(Intent, f64)>,
    /// Continues the previous turn rather than opening a new request.
    pub is_follow_up: bool,
    pub expects_action: bool,
}

fn starts_with_any(s: &str, prefixes: &[&str]) -> bool {
    prefixes.iter().any(|p| s.starts_with(p))
}

fn contains_any(s: &str, terms: &[&str]) -> bool {
    terms.iter().any(|t| s.contains(t))
}

/// Classify `message`. `history` holds the turns before it.
pub fn classify_intent(message: &str, history: &[ConversationTurn]) -> IntentFrame {
    let q = message.trim().to_lowercase();

    let mut question = 0.0;
    let mut task = 0.0;
    let mut information = 0.0;
    let mut feedback = 0.0;
    let mut social = 0.0;
    let mut support = 0.0;
    let mut brainstorm = 0.0;

    if q.ends_with('?') {
        question += 0.5;
    }
    if starts_with_any(
        &q,
        &[
            "what ", "why ", "how ", "when ", "where ", "who ", "which ", "is ", "are ", "does ",
            "do ", "can ", "could ", "should ",
        ],
    ) {
        question += 0.4;
    }

    if starts_with_any(
        &q,
        &[
            "write ", "create ", "make ", "build ", "fix ", "generate ", "draft ", "translate ",
            "refactor ", "implement ", "add ", "update ", "please ", "help me ",
        ],
    ) {
        task += 0.6;
    }
    if contains_any(&q, &["can you ", "could you ", "would you ", "i need you to", "i want you to"]) {
        task += 0.4;
    }

    if starts_with_any(&q, &["i ", "my ", "we ", "our ", "fyi", "just so you know", "note that"]) {
        information += 0.4;
    }
    if contains_any(&q, &[" is called ", " works at ", " lives in ", "i prefer", "i like ", "i use "]) {
        information += 0.3;
    }

    if starts_with_any(&q, &["no,", "no ", "not quite", "that's wrong", "thats wrong", "actually"]) {
        feedback += 0.6;
    }
    if contains_any(
        &q,
        &["that worked", "didn't work", "didnt work", "still broken", "you misunderstood", "wrong answer", "thanks", "thank you"],
    ) {
        feedback += 0.4;
    }

    if q == "hi"
        || starts_with_any(
            &q,
            &["hi ", "hi,", "hi!", "hello", "hey", "good morning", "good evening", "how are you"],
        )
    {
        social += 0.6;
    }
    if contains_any(&q, &["have a nice", "see you", "bye", "lol", "haha"]) {
        social += 0.3;
    }

    if contains_any(
        &q,
        &["i feel", "i'm feeling", "im feeling", "i'm struggling", "im struggling", "overwhelmed", "stressed", "anxious", "lonely", "burned out", "burnt out"],
    ) {
        support += 0.6;
    }

    if contains_any(
        &q,
        &["brainstorm", "ideas for", "options for", "alternatives", "what if", "pros and cons", "suggest", "come up with"],
    ) {
        brainstorm += 0.6;
    }

    let mut raw = [question, task, information, feedback, social, support, brainstorm];
    let total: f64 = raw.iter().sum();
    if total < 0.1 {
        // Unmarked statement: most likely sharing information.
        raw = [0.2, 0.1, 0.5, 0.05, 0.05, 0.05, 0.05];
    }
    let total: f64 = raw.iter().sum();
    let scores: Vec<(Intent, f64)> = Intent::ALL
        .iter()
        .zip(raw.iter())
        .map(|(intent, score)| (*intent, score / total))
        .collect();

    let mut ranked = scores.clone();
    // Stable: ties keep declaration order.
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
    let (primary, confidence) = ranked[0];
    let secondary = ranked
        .get(1)
        .filter(|(_, share)| *share >= SECONDARY_SHARE)
        .map(|(intent, _)| *intent);

    let is_follow_up = !history.is_empty()
        && starts_with_any(
            &q,
            &["and ", "also ", "what about", "how about", "then ", "ok ", "okay ", "but ", "it ", "that "],
        );

    IntentFrame {
        primary,
        secondary,
        confidence,
        scores,
        is_follow_up,
        expects_action: matches!(primary, Intent::TaskRequest) || task > 0.0,
    }
}

/// Feedback and support always surface; other intents only when clear.
pub fn format_intent_injection(frame: &IntentFrame) -> Option<ContextInjection> {
    let corrective = matches!(frame.primary, Intent::Feedback | Intent::Support);
    if !corrective && frame.confidence < INJECTION_CONFIDENCE {
        return None;
    }
    let mut content = format!(
        "Intent: {} ({:.2}). {}",
        frame.primary.as_str(),
        frame.confidence,
        frame.primary.guidance()
    );
    if let Some(secondary) = frame.secondary {
        content.push_str(&format!(" Secondary intent: {}.", secondary.as_str()));
    }
    if frame.is_follow_up {
        content.push_str(" This continues the previous exchange.");
    }
    let priority = if corrective {
        INTENT_PRIORITY_CORRECTIVE
    } else {
        INTENT_PRIORITY_DEFAULT
    };
    Some(ContextInjection::new(InjectionSource::Intent, content, priority))
}
