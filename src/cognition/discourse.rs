//! Conversation-level continuity: topic drift, repetition, and how satisfied the
//! user seems over several turns.
//!
//! The returned [`DiscourseState`] is fed back in on the next turn of the same
//! conversation through the [`crate::cognition::ConversationContext`].

use serde::{Deserialize, Serialize};

use crate::cognition::emotion::{EmotionalState, Valence};
use crate::cognition::injection::{ContextInjection, InjectionSource};
use crate::cognition::{ConversationTurn, Role};
use crate::memory::links::keyword_jaccard;
use crate::memory::store::extract_keywords;
use crate::memory::types::clamp_unit;

pub const DEFAULT_SATISFACTION: f64 = 0.7;
pub const LOW_SATISFACTION: f64 = 0.4;
/// Weight of the running satisfaction when blending in this turn's signal.
const SATISFACTION_MEMORY: f64 = 0.6;
const TOPIC_SHIFT_CONTINUITY: f64 = 0.15;
const DEEPENING_CONTINUITY: f64 = 0.3;
const REPEAT_SIMILARITY: f64 = 0.7;

const PLEASED_SIGNAL: f64 = 0.9;
const DISPLEASED_SIGNAL: f64 = 0.2;
const NEGATIVE_MOOD_SIGNAL: f64 = 0.35;
const NEUTRAL_SIGNAL: f64 = 0.65;

const DISCOURSE_PRIORITY_ALERT: i32 = 8;
const DISCOURSE_PRIORITY_DEFAULT: i32 = 3;

const PLEASED_MARKERS: &[&str] = &[
    "thanks", "thank you", "perfect", "that worked", "works now", "exactly", "great", "awesome",
];
const DISPLEASED_MARKERS: &[&str] = &[
    "wrong", "didn't work", "didnt work", "still not", "still broken", "not what i",
    "useless", "again", "you already said", "that's not", "thats not",
];
/// Words that carry no topic of their own.
const ACKNOWLEDGEMENTS: &[&str] = &[
    "thanks", "thank", "okay", "great", "perfect", "awesome", "cool", "nice", "sure", "yes",
    "yeah", "yep",
];
const CLOSING_MARKERS: &[&str] = &["bye", "that's all", "thats all", "that's it", "see you", "good night"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscoursePhase {
    Opening,
    Exploring,
    Deepening,
    Resolving,
    Closing,
}

impl DiscoursePhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Opening => "opening",
            Self::Exploring => "exploring",
            Self::Deepening => "deepening",
            Self::Resolving => "resolving",
            Self::Closing => "closing",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscourseState {
    /// Turns seen so far in this conversation, this one included.
    pub turn_count: usize,
    pub topic_keywords: Vec<String>,
    pub topic_shift: bool,
    /// Keyword overlap with the previous topic, in `[0, 1]`.
    pub continuity: f64,
    pub user_satisfaction: f64,
    pub repeated_question: bool,
    pub phase: DiscoursePhase,
}

fn contains_any(s: &str, terms: &[&str]) -> bool {
    terms.iter().any(|t| s.contains(t))
}

/// Advance the discourse state by one user message.
pub fn track_discourse(
    message: &str,
    history: &[ConversationTurn],
    previous: Option<&DiscourseState>,
    emotion: &EmotionalState,
) -> DiscourseState {
    let lowered = message.to_lowercase();
    let keywords: Vec<String> = extract_keywords(message)
        .into_iter()
        .filter(|k| !ACKNOWLEDGEMENTS.contains(&k.as_str()))
        .collect();

    let prior_turns = history.iter().filter(|t| t.role == Role::User).count();
    let turn_count = previous
        .map(|p| p.turn_count)
        .unwrap_or(prior_turns)
        .max(prior_turns)
        + 1;

    let (continuity, topic_shift) = match previous {
        Some(prev) if !keywords.is_empty() && !prev.topic_keywords.is_empty() => {
            let overlap = keyword_jaccard(&keywords, &prev.topic_keywords);
            (overlap, overlap < TOPIC_SHIFT_CONTINUITY)
        }
        Some(prev) => (prev.continuity, false),
        None => (0.0, false),
    };

    let repeated_question = message.contains('?')
        && !keywords.is_empty()
        && history
            .iter()
            .filter(|t| t.role == Role::User)
            .any(|t| keyword_jaccard(&keywords, &extract_keywords(&t.content)) >= REPEAT_SIMILARITY);

    let pleased = contains_any(&lowered, PLEASED_MARKERS);
    let displeased = contains_any(&lowered, DISPLEASED_MARKERS);
    let signal = if displeased || repeated_question {
        DISPLEASED_SIGNAL
    } else if pleased {
        PLEASED_SIGNAL
    } else if emotion.valence == Valence::Negative {
        NEGATIVE_MOOD_SIGNAL
    } else {
        NEUTRAL_SIGNAL
    };
    let running = previous
        .map(|p| p.user_satisfaction)
        .unwrap_or(DEFAULT_SATISFACTION);
    let user_satisfaction =
        clamp_unit(SATISFACTION_MEMORY * running + (1.0 - SATISFACTION_MEMORY) * signal);

    let phase = if contains_any(&lowered, CLOSING_MARKERS) {
        DiscoursePhase::Closing
    } else if turn_count == 1 {
        DiscoursePhase::Opening
    } else if pleased && !displeased {
        DiscoursePhase::Resolving
    } else if !topic_shift && continuity >= DEEPENING_CONTINUITY {
        DiscoursePhase::Deepening
    } else {
        DiscoursePhase::Exploring
    };

    // Messages without content words ("thanks!") keep the current topic.
    let topic_keywords = if keywords.is_empty() {
        previous.map(|p| p.topic_keywords.clone()).unwrap_or_default()
    } else {
        keywords
    };

    DiscourseState {
        turn_count,
        topic_keywords,
        topic_shift,
        continuity: clamp_unit(continuity),
        user_satisfaction,
        repeated_question,
        phase,
    }
}

/// Guidance only when something needs attention: low satisfaction first, then
/// repetition or a topic change.
pub fn format_discourse_injection(state: &DiscourseState) -> Option<ContextInjection> {
    if state.user_satisfaction < LOW_SATISFACTION {
        let mut content = format!(
            "User satisfaction looks low ({:.2}). Change approach: ask what is missing, be concrete, and avoid repeating earlier answers.",
            state.user_satisfaction
        );
        if state.repeated_question {
            content.push_str(" The user is repeating a question that was not resolved.");
        }
        return Some(ContextInjection::new(
            InjectionSource::Discourse,
            content,
            DISCOURSE_PRIORITY_ALERT,
        ));
    }
    if state.repeated_question {
        return Some(ContextInjection::new(
            InjectionSource::Discourse,
            "The user asked this before; answer differently or check what was unclear.",
            DISCOURSE_PRIORITY_DEFAULT,
        ));
    }
    if state.topic_shift {
        return Some(ContextInjection::new(
            InjectionSource::Discourse,
            format!(
                "The topic changed to: {}. Do not carry over assumptions from the previous topic.",
                state.topic_keywords.join(", ")
            ),
            DISCOURSE_PRIORITY_DEFAULT,
        ));
    }
    None
}
