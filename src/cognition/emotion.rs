//! Lexicon-based emotion analysis.
//!
//! Each token is looked up in [`LEXICON`] for valence, arousal and an emotion label.
//! Punctuation and capitalization add arousal; a weighted pattern table picks the
//! communication style. The previous turn's state (carried in the conversation
//! context) gives the trajectory.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

use crate::cognition::injection::{ContextInjection, InjectionSource};
use crate::embedding::tokenize;
use crate::memory::types::clamp_unit;

/// `(token, valence, arousal, label)`. Valence in `[-1, 1]`, arousal in `[0, 1]`.
pub const LEXICON: &[(&str, f64, f64, &str)] = &[
    ("happy", 0.8, 0.6, "joy"),
    ("glad", 0.6, 0.4, "joy"),
    ("love", 0.9, 0.7, "joy"),
    ("great", 0.7, 0.5, "joy"),
    ("awesome", 0.8, 0.7, "excitement"),
    ("amazing", 0.8, 0.75, "excitement"),
    ("excited", 0.8, 0.8, "excitement"),
    ("thrilled", 0.9, 0.85, "excitement"),
    ("thanks", 0.6, 0.3, "gratitude"),
    ("thank", 0.6, 0.3, "gratitude"),
    ("grateful", 0.7, 0.35, "gratitude"),
    ("appreciate", 0.6, 0.3, "gratitude"),
    ("perfect", 0.8, 0.5, "satisfaction"),
    ("good", 0.5, 0.3, "satisfaction"),
    ("nice", 0.5, 0.3, "satisfaction"),
    ("calm", 0.4, 0.1, "calm"),
    ("relaxed", 0.5, 0.1, "calm"),
    ("relieved", 0.5, 0.3, "relief"),
    ("hope", 0.5, 0.4, "hope"),
    ("hopeful", 0.5, 0.4, "hope"),
    ("curious", 0.3, 0.5, "curiosity"),
    ("wonder", 0.2, 0.4, "curiosity"),
    ("interested", 0.4, 0.45, "curiosity"),
    ("fascinating", 0.6, 0.6, "curiosity"),
    ("wow", 0.3, 0.8, "surprise"),
    ("surprised", 0.1, 0.75, "surprise"),
    ("unexpected", 0.0, 0.6, "surprise"),
    ("sad", -0.7, 0.3, "sadness"),
    ("unhappy", -0.6, 0.35, "sadness"),
    ("lonely", -0.6, 0.3, "sadness"),
    ("depressed", -0.8, 0.2, "sadness"),
    ("disappointed", -0.6, 0.4, "disappointment"),
    ("angry", -0.8, 0.85, "anger"),
    ("furious", -0.9, 0.95, "anger"),
    ("mad", -0.7, 0.8, "anger"),
    ("hate", -0.9, 0.8, "anger"),
    ("annoyed", -0.5, 0.6, "frustration"),
    ("annoying", -0.5, 0.6, "frustration"),
    ("frustrated", -0.7, 0.7, "frustration"),
    ("frustrating", -0.7, 0.7, "frustration"),
    ("stuck", -0.4, 0.5, "frustration"),
    ("broken", -0.5, 0.6, "frustration"),
    ("terrible", -0.8, 0.7, "distress"),
    ("awful", -0.8, 0.7, "distress"),
    ("horrible", -0.85, 0.75, "distress"),
    ("worried", -0.5, 0.6, "anxiety"),
    ("anxious", -0.6, 0.7, "anxiety"),
    ("nervous", -0.5, 0.65, "anxiety"),
    ("stressed", -0.6, 0.75, "anxiety"),
    ("overwhelmed", -0.6, 0.8, "anxiety"),
    ("scared", -0.7, 0.8, "fear"),
    ("afraid", -0.7, 0.75, "fear"),
    ("confused", -0.3, 0.5, "confusion"),
    ("lost", -0.3, 0.45, "confusion"),
];

/// Labels treated as curiosity by the curiosity detector.
pub const CURIOUS_LABELS: &[&str] = &["curiosity", "surprise", "excitement"];

const INTENSIFIERS: &[&str] = &["so", "very", "really", "extremely", "totally", "super"];

const BASELINE_AROUSAL: f64 = 0.3;
const INTENSIFIER_AROUSAL: f64 = 0.05;
const SINGLE_EXCLAMATION_AROUSAL: f64 = 0.1;
const REPEATED_EXCLAMATION_AROUSAL: f64 = 0.2;
const REPEATED_QUESTION_AROUSAL: f64 = 0.1;
const CAPS_AROUSAL: f64 = 0.25;
const CAPS_RATIO_THRESHOLD: f64 = 0.6;
const CAPS_MIN_LETTERS: usize = 6;

const POSITIVE_THRESHOLD: f64 = 0.2;
const NEGATIVE_THRESHOLD: f64 = -0.2;
const HIGH_AROUSAL: f64 = 0.65;
const MEDIUM_AROUSAL: f64 = 0.35;

const EMOTION_PRIORITY_ALERT: i32 = 8;
const EMOTION_PRIORITY_DEFAULT: i32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Valence {
    Positive,
    Negative,
    Neutral,
    Mixed,
}

impl Valence {
    /// Ordering from most negative to most positive; mixed sits with neutral.
    fn rank(self) -> i8 {
        match self {
            Self::Negative => 0,
            Self::Neutral | Self::Mixed => 1,
            Self::Positive => 2,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Positive => "positive",
            Self::Negative => "negative",
            Self::Neutral => "neutral",
            Self::Mixed => "mixed",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Arousal {
    High,
    Medium,
    Low,
}

impl Arousal {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommunicationStyle {
    Formal,
    Casual,
    Technical,
    Creative,
    Urgent,
    Reflective,
}

impl CommunicationStyle {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Formal => "formal",
            Self::Casual => "casual",
            Self::Technical => "technical",
            Self::Creative => "creative",
            Self::Urgent => "urgent",
            Self::Reflective => "reflective",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trajectory {
    /// Mood moved toward negative.
    Escalating,
    /// Mood moved toward positive.
    Deescalating,
    Stable,
    /// Mood swung from one pole to the other.
    Volatile,
}

impl Trajectory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Escalating => "escalating",
            Self::Deescalating => "deescalating",
            Self::Stable => "stable",
            Self::Volatile => "volatile",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmotionalState {
    pub valence: Valence,
    pub arousal: Arousal,
    pub dominant_emotion: String,
    pub confidence: f64,
    pub style: CommunicationStyle,
    pub empathy_level: f64,
    pub trajectory: Trajectory,
    /// Mean lexicon valence in `[-1, 1]`.
    pub valence_score: f64,
    /// Arousal after punctuation and caps boosts, in `[0, 1]`.
    pub arousal_score: f64,
}

static STYLE_PATTERNS: LazyLock<Vec<(Regex, CommunicationStyle, f64)>> = LazyLock::new(|| {
    let table: &[(&str, CommunicationStyle, f64)] = &[
        (
            r"\b(please|kindly|would you|could you|regards|sincerely|dear)\b",
            CommunicationStyle::Formal,
            1.0,
        ),
        (
            r"\b(hey|hi|lol|gonna|wanna|yeah|yep|cool|btw|haha)\b",
            CommunicationStyle::Casual,
            1.0,
        ),
        (
            r"\b(function|api|code|compile|compiler|database|server|algorithm|deploy|config|bug|stack trace|query|endpoint)\b",
            CommunicationStyle::Technical,
            1.2,
        ),
        (r"`[^`]+`", CommunicationStyle::Technical, 1.0),
        (
            r"\b(imagine|story|poem|creative|brainstorm|invent|fiction|design an?)\b",
            CommunicationStyle::Creative,
            1.0,
        ),
        (
            r"\b(urgent|urgently|asap|immediately|right now|deadline|emergency|critical|quickly)\b",
            CommunicationStyle::Urgent,
            1.5,
        ),
        (
            r"\b(i think|i feel|i wonder|reflect|meaning|realize|looking back|lately i)\b",
            CommunicationStyle::Reflective,
            1.0,
        ),
    ];
    table
        .iter()
        .filter_map(|(pattern, style, weight)| match Regex::new(pattern) {
            Ok(re) => Some((re, *style, *weight)),
            Err(e) => {
                tracing::error!(pattern, error = %e, "invalid style pattern");
                None
            }
        })
        .collect()
});

struct LexiconHits {
    valences: Vec<f64>,
    arousals: Vec<f64>,
    labels: Vec<&'static str>,
    intensifiers: usize,
}

fn lexicon_hits(tokens: &[String]) -> LexiconHits {
    let mut hits = LexiconHits {
        valences: Vec::new(),
        arousals: Vec::new(),
        labels: Vec::new(),
        intensifiers: 0,
    };
    for token in tokens {
        if INTENSIFIERS.contains(&token.as_str()) {
            hits.intensifiers += 1;
        }
        if let Some(&(_, valence, arousal, label)) =
            LEXICON.iter().find(|entry| entry.0 == token.as_str())
        {
            hits.valences.push(valence);
            hits.arousals.push(arousal);
            hits.labels.push(label);
        }
    }
    hits
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

/// Mean lexicon valence of `text`, 0 when nothing matches.
pub fn score_valence(text: &str) -> f64 {
    mean(&lexicon_hits(&tokenize(text)).valences).unwrap_or(0.0)
}

/// Analyze one message. `previous` is the state from the prior turn of the same
/// conversation.
pub fn analyze_emotion(text: &str, previous: Option<&EmotionalState>) -> EmotionalState {
    let tokens = tokenize(text);
    let hits = lexicon_hits(&tokens);

    let valence_score = mean(&hits.valences).unwrap_or(0.0).clamp(-1.0, 1.0);
    let arousal_score = clamp_unit(
        mean(&hits.arousals).unwrap_or(BASELINE_AROUSAL)
            + punctuation_arousal(text)
            + hits.intensifiers as f64 * INTENSIFIER_AROUSAL,
    );

    let has_positive = hits.valences.iter().any(|v| *v > POSITIVE_THRESHOLD);
    let has_negative = hits.valences.iter().any(|v| *v < NEGATIVE_THRESHOLD);
    let valence = if valence_score > POSITIVE_THRESHOLD {
        Valence::Positive
    } else if valence_score < NEGATIVE_THRESHOLD {
        Valence::Negative
    } else if has_positive && has_negative {
        Valence::Mixed
    } else {
        Valence::Neutral
    };

    let arousal = if arousal_score >= HIGH_AROUSAL {
        Arousal::High
    } else if arousal_score >= MEDIUM_AROUSAL {
        Arousal::Medium
    } else {
        Arousal::Low
    };

    let (style, style_matched) = detect_style(text);
    let confidence = clamp_unit(
        0.3 + 0.15 * hits.labels.len() as f64 + if style_matched { 0.1 } else { 0.0 },
    );

    let trajectory = match previous {
        None => Trajectory::Stable,
        Some(prev) => {
            let delta = valence.rank() - prev.valence.rank();
            match delta {
                d if d.abs() >= 2 => Trajectory::Volatile,
                d if d < 0 => Trajectory::Escalating,
                d if d > 0 => Trajectory::Deescalating,
                _ => Trajectory::Stable,
            }
        }
    };

    EmotionalState {
        valence,
        arousal,
        dominant_emotion: dominant_label(&hits.labels),
        confidence,
        style,
        empathy_level: empathy_for(valence, arousal),
        trajectory,
        valence_score,
        arousal_score,
    }
}

fn punctuation_arousal(text: &str) -> f64 {
    let exclamations = text.matches('!').count();
    let questions = text.matches('?').count();
    let mut boost = match exclamations {
        0 => 0.0,
        1 => SINGLE_EXCLAMATION_AROUSAL,
        _ => REPEATED_EXCLAMATION_AROUSAL,
    };
    if questions >= 2 {
        boost += REPEATED_QUESTION_AROUSAL;
    }

    let letters: Vec<char> = text.chars().filter(|c| c.is_alphabetic()).collect();
    if letters.len() >= CAPS_MIN_LETTERS {
        let upper = letters.iter().filter(|c| c.is_uppercase()).count();
        if upper as f64 / letters.len() as f64 > CAPS_RATIO_THRESHOLD {
            boost += CAPS_AROUSAL;
        }
    }
    boost
}

/// Most frequent label, earliest first on ties; "neutral" when nothing matched.
fn dominant_label(labels: &[&str]) -> String {
    let mut counts: Vec<(&str, usize)> = Vec::new();
    for &label in labels {
        match counts.iter_mut().find(|entry| entry.0 == label) {
            Some(entry) => entry.1 += 1,
            None => counts.push((label, 1)),
        }
    }
    counts
        .iter()
        .fold(None::<(&str, usize)>, |best, &(label, count)| match best {
            Some((_, c)) if c >= count => best,
            _ => Some((label, count)),
        })
        .map(|(label, _)| label.to_string())
        .unwrap_or_else(|| "neutral".to_string())
}

/// Highest cumulative pattern weight wins; casual when nothing matches.
fn detect_style(text: &str) -> (CommunicationStyle, bool) {
    let lowered = text.to_lowercase();
    let mut scores: Vec<(CommunicationStyle, f64)> = Vec::new();
    for (re, style, weight) in STYLE_PATTERNS.iter() {
        let count = re.find_iter(&lowered).count();
        if count == 0 {
            continue;
        }
        let score = weight * count as f64;
        match scores.iter_mut().find(|entry| entry.0 == *style) {
            Some(entry) => entry.1 += score,
            None => scores.push((*style, score)),
        }
    }
    scores
        .iter()
        .fold(None::<(CommunicationStyle, f64)>, |best, &(style, score)| match best {
            Some((_, s)) if s >= score => best,
            _ => Some((style, score)),
        })
        .map(|(style, _)| (style, true))
        .unwrap_or((CommunicationStyle::Casual, false))
}

fn empathy_for(valence: Valence, arousal: Arousal) -> f64 {
    let base = match valence {
        Valence::Negative => 0.7,
        Valence::Mixed => 0.6,
        Valence::Positive => 0.4,
        Valence::Neutral => 0.3,
    };
    let boost = if valence == Valence::Negative && arousal == Arousal::High {
        0.2
    } else {
        0.0
    };
    clamp_unit(base + boost)
}

/// Tone guidance for the prompt. Always produced; priority rises when the user is
/// upset, agitated, or getting worse.
pub fn format_emotion_injection(state: &EmotionalState) -> Option<ContextInjection> {
    let mut lines = vec![format!(
        "Emotional read: {} valence, {} arousal (dominant: {}), {} since last turn. Match a {} register.",
        state.valence.as_str(),
        state.arousal.as_str(),
        state.dominant_emotion,
        state.trajectory.as_str(),
        state.style.as_str(),
    )];
    match state.valence {
        Valence::Negative => lines.push(format!(
            "Acknowledge the user's {} before problem-solving; keep the tone steady and supportive.",
            state.dominant_emotion
        )),
        Valence::Mixed => lines.push("The user has mixed feelings; validate both sides.".into()),
        Valence::Positive => lines.push("Mirror the user's positive energy.".into()),
        Valence::Neutral => {}
    }
    if state.arousal == Arousal::High {
        lines.push("Keep replies short and action-oriented.".into());
    }
    if matches!(state.trajectory, Trajectory::Escalating | Trajectory::Volatile) {
        lines.push("Mood is shifting for the worse or swinging; slow down and check in.".into());
    }

    let alert = state.valence == Valence::Negative
        || state.arousal == Arousal::High
        || state.trajectory == Trajectory::Escalating;
    let priority = if alert {
        EMOTION_PRIORITY_ALERT
    } else {
        EMOTION_PRIORITY_DEFAULT
    };
    Some(ContextInjection::new(
        InjectionSource::Emotion,
        lines.join(" "),
        priority,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn angry_message_is_negative_and_high_arousal() {
        let state = analyze_emotion("this is terrible, I'm so angry!!", None);
        assert_eq!(state.valence, Valence::Negative);
        assert_eq!(state.arousal, Arousal::High);
        assert_eq!(state.trajectory, Trajectory::Stable);
        assert!(state.empathy_level >= 0.8);
    }

    #[test]
    fn neutral_message_defaults() {
        let state = analyze_emotion("the meeting moved to room four", None);
        assert_eq!(state.valence, Valence::Neutral);
        assert_eq!(state.arousal, Arousal::Low);
        assert_eq!(state.dominant_emotion, "neutral");
        assert_eq!(state.style, CommunicationStyle::Casual);
    }

    #[test]
    fn positive_gratitude() {
        let state = analyze_emotion("Thanks, that was perfect", None);
        assert_eq!(state.valence, Valence::Positive);
        assert_eq!(state.dominant_emotion, "gratitude");
    }

    #[test]
    fn mixed_feelings() {
        let state = analyze_emotion("I love the design but I hate the colors", None);
        assert_eq!(state.valence, Valence::Mixed);
    }

    #[test]
    fn caps_raise_arousal() {
        let calm = analyze_emotion("the build is broken", None);
        let shouting = analyze_emotion("THE BUILD IS BROKEN", None);
        assert!(shouting.arousal_score > calm.arousal_score);
    }

    #[test]
    fn style_patterns_pick_highest_weight() {
        let technical = analyze_emotion("the api endpoint returns a database error", None);
        assert_eq!(technical.style, CommunicationStyle::Technical);

        let urgent = analyze_emotion("I need this fixed asap, deadline is today", None);
        assert_eq!(urgent.style, CommunicationStyle::Urgent);

        let formal = analyze_emotion("Could you kindly review the attached document", None);
        assert_eq!(formal.style, CommunicationStyle::Formal);
    }

    #[test]
    fn trajectory_tracks_previous_state() {
        let happy = analyze_emotion("I'm so happy with this", None);
        let neutral = analyze_emotion("ok, next item", Some(&happy));
        assert_eq!(neutral.trajectory, Trajectory::Escalating);

        let angry = analyze_emotion("I'm furious", Some(&happy));
        assert_eq!(angry.trajectory, Trajectory::Volatile);

        let better = analyze_emotion("ok, next item", Some(&angry));
        assert_eq!(better.trajectory, Trajectory::Deescalating);

        let same = analyze_emotion("still furious", Some(&angry));
        assert_eq!(same.trajectory, Trajectory::Stable);
    }

    #[test]
    fn confidence_grows_with_matches() {
        let none = analyze_emotion("meeting at noon", None);
        let several = analyze_emotion("happy excited grateful", None);
        assert!(several.confidence > none.confidence);
        assert!(several.confidence <= 1.0);
    }

    #[test]
    fn injection_priority_reflects_distress() {
        let upset = analyze_emotion("this is terrible, I'm so angry!!", None);
        let calm = analyze_emotion("what time is it in Tokyo", None);
        let upset_injection = format_emotion_injection(&upset).unwrap();
        let calm_injection = format_emotion_injection(&calm).unwrap();
        assert!(upset_injection.priority > calm_injection.priority);
        assert!(upset_injection.content.contains("Acknowledge"));
        assert_eq!(upset_injection.source, InjectionSource::Emotion);
    }

    #[test]
    fn score_valence_for_memories() {
        assert!(score_valence("I hate waiting in line") < 0.0);
        assert!(score_valence("I love hiking") > 0.0);
        assert_eq!(score_valence("the sky is blue"), 0.0);
    }
}
