//! The shape of the user's argument: stated inferences, likely cognitive biases,
//! and statements that contradict what was said or remembered before.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

use crate::cognition::injection::{ContextInjection, InjectionSource};
use crate::cognition::{ConversationTurn, Role};
use crate::embedding::tokenize;
use crate::memory::links::keyword_jaccard;
use crate::memory::store::extract_keywords;
use crate::memory::types::{clamp_unit, RetrievalResult};

/// Keyword overlap at which two statements are about the same thing.
const CONTRADICTION_OVERLAP: f64 = 0.5;
const MAX_CHAIN: usize = 5;
const BASE_STRENGTH: f64 = 0.5;
const CHAIN_BONUS: f64 = 0.1;
const BIAS_PENALTY: f64 = 0.15;
const CONTRADICTION_PENALTY: f64 = 0.2;
const REASONING_PRIORITY: i32 = 6;

const NEGATIONS: &[&str] = &[
    "not", "never", "no", "dont", "doesnt", "isnt", "cant", "wont", "didnt", "arent", "wasnt",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CognitiveBias {
    Overgeneralization,
    Catastrophizing,
    ConfirmationSeeking,
    SunkCost,
    FalseDichotomy,
}

impl CognitiveBias {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Overgeneralization => "overgeneralization",
            Self::Catastrophizing => "catastrophizing",
            Self::ConfirmationSeeking => "confirmation_seeking",
            Self::SunkCost => "sunk_cost",
            Self::FalseDichotomy => "false_dichotomy",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BiasSignal {
    pub bias: CognitiveBias,
    /// The phrase that triggered it.
    pub evidence: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contradiction {
    pub statement: String,
    pub conflicts_with: String,
    /// Set when the earlier statement is a stored memory.
    pub memory_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReasoningFrame {
    pub biases: Vec<BiasSignal>,
    pub contradictions: Vec<Contradiction>,
    /// `premise => conclusion` steps in the order stated.
    pub inference_chain: Vec<String>,
    pub argument_strength: f64,
}

static BIAS_PATTERNS: LazyLock<Vec<(Regex, CognitiveBias)>> = LazyLock::new(|| {
    let table: &[(&str, CognitiveBias)] = &[
        (
            r"\b(always|never|everyone|nobody|every single time|all of them|none of them)\b",
            CognitiveBias::Overgeneralization,
        ),
        (
            r"\b(disaster|ruined|worst ever|end of the world|completely failed|never recover|catastroph\w*)\b",
            CognitiveBias::Catastrophizing,
        ),
        (
            r"\b(prove (that|me right)|confirm (that|my)|i know i'?m right|obviously|clearly i)\b",
            CognitiveBias::ConfirmationSeeking,
        ),
        (
            r"\b(already (spent|invested|put in)|too far (in|along) to|can'?t waste)\b",
            CognitiveBias::SunkCost,
        ),
        (
            r"\b(either\b.+\bor\b|only two (options|choices)|no other (choice|option|way))",
            CognitiveBias::FalseDichotomy,
        ),
    ];
    table
        .iter()
        .filter_map(|(pattern, bias)| match Regex::new(pattern) {
            Ok(re) => Some((re, *bias)),
            Err(e) => {
                tracing::error!(pattern, error = %e, "invalid bias pattern");
                None
            }
        })
        .collect()
});

static INFERENCE_MARKERS: LazyLock<Option<Regex>> = LazyLock::new(|| {
    match Regex::new(r"\b(because|since|therefore|which means|so that|thus|hence|so)\b") {
        Ok(re) => Some(re),
        Err(e) => {
            tracing::error!(error = %e, "invalid inference pattern");
            None
        }
    }
});

static CONDITIONAL: LazyLock<Option<Regex>> = LazyLock::new(|| {
    match Regex::new(r"\bif\s+(.+?),?\s+then\s+(.+)") {
        Ok(re) => Some(re),
        Err(e) => {
            tracing::error!(error = %e, "invalid conditional pattern");
            None
        }
    }
});

fn sentences(text: &str) -> Vec<String> {
    text.split(['.', '!', '?', ';', '\n'])
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}

fn is_negated(sentence: &str) -> bool {
    tokenize(sentence).iter().any(|t| NEGATIONS.contains(&t.as_str()))
}

fn clean(part: &str) -> String {
    part.trim().trim_matches(',').trim().to_string()
}

fn inference_steps(sentence: &str) -> Vec<String> {
    if let Some(caps) = CONDITIONAL.as_ref().and_then(|re| re.captures(sentence)) {
        if let (Some(premise), Some(conclusion)) = (caps.get(1), caps.get(2)) {
            return vec![format!(
                "{} => {}",
                clean(premise.as_str()),
                clean(conclusion.as_str())
            )];
        }
    }
    let Some(re) = INFERENCE_MARKERS.as_ref() else {
        return Vec::new();
    };
    let Some(m) = re.find(sentence) else {
        return Vec::new();
    };
    let before = clean(&sentence[..m.start()]);
    let after = clean(&sentence[m.end()..]);
    if before.is_empty() || after.is_empty() {
        return Vec::new();
    }
    match m.as_str() {
        // "X because Y": Y is the premise.
        "because" | "since" => vec![format!("{after} => {before}")],
        _ => vec![format!("{before} => {after}")],
    }
}

/// One statement contradicts another when they share most keywords and exactly one
/// of them is negated.
fn conflicts(a: &str, b: &str) -> bool {
    let content_words = |text: &str| -> Vec<String> {
        extract_keywords(text)
            .into_iter()
            .filter(|k| !NEGATIONS.contains(&k.as_str()))
            .collect()
    };
    let ka = content_words(a);
    let kb = content_words(b);
    !ka.is_empty()
        && keyword_jaccard(&ka, &kb) >= CONTRADICTION_OVERLAP
        && is_negated(a) != is_negated(b)
}

pub fn analyze_reasoning(
    message: &str,
    history: &[ConversationTurn],
    retrieved: &[RetrievalResult],
) -> ReasoningFrame {
    let lowered = message.to_lowercase();

    let biases: Vec<BiasSignal> = BIAS_PATTERNS
        .iter()
        .filter_map(|(re, bias)| {
            re.find(&lowered).map(|m| BiasSignal {
                bias: *bias,
                evidence: m.as_str().to_string(),
            })
        })
        .collect();

    let current = sentences(message);

    let inference_chain: Vec<String> = current
        .iter()
        .flat_map(|s| inference_steps(s))
        .take(MAX_CHAIN)
        .collect();

    let mut contradictions = Vec::new();
    for statement in &current {
        let earlier_turn = history
            .iter()
            .filter(|t| t.role == Role::User)
            .flat_map(|t| sentences(&t.content))
            .find(|earlier| conflicts(statement, earlier));
        if let Some(earlier) = earlier_turn {
            contradictions.push(Contradiction {
                statement: statement.clone(),
                conflicts_with: earlier,
                memory_id: None,
            });
            continue;
        }
        let remembered = retrieved
            .iter()
            .find(|r| conflicts(statement, &r.memory.content.to_lowercase()));
        if let Some(hit) = remembered {
            contradictions.push(Contradiction {
                statement: statement.clone(),
                conflicts_with: hit.memory.content.clone(),
                memory_id: Some(hit.memory.id.clone()),
            });
        }
    }

    let argument_strength = clamp_unit(
        BASE_STRENGTH + CHAIN_BONUS * inference_chain.len() as f64
            - BIAS_PENALTY * biases.len() as f64
            - CONTRADICTION_PENALTY * contradictions.len() as f64,
    );

    ReasoningFrame {
        biases,
        contradictions,
        inference_chain,
        argument_strength,
    }
}

/// Emitted when there is a bias or contradiction to handle, or a multi-step argument
/// to follow.
pub fn format_reasoning_injection(frame: &ReasoningFrame) -> Option<ContextInjection> {
    let mut parts = Vec::new();
    if !frame.contradictions.is_empty() {
        let listed: Vec<String> = frame
            .contradictions
            .iter()
            .map(|c| format!("\"{}\" vs earlier \"{}\"", c.statement, c.conflicts_with))
            .collect();
        parts.push(format!(
            "Possible contradiction: {}. Point it out gently and ask which holds.",
            listed.join("; ")
        ));
    }
    if !frame.biases.is_empty() {
        let names: Vec<&str> = frame.biases.iter().map(|b| b.bias.as_str()).collect();
        parts.push(format!(
            "The framing suggests {}; offer a balanced view without lecturing.",
            names.join(", ")
        ));
    }
    if frame.inference_chain.len() >= 2 {
        parts.push(format!(
            "The user's reasoning: {}. Check each step before building on it.",
            frame.inference_chain.join("; ")
        ));
    }
    if parts.is_empty() {
        return None;
    }
    Some(ContextInjection::new(
        InjectionSource::Reasoning,
        parts.join(" "),
        REASONING_PRIORITY,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::store::{create_memory, NewMemory};
    use crate::memory::types::{MatchType, MemoryCategory};
    use chrono::Utc;

    fn user(content: &str) -> ConversationTurn {
        ConversationTurn {
            role: Role::User,
            content: content.to_string(),
        }
    }

    #[test]
    fn detects_biases() {
        let frame = analyze_reasoning(
            "Everyone hates my code, this release is a disaster and we either ship today or quit",
            &[],
            &[],
        );
        let kinds: Vec<CognitiveBias> = frame.biases.iter().map(|b| b.bias).collect();
        assert!(kinds.contains(&CognitiveBias::Overgeneralization));
        assert!(kinds.contains(&CognitiveBias::Catastrophizing));
        assert!(kinds.contains(&CognitiveBias::FalseDichotomy));
        assert!(frame.argument_strength < 0.5);
    }

    #[test]
    fn builds_inference_chain() {
        let frame = analyze_reasoning(
            "The cache is cold because we restarted. If latency spikes, then users will notice.",
            &[],
            &[],
        );
        assert_eq!(
            frame.inference_chain,
            vec![
                "we restarted => the cache is cold",
                "latency spikes => users will notice"
            ]
        );
        assert!(format_reasoning_injection(&frame).is_some());
    }

    #[test]
    fn contradiction_with_history() {
        let history = [user("The staging server uses postgres.")];
        let frame = analyze_reasoning("The staging server doesn't use postgres", &history, &[]);
        assert_eq!(frame.contradictions.len(), 1);
        assert!(frame.contradictions[0].memory_id.is_none());
    }

    #[test]
    fn contradiction_with_memory() {
        let memory = create_memory(
            NewMemory::new("User is allergic to peanuts", MemoryCategory::Fact),
            Utc::now(),
        )
        .unwrap();
        let id = memory.id.clone();
        let retrieved = [RetrievalResult {
            memory,
            score: 0.8,
            match_type: MatchType::Keyword,
        }];
        let frame = analyze_reasoning("user is not allergic to peanuts", &[], &retrieved);
        assert_eq!(frame.contradictions.len(), 1);
        assert_eq!(frame.contradictions[0].memory_id.as_deref(), Some(id.as_str()));
        let injection = format_reasoning_injection(&frame).unwrap();
        assert!(injection.content.contains("contradiction"));
    }

    #[test]
    fn plain_statement_is_quiet() {
        let frame = analyze_reasoning("Please summarize the meeting notes", &[], &[]);
        assert!(frame.biases.is_empty());
        assert!(frame.contradictions.is_empty());
        assert!(frame.inference_chain.is_empty());
        assert!(format_reasoning_injection(&frame).is_none());
    }
}
