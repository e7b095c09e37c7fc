//! Topics the user is asking about that the memory store knows little about.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::LazyLock;

use crate::cognition::emotion::{EmotionalState, CURIOUS_LABELS};
use crate::cognition::injection::{ContextInjection, InjectionSource};
use crate::embedding::tokenize;
use crate::memory::store::is_stop_word;
use crate::memory::types::{clamp_unit, MemoryEntry};

pub const MAX_TOPICS: usize = 3;
pub const MAX_SIGNALS: usize = 3;
pub const MIN_PRIORITY: f64 = 0.3;
const MAX_TOPIC_WORDS: usize = 5;
const MAX_RELATED: usize = 5;

const GAP_UNKNOWN: f64 = 0.9;
const GAP_THIN: f64 = 0.6;
const GAP_KNOWN: f64 = 0.2;
const BASE_RELEVANCE: f64 = 0.5;
const CURIOUS_RELEVANCE_BOOST: f64 = 0.3;
const GAP_WEIGHT: f64 = 0.6;
const RELEVANCE_WEIGHT: f64 = 0.4;
const INJECTION_GAP: f64 = 0.6;
const CURIOSITY_PRIORITY: i32 = 4;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CuriositySignal {
    pub topic: String,
    pub knowledge_gap: f64,
    pub relevance: f64,
    pub exploration_priority: f64,
    pub suggested_questions: Vec<String>,
    pub related_concepts: Vec<String>,
}

static TOPIC_PATTERN: LazyLock<Option<Regex>> = LazyLock::new(|| {
    let pattern = r"(?i)\b(?:what (?:is|are|was|were)|how (?:do|does|did|can|to)|why (?:is|are|do|does|did)|explain|tell me about|curious about|wonder(?:ing)? (?:about|if|whether))\s+([a-z0-9][a-z0-9 '\-]{1,80})";
    match Regex::new(pattern) {
        Ok(re) => Some(re),
        Err(e) => {
            tracing::error!(error = %e, "invalid topic pattern");
            None
        }
    }
});

/// Candidate topics in order of appearance, stop words stripped, deduplicated.
pub fn extract_topics(message: &str) -> Vec<String> {
    let Some(re) = TOPIC_PATTERN.as_ref() else {
        return Vec::new();
    };
    let mut topics: Vec<String> = Vec::new();
    for caps in re.captures_iter(message) {
        let Some(raw) = caps.get(1) else { continue };
        let words: Vec<String> = tokenize(raw.as_str())
            .into_iter()
            .filter(|w| !is_stop_word(w))
            .take(MAX_TOPIC_WORDS)
            .collect();
        if words.is_empty() {
            continue;
        }
        let topic = words.join(" ");
        if !topics.contains(&topic) {
            topics.push(topic);
        }
        if topics.len() == MAX_TOPICS {
            break;
        }
    }
    topics
}

fn memory_terms(entry: &MemoryEntry) -> BTreeSet<String> {
    entry
        .keywords
        .iter()
        .cloned()
        .chain(tokenize(&entry.content))
        .collect()
}

fn gap_for(matches: usize) -> f64 {
    match matches {
        0 => GAP_UNKNOWN,
        1 => GAP_THIN,
        _ => GAP_KNOWN,
    }
}

/// Score each topic in `message` by how little the store knows about it.
pub fn detect_curiosity(
    message: &str,
    memories: &[MemoryEntry],
    emotion: &EmotionalState,
) -> Vec<CuriositySignal> {
    let curious = CURIOUS_LABELS.contains(&emotion.dominant_emotion.as_str());
    let relevance = clamp_unit(
        BASE_RELEVANCE
            + if curious {
                CURIOUS_RELEVANCE_BOOST
            } else {
                0.0
            },
    );

    let mut signals: Vec<CuriositySignal> = extract_topics(message)
        .into_iter()
        .map(|topic| {
            let topic_words: BTreeSet<String> = tokenize(&topic).into_iter().collect();
            let matching: Vec<&MemoryEntry> = memories
                .iter()
                .filter(|m| !memory_terms(m).is_disjoint(&topic_words))
                .collect();

            let knowledge_gap = gap_for(matching.len());
            let related_concepts: Vec<String> = matching
                .iter()
                .flat_map(|m| m.keywords.iter())
                .filter(|k| !topic_words.contains(*k))
                .cloned()
                .collect::<BTreeSet<_>>()
                .into_iter()
                .take(MAX_RELATED)
                .collect();

            let mut suggested_questions =
                vec![format!("What would you like to know first about {topic}?")];
            if knowledge_gap >= GAP_THIN {
                suggested_questions.push(format!("How does {topic} fit into what you're working on?"));
            }

            CuriositySignal {
                exploration_priority: clamp_unit(
                    GAP_WEIGHT * knowledge_gap + RELEVANCE_WEIGHT * relevance,
                ),
                topic,
                knowledge_gap,
                relevance,
                suggested_questions,
                related_concepts,
            }
        })
        .filter(|s| s.exploration_priority > MIN_PRIORITY)
        .collect();

    signals.sort_by(|a, b| b.exploration_priority.total_cmp(&a.exploration_priority));
    signals.truncate(MAX_SIGNALS);
    signals
}

/// Suggest follow-ups only when at least one topic is a real gap.
pub fn format_curiosity_injection(signals: &[CuriositySignal]) -> Option<ContextInjection> {
    let gaps: Vec<String> = signals
        .iter()
        .filter(|s| s.knowledge_gap >= INJECTION_GAP)
        .map(|s| match s.suggested_questions.last() {
            Some(q) => format!("{} (gap {:.2}; consider asking: {q})", s.topic, s.knowledge_gap),
            None => format!("{} (gap {:.2})", s.topic, s.knowledge_gap),
        })
        .collect();
    if gaps.is_empty() {
        return None;
    }
    Some(ContextInjection::new(
        InjectionSource::Curiosity,
        format!("Little is known about: {}.", gaps.join("; ")),
        CURIOSITY_PRIORITY,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cognition::emotion::analyze_emotion;
    use crate::memory::store::{create_memory, NewMemory};
    use crate::memory::types::MemoryCategory;
    use chrono::Utc;

    fn memory(content: &str) -> MemoryEntry {
        create_memory(NewMemory::new(content, MemoryCategory::Fact), Utc::now()).unwrap()
    }

    #[test]
    fn extracts_topics_from_question_forms() {
        let topics = extract_topics("What is a vector clock? And tell me about CRDTs.");
        assert_eq!(topics, vec!["vector clock", "crdts"]);
    }

    #[test]
    fn no_topics_in_statements() {
        assert!(extract_topics("I finished the report").is_empty());
    }

    #[test]
    fn gap_shrinks_with_known_memories() {
        let neutral = analyze_emotion("ok", None);
        let unknown = detect_curiosity("explain kubernetes", &[], &neutral);
        assert_eq!(unknown[0].knowledge_gap, 0.9);

        let one = [memory("We deploy on kubernetes clusters")];
        let thin = detect_curiosity("explain kubernetes", &one, &neutral);
        assert_eq!(thin[0].knowledge_gap, 0.6);
        assert!(thin[0].related_concepts.contains(&"clusters".to_string()));

        let many = [
            memory("We deploy on kubernetes clusters"),
            memory("kubernetes upgrade scheduled for june"),
        ];
        let known = detect_curiosity("explain kubernetes", &many, &neutral);
        assert_eq!(known[0].knowledge_gap, 0.2);
        assert!(known[0].exploration_priority < unknown[0].exploration_priority);
    }

    #[test]
    fn curious_emotion_raises_relevance() {
        let neutral = analyze_emotion("ok", None);
        let curious = analyze_emotion("I'm so curious", None);
        let flat = detect_curiosity("how does raft work", &[], &neutral);
        let eager = detect_curiosity("how does raft work", &[], &curious);
        assert!(eager[0].relevance > flat[0].relevance);
    }

    #[test]
    fn signals_are_sorted_and_capped() {
        let neutral = analyze_emotion("ok", None);
        let known = [memory("paxos notes"), memory("paxos paper summary")];
        let signals = detect_curiosity(
            "what is paxos? what is raft? what is zab? what is viewstamped replication?",
            &known,
            &neutral,
        );
        assert!(signals.len() <= MAX_SIGNALS);
        for pair in signals.windows(2) {
            assert!(pair[0].exploration_priority >= pair[1].exploration_priority);
        }
        assert_eq!(signals.last().map(|s| s.topic.as_str()), Some("paxos"));
    }

    #[test]
    fn injection_only_for_real_gaps() {
        let neutral = analyze_emotion("ok", None);
        let many = [memory("rust borrow checker"), memory("rust traits overview")];
        let known = detect_curiosity("explain rust", &many, &neutral);
        assert!(format_curiosity_injection(&known).is_none());

        let unknown = detect_curiosity("explain zig comptime", &[], &neutral);
        let injection = format_curiosity_injection(&unknown).unwrap();
        assert_eq!(injection.priority, 4);
        assert!(injection.content.contains("zig comptime"));
    }
}
