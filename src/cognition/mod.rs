//! Per-turn cognition pipeline.
//!
//! [`run_cognition_engine`] retrieves memories for the user's message, runs every
//! analyzer over it, and assembles the prioritized [`ContextInjection`] list that
//! a prompt builder merges into the system prompt. Analyzers are pure; the only
//! state that survives between turns lives in the caller-owned
//! [`ConversationContext`], one per conversation.

pub mod curiosity;
pub mod discourse;
pub mod emotion;
pub mod injection;
pub mod intent;
pub mod metacognition;
pub mod reasoning;
pub mod salience;
pub mod thought_tree;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::config::ReverieConfig;
use crate::memory::links::get_associative_memories;
use crate::memory::search::{
    search_memories, to_recall_view, RecalledMemory, SearchConfig, SearchFilter,
};
use crate::memory::store::truncate_preview;
use crate::memory::types::{AssociativeLink, MatchType, MemoryEntry, RetrievalResult};

use curiosity::{detect_curiosity, format_curiosity_injection, CuriositySignal};
use discourse::{format_discourse_injection, track_discourse, DiscourseState};
use emotion::{analyze_emotion, format_emotion_injection, EmotionalState};
use injection::{assemble_injections, total_token_cost, ContextInjection, InjectionSource};
use intent::{classify_intent, format_intent_injection, IntentFrame};
use metacognition::{assess_metacognition, format_meta_injection, MetacognitionState};
use reasoning::{analyze_reasoning, format_reasoning_injection, ReasoningFrame};
use salience::{extract_salience, format_salience_injection, SalienceFrame};
use thought_tree::{build_thought_tree, format_thought_tree_injection, ThoughtTree};

const MEMORY_PRIORITY: i32 = 6;
const PRIMING_PRIORITY: i32 = 3;
/// Activation given to last turn's hits when they seed this turn's traversal.
const CARRIED_SEED_SCORE: f64 = 0.6;
const PREVIEW_CHARS: usize = 120;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: Role,
    pub content: String,
}

impl ConversationTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Continuity carried from one turn to the next within a single conversation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConversationContext {
    pub conversation_id: String,
    pub previous_emotion: Option<EmotionalState>,
    pub previous_discourse: Option<DiscourseState>,
    /// Memories retrieved on the previous turn; they keep priming this one.
    pub primed_ids: Vec<String>,
}

impl ConversationContext {
    pub fn new(conversation_id: impl Into<String>) -> Self {
        Self {
            conversation_id: conversation_id.into(),
            ..Self::default()
        }
    }
}

/// Everything the pipeline concluded about one turn.
#[derive(Debug, Clone, Serialize)]
pub struct CognitionFrame {
    pub timestamp: DateTime<Utc>,
    pub emotion: EmotionalState,
    pub metacognition: MetacognitionState,
    pub thought_tree: ThoughtTree,
    pub curiosity: Vec<CuriositySignal>,
    pub intent: IntentFrame,
    pub discourse: DiscourseState,
    pub reasoning: ReasoningFrame,
    pub salience: SalienceFrame,
    /// Direct retrieval hits for the message.
    pub retrieved: Vec<RetrievalResult>,
    /// Memories reached through associative links.
    pub associative: Vec<RetrievalResult>,
    /// Ordered by descending priority.
    pub injections: Vec<ContextInjection>,
}

/// Serializable summary of a [`CognitionFrame`] with memories reduced to their
/// recall view.
#[derive(Debug, Serialize)]
pub struct TurnReport<'a> {
    pub timestamp: DateTime<Utc>,
    pub emotion: &'a EmotionalState,
    pub metacognition: &'a MetacognitionState,
    pub thought_tree: &'a ThoughtTree,
    pub curiosity: &'a [CuriositySignal],
    pub intent: &'a IntentFrame,
    pub discourse: &'a DiscourseState,
    pub reasoning: &'a ReasoningFrame,
    pub salience: &'a SalienceFrame,
    pub retrieved: Vec<RecalledMemory>,
    pub associative: Vec<RecalledMemory>,
    pub injections: &'a [ContextInjection],
    pub total_token_cost: usize,
}

impl CognitionFrame {
    pub fn report(&self) -> TurnReport<'_> {
        TurnReport {
            timestamp: self.timestamp,
            emotion: &self.emotion,
            metacognition: &self.metacognition,
            thought_tree: &self.thought_tree,
            curiosity: &self.curiosity,
            intent: &self.intent,
            discourse: &self.discourse,
            reasoning: &self.reasoning,
            salience: &self.salience,
            retrieved: to_recall_view(&self.retrieved),
            associative: to_recall_view(&self.associative),
            injections: &self.injections,
            total_token_cost: total_token_cost(&self.injections),
        }
    }

    /// Ids of every memory that surfaced this turn, direct hits first.
    pub fn activated_ids(&self) -> Vec<String> {
        self.retrieved
            .iter()
            .chain(self.associative.iter())
            .map(|r| r.memory.id.clone())
            .collect()
    }
}

/// Run the full pipeline for one user message.
///
/// `history` holds the turns before `message`. `memories` and `links` are read
/// only; reinforcement of what was retrieved is left to the caller.
pub fn run_cognition_engine(
    context: &mut ConversationContext,
    message: &str,
    history: &[ConversationTurn],
    memories: &[MemoryEntry],
    links: &[AssociativeLink],
    config: &ReverieConfig,
    now: DateTime<Utc>,
) -> CognitionFrame {
    let search_config = SearchConfig {
        max_results: config.retrieval.default_max_results,
        retrieval: &config.retrieval,
        memory: &config.memory,
        symmetric_links: config.associations.symmetric_traversal,
    };
    let filter = SearchFilter {
        categories: None,
        min_score: config.retrieval.min_score,
    };
    let retrieved = search_memories(memories, links, message, &filter, &search_config, now);

    let mut seeds = retrieved.clone();
    let direct: HashSet<&str> = retrieved.iter().map(|r| r.memory.id.as_str()).collect();
    seeds.extend(
        memories
            .iter()
            .filter(|m| context.primed_ids.contains(&m.id) && !direct.contains(m.id.as_str()))
            .map(|m| RetrievalResult {
                memory: m.clone(),
                score: CARRIED_SEED_SCORE,
                match_type: MatchType::Primed,
            }),
    );
    let associative = get_associative_memories(&seeds, memories, links, &config.associations);

    let emotion = analyze_emotion(message, context.previous_emotion.as_ref());
    let metacognition = assess_metacognition(message, history.len());
    let thought_tree = build_thought_tree(message, &retrieved, &metacognition);
    let curiosity = detect_curiosity(message, memories, &emotion);
    let intent = classify_intent(message, history);
    let discourse = track_discourse(
        message,
        history,
        context.previous_discourse.as_ref(),
        &emotion,
    );
    let reasoning = analyze_reasoning(message, history, &retrieved);
    let salience = extract_salience(message);

    let injections = assemble_injections(vec![
        format_emotion_injection(&emotion),
        format_meta_injection(&metacognition),
        format_thought_tree_injection(&thought_tree),
        format_curiosity_injection(&curiosity),
        format_intent_injection(&intent),
        format_discourse_injection(&discourse),
        format_reasoning_injection(&reasoning),
        format_salience_injection(&salience),
        format_memory_injection(&retrieved),
        format_priming_injection(&associative),
    ]);

    tracing::debug!(
        conversation = %context.conversation_id,
        retrieved = retrieved.len(),
        associative = associative.len(),
        injections = injections.len(),
        "cognition frame built"
    );

    context.previous_emotion = Some(emotion.clone());
    context.previous_discourse = Some(discourse.clone());
    context.primed_ids = retrieved.iter().map(|r| r.memory.id.clone()).collect();

    CognitionFrame {
        timestamp: now,
        emotion,
        metacognition,
        thought_tree,
        curiosity,
        intent,
        discourse,
        reasoning,
        salience,
        retrieved,
        associative,
        injections,
    }
}

fn format_memory_injection(retrieved: &[RetrievalResult]) -> Option<ContextInjection> {
    if retrieved.is_empty() {
        return None;
    }
    let lines: Vec<String> = retrieved
        .iter()
        .map(|r| {
            format!(
                "- {} ({}, {:.2})",
                truncate_preview(&r.memory.content, PREVIEW_CHARS),
                r.memory.category,
                r.score
            )
        })
        .collect();
    Some(ContextInjection::new(
        InjectionSource::Memory,
        format!("Relevant memories:\n{}", lines.join("\n")),
        MEMORY_PRIORITY,
    ))
}

fn format_priming_injection(associative: &[RetrievalResult]) -> Option<ContextInjection> {
    if associative.is_empty() {
        return None;
    }
    let lines: Vec<String> = associative
        .iter()
        .map(|r| {
            format!(
                "- {} ({})",
                truncate_preview(&r.memory.content, PREVIEW_CHARS),
                r.match_type
            )
        })
        .collect();
    Some(ContextInjection::new(
        InjectionSource::Priming,
        format!(
            "Associated memories, not directly asked about:\n{}",
            lines.join("\n")
        ),
        PRIMING_PRIORITY,
    ))
}
