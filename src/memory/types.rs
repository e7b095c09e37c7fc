//! Core memory type definitions.
//!
//! Defines [`MemoryCategory`] (the closed set of memory kinds), [`MemoryEntry`] (a full
//! record), [`AssociativeLink`] (a weighted edge between two memories), and
//! [`RetrievalResult`] (a scored hit produced per query).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What kind of thing a memory records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemoryCategory {
    Preference,
    Fact,
    Instruction,
    Context,
    Goal,
    Persona,
    Skill,
    Entity,
    /// Events and experiences; forgotten faster than the other categories.
    Episodic,
}

impl MemoryCategory {
    pub const ALL: [MemoryCategory; 9] = [
        Self::Preference,
        Self::Fact,
        Self::Instruction,
        Self::Context,
        Self::Goal,
        Self::Persona,
        Self::Skill,
        Self::Entity,
        Self::Episodic,
    ];

    /// SQL-compatible string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Preference => "preference",
            Self::Fact => "fact",
            Self::Instruction => "instruction",
            Self::Context => "context",
            Self::Goal => "goal",
            Self::Persona => "persona",
            Self::Skill => "skill",
            Self::Entity => "entity",
            Self::Episodic => "episodic",
        }
    }
}

impl std::fmt::Display for MemoryCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for MemoryCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| format!("unknown memory category: {s}"))
    }
}

/// How a memory entered the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemorySource {
    /// Explicitly stored through the store-memory tool.
    Conversation,
    /// Extracted automatically from a conversation turn.
    AutoExtract,
}

impl MemorySource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Conversation => "conversation",
            Self::AutoExtract => "auto_extract",
        }
    }
}

impl std::str::FromStr for MemorySource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "conversation" => Ok(Self::Conversation),
            "auto_extract" => Ok(Self::AutoExtract),
            _ => Err(format!("unknown memory source: {s}")),
        }
    }
}

/// A memory record.
///
/// `id`, `timestamp` and `category` never change after creation. `decay`, `access_count`,
/// `last_accessed` and `activation_level` change only through reinforcement;
/// `consolidated` only through consolidation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryEntry {
    /// UUID v7 (time-sortable).
    pub id: String,
    pub content: String,
    /// Lowercased, deduplicated, sorted.
    pub keywords: Vec<String>,
    pub category: MemoryCategory,
    /// Creation time.
    pub timestamp: DateTime<Utc>,
    /// 1 (trivia) to 5 (critical).
    pub importance: u8,
    pub source: MemorySource,
    pub access_count: u32,
    pub last_accessed: DateTime<Utc>,
    /// Lazily computed; `None` until first needed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
    /// Ids of memories this one was linked to at creation.
    #[serde(default)]
    pub relations: Vec<String>,
    #[serde(default)]
    pub consolidated: bool,
    /// Retained strength in `[0.0, 1.0]`.
    pub decay: f64,
    /// Recency of activation in `[0.0, 1.0]`.
    pub activation_level: f64,
    /// Affect of the content in `[-1.0, 1.0]`.
    pub emotional_valence: f64,
    /// Stable hash of the keyword set; equal signatures mean the same topical context.
    pub context_signature: String,
}

impl MemoryEntry {
    /// The later of creation and last access.
    pub fn last_touched(&self) -> DateTime<Utc> {
        self.last_accessed.max(self.timestamp)
    }
}

/// Why two memories are linked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkType {
    Causal,
    Temporal,
    Topical,
    Semantic,
    Contextual,
}

impl LinkType {
    pub const ALL: [LinkType; 5] = [
        Self::Causal,
        Self::Temporal,
        Self::Topical,
        Self::Semantic,
        Self::Contextual,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Causal => "causal",
            Self::Temporal => "temporal",
            Self::Topical => "topical",
            Self::Semantic => "semantic",
            Self::Contextual => "contextual",
        }
    }
}

impl std::fmt::Display for LinkType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for LinkType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "causal" => Ok(Self::Causal),
            "temporal" => Ok(Self::Temporal),
            "topical" => Ok(Self::Topical),
            "semantic" => Ok(Self::Semantic),
            "contextual" => Ok(Self::Contextual),
            _ => Err(format!("unknown link type: {s}")),
        }
    }
}

/// A weighted edge between two memories. At most one link exists per
/// `(source_id, target_id, link_type)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssociativeLink {
    pub source_id: String,
    pub target_id: String,
    /// In `[0.0, 1.0]`; only ever increases.
    pub strength: f64,
    #[serde(rename = "type")]
    pub link_type: LinkType,
    pub created_at: DateTime<Utc>,
    pub reinforcements: u32,
}

impl AssociativeLink {
    /// Identity used for deduplication.
    pub fn key(&self) -> (&str, &str, LinkType) {
        (&self.source_id, &self.target_id, self.link_type)
    }

    /// The endpoint opposite `id`, if `id` is one of the endpoints.
    pub fn other_end(&self, id: &str) -> Option<&str> {
        if self.source_id == id {
            Some(&self.target_id)
        } else if self.target_id == id {
            Some(&self.source_id)
        } else {
            None
        }
    }
}

/// The signal that contributed most to a retrieval score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchType {
    Keyword,
    Semantic,
    Temporal,
    Relational,
    /// One hop away from a direct hit in the link graph.
    Associative,
    /// Two or more hops away from a direct hit.
    Primed,
}

impl MatchType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Keyword => "keyword",
            Self::Semantic => "semantic",
            Self::Temporal => "temporal",
            Self::Relational => "relational",
            Self::Associative => "associative",
            Self::Primed => "primed",
        }
    }
}

impl std::fmt::Display for MatchType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A scored hit. Recomputed per query, never stored.
#[derive(Debug, Clone, Serialize)]
pub struct RetrievalResult {
    pub memory: MemoryEntry,
    /// In `[0.0, 1.0]`.
    pub score: f64,
    pub match_type: MatchType,
}

/// Clamp a score-like value into `[0.0, 1.0]`, mapping NaN to 0.
pub fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}
