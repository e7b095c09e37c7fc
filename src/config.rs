use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct ReverieConfig {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub retrieval: RetrievalConfig,
    pub memory: MemoryConfig,
    pub associations: AssociationConfig,
    pub conversations: ConversationConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub transport: String,
    pub log_level: String,
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StorageConfig {
    pub db_path: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct RetrievalConfig {
    pub default_max_results: usize,
    pub min_score: f64,
    pub recency_half_life_days: f64,
    /// Base score an entry needs before its linked neighbours receive a relational boost.
    pub relational_anchor: f64,
    pub weights: RetrievalWeights,
}

/// Weights of the four retrieval signals. They need not sum to one; the combined score
/// is clamped to `[0.0, 1.0]`.
#[derive(Debug, Deserialize, Clone, Copy)]
#[serde(default)]
pub struct RetrievalWeights {
    pub keyword: f64,
    pub semantic: f64,
    pub temporal: f64,
    pub relational: f64,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct MemoryConfig {
    pub reinforcement_boost: f64,
    pub forgetting_half_life_days: f64,
    pub consolidation_access_threshold: u32,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct AssociationConfig {
    pub link_threshold: f64,
    pub max_links_per_memory: usize,
    pub reinforcement_step: f64,
    pub max_depth: usize,
    pub hop_decay: f64,
    pub min_activation: f64,
    pub symmetric_traversal: bool,
    pub max_associative_results: usize,
}

/// Per-conversation cognition state kept in memory.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ConversationConfig {
    /// Conversations tracked at once; the least recently used one is dropped first.
    pub max_conversations: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            transport: "stdio".into(),
            log_level: "info".into(),
            host: "127.0.0.1".into(),
            port: 8787,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        let db_path = default_reverie_dir()
            .join("memory.db")
            .to_string_lossy()
            .into_owned();
        Self { db_path }
    }
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            default_max_results: 5,
            min_score: 0.2,
            recency_half_life_days: 14.0,
            relational_anchor: 0.4,
            weights: RetrievalWeights::default(),
        }
    }
}

impl Default for RetrievalWeights {
    fn default() -> Self {
        Self {
            keyword: 0.35,
            semantic: 0.35,
            temporal: 0.15,
            relational: 0.15,
        }
    }
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            reinforcement_boost: 0.1,
            forgetting_half_life_days: 30.0,
            consolidation_access_threshold: 5,
        }
    }
}

impl Default for AssociationConfig {
    fn default() -> Self {
        Self {
            link_threshold: 0.3,
            max_links_per_memory: 5,
            reinforcement_step: 0.1,
            max_depth: 2,
            hop_decay: 0.7,
            min_activation: 0.05,
            symmetric_traversal: true,
            max_associative_results: 5,
        }
    }
}

impl Default for ConversationConfig {
    fn default() -> Self {
        Self {
            max_conversations: 256,
        }
    }
}

/// Returns `~/.reverie/`, or `./.reverie/` when no home directory is known.
pub fn default_reverie_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".reverie")
}

/// Returns the default config file path: `~/.reverie/config.toml`
pub fn default_config_path() -> PathBuf {
    default_reverie_dir().join("config.toml")
}

impl ReverieConfig {
    /// Load config from TOML file (if it exists) then apply env var overrides.
    pub fn load() -> Result<Self> {
        Self::load_from(default_config_path())
    }

    /// Load from a specific path, then apply env var overrides.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            let contents =
                std::fs::read_to_string(path).context("failed to read config file")?;
            toml::from_str(&contents).context("failed to parse config TOML")?
        } else {
            info!("no config file at {}, using defaults", path.display());
            ReverieConfig::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides (REVERIE_DB, REVERIE_LOG_LEVEL).
    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("REVERIE_DB") {
            self.storage.db_path = val;
        }
        if let Ok(val) = std::env::var("REVERIE_LOG_LEVEL") {
            self.server.log_level = val;
        }
    }

    /// Resolve the database path, expanding `~` if needed.
    pub fn resolved_db_path(&self) -> PathBuf {
        expand_tilde(&self.storage.db_path)
    }
}

pub fn expand_tilde(path: &str) -> PathBuf {
    match (path.strip_prefix("~/"), dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(path),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = ReverieConfig::default();
        assert_eq!(config.server.transport, "stdio");
        assert_eq!(config.server.log_level, "info");
        assert_eq!(config.retrieval.default_max_results, 5);
        assert!(config.associations.symmetric_traversal);
        assert_eq!(config.conversations.max_conversations, 256);
        assert!(config.storage.db_path.ends_with("memory.db"));
    }

    #[test]
    fn parse_toml_config() {
        let toml_str = r#"
[server]
log_level = "debug"

[storage]
db_path = "/tmp/test.db"

[retrieval]
default_max_results = 10

[retrieval.weights]
semantic = 0.6

[associations]
symmetric_traversal = false

[conversations]
max_conversations = 8
"#;
        let config: ReverieConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.server.log_level, "debug");
        assert_eq!(config.storage.db_path, "/tmp/test.db");
        assert_eq!(config.retrieval.default_max_results, 10);
        assert_eq!(config.retrieval.weights.semantic, 0.6);
        assert!(!config.associations.symmetric_traversal);
        assert_eq!(config.conversations.max_conversations, 8);
        // defaults still apply for unset fields
        assert_eq!(config.retrieval.weights.keyword, 0.35);
        assert_eq!(config.memory.consolidation_access_threshold, 5);
    }

    #[test]
    fn env_overrides_apply() {
        let mut config = ReverieConfig::default();
        std::env::set_var("REVERIE_DB", "/tmp/override.db");
        std::env::set_var("REVERIE_LOG_LEVEL", "trace");

        config.apply_env_overrides();

        assert_eq!(config.storage.db_path, "/tmp/override.db");
        assert_eq!(config.server.log_level, "trace");

        std::env::remove_var("REVERIE_DB");
        std::env::remove_var("REVERIE_LOG_LEVEL");
    }

    #[test]
    fn expand_tilde_leaves_absolute_paths() {
        assert_eq!(expand_tilde("/var/db.sqlite"), PathBuf::from("/var/db.sqlite"));
    }
}
