//! Associative memory and a per-turn cognition pipeline for LLM chat agents.
//!
//! Reverie stores what an agent learns about its user as [`memory::types::MemoryEntry`]
//! records joined by weighted [`memory::types::AssociativeLink`]s. Each user turn runs
//! through [`cognition::run_cognition_engine`], which retrieves relevant memories,
//! spreads activation along links, analyzes the message (emotion, metacognition,
//! intent, discourse, reasoning, salience, curiosity) and assembles a prioritized
//! list of context injections for the system prompt.
//!
//! # Architecture
//!
//! - **Storage**: SQLite, loaded into memory per [`session::Session`] and saved back
//!   best-effort
//! - **Embeddings**: deterministic hashed bag-of-words vectors, no model download
//! - **Search**: weighted blend of keyword, semantic, recency and relational signals
//! - **Transport**: MCP over stdio (primary) or Streamable HTTP, plus a CLI
//!
//! # Modules
//!
//! - [`cognition`]: turn analyzers and injection assembly
//! - [`config`]: configuration from TOML files and environment variables
//! - [`db`]: SQLite initialization, schema and embedding scheme metadata
//! - [`embedding`]: tokenizer, hashed embeddings and cosine similarity
//! - [`memory`]: memory creation, links, retrieval, persistence and statistics
//! - [`session`]: orchestration of remember / recall / turn processing

pub mod cli;
pub mod cognition;
pub mod config;
pub mod db;
pub mod embedding;
pub mod error;
pub mod memory;
pub mod server;
pub mod session;
pub mod tools;
