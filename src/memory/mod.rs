//! Memory model: entries, associative links, retrieval, and persistence.

pub mod links;
pub mod repository;
pub mod search;
pub mod stats;
pub mod store;
pub mod types;
