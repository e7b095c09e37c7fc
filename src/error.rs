//! Error taxonomy for the memory and cognition core.
//!
//! Only [`CoreError::DimensionMismatch`] signals a programming error. Persistence
//! failures are logged and absorbed by [`crate::session::Session`]; an empty search
//! result is a plain empty `Vec`, never an error.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    /// Two embedding vectors of different lengths were compared.
    #[error("embedding dimension mismatch: {left} vs {right}")]
    DimensionMismatch { left: usize, right: usize },

    /// A memory or link is missing a required field or carries an out-of-range value.
    #[error("malformed entry: {0}")]
    MalformedEntry(String),

    /// The backing store failed to read or write.
    #[error("persistence failure: {0}")]
    Persistence(#[from] rusqlite::Error),

    /// A JSON column could not be encoded or decoded.
    #[error("persistence encoding failure: {0}")]
    Encoding(#[from] serde_json::Error),
}

pub type CoreResult<T> = Result<T, CoreError>;
