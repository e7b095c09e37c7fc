//! Text-to-vector embedding pipeline.
//!
//! A deterministic bag-of-hashed-tokens vectorizer ([`compute_embedding`]) producing
//! L2-normalized vectors of [`EMBEDDING_DIM`] dimensions, plus [`cosine_similarity`].
//! Identical text always yields a bit-identical vector, so an embedding doubles as a
//! stable content key.

pub mod hashing;

pub use hashing::{compute_embedding, fnv1a_hash};

use crate::error::{CoreError, CoreResult};

/// Number of dimensions in the embedding vectors.
pub const EMBEDDING_DIM: usize = 64;

/// Identifier recorded in the database so stored vectors can be checked against the
/// scheme the binary computes.
pub const EMBEDDING_SCHEME: &str = "fnv1a-bow-64";

/// Lowercase, strip everything outside `[a-z0-9\s]`, split on whitespace.
pub fn tokenize(text: &str) -> Vec<String> {
    let cleaned: String = text
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c.is_whitespace())
        .collect();
    cleaned
        .split_whitespace()
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// Dot product of two pre-normalized vectors.
///
/// Fails with [`CoreError::DimensionMismatch`] when the lengths differ.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> CoreResult<f32> {
    if a.len() != b.len() {
        return Err(CoreError::DimensionMismatch {
            left: a.len(),
            right: b.len(),
        });
    }
    Ok(a.iter().zip(b).map(|(x, y)| x * y).sum())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokenize_strips_punctuation_and_case() {
        assert_eq!(
            tokenize("Hello, World!  It's 2024."),
            vec!["hello", "world", "its", "2024"]
        );
    }

    #[test]
    fn tokenize_empty_and_symbol_only() {
        assert!(tokenize("").is_empty());
        assert!(tokenize("?!... ---").is_empty());
    }

    #[test]
    fn cosine_of_identical_normalized_vectors_is_one() {
        let v = compute_embedding("rust memory engine");
        let sim = cosine_similarity(&v, &v).unwrap();
        assert!((sim - 1.0).abs() < 1e-5);
    }

    #[test]
    fn cosine_rejects_mismatched_lengths() {
        let err = cosine_similarity(&[1.0, 0.0], &[1.0, 0.0, 0.0]).unwrap_err();
        assert!(matches!(
            err,
            CoreError::DimensionMismatch { left: 2, right: 3 }
        ));
    }
}
