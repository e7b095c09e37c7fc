//! Hashed bag-of-words vectorizer.
//!
//! Each token is hashed with 32-bit FNV-1a and counted into one of
//! [`EMBEDDING_DIM`] buckets; the count vector is then L2-normalized.

use super::{tokenize, EMBEDDING_DIM};

const FNV_OFFSET_BASIS: u32 = 2_166_136_261;
const FNV_PRIME: u32 = 16_777_619;

/// 32-bit FNV-1a over the token's characters, folded to a non-negative value the way
/// a signed 32-bit accumulator would be (`|h as i32|`).
pub fn fnv1a_hash(token: &str) -> u32 {
    let mut hash = FNV_OFFSET_BASIS;
    for c in token.chars() {
        hash ^= c as u32;
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    (hash as i32).unsigned_abs()
}

/// Embed text into an L2-normalized vector of [`EMBEDDING_DIM`] dimensions.
///
/// Text with no tokens produces the zero vector.
pub fn compute_embedding(text: &str) -> Vec<f32> {
    let mut vector = vec![0.0f32; EMBEDDING_DIM];
    for token in tokenize(text) {
        let bucket = fnv1a_hash(&token) as usize % EMBEDDING_DIM;
        vector[bucket] += 1.0;
    }

    let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in &mut vector {
            *x /= norm;
        }
    }
    vector
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::cosine_similarity;

    #[test]
    fn fnv_matches_reference_values() {
        // Offset basis folded through i32 for the empty string.
        assert_eq!(fnv1a_hash(""), 2_128_831_035);
        assert_eq!(fnv1a_hash("a"), 468_965_076);
        assert_eq!(fnv1a_hash("rust"), 490_716_647);
    }

    #[test]
    fn embedding_has_fixed_length_and_unit_norm() {
        let v = compute_embedding("The quick brown fox jumps over the lazy dog");
        assert_eq!(v.len(), EMBEDDING_DIM);
        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[test]
    fn empty_text_is_zero_vector() {
        let v = compute_embedding("   !!! ");
        assert_eq!(v.len(), EMBEDDING_DIM);
        assert!(v.iter().all(|x| *x == 0.0));
    }

    #[test]
    fn embedding_is_deterministic() {
        let a = compute_embedding("Remember that I prefer dark roast coffee");
        let b = compute_embedding("Remember that I prefer dark roast coffee");
        assert_eq!(a, b);
    }

    #[test]
    fn overlapping_phrases_score_higher_than_unrelated() {
        let base = compute_embedding("diagnostic capability probe local capture");
        let related = compute_embedding("capability probe device diagnostics capture");
        let unrelated = compute_embedding("calendar reminder shopping list");

        let close = cosine_similarity(&base, &related).unwrap();
        let far = cosine_similarity(&base, &unrelated).unwrap();
        assert!(close > far, "expected {close} > {far}");
    }
}
