use reverie::embedding::{compute_embedding, cosine_similarity, EMBEDDING_DIM};
use reverie::error::CoreError;

#[test]
fn embedding_length_is_fixed() {
    for text in ["", "one", "a much longer sentence with many different words in it"] {
        assert_eq!(compute_embedding(text).len(), EMBEDDING_DIM);
    }
}

#[test]
fn embedding_is_deterministic() {
    let a = compute_embedding("User's sister lives in Lisbon");
    let b = compute_embedding("User's sister lives in Lisbon");
    assert_eq!(a, b);
}

#[test]
fn overlapping_phrases_are_closer_than_unrelated_ones() {
    let a = compute_embedding("diagnostic capability probe local capture");
    let b = compute_embedding("capability probe device diagnostics capture");
    let c = compute_embedding("calendar reminder shopping list");

    let related = cosine_similarity(&a, &b).unwrap();
    let unrelated = cosine_similarity(&a, &c).unwrap();
    assert!(related > unrelated, "{related} <= {unrelated}");
}

#[test]
fn mismatched_lengths_fail() {
    let a = compute_embedding("hello");
    let err = cosine_similarity(&a, &a[..10]).unwrap_err();
    assert!(matches!(
        err,
        CoreError::DimensionMismatch {
            left: 64,
            right: 10
        }
    ));
}
