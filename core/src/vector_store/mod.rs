use std::path::PathBuf;

use async_trait::async_trait;
use thiserror::Error;

use crate::document::Passage;

pub mod passage_store;

pub use passage_store::{PassageStore, PassageStoreBuilder, StoreManifest};

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum VectorStoreError {
    #[error("Passage store not found at {0}")]
    NotInitialized(PathBuf),
    #[error("Vector dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },
    #[error("Passage store is corrupt: {0}")]
    Corrupt(String),
    #[error("Failed to access passage store at {path}: {message}")]
    Io { path: PathBuf, message: String },
    #[error("Failed to encode or decode passage store: {0}")]
    Serde(String),
}

/// A passage paired with its similarity to a query.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredPassage {
    pub passage: Passage,
    pub score: f64,
}

/// Read side of a passage store.
///
/// Implementations are immutable once built, so a single store can serve
/// concurrent queries behind a shared reference.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Embedding model the store was built with.
    fn embedding_model(&self) -> &str;

    /// Vector dimension, `0` for an empty store.
    fn dimensions(&self) -> usize;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    async fn get_by_id(&self, id: usize) -> Result<Option<Passage>, VectorStoreError>;

    /// The `n` passages most similar to `query`, best first. Equal scores are
    /// ordered by passage id.
    async fn top_n(&self, query: &[f64], n: usize) -> Result<Vec<ScoredPassage>, VectorStoreError>;
}

/// Cosine similarity of two equally sized vectors; `0.0` if either has zero norm.
#[must_use]
pub fn cosine_similarity(a: &[f64], b: &[f64]) -> f64 {
    let (mut dot, mut norm_a, mut norm_b) = (0.0, 0.0, 0.0);
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    let score = dot / (norm_a.sqrt() * norm_b.sqrt());
    // Overflowing norms give inf/inf.
    if score.is_finite() {
        score
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cosine_of_parallel_vectors_is_one() {
        let s = cosine_similarity(&[1.0, 2.0, 3.0], &[2.0, 4.0, 6.0]);
        assert!((s - 1.0).abs() < 1e-12);
    }

    #[test]
    fn overflowing_vectors_score_zero() {
        assert_eq!(cosine_similarity(&[1e200, 1e200], &[1e200, 1e200]), 0.0);
    }

    #[test]
    fn cosine_of_orthogonal_vectors_is_zero() {
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]), 0.0);
    }

    #[test]
    fn zero_vector_scores_zero() {
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]), 0.0);
    }
}
