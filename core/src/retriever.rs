use thiserror::Error;
use tracing::{debug, error, instrument};

use crate::{
    embeddings::{EmbedderError, EmbeddingModel},
    vector_store::{ScoredPassage, VectorStore, VectorStoreError},
};

/// Passages for one query, most similar first.
pub type RetrievalResult = Vec<ScoredPassage>;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RetrievalError {
    #[error(
        "Query embedded to {got} dimensions but the store holds {expected}; \
         the embedder changed after indexing"
    )]
    DimensionMismatch { expected: usize, got: usize },
    #[error("Store was built with embedding model `{store}` but `{embedder}` is configured")]
    ModelMismatch { store: String, embedder: String },
    #[error("Failed to embed query: {0}")]
    Embedder(#[from] EmbedderError),
    #[error(transparent)]
    Store(#[from] VectorStoreError),
}

impl RetrievalError {
    /// True for errors caused by the embedder and the store disagreeing,
    /// which no retry can fix.
    #[must_use]
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::DimensionMismatch { .. }
                | Self::ModelMismatch { .. }
                | Self::Store(VectorStoreError::DimensionMismatch { .. })
        )
    }
}

/// Top-k similarity search over a built store, using the same embedder that
/// built it.
pub struct Retriever<E, V> {
    embedder: E,
    store: V,
}

impl<E: EmbeddingModel, V: VectorStore> Retriever<E, V> {
    pub fn new(embedder: E, store: V) -> Self {
        Self { embedder, store }
    }

    /// Like [`Retriever::new`] but refuses a store built by another model.
    ///
    /// # Errors
    /// `ModelMismatch` when the store manifest names a different model.
    pub fn checked(embedder: E, store: V) -> Result<Self, RetrievalError> {
        if store.embedding_model() != embedder.model_id() {
            error!(
                store = store.embedding_model(),
                embedder = embedder.model_id(),
                "Embedding model differs from the one the store was built with"
            );
            return Err(RetrievalError::ModelMismatch {
                store: store.embedding_model().to_string(),
                embedder: embedder.model_id().to_string(),
            });
        }
        Ok(Self::new(embedder, store))
    }

    pub fn store(&self) -> &V {
        &self.store
    }

    pub fn embedder(&self) -> &E {
        &self.embedder
    }

    /// Returns at most `k` passages ordered by decreasing similarity, ties by
    /// passage id. Empty, without embedding the query, when `k` is zero or the
    /// store holds nothing.
    ///
    /// # Errors
    /// `DimensionMismatch` if the query vector does not fit the store,
    /// `Embedder` if the query cannot be embedded.
    #[instrument(skip(self, query), fields(query_len = query.len()))]
    pub async fn search(&self, query: &str, k: usize) -> Result<RetrievalResult, RetrievalError> {
        if k == 0 || self.store.is_empty() {
            debug!(store_len = self.store.len(), "Nothing to search");
            return Ok(Vec::new());
        }

        let vector = self.embedder.embed(query).await?;
        let expected = self.store.dimensions();
        if vector.len() != expected {
            error!(expected, got = vector.len(), "Query dimension mismatch");
            return Err(RetrievalError::DimensionMismatch {
                expected,
                got: vector.len(),
            });
        }

        let results = self.store.top_n(&vector, k).await?;
        debug!(
            hits = results.len(),
            best = results.first().map(|r| r.score),
            "Retrieved passages"
        );
        Ok(results)
    }
}
