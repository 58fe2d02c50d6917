use std::path::Path;

use thiserror::Error;
use tracing::{debug, error, info, instrument};

use crate::{
    document::Passage,
    embeddings::{EmbedderError, EmbeddingModel},
    vector_store::{PassageStore, PassageStoreBuilder, VectorStoreError},
};

const PROGRESS_EVERY: usize = 50;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum IndexBuildError {
    #[error("No passages to index")]
    EmptyInput,
    #[error("Failed to embed passage {passage_id}: {source}")]
    Embedder {
        passage_id: usize,
        source: EmbedderError,
    },
    #[error("Passage {passage_id} embedded to {got} dimensions, expected {expected}")]
    DimensionMismatch {
        passage_id: usize,
        expected: usize,
        got: usize,
    },
    #[error("Failed to write passage store: {0}")]
    Store(#[from] VectorStoreError),
}

/// Embeds every passage and collects them into a [`PassageStore`].
///
/// All or nothing: the first failing passage aborts the build and nothing
/// built so far is kept.
///
/// # Errors
/// `EmptyInput` for no passages, `Embedder` when the embedder fails,
/// `DimensionMismatch` when it returns vectors of inconsistent size.
#[instrument(skip_all, fields(passages = passages.len(), model = embedder.model_id()))]
pub async fn build<M: EmbeddingModel + ?Sized>(
    passages: Vec<Passage>,
    embedder: &M,
) -> Result<PassageStore, IndexBuildError> {
    if passages.is_empty() {
        return Err(IndexBuildError::EmptyInput);
    }
    let total = passages.len();
    let mut builder = PassageStoreBuilder::new(embedder.model_id());

    for passage in passages {
        let passage_id = passage.id;
        let vector = embedder.embed(&passage.text).await.map_err(|e| {
            error!(passage_id, error = %e, "Embedding failed, discarding build");
            IndexBuildError::Embedder {
                passage_id,
                source: e,
            }
        })?;
        builder.push(passage, vector).map_err(|e| match e {
            VectorStoreError::DimensionMismatch { expected, got } => {
                error!(passage_id, expected, got, "Embedding dimension changed mid build");
                IndexBuildError::DimensionMismatch {
                    passage_id,
                    expected,
                    got,
                }
            }
            other => IndexBuildError::Store(other),
        })?;

        if builder.len() % PROGRESS_EVERY == 0 {
            debug!(embedded = builder.len(), total, "Indexing progress");
        }
    }

    let store = builder.finish();
    info!(
        passages = store.manifest().passage_count,
        dimensions = store.manifest().dimensions,
        "Built passage store"
    );
    Ok(store)
}

/// [`build`]s the store and writes it to `dir`, replacing any previous store
/// there. Nothing is written if the build fails.
///
/// # Errors
/// Everything [`build`] returns, plus `Store` when writing fails.
pub async fn build_and_persist<M: EmbeddingModel + ?Sized>(
    passages: Vec<Passage>,
    embedder: &M,
    dir: impl AsRef<Path>,
) -> Result<PassageStore, IndexBuildError> {
    let store = build(passages, embedder).await?;
    store.save(dir).await?;
    Ok(store)
}
