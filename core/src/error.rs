use crate::{
    chunker::ChunkError,
    completion::CompletionError,
    config::ConfigError,
    embeddings::EmbedderError,
    index::IndexBuildError,
    loader::LoaderError,
    retriever::RetrievalError,
    vector_store::VectorStoreError,
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("No corpus text to index")]
    EmptyInput,
    #[error("Index build failed: {0}")]
    IndexBuild(IndexBuildError),
    #[error("Configuration error: {0}")]
    Configuration(String),
    #[error("Generation failed: {0}")]
    Generation(#[from] CompletionError),
    #[error("Knowledge base is not initialized: {0}")]
    NotInitialized(String),
    #[error("Embedder error: {0}")]
    Embedder(EmbedderError),
    #[error("Passage store error: {0}")]
    Store(VectorStoreError),
    #[error("Loader error: {0}")]
    Loader(#[from] LoaderError),
}

impl From<ChunkError> for Error {
    fn from(e: ChunkError) -> Self {
        match e {
            ChunkError::EmptyInput => Self::EmptyInput,
            ChunkError::InvalidConfig { .. } => Self::Configuration(e.to_string()),
        }
    }
}

impl From<IndexBuildError> for Error {
    fn from(e: IndexBuildError) -> Self {
        match e {
            IndexBuildError::EmptyInput => Self::EmptyInput,
            other => Self::IndexBuild(other),
        }
    }
}

impl From<VectorStoreError> for Error {
    fn from(e: VectorStoreError) -> Self {
        match e {
            VectorStoreError::NotInitialized(path) => Self::NotInitialized(format!(
                "no passage store at {}; build the knowledge base first",
                path.display()
            )),
            VectorStoreError::DimensionMismatch { .. } => Self::Configuration(e.to_string()),
            other => Self::Store(other),
        }
    }
}

impl From<RetrievalError> for Error {
    fn from(e: RetrievalError) -> Self {
        match e {
            RetrievalError::Store(store) => store.into(),
            RetrievalError::Embedder(embedder) => embedder.into(),
            other => Self::Configuration(other.to_string()),
        }
    }
}

impl From<EmbedderError> for Error {
    fn from(e: EmbedderError) -> Self {
        match e {
            EmbedderError::Configuration(_) => Self::Configuration(e.to_string()),
            other => Self::Embedder(other),
        }
    }
}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Self::Configuration(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn taxonomy_mapping() {
        assert!(matches!(Error::from(ChunkError::EmptyInput), Error::EmptyInput));
        assert!(matches!(
            Error::from(IndexBuildError::EmptyInput),
            Error::EmptyInput
        ));
        assert!(matches!(
            Error::from(VectorStoreError::NotInitialized(PathBuf::from("db"))),
            Error::NotInitialized(_)
        ));
        assert!(matches!(
            Error::from(RetrievalError::DimensionMismatch {
                expected: 3,
                got: 4
            }),
            Error::Configuration(_)
        ));
        assert!(matches!(
            Error::from(CompletionError::ProviderError(429, "slow down".to_string())),
            Error::Generation(_)
        ));
        assert!(matches!(
            Error::from(RetrievalError::Embedder(EmbedderError::EmptyEmbedding)),
            Error::Embedder(_)
        ));
    }
}
