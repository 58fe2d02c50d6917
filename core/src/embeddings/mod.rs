use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EmbedderError {
    #[error("Embedding provider error: {0}")]
    ProviderError(String),
    #[error("RequestError: {0}")]
    RequestError(String),
    #[error("ParseError: {0}")]
    ParseError(String),
    #[error("Provider returned an empty embedding")]
    EmptyEmbedding,
    #[error("Failed to configure embedder: {0}")]
    Configuration(String),
}

/// Text embedding capability.
///
/// The same model (and so the same dimension) must be used when building the
/// passage store and when embedding queries against it; `model_id` is recorded
/// in the store manifest so a mismatch can be detected on open.
#[async_trait]
pub trait EmbeddingModel: Send + Sync {
    /// Identifier of the underlying model, eg `text-embedding-3-small`
    fn model_id(&self) -> &str;

    async fn embed(&self, data: &str) -> Result<Vec<f64>, EmbedderError>;
}

#[async_trait]
impl<T: EmbeddingModel + ?Sized> EmbeddingModel for std::sync::Arc<T> {
    fn model_id(&self) -> &str {
        (**self).model_id()
    }

    async fn embed(&self, data: &str) -> Result<Vec<f64>, EmbedderError> {
        (**self).embed(data).await
    }
}
