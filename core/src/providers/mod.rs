//! OpenAI-compatible HTTP implementations of [`EmbeddingModel`](crate::embeddings::EmbeddingModel)
//! and [`CompletionModel`](crate::completion::CompletionModel).
//!
//! Any service speaking the `/embeddings`, `/chat/completions` and `/models`
//! dialect works by pointing the configured URLs at it.

pub mod completions;
pub mod embeddings;

use std::time::Duration;

/// Shared reqwest client with a bounded request timeout.
pub(crate) fn http_client(timeout_secs: u64) -> Result<reqwest::Client, reqwest::Error> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
}
