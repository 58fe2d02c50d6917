use crate::{
    config::{api_key_from_env, EmbeddingConfig},
    embeddings::{EmbedderError, EmbeddingModel},
    providers::http_client,
};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, error, instrument};

pub struct OpenAIEmbeddingModel {
    api_url: String,
    api_key: String,
    model: String,
    client: reqwest::Client,
}

impl OpenAIEmbeddingModel {
    /// # Errors
    /// `Configuration` if the HTTP client cannot be built.
    pub fn new(
        api_key: String,
        api_url: String,
        model: String,
        timeout_secs: u64,
    ) -> Result<Self, EmbedderError> {
        let client = http_client(timeout_secs)
            .map_err(|e| EmbedderError::Configuration(e.to_string()))?;
        Ok(Self {
            api_url,
            api_key,
            model,
            client,
        })
    }

    /// Builds the model from config, reading the key from `config.api_key_var`.
    ///
    /// # Errors
    /// `Configuration` if the key is missing or the client cannot be built.
    pub fn from_config(config: &EmbeddingConfig) -> Result<Self, EmbedderError> {
        let api_key = api_key_from_env(&config.api_key_var).map_err(|e| {
            error!(error = %e, "API key unavailable");
            EmbedderError::Configuration(e.to_string())
        })?;
        Self::new(
            api_key,
            config.api_url.clone(),
            config.model.clone(),
            config.timeout_secs,
        )
    }
}

#[derive(Deserialize)]
struct OpenAIEmbeddingResponse {
    pub data: Vec<OpenAIEmbeddingData>,
}

#[derive(Deserialize)]
struct OpenAIEmbeddingData {
    pub embedding: Vec<f64>,
}

#[async_trait]
impl EmbeddingModel for OpenAIEmbeddingModel {
    fn model_id(&self) -> &str {
        &self.model
    }

    #[instrument(skip(self, data), fields(model = %self.model, input_len = data.len()))]
    async fn embed(&self, data: &str) -> Result<Vec<f64>, EmbedderError> {
        let request_body = json!({
                "input": data,
                "model": self.model,
        });
        let response = self
            .client
            .post(&self.api_url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&request_body)
            .send()
            .await
            .map_err(|e| {
                error!(error = ?e, "Embedding request failed");
                EmbedderError::RequestError(e.to_string())
            })?;

        let status = response.status();
        debug!(%status, "Received embedding response");

        if status.is_success() {
            let response = response
                .json::<OpenAIEmbeddingResponse>()
                .await
                .map_err(|e| EmbedderError::ParseError(e.to_string()))?;

            let embedding = response
                .data
                .into_iter()
                .next()
                .map(|d| d.embedding)
                .unwrap_or_default();
            if embedding.is_empty() {
                return Err(EmbedderError::EmptyEmbedding);
            }
            Ok(embedding)
        } else {
            let error_message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            error!(%status, error = %error_message, "Embedding API returned error");

            Err(EmbedderError::ProviderError(format!(
                "HTTP {status}: {error_message}"
            )))
        }
    }
}
