use async_trait::async_trait;
use thiserror::Error;
use tracing::{info, warn};

/// Message that'll be sent in Completions
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    /// System prompt
    Preamble(String),
    /// Message sent by the user
    User(String),
    /// Response from the assistant
    Assistant(String),
}

impl Message {
    #[must_use]
    pub fn content(&self) -> &str {
        match self {
            Message::Preamble(s) | Message::User(s) | Message::Assistant(s) => s,
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TokenUsage {
    pub prompt_tokens: Option<u64>,
    pub completion_tokens: Option<u64>,
    pub total_tokens: Option<u64>,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CompletionError {
    #[error("Provider error -> HTTP Status {0}: {1}")]
    ProviderError(u16, String),
    #[error("RequestError: {0}")]
    RequestError(String),
    #[error("ParseError: {0}")]
    ParseError(String),
    #[error("Failed to configure completion client: {0}")]
    Configuration(String),
}

/// Sampling parameters sent with every completion request.
#[derive(Debug, Clone, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct GenerationParams {
    pub temperature: f64,
    pub max_tokens: usize,
    pub top_p: f64,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            temperature: 0.1,
            max_tokens: 1024,
            top_p: 0.9,
        }
    }
}

/// Text completion capability.
///
/// Implementations take `&self` and must be safe to share between concurrent
/// queries.
#[async_trait]
pub trait CompletionModel: Send + Sync {
    /// Send messages to the LLM and get a reply
    async fn send(
        &self,
        model: &str,
        messages: &[Message],
        params: &GenerationParams,
    ) -> Result<(Message, TokenUsage), CompletionError>;

    /// Identifiers of the models the service currently offers
    async fn list_models(&self) -> Result<Vec<String>, CompletionError>;
}

#[async_trait]
impl<T: CompletionModel + ?Sized> CompletionModel for std::sync::Arc<T> {
    async fn send(
        &self,
        model: &str,
        messages: &[Message],
        params: &GenerationParams,
    ) -> Result<(Message, TokenUsage), CompletionError> {
        (**self).send(model, messages, params).await
    }

    async fn list_models(&self) -> Result<Vec<String>, CompletionError> {
        (**self).list_models().await
    }
}

/// Picks the completion model to use from the service's catalog.
///
/// The first entry of `preferred` that the catalog offers wins. If none is
/// offered the catalog's first entry is used, and if there is no catalog at
/// all (the listing failed or came back empty) `default_model` is used.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelSelector {
    preferred: Vec<String>,
    default_model: String,
}

/// Outcome of resolving a [`ModelSelector`] against a live service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelChoice {
    pub model: String,
    pub catalog: Vec<String>,
}

impl ModelSelector {
    pub fn new(preferred: Vec<String>, default_model: impl Into<String>) -> Self {
        Self {
            preferred,
            default_model: default_model.into(),
        }
    }

    #[must_use]
    pub fn select(&self, catalog: Option<&[String]>) -> String {
        let Some(catalog) = catalog.filter(|c| !c.is_empty()) else {
            return self.default_model.clone();
        };
        self.preferred
            .iter()
            .find(|p| catalog.contains(*p))
            .or_else(|| catalog.first())
            .cloned()
            .unwrap_or_else(|| self.default_model.clone())
    }

    /// Queries the catalog once and selects from it. A failed listing is
    /// logged and treated as no catalog.
    pub async fn resolve<C: CompletionModel + ?Sized>(&self, client: &C) -> ModelChoice {
        let catalog = match client.list_models().await {
            Ok(models) => models,
            Err(e) => {
                warn!(error = %e, default = %self.default_model, "Model catalog unavailable");
                Vec::new()
            }
        };
        let model = self.select(Some(catalog.as_slice()));
        info!(%model, available = catalog.len(), "Selected completion model");
        ModelChoice { model, catalog }
    }
}
