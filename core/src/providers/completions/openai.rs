use crate::{
    completion::{CompletionError, CompletionModel, GenerationParams, Message, TokenUsage},
    config::{api_key_from_env, CompletionConfig},
    providers::http_client,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, error, info, instrument};

pub struct OpenAICompletionModel {
    api_key: String,
    api_url: String,
    models_url: String,
    client: reqwest::Client,
}

impl OpenAICompletionModel {
    /// # Errors
    /// `Configuration` if the HTTP client cannot be built.
    pub fn new(
        api_key: String,
        api_url: String,
        models_url: String,
        timeout_secs: u64,
    ) -> Result<Self, CompletionError> {
        let client = http_client(timeout_secs)
            .map_err(|e| CompletionError::Configuration(e.to_string()))?;
        Ok(Self {
            api_key,
            api_url,
            models_url,
            client,
        })
    }

    /// # Errors
    /// `Configuration` if the key named by `config.api_key_var` is missing or
    /// the client cannot be built.
    pub fn from_config(config: &CompletionConfig) -> Result<Self, CompletionError> {
        let api_key = api_key_from_env(&config.api_key_var).map_err(|e| {
            error!(error = %e, "API key unavailable");
            CompletionError::Configuration(e.to_string())
        })?;
        Self::new(
            api_key,
            config.api_url.clone(),
            config.models_url.clone(),
            config.timeout_secs,
        )
    }

    async fn error_body(response: reqwest::Response) -> CompletionError {
        let status = response.status();
        let error_msg = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error (failed to read response body)".to_string());

        error!(
            status = %status,
            error = %error_msg,
            "API returned error response"
        );
        CompletionError::ProviderError(status.into(), error_msg)
    }
}

#[derive(Serialize, Deserialize, Eq, PartialEq, Debug)]
#[serde(tag = "role", content = "content")]
#[allow(non_camel_case_types)]
enum OpenAIMessage {
    system(String),
    user(String),
    assistant(String),
}

impl From<&Message> for OpenAIMessage {
    fn from(value: &Message) -> OpenAIMessage {
        match value {
            Message::Preamble(s) => OpenAIMessage::system(s.clone()),
            Message::User(s) => OpenAIMessage::user(s.clone()),
            Message::Assistant(s) => OpenAIMessage::assistant(s.clone()),
        }
    }
}

#[derive(Deserialize)]
struct ModelList {
    data: Vec<ModelEntry>,
}

#[derive(Deserialize)]
struct ModelEntry {
    id: String,
}

#[async_trait]
impl CompletionModel for OpenAICompletionModel {
    #[instrument(
        skip(self, messages, params),
        fields(message_count = messages.len(), max_tokens = params.max_tokens)
    )]
    async fn send(
        &self,
        model: &str,
        messages: &[Message],
        params: &GenerationParams,
    ) -> Result<(Message, TokenUsage), CompletionError> {
        let messages: Vec<OpenAIMessage> = messages.iter().map(Into::into).collect();

        let request_body = json!({
            "model": model,
            "messages": messages,
            "temperature": params.temperature,
            "max_tokens": params.max_tokens,
            "top_p": params.top_p,
        });

        debug!(request_body = ?request_body, "Sending completion request");

        let response = self
            .client
            .post(&self.api_url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&request_body)
            .send()
            .await
            .map_err(|e| {
                error!(error = ?e, "Request failed");
                CompletionError::RequestError(e.to_string())
            })?;

        let status = response.status();
        debug!(%status, "Received API response");

        if !status.is_success() {
            return Err(Self::error_body(response).await);
        }

        let response_json: serde_json::Value = response.json().await.map_err(|e| {
            error!(error = ?e, "Failed to parse response JSON");
            CompletionError::ParseError(e.to_string())
        })?;

        let content = response_json["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| {
                error!("Missing content in completion response");
                CompletionError::ParseError("Missing message content".to_string())
            })?
            .to_string();

        // Some compatible services omit usage.
        let usage_response = &response_json["usage"];
        let token_usage = TokenUsage {
            prompt_tokens: usage_response["prompt_tokens"].as_u64(),
            completion_tokens: usage_response["completion_tokens"].as_u64(),
            total_tokens: usage_response["total_tokens"].as_u64(),
        };

        info!(
            prompt_tokens = token_usage.prompt_tokens,
            completion_tokens = token_usage.completion_tokens,
            total_tokens = token_usage.total_tokens,
            "Token usage recorded"
        );

        Ok((Message::Assistant(content), token_usage))
    }

    #[instrument(skip(self))]
    async fn list_models(&self) -> Result<Vec<String>, CompletionError> {
        let response = self
            .client
            .get(&self.models_url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .send()
            .await
            .map_err(|e| {
                error!(error = ?e, "Model listing request failed");
                CompletionError::RequestError(e.to_string())
            })?;

        if !response.status().is_success() {
            return Err(Self::error_body(response).await);
        }

        let list: ModelList = response.json().await.map_err(|e| {
            error!(error = ?e, "Failed to parse model list");
            CompletionError::ParseError(e.to_string())
        })?;
        let models: Vec<String> = list.data.into_iter().map(|m| m.id).collect();
        debug!(count = models.len(), "Fetched model catalog");
        Ok(models)
    }
}
