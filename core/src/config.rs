//! JSON configuration for the knowledge base builder and the assistant.
//!
//! Every field has a default, so an empty object (or no file at all) is a
//! valid configuration:
//!
//! ```json
//! {
//!     "corpus_path": "persian_law.txt",
//!     "store_dir": "persian_law_db",
//!     "chunk_size": 800,
//!     "chunk_overlap": 100,
//!     "top_k": 3,
//!     "embedding": { "model": "text-embedding-3-small" },
//!     "completion": {
//!         "preferred_models": ["gpt-4o", "gpt-4o-mini"],
//!         "generation": { "temperature": 0.1, "max_tokens": 1024, "top_p": 0.9 }
//!     }
//! }
//! ```
//!
//! API keys never live in the file; `api_key_var` names the environment
//! variable holding them.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::{
    chunker::{DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE},
    completion::{GenerationParams, ModelSelector},
    composer::DEFAULT_TOP_K,
};

pub const DEFAULT_CONFIG_PATH: &str = "qanun.json";
const DEFAULT_TIMEOUT_SECS: u64 = 60;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {message}")]
    Io { path: PathBuf, message: String },
    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Invalid config: {0}")]
    Invalid(String),
    #[error("Failed to fetch env var `{0}`")]
    MissingApiKey(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Plain UTF-8 corpus written by the acquisition tools
    pub corpus_path: PathBuf,
    /// Directory holding the persisted passage store
    pub store_dir: PathBuf,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub top_k: usize,
    pub embedding: EmbeddingConfig,
    pub completion: CompletionConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            corpus_path: PathBuf::from("persian_law.txt"),
            store_dir: PathBuf::from("persian_law_db"),
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_overlap: DEFAULT_CHUNK_OVERLAP,
            top_k: DEFAULT_TOP_K,
            embedding: EmbeddingConfig::default(),
            completion: CompletionConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EmbeddingConfig {
    pub api_key_var: String,
    pub api_url: String,
    pub model: String,
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            api_key_var: "QANUN_EMBEDDING_API_KEY".to_string(),
            api_url: "https://api.openai.com/v1/embeddings".to_string(),
            model: "text-embedding-3-small".to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CompletionConfig {
    pub api_key_var: String,
    pub api_url: String,
    pub models_url: String,
    /// Tried in order against the service's model catalog
    pub preferred_models: Vec<String>,
    /// Used when the catalog cannot be fetched
    pub default_model: String,
    pub generation: GenerationParams,
    pub timeout_secs: u64,
    pub system_prompt: Option<String>,
    pub not_found_answer: Option<String>,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            api_key_var: "QANUN_COMPLETION_API_KEY".to_string(),
            api_url: "https://api.openai.com/v1/chat/completions".to_string(),
            models_url: "https://api.openai.com/v1/models".to_string(),
            preferred_models: vec![
                "gpt-4o".to_string(),
                "gpt-4o-mini".to_string(),
                "gpt-4.1-mini".to_string(),
            ],
            default_model: "gpt-4o-mini".to_string(),
            generation: GenerationParams::default(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            system_prompt: None,
            not_found_answer: None,
        }
    }
}

impl CompletionConfig {
    #[must_use]
    pub fn model_selector(&self) -> ModelSelector {
        ModelSelector::new(self.preferred_models.clone(), self.default_model.clone())
    }
}

impl Config {
    /// # Errors
    /// `Parse` for malformed JSON or unknown fields, `Invalid` for unusable values.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// # Errors
    /// `Io` if the file cannot be read, otherwise as [`Config::from_json`].
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        Self::from_json(&json)
    }

    /// Loads `path` if it exists, defaults otherwise.
    ///
    /// # Errors
    /// As [`Config::load`] for a file that exists but is unusable.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if path.exists() {
            Self::load(path)
        } else {
            info!(path = %path.display(), "No config file, using defaults");
            Ok(Self::default())
        }
    }

    /// # Errors
    /// `Invalid` describing the first unusable value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.chunk_size == 0 || self.chunk_overlap >= self.chunk_size {
            return Err(ConfigError::Invalid(format!(
                "chunk_overlap ({}) must be smaller than a non-zero chunk_size ({})",
                self.chunk_overlap, self.chunk_size
            )));
        }
        if self.embedding.model.trim().is_empty() {
            return Err(ConfigError::Invalid("embedding.model is empty".to_string()));
        }
        if self.completion.default_model.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "completion.default_model is empty".to_string(),
            ));
        }
        if self.embedding.timeout_secs == 0 || self.completion.timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "timeouts must be at least one second".to_string(),
            ));
        }
        Ok(())
    }
}

/// Reads the API key from the environment variable named `var`.
///
/// # Errors
/// `MissingApiKey` if the variable is unset or blank.
pub fn api_key_from_env(var: &str) -> Result<String, ConfigError> {
    match std::env::var(var) {
        Ok(key) if !key.trim().is_empty() => Ok(key),
        _ => Err(ConfigError::MissingApiKey(var.to_string())),
    }
}
