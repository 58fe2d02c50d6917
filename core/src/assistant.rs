//! Query boundary for front ends.
//!
//! [`Assistant`] owns a fully wired [`Composer`] or the reason it could not
//! be built, and turns every question into a [`ConversationTurn`] that can be
//! shown as is. Failures never escape [`Assistant::ask`]; callers that want
//! the typed error use [`Assistant::try_ask`].

use tracing::{error, info, instrument, warn};

use crate::{
    completion::{CompletionError, CompletionModel},
    composer::{Answer, Composer},
    config::Config,
    embeddings::EmbeddingModel,
    error::Error,
    providers::{completions::OpenAI as OpenAICompletion, embeddings::OpenAI as OpenAIEmbedding},
    retriever::Retriever,
    vector_store::{PassageStore, VectorStore},
};

/// Shown instead of an answer when the assistant failed to start.
pub const NOT_READY_MESSAGE: &str =
    "ربات راه اندازی نشده است. لطفاً مطمئن شوید که مراحل قبل را به درستی انجام داده اید.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
}

/// One displayable message of a conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationTurn {
    pub role: Role,
    pub content: String,
    pub sources: Vec<String>,
}

impl ConversationTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            sources: Vec::new(),
        }
    }

    pub fn assistant(content: impl Into<String>, sources: Vec<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            sources,
        }
    }
}

/// User-visible text for a failed question.
#[must_use]
pub fn error_message(e: &Error) -> String {
    format!("خطا در پردازش سوال: {e}")
}

enum State<E, V, C> {
    Ready(Box<Composer<E, V, C>>),
    NotReady(String),
}

pub struct Assistant<E = OpenAIEmbedding, V = PassageStore, C = OpenAICompletion> {
    state: State<E, V, C>,
}

impl Assistant {
    /// Wires the HTTP providers and the persisted store described by `config`.
    ///
    /// Never fails: a construction error is logged once and leaves the
    /// assistant not ready.
    pub async fn open(config: &Config) -> Self {
        match Self::try_open(config).await {
            Ok(assistant) => assistant,
            Err(e) => {
                error!(error = %e, "Assistant failed to start");
                Self::not_ready(e.to_string())
            }
        }
    }

    /// # Errors
    /// `NotInitialized` when no store exists at `config.store_dir`,
    /// `Configuration` for missing keys, invalid settings or a store built by
    /// another embedding model.
    #[instrument(skip_all, fields(store_dir = %config.store_dir.display()))]
    pub async fn try_open(config: &Config) -> Result<Self, Error> {
        config.validate()?;
        let store = PassageStore::open(&config.store_dir).await?;
        let embedder = OpenAIEmbedding::from_config(&config.embedding)?;
        let retriever = Retriever::checked(embedder, store)?;
        let completion_model =
            OpenAICompletion::from_config(&config.completion).map_err(|e| match e {
                CompletionError::Configuration(msg) => Error::Configuration(msg),
                other => Error::Generation(other),
            })?;

        let mut composer = Composer::with_selector(
            retriever,
            completion_model,
            &config.completion.model_selector(),
        )
        .await
        .with_params(config.completion.generation.clone())
        .with_top_k(config.top_k);
        if let Some(prompt) = &config.completion.system_prompt {
            composer = composer.with_system_prompt(prompt.clone());
        }
        if let Some(answer) = &config.completion.not_found_answer {
            composer = composer.with_not_found_answer(answer.clone());
        }

        info!(
            model = composer.model(),
            passages = composer.retriever().store().len(),
            "Assistant ready"
        );
        Ok(Self::from_composer(composer))
    }
}

impl<E, V, C> Assistant<E, V, C>
where
    E: EmbeddingModel,
    V: VectorStore,
    C: CompletionModel,
{
    pub fn from_composer(composer: Composer<E, V, C>) -> Self {
        Self {
            state: State::Ready(Box::new(composer)),
        }
    }

    pub fn not_ready(reason: impl Into<String>) -> Self {
        Self {
            state: State::NotReady(reason.into()),
        }
    }

    #[must_use]
    pub fn is_ready(&self) -> bool {
        matches!(self.state, State::Ready(_))
    }

    /// Why the assistant failed to start, if it did.
    #[must_use]
    pub fn not_ready_reason(&self) -> Option<&str> {
        match &self.state {
            State::Ready(_) => None,
            State::NotReady(reason) => Some(reason),
        }
    }

    /// Completion model in use, if ready.
    #[must_use]
    pub fn model(&self) -> Option<&str> {
        match &self.state {
            State::Ready(composer) => Some(composer.model()),
            State::NotReady(_) => None,
        }
    }

    /// Catalog the completion service reported at startup.
    #[must_use]
    pub fn available_models(&self) -> &[String] {
        match &self.state {
            State::Ready(composer) => composer.available_models(),
            State::NotReady(_) => &[],
        }
    }

    /// # Errors
    /// `NotInitialized` when not ready, otherwise whatever retrieval or
    /// generation failed with.
    pub async fn try_ask(&self, question: &str) -> Result<Answer, Error> {
        match &self.state {
            State::Ready(composer) => composer.ask(question).await,
            State::NotReady(reason) => Err(Error::NotInitialized(reason.clone())),
        }
    }

    /// Answers `question` as a displayable turn. Sources are omitted whenever
    /// the answer says nothing was found.
    #[instrument(skip_all, fields(question_len = question.len()))]
    pub async fn ask(&self, question: &str) -> ConversationTurn {
        let State::Ready(composer) = &self.state else {
            return ConversationTurn::assistant(NOT_READY_MESSAGE, Vec::new());
        };
        match composer.ask(question).await {
            Ok(answer) if answer.is_fallback() || composer.says_not_found(&answer.text) => {
                ConversationTurn::assistant(answer.text, Vec::new())
            }
            Ok(answer) => ConversationTurn::assistant(answer.text, answer.sources),
            Err(e) => {
                warn!(error = %e, "Question failed");
                ConversationTurn::assistant(error_message(&e), Vec::new())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        completion::CompletionError,
        composer::NOT_FOUND_ANSWER,
        index,
        test_utils::{passages, HashEmbedder, ScriptedCompletion},
    };

    async fn assistant(
        texts: &[&str],
        completion: ScriptedCompletion,
    ) -> Assistant<HashEmbedder, PassageStore, ScriptedCompletion> {
        let store = if texts.is_empty() {
            PassageStore::empty("hash-embedder")
        } else {
            index::build(passages(texts), &HashEmbedder::new(64))
                .await
                .unwrap()
        };
        let retriever = Retriever::checked(HashEmbedder::new(64), store).unwrap();
        Assistant::from_composer(Composer::new(retriever, completion, "model-a"))
    }

    #[tokio::test]
    async fn answer_carries_sources() {
        let a = assistant(
            &["بانک مرکزی ناظر است", "هیئت عالی رکن بانک است"],
            ScriptedCompletion::replying("طبق متن، بانک مرکزی ناظر است."),
        )
        .await;
        let turn = a.ask("ناظر کیست؟").await;
        assert_eq!(turn.role, Role::Assistant);
        assert_eq!(turn.content, "طبق متن، بانک مرکزی ناظر است.");
        assert_eq!(turn.sources, vec!["persian_law"]);
    }

    #[tokio::test]
    async fn fallback_has_no_sources() {
        let a = assistant(&[], ScriptedCompletion::replying("unused")).await;
        let turn = a.ask("سوال").await;
        assert_eq!(turn.content, NOT_FOUND_ANSWER);
        assert!(turn.sources.is_empty());
    }

    #[tokio::test]
    async fn quoted_not_found_reply_has_no_sources() {
        let a = assistant(&["ماده ۱"], ScriptedCompletion::replying(NOT_FOUND_ANSWER)).await;
        let turn = a.ask("مجازات چیست؟").await;
        assert_eq!(turn.content, NOT_FOUND_ANSWER);
        assert!(turn.sources.is_empty());

        let a = assistant(
            &["ماده ۱"],
            ScriptedCompletion::replying("با توجه به متن، «پاسخ این سوال در متن قانون یافت نشد.»"),
        )
        .await;
        assert!(a.ask("مجازات چیست؟").await.sources.is_empty());

        let answer = a.try_ask("مجازات چیست؟").await.unwrap();
        assert!(!answer.is_fallback());
        assert_eq!(answer.sources, vec!["persian_law"]);
    }

    #[tokio::test]
    async fn generation_failure_becomes_message() {
        let a = assistant(
            &["ماده ۱"],
            ScriptedCompletion::failing(CompletionError::ProviderError(
                503,
                "unavailable".to_string(),
            )),
        )
        .await;
        let turn = a.ask("ماده ۱").await;
        assert!(turn.content.starts_with("خطا در پردازش سوال: "));
        assert!(turn.content.contains("unavailable"));
        assert!(turn.sources.is_empty());

        assert!(matches!(a.try_ask("ماده ۱").await, Err(Error::Generation(_))));
    }

    #[tokio::test]
    async fn not_ready_answers_with_fixed_message() {
        let a: Assistant<HashEmbedder, PassageStore, ScriptedCompletion> =
            Assistant::not_ready("no passage store");
        assert!(!a.is_ready());
        assert_eq!(a.not_ready_reason(), Some("no passage store"));
        assert!(a.available_models().is_empty());

        let turn = a.ask("سوال").await;
        assert_eq!(turn.content, NOT_READY_MESSAGE);
        assert!(matches!(a.try_ask("سوال").await, Err(Error::NotInitialized(_))));
    }

    #[tokio::test]
    async fn open_without_store_is_not_ready() {
        let tmp = tempfile::tempdir().unwrap();
        let config = Config {
            store_dir: tmp.path().join("persian_law_db"),
            ..Config::default()
        };
        let err = Assistant::try_open(&config).await.err().unwrap();
        assert!(matches!(err, Error::NotInitialized(_)), "{err:?}");

        let a = Assistant::open(&config).await;
        assert!(!a.is_ready());
    }
}
