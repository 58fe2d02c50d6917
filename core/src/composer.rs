use std::collections::BTreeSet;

use tracing::{error, info, instrument};

use crate::{
    completion::{CompletionError, CompletionModel, GenerationParams, Message, ModelSelector, TokenUsage},
    embeddings::EmbeddingModel,
    retriever::{RetrievalResult, Retriever},
    vector_store::VectorStore,
};

/// Passages retrieved per question unless configured otherwise.
pub const DEFAULT_TOP_K: usize = 3;

/// Returned verbatim when nothing relevant was retrieved.
pub const NOT_FOUND_ANSWER: &str = "پاسخ این سوال در متن قانون یافت نشد.";

/// System instruction constraining answers to the retrieved legal text.
pub const SYSTEM_PROMPT: &str = "شما یک دستیار حقوقی هستید که فقط بر اساس متن قانونی ارائه‌شده پاسخ می‌دهید.
قواعد:
۱. فقط از اطلاعات موجود در بخش <context> استفاده کنید و چیزی از خودتان اضافه نکنید.
۲. پاسخ را به زبان فارسی و روشن بنویسید.
۳. اگر پاسخ در متن ارائه‌شده وجود ندارد یا کافی نیست، صریحاً بنویسید: «پاسخ این سوال در متن قانون یافت نشد.»
۴. در صورت وجود، شماره ماده، تبصره یا بند مربوط را ذکر کنید.";

/// An answer together with the sources it was grounded on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Answer {
    pub text: String,
    /// Distinct `source_tag`s of the retrieved passages, sorted
    pub sources: Vec<String>,
    /// Completion model that produced the text, `None` for the fallback answer
    pub model: Option<String>,
    pub usage: TokenUsage,
}

impl Answer {
    fn not_found(text: &str) -> Self {
        Self {
            text: text.to_string(),
            sources: Vec::new(),
            model: None,
            usage: TokenUsage::default(),
        }
    }

    /// True when no context was found and the fixed answer was returned.
    #[must_use]
    pub fn is_fallback(&self) -> bool {
        self.model.is_none()
    }
}

/// Builds grounded prompts from retrieved passages and asks the completion
/// service for an answer.
///
/// All collaborators are injected; the composer holds no mutable state, so
/// one instance can serve concurrent questions.
pub struct Composer<E, V, C> {
    retriever: Retriever<E, V>,
    completion_model: C,
    model: String,
    catalog: Vec<String>,
    params: GenerationParams,
    top_k: usize,
    system_prompt: String,
    not_found_answer: String,
}

impl<E, V, C> Composer<E, V, C>
where
    E: EmbeddingModel,
    V: VectorStore,
    C: CompletionModel,
{
    /// Creates a composer that always uses `model`.
    pub fn new(retriever: Retriever<E, V>, completion_model: C, model: impl Into<String>) -> Self {
        Self {
            retriever,
            completion_model,
            model: model.into(),
            catalog: Vec::new(),
            params: GenerationParams::default(),
            top_k: DEFAULT_TOP_K,
            system_prompt: SYSTEM_PROMPT.to_string(),
            not_found_answer: NOT_FOUND_ANSWER.to_string(),
        }
    }

    /// Creates a composer whose model is chosen from the service catalog.
    pub async fn with_selector(
        retriever: Retriever<E, V>,
        completion_model: C,
        selector: &ModelSelector,
    ) -> Self {
        let choice = selector.resolve(&completion_model).await;
        let mut composer = Self::new(retriever, completion_model, choice.model);
        composer.catalog = choice.catalog;
        composer
    }

    #[must_use]
    pub fn with_params(mut self, params: GenerationParams) -> Self {
        self.params = params;
        self
    }

    #[must_use]
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    #[must_use]
    pub fn with_system_prompt(mut self, system_prompt: impl Into<String>) -> Self {
        self.system_prompt = system_prompt.into();
        self
    }

    #[must_use]
    pub fn with_not_found_answer(mut self, answer: impl Into<String>) -> Self {
        self.not_found_answer = answer.into();
        self
    }

    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Models the completion service offered when the composer was built.
    #[must_use]
    pub fn available_models(&self) -> &[String] {
        &self.catalog
    }

    #[must_use]
    pub fn not_found_answer(&self) -> &str {
        &self.not_found_answer
    }

    /// True when `text` carries the not-found answer, whether it is the
    /// fallback itself or the model quoting it.
    #[must_use]
    pub fn says_not_found(&self, text: &str) -> bool {
        let phrase = self
            .not_found_answer
            .trim_matches(|c: char| c.is_whitespace() || matches!(c, '«' | '»' | '.'));
        !phrase.is_empty() && text.contains(phrase)
    }

    pub fn retriever(&self) -> &Retriever<E, V> {
        &self.retriever
    }

    /// Retrieves context for `question` and answers from it.
    ///
    /// # Errors
    /// Retrieval failures and [`CompletionError`]s, converted to [`crate::error::Error`].
    pub async fn ask(&self, question: &str) -> Result<Answer, crate::error::Error> {
        let retrieved = self.retriever.search(question, self.top_k).await?;
        Ok(self.answer(question, &retrieved).await?)
    }

    /// Answers `question` from `retrieved`.
    ///
    /// With nothing retrieved the fixed not-found answer is returned without
    /// calling the completion service.
    ///
    /// # Errors
    /// The completion service's error, unretried.
    #[instrument(skip(self, question, retrieved), fields(passages = retrieved.len(), model = %self.model))]
    pub async fn answer(
        &self,
        question: &str,
        retrieved: &RetrievalResult,
    ) -> Result<Answer, CompletionError> {
        if retrieved.is_empty() {
            info!("No context retrieved, returning fallback answer");
            return Ok(Answer::not_found(&self.not_found_answer));
        }

        let messages = self.build_messages(question, retrieved);
        let (reply, usage) = self
            .completion_model
            .send(&self.model, &messages, &self.params)
            .await
            .map_err(|e| {
                error!(error = %e, "Completion request failed");
                e
            })?;

        let text = reply.content().trim().to_string();
        if text.is_empty() {
            return Err(CompletionError::ParseError(
                "Completion service returned an empty answer".to_string(),
            ));
        }

        Ok(Answer {
            text,
            sources: collect_sources(retrieved),
            model: Some(self.model.clone()),
            usage,
        })
    }

    /// The system instruction followed by a single user turn carrying the
    /// question and the retrieved context.
    #[must_use]
    pub fn build_messages(&self, question: &str, retrieved: &RetrievalResult) -> Vec<Message> {
        let context = context_block(retrieved);
        vec![
            Message::Preamble(self.system_prompt.clone()),
            Message::User(format!(
                "{}\n\n<context>\n{context}\n</context>\n",
                question.trim()
            )),
        ]
    }
}

/// Passage texts in retrieval order, separated by blank lines.
#[must_use]
pub fn context_block(retrieved: &RetrievalResult) -> String {
    retrieved
        .iter()
        .map(|r| r.passage.text.as_str())
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Distinct source tags, sorted so the same retrieval always yields the same list.
#[must_use]
pub fn collect_sources(retrieved: &RetrievalResult) -> Vec<String> {
    retrieved
        .iter()
        .map(|r| r.passage.source_tag.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Passage;
    use crate::index;
    use crate::test_utils::{passages, HashEmbedder, ScriptedCompletion};
    use crate::vector_store::{PassageStore, ScoredPassage};

    fn scored(id: usize, text: &str, tag: &str, score: f64) -> ScoredPassage {
        ScoredPassage {
            passage: Passage {
                id,
                text: text.to_string(),
                source_tag: tag.to_string(),
            },
            score,
        }
    }

    fn composer(reply: ScriptedCompletion) -> Composer<HashEmbedder, PassageStore, ScriptedCompletion> {
        let retriever = Retriever::new(HashEmbedder::new(8), PassageStore::empty("hash-embedder"));
        Composer::new(retriever, reply, "model-a")
    }

    #[test]
    fn not_found_phrase_is_recognized_inside_replies() {
        let c = composer(ScriptedCompletion::replying("unused"));
        assert!(c.says_not_found(NOT_FOUND_ANSWER));
        assert!(c.says_not_found("«پاسخ این سوال در متن قانون یافت نشد.»"));
        assert!(!c.says_not_found("طبق ماده ۵ جریمه نقدی است."));

        let c = c.with_not_found_answer("«چیزی یافت نشد»");
        assert!(c.says_not_found("متاسفانه چیزی یافت نشد."));
        assert!(!c.says_not_found(NOT_FOUND_ANSWER));
    }

    #[tokio::test]
    async fn empty_retrieval_returns_fallback_without_calling_service() {
        let c = composer(ScriptedCompletion::replying("should not be used"));
        let answer = c.answer("غیرمرتبط", &vec![]).await.unwrap();
        assert_eq!(answer.text, NOT_FOUND_ANSWER);
        assert!(answer.sources.is_empty());
        assert!(answer.is_fallback());
        assert_eq!(c.completion_model.request_count(), 0);
    }

    #[tokio::test]
    async fn ask_against_empty_store_is_fallback() {
        let c = composer(ScriptedCompletion::replying("x"));
        let answer = c.ask("غیرمرتبط").await.unwrap();
        assert_eq!(answer.text, NOT_FOUND_ANSWER);
        assert_eq!(answer.sources, Vec::<String>::new());
    }

    #[tokio::test]
    async fn sources_are_deduplicated() {
        let c = composer(ScriptedCompletion::replying("طبق ماده ۱ ..."));
        let retrieved = vec![
            scored(0, "ماده ۱", "persian_law", 0.9),
            scored(1, "ماده ۲", "persian_law", 0.8),
            scored(2, "ماده ۳", "persian_law", 0.7),
        ];
        let answer = c.answer("سوال", &retrieved).await.unwrap();
        assert_eq!(answer.sources, vec!["persian_law".to_string()]);
        assert!(!answer.is_fallback());
        assert_eq!(answer.model.as_deref(), Some("model-a"));
    }

    #[tokio::test]
    async fn sources_do_not_depend_on_retrieval_order() {
        let c = composer(ScriptedCompletion::replying("پاسخ"));
        let a = vec![scored(0, "x", "law_b", 0.9), scored(1, "y", "law_a", 0.8)];
        let b = vec![scored(1, "y", "law_a", 0.9), scored(0, "x", "law_b", 0.8)];
        assert_eq!(
            c.answer("q", &a).await.unwrap().sources,
            c.answer("q", &b).await.unwrap().sources
        );
    }

    #[test]
    fn prompt_carries_instruction_question_and_context_in_order() {
        let c = composer(ScriptedCompletion::replying(""));
        let retrieved = vec![
            scored(4, "متن دوم", "persian_law", 0.9),
            scored(1, "متن اول", "persian_law", 0.5),
        ];
        let messages = c.build_messages("  مجازات چیست؟ ", &retrieved);
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0], Message::Preamble(SYSTEM_PROMPT.to_string()));
        let Message::User(user) = &messages[1] else {
            panic!("expected a user turn");
        };
        assert!(user.starts_with("مجازات چیست؟"));
        let first = user.find("متن دوم").unwrap();
        let second = user.find("متن اول").unwrap();
        assert!(first < second);
        assert!(user.contains("<context>"));
    }

    #[tokio::test]
    async fn generation_error_is_returned_once() {
        let c = composer(ScriptedCompletion::failing(CompletionError::ProviderError(
            401,
            "invalid api key".to_string(),
        )));
        let err = c
            .answer("q", &vec![scored(0, "x", "persian_law", 1.0)])
            .await
            .unwrap_err();
        assert_eq!(err, CompletionError::ProviderError(401, "invalid api key".to_string()));
        assert_eq!(c.completion_model.request_count(), 1);
    }

    #[tokio::test]
    async fn blank_reply_is_an_error() {
        let c = composer(ScriptedCompletion::replying("   "));
        let err = c
            .answer("q", &vec![scored(0, "x", "persian_law", 1.0)])
            .await
            .unwrap_err();
        assert!(matches!(err, CompletionError::ParseError(_)));
    }

    #[tokio::test]
    async fn ask_retrieves_then_generates_with_selected_model() {
        let store = index::build(
            passages(&["ماده ۱ بانک مرکزی مستقل است", "ماده ۲ مجازات تخلف جریمه است"]),
            &HashEmbedder::new(256),
        )
        .await
        .unwrap();
        let retriever = Retriever::checked(HashEmbedder::new(256), store).unwrap();
        let selector = ModelSelector::new(vec!["model-b".to_string()], "default");
        let c = Composer::with_selector(retriever, ScriptedCompletion::replying("طبق ماده ۲"), &selector)
            .await
            .with_top_k(1);

        assert_eq!(c.model(), "model-b");
        assert_eq!(c.available_models().len(), 2);

        let answer = c.ask("مجازات تخلف چیست").await.unwrap();
        assert_eq!(answer.text, "طبق ماده ۲");
        assert_eq!(answer.sources, vec!["persian_law".to_string()]);

        let requests = c.completion_model.requests.lock().unwrap();
        let (model, messages) = &requests[0];
        assert_eq!(model, "model-b");
        assert!(messages[1].content().contains("مجازات تخلف جریمه"));
        assert!(!messages[1].content().contains("مستقل"));
    }
}
