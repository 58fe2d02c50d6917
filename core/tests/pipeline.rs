use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use async_trait::async_trait;
use qanun::{
    assistant::{Assistant, ConversationTurn, Role},
    chunker::{self, Chunker},
    completion::{CompletionError, CompletionModel, GenerationParams, Message, TokenUsage},
    composer::{Composer, NOT_FOUND_ANSWER},
    document::Document,
    embeddings::{EmbedderError, EmbeddingModel},
    index,
    retriever::Retriever,
    vector_store::{PassageStore, VectorStore},
};

/// Letter-frequency embedder: one bucket per Unicode scalar modulo `DIMS`.
struct CharEmbedder;

const DIMS: usize = 97;

#[async_trait]
impl EmbeddingModel for CharEmbedder {
    fn model_id(&self) -> &str {
        "char-embedder"
    }

    async fn embed(&self, data: &str) -> Result<Vec<f64>, EmbedderError> {
        let mut v = vec![0.0; DIMS];
        for c in data.chars().filter(|c| !c.is_whitespace()) {
            v[c as usize % DIMS] += 1.0;
        }
        Ok(v)
    }
}

/// Echoes the first line of the user turn and counts calls.
#[derive(Default)]
struct EchoCompletion {
    calls: AtomicUsize,
}

#[async_trait]
impl CompletionModel for EchoCompletion {
    async fn send(
        &self,
        _model: &str,
        messages: &[Message],
        _params: &GenerationParams,
    ) -> Result<(Message, TokenUsage), CompletionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let question = messages
            .last()
            .and_then(|m| m.content().lines().next())
            .unwrap_or_default();
        Ok((
            Message::Assistant(format!("پاسخ: {question}")),
            TokenUsage::default(),
        ))
    }

    async fn list_models(&self) -> Result<Vec<String>, CompletionError> {
        Ok(vec!["echo".to_string()])
    }
}

const CORPUS: &str = "ماده ۱ - بانک مرکزی جمهوری اسلامی ایران مسئول تنظیم سیاست پولی است.\n\n\
ماده ۲ - هیئت عالی بالاترین رکن سیاست‌گذاری بانک مرکزی است.\n\n\
ماده ۳ - نظارت بر بانک‌ها و موسسات اعتباری بر عهده بانک مرکزی است.\n\n\
ماده ۴ - تخلف از مقررات این قانون موجب جریمه نقدی می‌شود.";

#[tokio::test]
async fn short_corpus_is_one_passage_and_always_retrieved() {
    let passages = chunker::chunk(
        "ماده ۱ - تعاریف این قانون. ماده ۲ - دامنه شمول این قانون.",
        800,
        100,
    )
    .unwrap();
    assert_eq!(passages.len(), 1);

    let store = index::build(passages.clone(), &CharEmbedder).await.unwrap();
    let retriever = Retriever::checked(CharEmbedder, store).unwrap();
    for query in ["تعاریف", "something unrelated", "۲"] {
        let results = retriever.search(query, 1).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].passage, passages[0]);
    }
}

#[tokio::test]
async fn rebuilding_yields_identical_ordering() {
    let tmp = tempfile::tempdir().unwrap();
    let dir = tmp.path().join("persian_law_db");
    let chunker = Chunker::new(80, 20).unwrap();
    let documents = vec![Document::new("persian_law", CORPUS)];

    let mut orderings = Vec::new();
    for _ in 0..2 {
        let passages = chunker.chunk_documents(&documents).unwrap();
        index::build_and_persist(passages, &CharEmbedder, &dir)
            .await
            .unwrap();
        let store = PassageStore::open(&dir).await.unwrap();
        let retriever = Retriever::checked(CharEmbedder, store).unwrap();
        let ids: Vec<usize> = retriever
            .search("جریمه تخلف", 3)
            .await
            .unwrap()
            .iter()
            .map(|r| r.passage.id)
            .collect();
        orderings.push(ids);
    }
    assert_eq!(orderings[0], orderings[1]);
    assert_eq!(orderings[0].len(), 3);
}

#[tokio::test]
async fn empty_store_answers_with_fallback() {
    let completion = Arc::new(EchoCompletion::default());
    let retriever = Retriever::new(CharEmbedder, PassageStore::empty("char-embedder"));
    let composer = Composer::new(retriever, Arc::clone(&completion), "echo");
    let answer = composer.ask("مجازات چیست؟").await.unwrap();
    assert_eq!(answer.text, NOT_FOUND_ANSWER);
    assert!(answer.sources.is_empty());
    assert_eq!(completion.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn persisted_store_answers_with_deduplicated_sources() {
    let tmp = tempfile::tempdir().unwrap();
    let dir = tmp.path().join("persian_law_db");
    let passages = Chunker::new(80, 20)
        .unwrap()
        .chunk_documents(&[Document::new("persian_law", CORPUS)])
        .unwrap();
    assert!(passages.len() >= 3);
    index::build_and_persist(passages, &CharEmbedder, &dir)
        .await
        .unwrap();

    let store = PassageStore::open(&dir).await.unwrap();
    assert_eq!(store.embedding_model(), "char-embedder");
    let retriever = Retriever::checked(CharEmbedder, store).unwrap();
    let assistant = Assistant::from_composer(Composer::new(
        retriever,
        EchoCompletion::default(),
        "echo",
    ));

    let turn: ConversationTurn = assistant.ask("نظارت بر بانک‌ها").await;
    assert_eq!(turn.role, Role::Assistant);
    assert_eq!(turn.content, "پاسخ: نظارت بر بانک‌ها");
    assert_eq!(turn.sources, vec!["persian_law".to_string()]);
}
