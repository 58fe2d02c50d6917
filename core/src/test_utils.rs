//! Fakes shared by the unit tests.

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Mutex,
};

use async_trait::async_trait;

use crate::{
    completion::{CompletionError, CompletionModel, GenerationParams, Message, TokenUsage},
    document::Passage,
    embeddings::{EmbedderError, EmbeddingModel},
};

pub(crate) fn passages(texts: &[&str]) -> Vec<Passage> {
    texts
        .iter()
        .enumerate()
        .map(|(id, text)| Passage {
            id,
            text: (*text).to_string(),
            source_tag: "persian_law".to_string(),
        })
        .collect()
}

/// Deterministic bag-of-words embedder: each whitespace token bumps one of
/// `dims` buckets chosen by an FNV-1a hash.
pub(crate) struct HashEmbedder {
    dims: usize,
    calls: AtomicUsize,
}

impl HashEmbedder {
    pub(crate) fn new(dims: usize) -> Self {
        Self {
            dims,
            calls: AtomicUsize::new(0),
        }
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EmbeddingModel for HashEmbedder {
    fn model_id(&self) -> &str {
        "hash-embedder"
    }

    async fn embed(&self, data: &str) -> Result<Vec<f64>, EmbedderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut v = vec![0.0; self.dims];
        for token in data.split_whitespace() {
            let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
            for b in token.bytes() {
                hash ^= u64::from(b);
                hash = hash.wrapping_mul(0x0100_0000_01b3);
            }
            v[(hash % self.dims as u64) as usize] += 1.0;
        }
        Ok(v)
    }
}

/// Succeeds `ok_calls` times, then fails every call.
pub(crate) struct FailingEmbedder {
    ok_calls: usize,
    calls: AtomicUsize,
}

impl FailingEmbedder {
    pub(crate) fn after(ok_calls: usize) -> Self {
        Self {
            ok_calls,
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl EmbeddingModel for FailingEmbedder {
    fn model_id(&self) -> &str {
        "failing-embedder"
    }

    async fn embed(&self, _data: &str) -> Result<Vec<f64>, EmbedderError> {
        if self.calls.fetch_add(1, Ordering::SeqCst) < self.ok_calls {
            Ok(vec![1.0, 0.0])
        } else {
            Err(EmbedderError::RequestError("connection refused".to_string()))
        }
    }
}

/// Returns two dimensions on the first call and one afterwards.
pub(crate) struct ShrinkingEmbedder;

#[async_trait]
impl EmbeddingModel for ShrinkingEmbedder {
    fn model_id(&self) -> &str {
        "shrinking-embedder"
    }

    async fn embed(&self, data: &str) -> Result<Vec<f64>, EmbedderError> {
        if data == "a" {
            Ok(vec![1.0, 1.0])
        } else {
            Ok(vec![1.0])
        }
    }
}

/// Completion model that replays a canned reply and records requests.
pub(crate) struct ScriptedCompletion {
    reply: Result<String, CompletionError>,
    catalog: Result<Vec<String>, CompletionError>,
    pub(crate) requests: Mutex<Vec<(String, Vec<Message>)>>,
}

impl ScriptedCompletion {
    pub(crate) fn replying(reply: &str) -> Self {
        Self {
            reply: Ok(reply.to_string()),
            catalog: Ok(vec!["model-a".to_string(), "model-b".to_string()]),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn failing(error: CompletionError) -> Self {
        Self {
            reply: Err(error),
            ..Self::replying("")
        }
    }

    pub(crate) fn with_catalog(mut self, catalog: Result<Vec<String>, CompletionError>) -> Self {
        self.catalog = catalog;
        self
    }

    pub(crate) fn request_count(&self) -> usize {
        self.requests.lock().map(|r| r.len()).unwrap_or(0)
    }
}

#[async_trait]
impl CompletionModel for ScriptedCompletion {
    async fn send(
        &self,
        model: &str,
        messages: &[Message],
        _params: &GenerationParams,
    ) -> Result<(Message, TokenUsage), CompletionError> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push((model.to_string(), messages.to_vec()));
        }
        let content = self.reply.clone()?;
        Ok((Message::Assistant(content), TokenUsage::default()))
    }

    async fn list_models(&self) -> Result<Vec<String>, CompletionError> {
        self.catalog.clone()
    }
}
