pub use crate::{
    assistant::{Assistant, ConversationTurn, Role},
    chunker::Chunker,
    completion::{CompletionModel, GenerationParams, Message, ModelSelector},
    composer::{Answer, Composer},
    config::Config,
    document::{Document, Passage},
    embeddings::EmbeddingModel,
    error::Error,
    index,
    loader::{save_corpus, FileLoader, Loader, ManualInput},
    providers::{completions::OpenAI, embeddings::OpenAI as OpenAIEmbedding},
    retriever::Retriever,
    vector_store::{PassageStore, VectorStore},
};
