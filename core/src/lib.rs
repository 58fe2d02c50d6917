//! # Qanun - Core API Documentation
//!
//! Qanun answers questions about a corpus of Persian legal text using only
//! that text. Answers are grounded in retrieved passages and carry the tags of
//! the sources they came from; when nothing relevant is found the assistant
//! says so instead of guessing.
//!
//! ## Pipeline
//!
//! - **Loaders**: corpus acquisition from files, pasted text or (through the
//!   `qanun_webscraper` integration) web pages
//! - **Chunker**: splits the corpus into overlapping passages, preferring
//!   paragraph and sentence boundaries
//! - **Indexer**: embeds every passage and persists the result as a passage
//!   store directory
//! - **Retriever**: top-k cosine similarity search over the store
//! - **Composer**: builds the grounded prompt, calls the completion service and
//!   reports sources
//! - **Assistant**: the boundary front ends talk to; turns every question into
//!   a displayable [`assistant::ConversationTurn`]
//!
//! ## Examples
//!
//! The `core/examples` directory has runnable front ends for building the
//! knowledge base and chatting with it.
//!
//! ### Building the knowledge base
//!
//! ```rust,no_run
//! use qanun::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Error> {
//!     let config = Config::load_or_default("qanun.json")?;
//!     let documents = FileLoader::new(vec![config.corpus_path.display().to_string()])?
//!         .load()
//!         .await?;
//!
//!     let passages = Chunker::new(config.chunk_size, config.chunk_overlap)?
//!         .chunk_documents(&documents)?;
//!     let embedder = OpenAIEmbedding::from_config(&config.embedding)?;
//!     index::build_and_persist(passages, &embedder, &config.store_dir).await?;
//!     Ok(())
//! }
//! ```
//!
//! ### Asking questions
//!
//! ```rust,no_run
//! use qanun::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Error> {
//!     let config = Config::load_or_default("qanun.json")?;
//!     let assistant = Assistant::open(&config).await;
//!
//!     let turn = assistant.ask("مجازات تخلفات بانکی چیست؟").await;
//!     println!("{}", turn.content);
//!     if !turn.sources.is_empty() {
//!         println!("منابع: {}", turn.sources.join(", "));
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Feature flags
//!
//! Name | Description | Default?
//! ---|---|---
//! `pdf` | enables the file loader to parse PDFs | No

/// Query boundary for front ends
pub mod assistant;

/// Recursive splitting of corpus text into overlapping passages
pub mod chunker;

/// Language model completion
///
/// Contains:
/// - The completion capability trait
/// - Generation parameters
/// - Model selection against the service catalog
pub mod completion;

/// Grounded prompt construction and answer composition
pub mod composer;

/// JSON configuration
pub mod config;

/// Raw documents and the passages cut from them
pub mod document;

/// Text embeddings support
pub mod embeddings;

/// Error types for all library operations
pub mod error;

/// Offline index construction
pub mod index;

/// Corpus acquisition
pub mod loader;

/// Convenience prelude exports
pub mod prelude;

/// Builtin completion and embedding model providers
pub mod providers;

/// Top-k similarity search
pub mod retriever;

/// Vector storage and retrieval
pub mod vector_store;

#[cfg(test)]
mod test_utils;
