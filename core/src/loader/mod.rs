//! Corpus acquisition.
//!
//! A [`Loader`] produces the raw [`Document`]s the chunker consumes. The
//! builtin loaders read local files or text pasted on a terminal; remote
//! sources live in integration crates.

pub mod builtins;

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use thiserror::Error;
use tracing::info;

use crate::document::Document;

pub use builtins::file_loaders::FileLoader;
pub use builtins::manual_input::ManualInput;

#[derive(Debug, Error)]
pub enum LoaderError {
    #[error("Invalid glob-pattern")]
    InvalidGlobPattern(#[from] glob::PatternError),
    #[error("No matching documents found")]
    NoMatchingDocuments,
    #[error("Failed to read {path}: {message}")]
    Io { path: PathBuf, message: String },
    #[error("Failed to parse PDF {path}: {message}")]
    Pdf { path: PathBuf, message: String },
    #[error("Request failed: {0}")]
    Request(String),
    #[error("HTTP status {status} from {url}")]
    Http { status: u16, url: String },
    #[error("No substantial text found at {0}")]
    NoSubstantialText(String),
}

impl LoaderError {
    pub(crate) fn io(path: &Path, e: impl std::fmt::Display) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            message: e.to_string(),
        }
    }
}

/// Source of corpus documents.
#[async_trait]
pub trait Loader: Send + Sync {
    async fn load(&self) -> Result<Vec<Document>, LoaderError>;
}

/// Writes acquired corpus text as UTF-8, replacing any previous file.
///
/// # Errors
/// `Io` if the file cannot be written.
pub async fn save_corpus(path: impl AsRef<Path>, text: &str) -> Result<(), LoaderError> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| LoaderError::io(parent, e))?;
    }
    tokio::fs::write(path, text)
        .await
        .map_err(|e| LoaderError::io(path, e))?;
    info!(path = %path.display(), chars = text.chars().count(), "Saved corpus");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn save_corpus_writes_utf8() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("nested").join("persian_law.txt");
        save_corpus(&path, "ماده ۱ - قانون").await.unwrap();
        save_corpus(&path, "ماده ۲ - قانون جدید").await.unwrap();
        assert_eq!(
            tokio::fs::read_to_string(&path).await.unwrap(),
            "ماده ۲ - قانون جدید"
        );
    }
}
