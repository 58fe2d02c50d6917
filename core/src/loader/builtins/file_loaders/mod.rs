//! Module for loading corpus documents from files.

mod utils;

use std::path::PathBuf;

use async_trait::async_trait;
use glob::Pattern;
use tracing::{info, instrument};

use crate::{
    document::Document,
    loader::{Loader, LoaderError},
};
use utils::{document_id, parse_file, resolve_input_to_files};

/// Loads one [`Document`] per file matched by a set of glob patterns.
///
/// Matched directories are walked recursively. PDF files are parsed when
/// the crate is built with the `pdf` feature; everything else is read as
/// UTF-8 text. The document id is the file stem, so `persian_law.txt`
/// yields passages tagged `persian_law`.
#[derive(Debug, Clone)]
pub struct FileLoader {
    glob_patterns: Vec<String>,
}

impl FileLoader {
    /// # Errors
    /// `InvalidGlobPattern` if any pattern does not parse.
    pub fn new(glob_patterns: Vec<String>) -> Result<Self, LoaderError> {
        for p in &glob_patterns {
            Pattern::new(p)?;
        }
        Ok(Self { glob_patterns })
    }

    pub fn patterns(&self) -> &[String] {
        &self.glob_patterns
    }
}

#[async_trait]
impl Loader for FileLoader {
    #[instrument(skip(self), fields(patterns = ?self.glob_patterns))]
    async fn load(&self) -> Result<Vec<Document>, LoaderError> {
        let patterns = self.glob_patterns.clone();
        let documents = tokio::task::spawn_blocking(move || {
            let files = resolve_input_to_files(&patterns)?;
            files
                .iter()
                .map(|path| Ok(Document::new(document_id(path), parse_file(path)?)))
                .collect::<Result<Vec<_>, LoaderError>>()
        })
        .await
        .map_err(|e| LoaderError::Io {
            path: PathBuf::new(),
            message: format!("file loading task failed: {e}"),
        })??;

        if documents.is_empty() {
            return Err(LoaderError::NoMatchingDocuments);
        }
        info!(count = documents.len(), "Loaded documents");
        Ok(documents)
    }
}
