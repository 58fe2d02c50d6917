use std::io::BufRead;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::{
    document::Document,
    loader::{Loader, LoaderError},
};

const BLANK_LINES_TO_FINISH: usize = 2;

/// Collects corpus text pasted line by line.
///
/// Input ends at two consecutive blank lines or end of input. Blank lines are
/// dropped, non-blank lines are kept verbatim and joined with `\n`.
pub struct ManualInput<R> {
    reader: Mutex<R>,
    document_id: String,
}

impl<R: BufRead> ManualInput<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader: Mutex::new(reader),
            document_id: crate::chunker::DEFAULT_SOURCE_TAG.to_string(),
        }
    }

    /// Id given to the document produced by [`Loader::load`].
    #[must_use]
    pub fn with_document_id(mut self, id: impl Into<String>) -> Self {
        self.document_id = id.into();
        self
    }

    /// Reads until the terminator. `None` if nothing but whitespace was entered.
    ///
    /// # Errors
    /// `Io` if the reader fails.
    pub fn read_text(&mut self) -> Result<Option<String>, LoaderError> {
        collect_lines(self.reader.get_mut())
    }
}

fn collect_lines<R: BufRead>(reader: &mut R) -> Result<Option<String>, LoaderError> {
    let mut lines = Vec::new();
    let mut blank_run = 0;
    let mut buf = String::new();

    loop {
        buf.clear();
        let read = reader
            .read_line(&mut buf)
            .map_err(|e| LoaderError::io(std::path::Path::new("<input>"), e))?;
        if read == 0 {
            debug!("End of input");
            break;
        }
        let line = buf.trim_end_matches(['\n', '\r']);
        if line.trim().is_empty() {
            blank_run += 1;
            if blank_run >= BLANK_LINES_TO_FINISH {
                break;
            }
        } else {
            blank_run = 0;
            lines.push(line.to_string());
        }
    }

    let text = lines.join("\n");
    if text.trim().is_empty() {
        return Ok(None);
    }
    info!(lines = lines.len(), chars = text.chars().count(), "Received text");
    Ok(Some(text))
}

#[async_trait]
impl<R: BufRead + Send + Sync> Loader for ManualInput<R> {
    async fn load(&self) -> Result<Vec<Document>, LoaderError> {
        let mut reader = self.reader.lock().await;
        match collect_lines(&mut *reader)? {
            Some(text) => Ok(vec![Document::new(self.document_id.clone(), text)]),
            None => Err(LoaderError::NoMatchingDocuments),
        }
    }
}
