use std::path::{Path, PathBuf};

use glob::glob;
use tracing::warn;
use walkdir::WalkDir;

use crate::loader::LoaderError;

/// Expands glob patterns to files, walking matched directories recursively.
/// The result is sorted and free of duplicates.
pub(super) fn resolve_input_to_files(inputs: &[String]) -> Result<Vec<PathBuf>, LoaderError> {
    let mut files = Vec::new();

    for input in inputs {
        for entry in glob(input)? {
            match entry {
                Ok(path) => {
                    if path.is_dir() {
                        for entry in WalkDir::new(&path) {
                            let entry = entry.map_err(|e| LoaderError::io(&path, e))?;
                            if entry.file_type().is_file() {
                                files.push(entry.path().to_path_buf());
                            }
                        }
                    } else if path.is_file() {
                        files.push(path);
                    }
                }
                Err(e) => warn!(pattern = %input, error = %e, "Glob error"),
            }
        }
    }

    files.sort();
    files.dedup();
    Ok(files)
}

/// Reads a file as text; `.pdf` files go through the PDF extractor.
pub(super) fn parse_file(file_path: &Path) -> Result<String, LoaderError> {
    let is_pdf = file_path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"));
    if is_pdf {
        return parse_pdf(file_path);
    }
    std::fs::read_to_string(file_path).map_err(|e| LoaderError::io(file_path, e))
}

#[cfg(feature = "pdf")]
fn parse_pdf(file_path: &Path) -> Result<String, LoaderError> {
    pdf_extract::extract_text(file_path).map_err(|e| LoaderError::Pdf {
        path: file_path.to_path_buf(),
        message: e.to_string(),
    })
}

#[cfg(not(feature = "pdf"))]
fn parse_pdf(file_path: &Path) -> Result<String, LoaderError> {
    Err(LoaderError::Pdf {
        path: file_path.to_path_buf(),
        message: "built without the `pdf` feature".to_string(),
    })
}

/// Document id for a file: its stem, or the whole path if it has none.
pub(super) fn document_id(file_path: &Path) -> String {
    file_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| file_path.display().to_string())
}
