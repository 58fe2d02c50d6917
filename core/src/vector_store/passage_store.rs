use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use super::{cosine_similarity, ScoredPassage, VectorStore, VectorStoreError};
use crate::document::Passage;

const MANIFEST_FILE: &str = "manifest.json";
const PASSAGES_FILE: &str = "passages.json";

/// Describes a persisted store: which embedder built it and what it holds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreManifest {
    pub embedding_model: String,
    pub dimensions: usize,
    pub passage_count: usize,
    pub built_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct StoredPassage {
    passage: Passage,
    vector: Vec<f64>,
}

/// Flat passage store: every passage with exactly one vector, searched by
/// exhaustive cosine similarity.
///
/// Stores are produced by [`PassageStoreBuilder`] (or [`PassageStore::open`])
/// and never mutated afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct PassageStore {
    manifest: StoreManifest,
    entries: Vec<StoredPassage>,
}

/// Append-only builder used while indexing.
#[derive(Debug)]
pub struct PassageStoreBuilder {
    embedding_model: String,
    dimensions: Option<usize>,
    entries: Vec<StoredPassage>,
}

impl PassageStoreBuilder {
    pub fn new(embedding_model: impl Into<String>) -> Self {
        Self {
            embedding_model: embedding_model.into(),
            dimensions: None,
            entries: Vec::new(),
        }
    }

    /// Appends a passage. The first vector fixes the store dimension.
    ///
    /// # Errors
    /// `DimensionMismatch` if `vector` is empty or differs in length from the
    /// vectors already pushed.
    pub fn push(&mut self, passage: Passage, vector: Vec<f64>) -> Result<(), VectorStoreError> {
        if vector.is_empty() {
            return Err(VectorStoreError::DimensionMismatch {
                expected: self.dimensions.unwrap_or(0),
                got: 0,
            });
        }
        let expected = *self.dimensions.get_or_insert(vector.len());
        if vector.len() != expected {
            return Err(VectorStoreError::DimensionMismatch {
                expected,
                got: vector.len(),
            });
        }
        self.entries.push(StoredPassage { passage, vector });
        Ok(())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn finish(self) -> PassageStore {
        PassageStore {
            manifest: StoreManifest {
                embedding_model: self.embedding_model,
                dimensions: self.dimensions.unwrap_or(0),
                passage_count: self.entries.len(),
                built_at: Utc::now(),
            },
            entries: self.entries,
        }
    }
}

impl PassageStore {
    /// A store with no passages; every search against it is empty.
    pub fn empty(embedding_model: impl Into<String>) -> Self {
        PassageStoreBuilder::new(embedding_model).finish()
    }

    #[must_use]
    pub fn manifest(&self) -> &StoreManifest {
        &self.manifest
    }

    pub fn passages(&self) -> impl Iterator<Item = &Passage> {
        self.entries.iter().map(|e| &e.passage)
    }

    /// Opens a store previously written with [`PassageStore::save`].
    ///
    /// If `dir` is missing but a save was interrupted after parking the
    /// previous store at `<dir>.old`, that copy is opened instead.
    ///
    /// # Errors
    /// `NotInitialized` if neither location holds a store, `Corrupt` if the
    /// manifest and the passages disagree, `Io`/`Serde` on read or decode
    /// failures.
    #[instrument(skip_all, fields(dir = %dir.as_ref().display()))]
    pub async fn open(dir: impl AsRef<Path>) -> Result<Self, VectorStoreError> {
        let dir = dir.as_ref();
        if has_manifest(dir).await? {
            return Self::read(dir).await;
        }
        let retired = sibling(dir, "old");
        if !path_exists(dir).await? && has_manifest(&retired).await? {
            warn!(retired = %retired.display(), "Store missing, opening copy left by an interrupted save");
            return Self::read(&retired).await;
        }
        Err(VectorStoreError::NotInitialized(dir.to_path_buf()))
    }

    async fn read(dir: &Path) -> Result<Self, VectorStoreError> {
        let manifest: StoreManifest = read_json(&dir.join(MANIFEST_FILE)).await?;
        let entries: Vec<StoredPassage> = read_json(&dir.join(PASSAGES_FILE)).await?;

        if entries.len() != manifest.passage_count {
            return Err(VectorStoreError::Corrupt(format!(
                "manifest lists {} passages, found {}",
                manifest.passage_count,
                entries.len()
            )));
        }
        if let Some(bad) = entries
            .iter()
            .find(|e| e.vector.len() != manifest.dimensions)
        {
            return Err(VectorStoreError::Corrupt(format!(
                "passage {} has {} dimensions, manifest says {}",
                bad.passage.id,
                bad.vector.len(),
                manifest.dimensions
            )));
        }

        info!(
            passages = manifest.passage_count,
            dimensions = manifest.dimensions,
            model = %manifest.embedding_model,
            "Opened passage store"
        );
        Ok(Self { manifest, entries })
    }

    /// Writes the store to `dir`, replacing whatever store was there.
    ///
    /// Files are written to a sibling staging directory first and swapped in
    /// with renames, so readers never observe a half written store.
    ///
    /// # Errors
    /// `Io`/`Serde` on write or encode failures.
    #[instrument(skip_all, fields(dir = %dir.as_ref().display(), passages = self.entries.len()))]
    pub async fn save(&self, dir: impl AsRef<Path>) -> Result<(), VectorStoreError> {
        let dir = dir.as_ref();
        let staging = sibling(dir, "tmp");
        let retired = sibling(dir, "old");

        remove_dir_if_exists(&staging).await?;
        tokio::fs::create_dir_all(&staging)
            .await
            .map_err(|e| io_error(&staging, &e))?;
        write_json(&staging.join(PASSAGES_FILE), &self.entries).await?;
        write_json(&staging.join(MANIFEST_FILE), &self.manifest).await?;

        // With `dir` gone, `<dir>.old` may be the only copy until the swap.
        if path_exists(dir).await? {
            remove_dir_if_exists(&retired).await?;
            tokio::fs::rename(dir, &retired)
                .await
                .map_err(|e| io_error(dir, &e))?;
        }
        tokio::fs::rename(&staging, dir)
            .await
            .map_err(|e| io_error(&staging, &e))?;
        remove_dir_if_exists(&retired).await?;

        debug!("Passage store written");
        Ok(())
    }
}

#[async_trait]
impl VectorStore for PassageStore {
    fn embedding_model(&self) -> &str {
        &self.manifest.embedding_model
    }

    fn dimensions(&self) -> usize {
        self.manifest.dimensions
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    async fn get_by_id(&self, id: usize) -> Result<Option<Passage>, VectorStoreError> {
        Ok(self
            .entries
            .iter()
            .find(|e| e.passage.id == id)
            .map(|e| e.passage.clone()))
    }

    async fn top_n(&self, query: &[f64], n: usize) -> Result<Vec<ScoredPassage>, VectorStoreError> {
        if n == 0 || self.entries.is_empty() {
            return Ok(Vec::new());
        }
        if query.len() != self.manifest.dimensions {
            return Err(VectorStoreError::DimensionMismatch {
                expected: self.manifest.dimensions,
                got: query.len(),
            });
        }

        let mut results = self
            .entries
            .iter()
            .map(|e| (cosine_similarity(query, &e.vector), &e.passage))
            .collect::<Vec<_>>();
        results.sort_by(|a, b| b.0.total_cmp(&a.0).then(a.1.id.cmp(&b.1.id)));
        results.truncate(n);

        Ok(results
            .into_iter()
            .map(|(score, passage)| ScoredPassage {
                passage: passage.clone(),
                score,
            })
            .collect())
    }
}

fn sibling(dir: &Path, suffix: &str) -> PathBuf {
    let mut name = dir.file_name().unwrap_or_default().to_os_string();
    name.push(format!(".{suffix}"));
    dir.with_file_name(name)
}

async fn path_exists(path: &Path) -> Result<bool, VectorStoreError> {
    tokio::fs::try_exists(path)
        .await
        .map_err(|e| io_error(path, &e))
}

async fn has_manifest(dir: &Path) -> Result<bool, VectorStoreError> {
    path_exists(&dir.join(MANIFEST_FILE)).await
}

fn io_error(path: &Path, e: &std::io::Error) -> VectorStoreError {
    VectorStoreError::Io {
        path: path.to_path_buf(),
        message: e.to_string(),
    }
}

async fn remove_dir_if_exists(dir: &Path) -> Result<(), VectorStoreError> {
    match tokio::fs::remove_dir_all(dir).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(io_error(dir, &e)),
    }
}

async fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, VectorStoreError> {
    let bytes = tokio::fs::read(path).await.map_err(|e| io_error(path, &e))?;
    serde_json::from_slice(&bytes)
        .map_err(|e| VectorStoreError::Serde(format!("{}: {e}", path.display())))
}

async fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), VectorStoreError> {
    let json = serde_json::to_vec(value).map_err(|e| VectorStoreError::Serde(e.to_string()))?;
    tokio::fs::write(path, json)
        .await
        .map_err(|e| io_error(path, &e))
}
