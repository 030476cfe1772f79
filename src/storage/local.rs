//! Local filesystem storage implementation.
//!
//! Checkpoints are single JSON files overwritten atomically. Documents are
//! one JSON file each, grouped by collection.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Serialize, de::DeserializeOwned};
use tokio::io::AsyncWriteExt;

use crate::error::{AppError, Result};
use crate::models::{IngestedDocument, ProgressCheckpoint};
use crate::storage::{CheckpointStore, DocumentStore};

/// Ensure parent directory exists.
async fn ensure_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    Ok(())
}

/// Write bytes atomically (write to temp, then rename).
async fn write_bytes(path: &Path, bytes: &[u8]) -> Result<()> {
    ensure_dir(path).await?;

    let tmp = path.with_extension("tmp");
    let mut file = tokio::fs::File::create(&tmp).await?;
    file.write_all(bytes).await?;
    file.flush().await?;
    drop(file);

    tokio::fs::rename(&tmp, path).await?;
    Ok(())
}

/// Write JSON data.
async fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let bytes = serde_json::to_vec_pretty(value)?;
    write_bytes(path, &bytes).await
}

/// Read bytes, returning None if file doesn't exist.
async fn read_bytes(path: &Path) -> Result<Option<Vec<u8>>> {
    match tokio::fs::read(path).await {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(AppError::Io(e)),
    }
}

/// Read JSON data.
async fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    match read_bytes(path).await? {
        Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
        None => Ok(None),
    }
}

/// Map a natural-key component onto a portable file name.
///
/// Reserved characters and `%` itself are percent-escaped, so distinct
/// names always map to distinct files.
fn file_component(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for c in name.chars() {
        match c {
            '%' | ':' | '/' | '\\' | '*' | '?' | '"' | '<' | '>' | '|' => {
                out.push_str(&format!("%{:02X}", c as u32));
            }
            c => out.push(c),
        }
    }
    out
}

/// Checkpoint kept as `{dir}/{run}.checkpoint.json`.
#[derive(Debug, Clone)]
pub struct FileCheckpointStore {
    path: PathBuf,
}

impl FileCheckpointStore {
    /// Create a store for the named run type inside `dir`.
    pub fn new(dir: impl AsRef<Path>, run: &str) -> Self {
        Self {
            path: dir
                .as_ref()
                .join(format!("{}.checkpoint.json", file_component(run))),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Where an unreadable checkpoint is moved: `{run}.checkpoint.json.corrupt`.
    pub fn quarantine_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_owned();
        name.push(".corrupt");
        PathBuf::from(name)
    }

    /// Move an unreadable checkpoint aside so the fresh run cannot overwrite it.
    async fn quarantine(&self, reason: &AppError) -> Result<()> {
        let target = self.quarantine_path();
        tokio::fs::rename(&self.path, &target).await?;
        log::warn!(
            "Unreadable checkpoint {} moved to {}: {}",
            self.path.display(),
            target.display(),
            reason
        );
        Ok(())
    }
}

#[async_trait]
impl CheckpointStore for FileCheckpointStore {
    async fn load(&self) -> Result<Option<ProgressCheckpoint>> {
        match read_json(&self.path).await {
            Ok(checkpoint) => Ok(checkpoint),
            Err(e) => match self.quarantine(&e).await {
                Ok(()) => Ok(None),
                Err(move_error) => {
                    log::error!(
                        "Could not move unreadable checkpoint {} aside: {}",
                        self.path.display(),
                        move_error
                    );
                    Err(e)
                }
            },
        }
    }

    async fn save(&self, checkpoint: &ProgressCheckpoint) -> Result<()> {
        write_json(&self.path, checkpoint)
            .await
            .map_err(|e| AppError::CheckpointWrite(format!("{}: {}", self.path.display(), e)))
    }

    async fn clear(&self) -> Result<()> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(AppError::Io(e)),
        }
    }
}

/// Document store writing one JSON file per document.
#[derive(Debug, Clone)]
pub struct LocalDocumentStore {
    root_dir: PathBuf,
}

impl LocalDocumentStore {
    /// Create a new LocalDocumentStore rooted at the given directory.
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: root_dir.into(),
        }
    }

    /// Get the full path for a natural key.
    fn path(&self, collection_id: &str, filename: &str) -> PathBuf {
        self.root_dir
            .join(file_component(collection_id))
            .join(format!("{}.json", file_component(filename)))
    }

    /// Load a stored document by natural key.
    pub async fn get(&self, collection_id: &str, filename: &str) -> Result<Option<IngestedDocument>> {
        read_json(&self.path(collection_id, filename)).await
    }
}

#[async_trait]
impl DocumentStore for LocalDocumentStore {
    async fn exists(&self, collection_id: &str, filename: &str) -> Result<bool> {
        Ok(tokio::fs::try_exists(self.path(collection_id, filename)).await?)
    }

    async fn insert(&self, document: &IngestedDocument) -> Result<()> {
        let path = self.path(&document.collection_id, &document.filename);
        write_json(&path, document).await
    }
}
