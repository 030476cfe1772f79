//! In-memory storage backends for dry runs and tests.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{IngestedDocument, ProgressCheckpoint};
use crate::storage::{CheckpointStore, DocumentStore};

/// Checkpoint held in memory, with a save counter.
#[derive(Debug, Default)]
pub struct MemoryCheckpointStore {
    slot: Mutex<Option<ProgressCheckpoint>>,
    saves: Mutex<usize>,
}

impl MemoryCheckpointStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing checkpoint, as if left by an earlier run.
    pub fn with_checkpoint(checkpoint: ProgressCheckpoint) -> Self {
        Self {
            slot: Mutex::new(Some(checkpoint)),
            saves: Mutex::new(0),
        }
    }

    pub fn snapshot(&self) -> Option<ProgressCheckpoint> {
        self.slot.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Number of successful saves.
    pub fn save_count(&self) -> usize {
        *self.saves.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl CheckpointStore for MemoryCheckpointStore {
    async fn load(&self) -> Result<Option<ProgressCheckpoint>> {
        Ok(self.snapshot())
    }

    async fn save(&self, checkpoint: &ProgressCheckpoint) -> Result<()> {
        *self.slot.lock().unwrap_or_else(|e| e.into_inner()) = Some(checkpoint.clone());
        *self.saves.lock().unwrap_or_else(|e| e.into_inner()) += 1;
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        *self.slot.lock().unwrap_or_else(|e| e.into_inner()) = None;
        Ok(())
    }
}

/// Document store keyed by `(collection_id, filename)`.
#[derive(Debug, Default)]
pub struct MemoryDocumentStore {
    documents: Mutex<HashMap<(String, String), IngestedDocument>>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.documents
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, collection_id: &str, filename: &str) -> Option<IngestedDocument> {
        self.documents
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(&(collection_id.to_string(), filename.to_string()))
            .cloned()
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn exists(&self, collection_id: &str, filename: &str) -> Result<bool> {
        Ok(self.get(collection_id, filename).is_some())
    }

    async fn insert(&self, document: &IngestedDocument) -> Result<()> {
        self.documents.lock().unwrap_or_else(|e| e.into_inner()).insert(
            (document.collection_id.clone(), document.filename.clone()),
            document.clone(),
        );
        Ok(())
    }
}
