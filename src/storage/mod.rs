//! Storage abstractions for checkpoints and ingested documents.
//!
//! ## Directory Structure
//!
//! ```text
//! storage/
//! ├── checkpoints/
//! │   ├── ingest.checkpoint.json   # Retained while a run is incomplete or failed
//! │   └── survey.checkpoint.json
//! └── documents/
//!     └── {collection_id}/
//!         └── ECLI%3ABE%3ACASS%3A2020%3AARR.1.txt.json
//! ```

pub mod local;
pub mod memory;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{IngestedDocument, ProgressCheckpoint};

// Re-export for convenience
pub use local::{FileCheckpointStore, LocalDocumentStore};
pub use memory::{MemoryCheckpointStore, MemoryDocumentStore};

/// Durable home of one run type's [`ProgressCheckpoint`].
#[async_trait]
pub trait CheckpointStore: Send + Sync {
    /// Load the retained checkpoint, if any.
    async fn load(&self) -> Result<Option<ProgressCheckpoint>>;

    /// Overwrite the retained checkpoint.
    async fn save(&self, checkpoint: &ProgressCheckpoint) -> Result<()>;

    /// Delete the retained checkpoint so the next run starts fresh.
    async fn clear(&self) -> Result<()>;
}

/// Destination collaborator holding ingested documents.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Whether a document exists under the natural key.
    async fn exists(&self, collection_id: &str, filename: &str) -> Result<bool>;

    /// Insert a document. Does not check for an existing one.
    async fn insert(&self, document: &IngestedDocument) -> Result<()>;
}
