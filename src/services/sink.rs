// src/services/sink.rs

//! Deduplicating ingestion sink.

use async_trait::async_trait;

use crate::models::{DestinationContext, EcliDocument, IngestedDocument};
use crate::storage::DocumentStore;

/// Result of handing one record to a sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestOutcome {
    Imported,
    /// Already present under the natural key
    Skipped,
    Failed(String),
}

/// Receives parsed records from the walker.
#[async_trait]
pub trait IngestionSink: Send + Sync {
    async fn ingest(&self, record: &EcliDocument) -> IngestOutcome;
}

/// Sink that inserts only records absent from the destination.
///
/// The lookup and the insert are two separate calls. Two runs writing to
/// the same destination at once can both insert the same key.
pub struct DedupSink<'a> {
    store: &'a dyn DocumentStore,
    context: DestinationContext,
}

impl<'a> DedupSink<'a> {
    pub fn new(store: &'a dyn DocumentStore, context: DestinationContext) -> Self {
        Self { store, context }
    }

    pub fn context(&self) -> &DestinationContext {
        &self.context
    }
}

#[async_trait]
impl IngestionSink for DedupSink<'_> {
    async fn ingest(&self, record: &EcliDocument) -> IngestOutcome {
        let filename = IngestedDocument::filename_for(record);

        match self
            .store
            .exists(&self.context.collection_id, &filename)
            .await
        {
            Ok(true) => {
                log::debug!("Skipping {}: already ingested", record.identifier);
                return IngestOutcome::Skipped;
            }
            Ok(false) => {}
            Err(e) => return IngestOutcome::Failed(format!("lookup failed: {e}")),
        }

        let document = IngestedDocument::build(record, &self.context);
        match self.store.insert(&document).await {
            Ok(()) => {
                log::debug!(
                    "Imported {} ({} bytes)",
                    record.identifier,
                    document.size_bytes
                );
                IngestOutcome::Imported
            }
            Err(e) => IngestOutcome::Failed(format!("insert failed: {e}")),
        }
    }
}
