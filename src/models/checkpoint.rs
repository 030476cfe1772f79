//! Durable crawl progress.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Kind of a non-fatal failure captured during a walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    SitemapFetchFailed,
    EntryParseFailed,
    IngestionFailed,
}

/// A recorded failure with enough context for manual triage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckpointError {
    pub kind: ErrorKind,

    /// Root index position the failure happened under
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<usize>,

    /// URL being fetched
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    /// Document identifier being handled
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identifier: Option<String>,

    pub message: String,
    pub timestamp: DateTime<Utc>,
}

impl CheckpointError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            index: None,
            url: None,
            identifier: None,
            message: message.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn at_index(mut self, index: usize) -> Self {
        self.index = Some(index);
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn with_identifier(mut self, identifier: impl Into<String>) -> Self {
        self.identifier = Some(identifier.into());
        self
    }

    /// Single-line description for log output.
    pub fn describe(&self) -> String {
        let context = self
            .url
            .as_deref()
            .or(self.identifier.as_deref())
            .unwrap_or("-");
        match self.index {
            Some(index) => format!("[{:?}] index {} {}: {}", self.kind, index, context, self.message),
            None => format!("[{:?}] {}: {}", self.kind, context, self.message),
        }
    }
}

/// Counts for the root index currently being walked.
///
/// Folded into the checkpoint totals only once the index completes, so an
/// index that is interrupted and re-scanned later is never counted twice.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexTally {
    pub sitemaps: usize,
    pub documents: usize,
    pub unparseable: usize,
}

/// Resumption state for one run type.
///
/// Owned by the walker for the duration of a run and persisted through a
/// [`CheckpointStore`](crate::storage::CheckpointStore).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressCheckpoint {
    pub total_indexes: usize,
    pub processed_indexes: usize,
    pub total_sitemaps: usize,

    /// Records parsed in fully processed root indexes
    pub total_documents: usize,
    pub total_imported: usize,

    /// Records already present in the destination
    pub total_skipped: usize,
    #[serde(default)]
    pub total_failed: usize,

    /// Entries dropped for lacking an identifier, in processed root indexes
    #[serde(default)]
    pub total_unparseable: usize,

    /// First root index not yet fully processed
    pub current_index: usize,

    /// Partial counts for `current_index`, discarded when it is re-scanned
    #[serde(default)]
    pub in_progress: IndexTally,

    pub started_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,

    #[serde(default)]
    pub errors: Vec<CheckpointError>,
}

impl ProgressCheckpoint {
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            total_indexes: 0,
            processed_indexes: 0,
            total_sitemaps: 0,
            total_documents: 0,
            total_imported: 0,
            total_skipped: 0,
            total_failed: 0,
            total_unparseable: 0,
            current_index: 0,
            in_progress: IndexTally::default(),
            started_at: now,
            updated_at: now,
            errors: Vec::new(),
        }
    }

    /// Index the walk starts from. A checkpoint never moves it backward.
    pub fn resume_offset(&self, requested: usize) -> usize {
        requested.max(self.current_index)
    }

    pub fn record_error(&mut self, error: CheckpointError) {
        log::warn!("{}", error.describe());
        self.errors.push(error);
        self.touch();
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Start (or restart) walking a root index with an empty tally.
    pub fn begin_index(&mut self) {
        self.in_progress = IndexTally::default();
    }

    /// Mark root index `index` as fully processed and fold in its tally.
    pub fn complete_index(&mut self, index: usize) {
        let tally = std::mem::take(&mut self.in_progress);
        self.total_sitemaps += tally.sitemaps;
        self.total_documents += tally.documents;
        self.total_unparseable += tally.unparseable;
        self.processed_indexes += 1;
        self.current_index = self.current_index.max(index + 1);
        self.touch();
    }

    /// True once every discovered root index has been consumed.
    pub fn is_exhausted(&self) -> bool {
        self.current_index >= self.total_indexes
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

impl Default for ProgressCheckpoint {
    fn default() -> Self {
        Self::new()
    }
}
