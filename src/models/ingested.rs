//! Destination representation of an ingested record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use unicode_segmentation::UnicodeSegmentation;

use super::document::{EcliDocument, Language};

/// Extension appended to the identifier to form the destination filename.
pub const FILENAME_EXTENSION: &str = "txt";

/// Where ingested documents land and on whose behalf.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DestinationContext {
    pub collection_id: String,
    pub uploader_id: String,

    /// Summary length limit in grapheme clusters
    pub summary_graphemes: usize,
}

/// A record as stored by the destination collaborator.
///
/// `(collection_id, filename)` is the natural key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestedDocument {
    pub collection_id: String,
    pub uploaded_by: String,
    pub filename: String,
    pub title: String,
    pub summary: String,
    pub content: String,
    pub source_url: Option<String>,

    /// Language the canonical text was taken from
    pub language: Option<Language>,

    pub size_bytes: usize,
    pub content_hash: String,
    pub record: EcliDocument,
    pub created_at: DateTime<Utc>,
}

impl IngestedDocument {
    /// Filename derived from a record identifier.
    pub fn filename_for(record: &EcliDocument) -> String {
        format!("{}.{}", record.identifier, FILENAME_EXTENSION)
    }

    /// Build the destination document for a record.
    pub fn build(record: &EcliDocument, context: &DestinationContext) -> Self {
        let summary_source = record.abstract_text.canonical();
        let language = record
            .abstract_text
            .canonical_entry()
            .or_else(|| record.description_text.canonical_entry())
            .map(|(lang, _)| lang);

        let content = [
            record.abstract_text.canonical(),
            record.description_text.canonical(),
            record.subject.canonical(),
            record.creator.canonical(),
        ]
        .into_iter()
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n");

        let title = match (&record.court, &record.decision_date) {
            (Some(court), Some(date)) => format!("{} ({}, {})", record.identifier, court, date),
            (Some(court), None) => format!("{} ({})", record.identifier, court),
            (None, Some(date)) => format!("{} ({})", record.identifier, date),
            (None, None) => record.identifier.to_string(),
        };

        Self {
            collection_id: context.collection_id.clone(),
            uploaded_by: context.uploader_id.clone(),
            filename: Self::filename_for(record),
            title,
            summary: truncate_graphemes(summary_source, context.summary_graphemes),
            size_bytes: content.len(),
            content_hash: hex::encode(Sha256::digest(content.as_bytes())),
            content,
            source_url: record.canonical_url().map(str::to_string),
            language,
            record: record.clone(),
            created_at: Utc::now(),
        }
    }
}

/// Cut text to at most `limit` grapheme clusters, marking the cut with an ellipsis.
fn truncate_graphemes(text: &str, limit: usize) -> String {
    let graphemes: Vec<&str> = text.graphemes(true).collect();
    if graphemes.len() <= limit {
        return text.to_string();
    }
    let mut out: String = graphemes[..limit].concat();
    out.push('…');
    out
}
