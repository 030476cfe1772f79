// src/error.rs

//! Unified error handling for the crawl-and-ingest pipeline.

use std::fmt;

use thiserror::Error;

use crate::services::FetchError;

/// Result type alias for pipeline operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// Unified application error type.
///
/// Only [`AppError::ListingUnreachable`] and startup failures ever reach the
/// process boundary. Everything else raised during a walk is captured into
/// the checkpoint's error list and the walk moves on.
#[derive(Error, Debug)]
pub enum AppError {
    /// The root listing could not be fetched; nothing else can run.
    #[error("Listing unreachable at {url}: {source}")]
    ListingUnreachable {
        url: String,
        #[source]
        source: FetchError,
    },

    /// A sitemap or sitemap index could not be fetched
    #[error("Sitemap fetch failed for {url}: {source}")]
    SitemapFetch {
        url: String,
        #[source]
        source: FetchError,
    },

    /// A sitemap entry carried an identifier that is not a valid ECLI
    #[error("Entry parse failed: {0}")]
    Parse(String),

    /// Destination lookup or insert failed
    #[error("Ingestion failed for {identifier}: {message}")]
    Ingestion { identifier: String, message: String },

    /// Checkpoint could not be persisted
    #[error("Checkpoint write failed: {0}")]
    CheckpointWrite(String),

    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP client construction failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing failed
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// URL parsing failed
    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    /// Data validation error
    #[error("Validation error: {0}")]
    Validation(String),
}

impl AppError {
    /// Create a listing-unreachable error.
    pub fn listing(url: impl Into<String>, source: FetchError) -> Self {
        Self::ListingUnreachable {
            url: url.into(),
            source,
        }
    }

    /// Create a sitemap fetch error.
    pub fn sitemap(url: impl Into<String>, source: FetchError) -> Self {
        Self::SitemapFetch {
            url: url.into(),
            source,
        }
    }

    /// Create an ingestion error with context.
    pub fn ingestion(identifier: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Ingestion {
            identifier: identifier.into(),
            message: message.to_string(),
        }
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// True when the error must abort the whole run.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::ListingUnreachable { .. })
    }
}
