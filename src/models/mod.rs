// src/models/mod.rs

//! Domain models for the crawl-and-ingest pipeline.
//!
//! This module contains all data structures used throughout the application,
//! organized by their primary purpose.

mod checkpoint;
mod config;
mod document;
mod ingested;

// Re-export all public types
pub use checkpoint::{CheckpointError, ErrorKind, IndexTally, ProgressCheckpoint};
pub use config::{CheckpointConfig, Config, CrawlerConfig, DestinationConfig, SurveyConfig};
pub use document::{Ecli, EcliDocument, LangMap, Language};
pub use ingested::{DestinationContext, FILENAME_EXTENSION, IngestedDocument};
