//! Service layer for the crawler.
//!
//! This module contains the business logic for:
//! - Root index discovery (`discover_root_indexes`)
//! - Throttled fetching (`HttpFetcher`, `Throttle`)
//! - Entry parsing (`EntryParser`)
//! - Deduplicating ingestion (`DedupSink`)
//! - The sitemap tree walk (`SitemapWalker`)

pub mod discovery;
mod fetcher;
mod parser;
mod sink;
pub mod sitemap;
mod walker;

pub use discovery::discover_root_indexes;
pub use fetcher::{FetchError, Fetcher, HttpFetcher, Throttle};
pub use parser::EntryParser;
pub use sink::{DedupSink, IngestOutcome, IngestionSink};
pub use walker::{RunReport, SitemapWalker, StopReason, WalkOptions, WalkOutcome};
