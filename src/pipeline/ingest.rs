// src/pipeline/ingest.rs

//! Full ingestion run.

use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use chrono::Utc;

use crate::error::Result;
use crate::models::Config;
use crate::pipeline::{Statistics, log_run_summary};
use crate::services::{DedupSink, Fetcher, RunReport, SitemapWalker, Throttle, WalkOptions};
use crate::storage::{CheckpointStore, DocumentStore};
use crate::utils::report;

/// Walk the whole sitemap tree and ingest every record into `documents`.
///
/// Only an unreachable listing fails the run; every other problem ends up
/// in the returned checkpoint.
pub async fn run_ingest(
    config: &Config,
    fetcher: &dyn Fetcher,
    checkpoints: &dyn CheckpointStore,
    documents: &dyn DocumentStore,
    options: WalkOptions,
    throttle: Throttle,
    cancel: Option<Arc<AtomicBool>>,
) -> Result<RunReport> {
    report::header("ECLI ingestion");
    report::sub_item(&format!("Listing: {}", config.crawler.listing_url));
    report::sub_item(&format!(
        "Destination collection: {}",
        config.destination.collection_id
    ));
    report::sub_item(&format!(
        "Delay: {} ms, batch size: {}",
        throttle.delay().as_millis(),
        options.batch_size
    ));

    let sink = DedupSink::new(documents, config.destination.context());
    let mut walker = SitemapWalker::new(fetcher, checkpoints, throttle, options).with_sink(&sink);
    if let Some(flag) = cancel {
        walker = walker.with_cancel_flag(flag);
    }

    let run = walker.run(&config.crawler.listing_url).await?;

    log_run_summary("Ingestion", &run);
    let stats = Statistics::from_checkpoint(&run.checkpoint, Utc::now());
    if !run.checkpoint_cleared {
        report::summary("Progress", &stats.report());
    }

    Ok(run)
}
