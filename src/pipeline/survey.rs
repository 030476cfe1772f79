// src/pipeline/survey.rs

//! Sampled, parse-only survey run.
//!
//! Visits a handful of root indexes without writing to the destination and
//! projects the corpus size from what it saw. Successive surveys resume
//! from their own checkpoint, so repeated runs widen the sample.

use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use chrono::Utc;

use crate::error::Result;
use crate::models::Config;
use crate::pipeline::{Statistics, log_run_summary};
use crate::services::{Fetcher, RunReport, SitemapWalker, Throttle, WalkOptions};
use crate::storage::CheckpointStore;
use crate::utils::report;

/// Outcome of a survey: the run itself and the projection drawn from it.
#[derive(Debug, Clone)]
pub struct SurveyReport {
    pub run: RunReport,
    pub statistics: Statistics,
}

/// Sample `max_indexes` root indexes and extrapolate.
pub async fn run_survey(
    config: &Config,
    fetcher: &dyn Fetcher,
    checkpoints: &dyn CheckpointStore,
    max_indexes: usize,
    throttle: Throttle,
    cancel: Option<Arc<AtomicBool>>,
) -> Result<SurveyReport> {
    report::header("ECLI corpus survey");
    report::sub_item(&format!("Listing: {}", config.crawler.listing_url));
    report::sub_item(&format!(
        "Sampling {} root indexes, delay {} ms",
        max_indexes,
        throttle.delay().as_millis()
    ));

    let options = WalkOptions {
        start_offset: 0,
        max_indexes: Some(max_indexes),
        max_documents: None,
        batch_size: config.checkpoint.batch_size,
    };
    let mut walker = SitemapWalker::new(fetcher, checkpoints, throttle, options);
    if let Some(flag) = cancel {
        walker = walker.with_cancel_flag(flag);
    }

    let run = walker.run(&config.crawler.listing_url).await?;
    let statistics = Statistics::from_checkpoint(&run.checkpoint, Utc::now());

    log_run_summary("Survey", &run);
    report::summary("Extrapolation", &statistics.report());

    Ok(SurveyReport { run, statistics })
}
