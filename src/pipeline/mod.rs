//! Pipeline entry points for crawler runs.
//!
//! - `run_ingest`: Walk the sitemap tree and ingest every record
//! - `run_survey`: Sample a few root indexes and extrapolate the corpus size
//! - `Statistics`: Progress figures derived from a checkpoint

pub mod ingest;
pub mod stats;
pub mod survey;

pub use ingest::run_ingest;
pub use stats::Statistics;
pub use survey::{SurveyReport, run_survey};

use crate::services::{RunReport, StopReason};
use crate::utils::report;

/// Log the end-of-run summary shared by every run mode.
fn log_run_summary(title: &str, run: &RunReport) {
    let cp = &run.checkpoint;
    let stop = match run.outcome.stop_reason {
        StopReason::Exhausted => "all root indexes consumed",
        StopReason::IndexLimit => "root index limit reached",
        StopReason::DocumentCap => "document cap reached",
        StopReason::Cancelled => "cancelled",
    };

    let mut items = vec![
        ("Stopped", stop.to_string()),
        (
            "Root indexes",
            format!("{}/{}", cp.processed_indexes, cp.total_indexes),
        ),
        ("Sitemaps", cp.total_sitemaps.to_string()),
        ("Documents", cp.total_documents.to_string()),
        ("Imported", cp.total_imported.to_string()),
        ("Skipped", cp.total_skipped.to_string()),
        ("Failed", cp.total_failed.to_string()),
        ("Unparseable", cp.total_unparseable.to_string()),
        ("Errors", cp.errors.len().to_string()),
    ];
    if cp.in_progress.documents > 0 {
        items.push((
            "Partial index",
            format!(
                "{} documents in root index {} (re-scanned on resume)",
                cp.in_progress.documents, cp.current_index
            ),
        ));
    }
    report::summary(title, &items);

    if run.outcome.checkpoint_write_failures > 0 {
        log::error!(
            "{} checkpoint writes failed; resume position may be stale",
            run.outcome.checkpoint_write_failures
        );
    }

    if cp.has_errors() {
        log::warn!(
            "Run finished with {} errors; checkpoint retained for inspection",
            cp.errors.len()
        );
        for error in cp.errors.iter().rev().take(5) {
            report::sub_item(&error.describe());
        }
    } else if run.checkpoint_cleared {
        report::success("Run complete, checkpoint cleared");
    } else {
        report::sub_item("Checkpoint retained; the next run resumes from it");
    }
}
