// src/pipeline/stats.rs

//! Progress statistics and corpus extrapolation.
//!
//! Everything here is advisory and derived from a checkpoint snapshot.

use chrono::{DateTime, Utc};

use crate::models::ProgressCheckpoint;

/// Derived progress figures.
#[derive(Debug, Clone, PartialEq)]
pub struct Statistics {
    pub total_indexes: usize,
    pub processed_indexes: usize,
    pub total_documents: usize,
    pub avg_docs_per_index: f64,
    pub estimated_remaining: f64,

    /// `None` until at least one index has been processed
    pub eta_minutes: Option<f64>,

    /// Projected corpus size, only for sampled runs
    pub extrapolated_total: Option<f64>,

    pub docs_per_minute: Option<f64>,
    pub elapsed_minutes: f64,
    pub error_count: usize,
}

impl Statistics {
    pub fn from_checkpoint(checkpoint: &ProgressCheckpoint, now: DateTime<Utc>) -> Self {
        let processed = checkpoint.processed_indexes;
        let total = checkpoint.total_indexes;

        let avg_docs_per_index = if processed > 0 {
            checkpoint.total_documents as f64 / processed as f64
        } else {
            0.0
        };
        let remaining_indexes = total.saturating_sub(processed);
        let estimated_remaining = avg_docs_per_index * remaining_indexes as f64;

        let elapsed_minutes =
            ((now - checkpoint.started_at).num_milliseconds().max(0) as f64) / 60_000.0;

        let eta_minutes =
            (processed > 0).then(|| elapsed_minutes / processed as f64 * remaining_indexes as f64);
        let extrapolated_total =
            (processed > 0 && processed < total).then(|| avg_docs_per_index * total as f64);
        let docs_per_minute =
            (elapsed_minutes > 0.0).then(|| checkpoint.total_documents as f64 / elapsed_minutes);

        Self {
            total_indexes: total,
            processed_indexes: processed,
            total_documents: checkpoint.total_documents,
            avg_docs_per_index,
            estimated_remaining,
            eta_minutes,
            extrapolated_total,
            docs_per_minute,
            elapsed_minutes,
            error_count: checkpoint.errors.len(),
        }
    }

    /// Fraction of root indexes processed, in percent.
    pub fn percent_complete(&self) -> f64 {
        if self.total_indexes == 0 {
            return 0.0;
        }
        self.processed_indexes as f64 * 100.0 / self.total_indexes as f64
    }

    /// Key/value lines for a log summary.
    pub fn report(&self) -> Vec<(&'static str, String)> {
        let mut items = vec![
            (
                "Root indexes",
                format!(
                    "{}/{} ({:.1}%)",
                    self.processed_indexes,
                    self.total_indexes,
                    self.percent_complete()
                ),
            ),
            ("Documents", self.total_documents.to_string()),
            ("Avg per index", format!("{:.1}", self.avg_docs_per_index)),
            ("Est. remaining", format!("{:.0}", self.estimated_remaining)),
        ];
        if let Some(eta) = self.eta_minutes {
            items.push(("ETA", format_minutes(eta)));
        }
        if let Some(rate) = self.docs_per_minute {
            items.push(("Docs/minute", format!("{:.1}", rate)));
        }
        if let Some(total) = self.extrapolated_total {
            items.push(("Extrapolated total", format!("~{:.0}", total)));
        }
        items.push(("Errors", self.error_count.to_string()));
        items
    }
}

fn format_minutes(minutes: f64) -> String {
    if minutes < 60.0 {
        format!("{:.0} min", minutes)
    } else {
        format!("{:.1} h", minutes / 60.0)
    }
}
