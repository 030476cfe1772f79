// src/services/walker.rs

//! Two-level sitemap tree walker.
//!
//! Root indexes are visited in discovery order, their child sitemaps in
//! document order, and every entry is parsed and ingested inline. The walk
//! is strictly sequential: one request in flight, a throttle pause after
//! each fetch and after each checkpoint batch.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::{AppError, Result};
use crate::models::{CheckpointError, ErrorKind, ProgressCheckpoint};
use crate::services::discovery::discover_root_indexes;
use crate::services::parser::EntryParser;
use crate::services::sink::{IngestOutcome, IngestionSink};
use crate::services::{Fetcher, Throttle, sitemap};
use crate::storage::CheckpointStore;

/// Caller-supplied limits for one walk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalkOptions {
    /// Requested first root index; a checkpoint may push it further
    pub start_offset: usize,

    /// Root indexes to visit this run (all when `None`)
    pub max_indexes: Option<usize>,

    /// Records to hand on this run (unbounded when `None`)
    pub max_documents: Option<usize>,

    /// Records between checkpoint flushes
    pub batch_size: usize,
}

impl Default for WalkOptions {
    fn default() -> Self {
        Self {
            start_offset: 0,
            max_indexes: None,
            max_documents: None,
            batch_size: 50,
        }
    }
}

/// Why a walk ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// Every root index has been consumed
    Exhausted,
    /// `max_indexes` reached before the end of the listing
    IndexLimit,
    /// `max_documents` reached
    DocumentCap,
    /// Cancellation requested between units of work
    Cancelled,
}

/// Summary of one walk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalkOutcome {
    pub stop_reason: StopReason,
    pub first_index: usize,
    pub indexes_visited: usize,
    pub records_this_run: usize,
    pub checkpoint_write_failures: usize,
}

/// Result of a full run: discovery, walk, and checkpoint finalization.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub outcome: WalkOutcome,
    pub checkpoint: ProgressCheckpoint,

    /// Checkpoint deleted because the run completed without errors
    pub checkpoint_cleared: bool,
}

enum Flow {
    Continue,
    Stop(StopReason),
}

#[derive(Default)]
struct WalkState {
    indexes_visited: usize,
    records_this_run: usize,
    since_flush: usize,
    write_failures: usize,
}

/// Walks root indexes, child sitemaps and entries.
pub struct SitemapWalker<'a> {
    fetcher: &'a dyn Fetcher,
    store: &'a dyn CheckpointStore,
    sink: Option<&'a dyn IngestionSink>,
    parser: EntryParser,
    throttle: Throttle,
    options: WalkOptions,
    cancel: Option<Arc<AtomicBool>>,
}

impl<'a> SitemapWalker<'a> {
    pub fn new(
        fetcher: &'a dyn Fetcher,
        store: &'a dyn CheckpointStore,
        throttle: Throttle,
        options: WalkOptions,
    ) -> Self {
        Self {
            fetcher,
            store,
            sink: None,
            parser: EntryParser::new(),
            throttle,
            options,
            cancel: None,
        }
    }

    /// Ingest parsed records into `sink`. Without a sink records are only counted.
    pub fn with_sink(mut self, sink: &'a dyn IngestionSink) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Stop between units of work once `flag` is set.
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    /// Discover, resume, walk, and finalize the checkpoint.
    ///
    /// Only an unreachable listing is returned as an error.
    pub async fn run(&self, listing_url: &str) -> Result<RunReport> {
        let roots = discover_root_indexes(self.fetcher, listing_url).await?;
        self.throttle.pause().await;

        let mut checkpoint = self.load_checkpoint().await;
        let outcome = self.walk(&roots, &mut checkpoint).await;
        let checkpoint_cleared = self.finish(&mut checkpoint, &outcome).await;

        Ok(RunReport {
            outcome,
            checkpoint,
            checkpoint_cleared,
        })
    }

    /// Load the retained checkpoint, or start a fresh one.
    pub async fn load_checkpoint(&self) -> ProgressCheckpoint {
        match self.store.load().await {
            Ok(Some(checkpoint)) => {
                log::info!(
                    "Resuming from checkpoint: index {}/{}, {} documents, {} errors",
                    checkpoint.current_index,
                    checkpoint.total_indexes,
                    checkpoint.total_documents,
                    checkpoint.errors.len()
                );
                checkpoint
            }
            Ok(None) => ProgressCheckpoint::new(),
            Err(e) => {
                log::warn!("Checkpoint load failed, starting fresh: {}", e);
                ProgressCheckpoint::new()
            }
        }
    }

    /// Walk `roots` from the resume offset, mutating `checkpoint` as work completes.
    pub async fn walk(&self, roots: &[String], checkpoint: &mut ProgressCheckpoint) -> WalkOutcome {
        checkpoint.total_indexes = roots.len();
        let first_index = checkpoint.resume_offset(self.options.start_offset);
        let end = match self.options.max_indexes {
            Some(limit) => first_index.saturating_add(limit).min(roots.len()),
            None => roots.len(),
        };

        let mut state = WalkState::default();
        let mut stop_reason = if end < roots.len() {
            StopReason::IndexLimit
        } else {
            StopReason::Exhausted
        };

        if first_index > 0 {
            log::info!("Starting at root index {}/{}", first_index, roots.len());
        }

        if self.options.max_documents == Some(0) {
            stop_reason = StopReason::DocumentCap;
        } else {
            for (index, url) in roots.iter().enumerate().take(end).skip(first_index) {
                if self.is_cancelled() {
                    stop_reason = StopReason::Cancelled;
                    break;
                }

                state.indexes_visited += 1;
                checkpoint.begin_index();
                match self.process_index(index, url, checkpoint, &mut state).await {
                    Flow::Continue => {
                        checkpoint.complete_index(index);
                        self.flush(checkpoint, &mut state).await;
                        log::info!(
                            "Root index {}/{} done: {} sitemaps, {} documents so far",
                            index + 1,
                            roots.len(),
                            checkpoint.total_sitemaps,
                            checkpoint.total_documents
                        );
                    }
                    Flow::Stop(reason) => {
                        stop_reason = reason;
                        break;
                    }
                }
            }
        }

        self.flush(checkpoint, &mut state).await;

        WalkOutcome {
            stop_reason,
            first_index,
            indexes_visited: state.indexes_visited,
            records_this_run: state.records_this_run,
            checkpoint_write_failures: state.write_failures,
        }
    }

    /// Delete the checkpoint after a clean, complete walk; keep it otherwise.
    ///
    /// Returns true when the checkpoint was deleted.
    pub async fn finish(&self, checkpoint: &mut ProgressCheckpoint, outcome: &WalkOutcome) -> bool {
        let complete = outcome.stop_reason == StopReason::Exhausted && checkpoint.is_exhausted();

        if complete && !checkpoint.has_errors() {
            match self.store.clear().await {
                Ok(()) => return true,
                Err(e) => log::error!("Failed to delete completed checkpoint: {}", e),
            }
        } else {
            checkpoint.touch();
            if let Err(e) = self.store.save(checkpoint).await {
                log::error!("{}", e);
            }
        }
        false
    }

    async fn process_index(
        &self,
        index: usize,
        url: &str,
        checkpoint: &mut ProgressCheckpoint,
        state: &mut WalkState,
    ) -> Flow {
        let fetched = self.fetcher.fetch_text(url).await;
        self.throttle.pause().await;

        let body = match fetched {
            Ok(body) => body,
            Err(e) => {
                checkpoint.record_error(
                    CheckpointError::new(
                        ErrorKind::SitemapFetchFailed,
                        AppError::sitemap(url, e).to_string(),
                    )
                    .at_index(index)
                    .with_url(url),
                );
                return Flow::Continue;
            }
        };

        let children = sitemap::extract_locations(&body, url);
        log::debug!("Root index {} lists {} sitemaps", url, children.len());

        for child in &children {
            if self.is_cancelled() {
                return Flow::Stop(StopReason::Cancelled);
            }
            if let Flow::Stop(reason) = self.process_sitemap(index, child, checkpoint, state).await {
                return Flow::Stop(reason);
            }
        }
        Flow::Continue
    }

    async fn process_sitemap(
        &self,
        index: usize,
        url: &str,
        checkpoint: &mut ProgressCheckpoint,
        state: &mut WalkState,
    ) -> Flow {
        let fetched = self.fetcher.fetch_text(url).await;
        self.throttle.pause().await;

        let body = match fetched {
            Ok(body) => body,
            Err(e) => {
                checkpoint.record_error(
                    CheckpointError::new(
                        ErrorKind::SitemapFetchFailed,
                        AppError::sitemap(url, e).to_string(),
                    )
                    .at_index(index)
                    .with_url(url),
                );
                return Flow::Continue;
            }
        };
        checkpoint.in_progress.sitemaps += 1;

        for raw in sitemap::extract_entries(&body) {
            if self.is_cancelled() {
                return Flow::Stop(StopReason::Cancelled);
            }

            let record = match self.parser.parse_entry(raw) {
                Ok(Some(record)) => record,
                Ok(None) => {
                    checkpoint.in_progress.unparseable += 1;
                    continue;
                }
                Err(e) => {
                    checkpoint.record_error(
                        CheckpointError::new(ErrorKind::EntryParseFailed, e.to_string())
                            .at_index(index)
                            .with_url(url),
                    );
                    continue;
                }
            };
            checkpoint.in_progress.documents += 1;

            if let Some(sink) = self.sink {
                match sink.ingest(&record).await {
                    IngestOutcome::Imported => checkpoint.total_imported += 1,
                    IngestOutcome::Skipped => checkpoint.total_skipped += 1,
                    IngestOutcome::Failed(reason) => {
                        let identifier = record.identifier.to_string();
                        checkpoint.total_failed += 1;
                        checkpoint.record_error(
                            CheckpointError::new(
                                ErrorKind::IngestionFailed,
                                AppError::ingestion(&identifier, reason).to_string(),
                            )
                            .at_index(index)
                            .with_identifier(identifier),
                        );
                    }
                }
            }
            checkpoint.touch();

            state.records_this_run += 1;
            state.since_flush += 1;
            if state.since_flush >= self.options.batch_size.max(1) {
                self.flush(checkpoint, state).await;
                self.throttle.pause().await;
            }

            if self
                .options
                .max_documents
                .is_some_and(|cap| state.records_this_run >= cap)
            {
                log::info!("Document cap of {} reached", state.records_this_run);
                return Flow::Stop(StopReason::DocumentCap);
            }
        }
        Flow::Continue
    }

    /// Persist the checkpoint. A failed save is logged and the walk goes on.
    async fn flush(&self, checkpoint: &mut ProgressCheckpoint, state: &mut WalkState) {
        checkpoint.touch();
        state.since_flush = 0;
        if let Err(e) = self.store.save(checkpoint).await {
            state.write_failures += 1;
            log::error!("{} (progress continues in memory)", e);
        }
    }

    fn is_cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Relaxed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    use async_trait::async_trait;

    use std::time::Duration;

    use crate::models::DestinationContext;
    use crate::pipeline::Statistics;
    use crate::services::FetchError;
    use crate::services::sink::DedupSink;
    use crate::storage::{MemoryCheckpointStore, MemoryDocumentStore};

    const LISTING_URL: &str = "https://example.org/robots.txt";

    /// Serves canned bodies by URL and records the request order.
    #[derive(Default)]
    struct MapFetcher {
        responses: HashMap<String, std::result::Result<String, FetchError>>,
        requests: Mutex<Vec<String>>,
    }

    impl MapFetcher {
        fn ok(mut self, url: &str, body: impl Into<String>) -> Self {
            self.responses.insert(url.to_string(), Ok(body.into()));
            self
        }

        fn fail(mut self, url: &str, error: FetchError) -> Self {
            self.responses.insert(url.to_string(), Err(error));
            self
        }

        fn requests(&self) -> Vec<String> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Fetcher for MapFetcher {
        async fn fetch_text(&self, url: &str) -> std::result::Result<String, FetchError> {
            self.requests.lock().unwrap().push(url.to_string());
            self.responses
                .get(url)
                .cloned()
                .unwrap_or_else(|| Err(FetchError::HttpStatus(404)))
        }
    }

    /// Checkpoint store whose saves always fail.
    struct ReadOnlyStore;

    #[async_trait]
    impl CheckpointStore for ReadOnlyStore {
        async fn load(&self) -> Result<Option<ProgressCheckpoint>> {
            Ok(None)
        }
        async fn save(&self, _checkpoint: &ProgressCheckpoint) -> Result<()> {
            Err(AppError::CheckpointWrite("disk full".to_string()))
        }
        async fn clear(&self) -> Result<()> {
            Ok(())
        }
    }

    fn listing(indexes: &[&str]) -> String {
        indexes
            .iter()
            .map(|url| format!("Sitemap: {url}\n"))
            .collect()
    }

    fn index_xml(children: &[&str]) -> String {
        let body: String = children
            .iter()
            .map(|url| format!("<sitemap><loc>{url}</loc></sitemap>"))
            .collect();
        format!("<sitemapindex>{body}</sitemapindex>")
    }

    fn entry(serial: &str) -> String {
        format!(
            "<url><loc>https://example.org/doc/{serial}</loc>\
             <dcterms:isVersionOf>ECLI:BE:CASS:2020:{serial}</dcterms:isVersionOf>\
             <dcterms:abstract xml:lang=\"nl\">Samenvatting {serial}</dcterms:abstract></url>"
        )
    }

    fn sitemap_xml(serials: &[&str]) -> String {
        let body: String = serials.iter().map(|s| entry(s)).collect();
        format!("<urlset>{body}</urlset>")
    }

    fn context() -> DestinationContext {
        DestinationContext {
            collection_id: "case-law".to_string(),
            uploader_id: "crawler".to_string(),
            summary_graphemes: 100,
        }
    }

    fn options() -> WalkOptions {
        WalkOptions {
            batch_size: 2,
            ..WalkOptions::default()
        }
    }

    /// Three root indexes; index 1 has a failing second child.
    fn tree() -> MapFetcher {
        MapFetcher::default()
            .ok(
                LISTING_URL,
                listing(&[
                    "https://example.org/index-0.xml",
                    "https://example.org/index-1.xml",
                    "https://example.org/index-2.xml",
                ]),
            )
            .ok(
                "https://example.org/index-0.xml",
                index_xml(&["https://example.org/s-0a.xml"]),
            )
            .ok(
                "https://example.org/index-1.xml",
                index_xml(&[
                    "https://example.org/s-1a.xml",
                    "https://example.org/s-1b.xml",
                ]),
            )
            .ok(
                "https://example.org/index-2.xml",
                index_xml(&["https://example.org/s-2a.xml"]),
            )
            .ok("https://example.org/s-0a.xml", sitemap_xml(&["A.1", "A.2"]))
            .ok("https://example.org/s-1a.xml", sitemap_xml(&["B.1"]))
            .fail("https://example.org/s-1b.xml", FetchError::HttpStatus(500))
            .ok("https://example.org/s-2a.xml", sitemap_xml(&["C.1", "C.2"]))
    }

    #[tokio::test]
    async fn partial_failure_is_recorded_and_walk_continues() {
        let fetcher = tree();
        let checkpoints = MemoryCheckpointStore::new();
        let documents = MemoryDocumentStore::new();
        let sink = DedupSink::new(&documents, context());
        let walker =
            SitemapWalker::new(&fetcher, &checkpoints, Throttle::none(), options()).with_sink(&sink);

        let roots = vec![
            "https://example.org/index-1.xml".to_string(),
            "https://example.org/index-2.xml".to_string(),
        ];
        let mut checkpoint = ProgressCheckpoint::new();
        let outcome = walker.walk(&roots, &mut checkpoint).await;

        assert_eq!(outcome.stop_reason, StopReason::Exhausted);
        assert_eq!(checkpoint.errors.len(), 1);
        let error = &checkpoint.errors[0];
        assert_eq!(error.kind, ErrorKind::SitemapFetchFailed);
        assert_eq!(error.url.as_deref(), Some("https://example.org/s-1b.xml"));
        assert_eq!(error.index, Some(0));
        assert!(error.message.contains("500"));

        // s-1a and s-2a succeeded; s-1b did not count
        assert_eq!(checkpoint.total_sitemaps, 2);
        assert_eq!(checkpoint.processed_indexes, 2);
        assert_eq!(checkpoint.total_imported, 3);
        assert_eq!(documents.len(), 3);
    }

    #[tokio::test]
    async fn run_with_errors_retains_checkpoint() {
        let fetcher = tree();
        let checkpoints = MemoryCheckpointStore::new();
        let documents = MemoryDocumentStore::new();
        let sink = DedupSink::new(&documents, context());
        let walker =
            SitemapWalker::new(&fetcher, &checkpoints, Throttle::none(), options()).with_sink(&sink);

        let report = walker.run(LISTING_URL).await.unwrap();

        assert!(!report.checkpoint_cleared);
        assert_eq!(report.checkpoint.total_indexes, 3);
        assert_eq!(report.checkpoint.current_index, 3);
        assert_eq!(report.checkpoint.total_documents, 5);
        let retained = checkpoints.snapshot().unwrap();
        assert_eq!(retained.errors.len(), 1);
    }

    #[tokio::test]
    async fn clean_run_clears_checkpoint() {
        let fetcher = MapFetcher::default()
            .ok(LISTING_URL, listing(&["https://example.org/index-0.xml"]))
            .ok(
                "https://example.org/index-0.xml",
                index_xml(&["https://example.org/s-0a.xml"]),
            )
            .ok("https://example.org/s-0a.xml", sitemap_xml(&["A.1", "A.2", "A.3"]));
        let checkpoints = MemoryCheckpointStore::new();
        let documents = MemoryDocumentStore::new();
        let sink = DedupSink::new(&documents, context());
        let walker =
            SitemapWalker::new(&fetcher, &checkpoints, Throttle::none(), options()).with_sink(&sink);

        let report = walker.run(LISTING_URL).await.unwrap();

        assert!(report.checkpoint_cleared);
        assert!(checkpoints.snapshot().is_none());
        assert_eq!(report.checkpoint.total_imported, 3);
        assert!(checkpoints.save_count() >= 2);
    }

    #[tokio::test]
    async fn document_cap_stops_before_next_entry() {
        let fetcher = MapFetcher::default()
            .ok(LISTING_URL, listing(&["https://example.org/index-0.xml"]))
            .ok(
                "https://example.org/index-0.xml",
                index_xml(&["https://example.org/s-0a.xml"]),
            )
            .ok(
                "https://example.org/s-0a.xml",
                sitemap_xml(&["A.1", "A.2", "A.3", "A.4", "A.5"]),
            );
        let checkpoints = MemoryCheckpointStore::new();
        let documents = MemoryDocumentStore::new();
        let sink = DedupSink::new(&documents, context());
        let walker = SitemapWalker::new(
            &fetcher,
            &checkpoints,
            Throttle::none(),
            WalkOptions {
                max_documents: Some(3),
                ..options()
            },
        )
        .with_sink(&sink);

        let report = walker.run(LISTING_URL).await.unwrap();

        assert_eq!(report.outcome.stop_reason, StopReason::DocumentCap);
        assert_eq!(report.outcome.records_this_run, 3);
        assert_eq!(documents.len(), 3);
        assert!(documents.get("case-law", "ECLI:BE:CASS:2020:A.4.txt").is_none());
        // Unfinished index is re-scanned on resume
        assert_eq!(report.checkpoint.current_index, 0);
        assert_eq!(report.checkpoint.processed_indexes, 0);
        assert!(!report.checkpoint_cleared);
    }

    #[tokio::test]
    async fn resume_after_cap_is_idempotent() {
        let fetcher = MapFetcher::default()
            .ok(LISTING_URL, listing(&["https://example.org/index-0.xml"]))
            .ok(
                "https://example.org/index-0.xml",
                index_xml(&["https://example.org/s-0a.xml"]),
            )
            .ok(
                "https://example.org/s-0a.xml",
                sitemap_xml(&["A.1", "A.2", "A.3", "A.4", "A.5"]),
            );
        let checkpoints = MemoryCheckpointStore::new();
        let documents = MemoryDocumentStore::new();
        let sink = DedupSink::new(&documents, context());

        let capped = WalkOptions {
            max_documents: Some(3),
            ..options()
        };
        SitemapWalker::new(&fetcher, &checkpoints, Throttle::none(), capped)
            .with_sink(&sink)
            .run(LISTING_URL)
            .await
            .unwrap();

        let report = SitemapWalker::new(&fetcher, &checkpoints, Throttle::none(), options())
            .with_sink(&sink)
            .run(LISTING_URL)
            .await
            .unwrap();

        assert!(report.checkpoint_cleared);
        assert_eq!(documents.len(), 5);
        assert_eq!(report.checkpoint.total_imported, 5);
        assert_eq!(report.checkpoint.total_skipped, 3);
    }

    #[tokio::test]
    async fn resume_never_rescans_earlier_indexes() {
        let fetcher = tree();
        let mut previous = ProgressCheckpoint::new();
        previous.current_index = 2;
        previous.processed_indexes = 2;
        let checkpoints = MemoryCheckpointStore::with_checkpoint(previous);
        let walker = SitemapWalker::new(
            &fetcher,
            &checkpoints,
            Throttle::none(),
            WalkOptions {
                start_offset: 1,
                ..options()
            },
        );

        let report = walker.run(LISTING_URL).await.unwrap();

        assert_eq!(report.outcome.first_index, 2);
        assert_eq!(report.outcome.indexes_visited, 1);
        let requests = fetcher.requests();
        assert!(!requests.iter().any(|u| u.contains("index-0")));
        assert!(!requests.iter().any(|u| u.contains("index-1")));
        assert!(requests.iter().any(|u| u.contains("index-2")));
        assert_eq!(report.checkpoint.processed_indexes, 3);
    }

    #[tokio::test]
    async fn larger_start_offset_wins_over_checkpoint() {
        let fetcher = tree();
        let mut previous = ProgressCheckpoint::new();
        previous.current_index = 1;
        let checkpoints = MemoryCheckpointStore::with_checkpoint(previous);
        let walker = SitemapWalker::new(
            &fetcher,
            &checkpoints,
            Throttle::none(),
            WalkOptions {
                start_offset: 2,
                ..options()
            },
        );

        let report = walker.run(LISTING_URL).await.unwrap();
        assert_eq!(report.outcome.first_index, 2);
    }

    #[tokio::test]
    async fn index_limit_samples_and_retains_checkpoint() {
        let fetcher = tree();
        let checkpoints = MemoryCheckpointStore::new();
        let walker = SitemapWalker::new(
            &fetcher,
            &checkpoints,
            Throttle::none(),
            WalkOptions {
                max_indexes: Some(1),
                ..options()
            },
        );

        let report = walker.run(LISTING_URL).await.unwrap();

        assert_eq!(report.outcome.stop_reason, StopReason::IndexLimit);
        assert_eq!(report.checkpoint.processed_indexes, 1);
        assert_eq!(report.checkpoint.total_documents, 2);
        // Without a sink nothing is imported
        assert_eq!(report.checkpoint.total_imported, 0);
        assert!(checkpoints.snapshot().is_some());
    }

    #[tokio::test]
    async fn unparseable_entries_are_counted_not_errors() {
        let body = format!(
            "<urlset>{}<url><loc>https://example.org/no-id</loc></url>\
             <url><isVersionOf>NOT-AN-ECLI</isVersionOf></url></urlset>",
            entry("A.1")
        );
        let fetcher = MapFetcher::default()
            .ok(
                "https://example.org/index-0.xml",
                index_xml(&["https://example.org/s-0a.xml"]),
            )
            .ok("https://example.org/s-0a.xml", body);
        let checkpoints = MemoryCheckpointStore::new();
        let walker = SitemapWalker::new(&fetcher, &checkpoints, Throttle::none(), options());

        let mut checkpoint = ProgressCheckpoint::new();
        walker
            .walk(&["https://example.org/index-0.xml".to_string()], &mut checkpoint)
            .await;

        assert_eq!(checkpoint.total_documents, 1);
        assert_eq!(checkpoint.total_unparseable, 1);
        assert_eq!(checkpoint.errors.len(), 1);
        assert_eq!(checkpoint.errors[0].kind, ErrorKind::EntryParseFailed);
    }

    #[tokio::test]
    async fn unreachable_listing_aborts_run() {
        let fetcher = MapFetcher::default().fail(LISTING_URL, FetchError::Timeout);
        let checkpoints = MemoryCheckpointStore::new();
        let walker = SitemapWalker::new(&fetcher, &checkpoints, Throttle::none(), options());

        let err = walker.run(LISTING_URL).await.unwrap_err();
        assert!(err.is_fatal());
        assert_eq!(checkpoints.save_count(), 0);
    }

    #[tokio::test]
    async fn failing_checkpoint_writes_do_not_stop_walk() {
        let fetcher = tree();
        let store = ReadOnlyStore;
        let walker = SitemapWalker::new(&fetcher, &store, Throttle::none(), options());

        let report = walker.run(LISTING_URL).await.unwrap();

        assert_eq!(report.outcome.stop_reason, StopReason::Exhausted);
        assert!(report.outcome.checkpoint_write_failures > 0);
        assert_eq!(report.checkpoint.processed_indexes, 3);
    }

    #[tokio::test]
    async fn cancellation_stops_between_units() {
        let fetcher = tree();
        let checkpoints = MemoryCheckpointStore::new();
        let flag = Arc::new(AtomicBool::new(true));
        let walker = SitemapWalker::new(&fetcher, &checkpoints, Throttle::none(), options())
            .with_cancel_flag(Arc::clone(&flag));

        let report = walker.run(LISTING_URL).await.unwrap();

        assert_eq!(report.outcome.stop_reason, StopReason::Cancelled);
        assert_eq!(report.outcome.indexes_visited, 0);
        assert!(checkpoints.snapshot().is_some());
    }

    #[tokio::test]
    async fn batches_flush_checkpoint() {
        let fetcher = MapFetcher::default()
            .ok(
                "https://example.org/index-0.xml",
                index_xml(&["https://example.org/s-0a.xml"]),
            )
            .ok(
                "https://example.org/s-0a.xml",
                sitemap_xml(&["A.1", "A.2", "A.3", "A.4"]),
            );
        let checkpoints = MemoryCheckpointStore::new();
        let walker = SitemapWalker::new(&fetcher, &checkpoints, Throttle::none(), options());

        let mut checkpoint = ProgressCheckpoint::new();
        walker
            .walk(&["https://example.org/index-0.xml".to_string()], &mut checkpoint)
            .await;

        // Two full batches, the finished index, and the final flush
        assert_eq!(checkpoints.save_count(), 4);
        assert_eq!(checkpoints.snapshot().unwrap().total_documents, 4);
    }

    /// Two root indexes with one sitemap of five entries each.
    fn two_index_tree() -> MapFetcher {
        MapFetcher::default()
            .ok(
                LISTING_URL,
                listing(&[
                    "https://example.org/index-0.xml",
                    "https://example.org/index-1.xml",
                ]),
            )
            .ok(
                "https://example.org/index-0.xml",
                index_xml(&["https://example.org/s-0a.xml"]),
            )
            .ok(
                "https://example.org/index-1.xml",
                index_xml(&["https://example.org/s-1a.xml"]),
            )
            .ok(
                "https://example.org/s-0a.xml",
                sitemap_xml(&["A.1", "A.2", "A.3", "A.4", "A.5"]),
            )
            .ok(
                "https://example.org/s-1a.xml",
                sitemap_xml(&["B.1", "B.2", "B.3", "B.4", "B.5"]),
            )
    }

    #[tokio::test]
    async fn resume_after_cap_counts_rescanned_index_once() {
        let fetcher = two_index_tree();
        let checkpoints = MemoryCheckpointStore::new();
        let documents = MemoryDocumentStore::new();
        let sink = DedupSink::new(&documents, context());

        let capped = SitemapWalker::new(
            &fetcher,
            &checkpoints,
            Throttle::none(),
            WalkOptions {
                max_documents: Some(3),
                ..options()
            },
        )
        .with_sink(&sink)
        .run(LISTING_URL)
        .await
        .unwrap();
        assert_eq!(capped.checkpoint.total_documents, 0);
        assert_eq!(capped.checkpoint.total_sitemaps, 0);
        assert_eq!(checkpoints.snapshot().unwrap().in_progress.documents, 3);

        let resumed = SitemapWalker::new(
            &fetcher,
            &checkpoints,
            Throttle::none(),
            WalkOptions {
                max_indexes: Some(1),
                ..options()
            },
        )
        .with_sink(&sink)
        .run(LISTING_URL)
        .await
        .unwrap();

        let cp = &resumed.checkpoint;
        assert_eq!(cp.processed_indexes, 1);
        assert_eq!(cp.total_sitemaps, 1);
        assert_eq!(cp.total_documents, 5);
        assert_eq!(cp.total_imported, 5);
        assert_eq!(cp.total_skipped, 3);
        assert_eq!(documents.len(), 5);

        let stats = Statistics::from_checkpoint(cp, cp.started_at + chrono::Duration::minutes(1));
        assert_eq!(stats.avg_docs_per_index, 5.0);
        assert_eq!(stats.extrapolated_total, Some(10.0));
    }

    #[tokio::test(start_paused = true)]
    async fn walk_pauses_after_each_fetch_and_batch() {
        let fetcher = MapFetcher::default()
            .ok(
                "https://example.org/index-0.xml",
                index_xml(&[
                    "https://example.org/s-0a.xml",
                    "https://example.org/s-0b.xml",
                ]),
            )
            .ok("https://example.org/s-0a.xml", sitemap_xml(&["A.1", "A.2", "A.3"]))
            .ok("https://example.org/s-0b.xml", sitemap_xml(&["B.1", "B.2", "B.3"]));
        let checkpoints = MemoryCheckpointStore::new();
        let walker =
            SitemapWalker::new(&fetcher, &checkpoints, Throttle::from_millis(100), options());

        let start = tokio::time::Instant::now();
        let mut checkpoint = ProgressCheckpoint::new();
        walker
            .walk(&["https://example.org/index-0.xml".to_string()], &mut checkpoint)
            .await;
        let elapsed = start.elapsed();

        // One root index, two sitemaps, three full batches of two
        assert!(elapsed >= Duration::from_millis(600), "{elapsed:?}");
        assert!(elapsed < Duration::from_millis(700), "{elapsed:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn run_pauses_after_listing_fetch() {
        let fetcher = MapFetcher::default()
            .ok(LISTING_URL, listing(&["https://example.org/index-0.xml"]))
            .ok(
                "https://example.org/index-0.xml",
                index_xml(&["https://example.org/s-0a.xml"]),
            )
            .ok("https://example.org/s-0a.xml", sitemap_xml(&["A.1", "A.2", "A.3"]));
        let checkpoints = MemoryCheckpointStore::new();
        let walker =
            SitemapWalker::new(&fetcher, &checkpoints, Throttle::from_millis(250), options());

        let start = tokio::time::Instant::now();
        walker.run(LISTING_URL).await.unwrap();
        let elapsed = start.elapsed();

        // Listing, root index, sitemap, one full batch
        assert!(elapsed >= Duration::from_millis(1000), "{elapsed:?}");
        assert!(elapsed < Duration::from_millis(1250), "{elapsed:?}");
    }
}
