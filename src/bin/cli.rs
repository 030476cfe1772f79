//! ECLI Crawler CLI
//!
//! Local execution entry point.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::Utc;
use clap::{Parser, Subcommand, ValueEnum};
use ecli_crawler::{
    error::Result,
    models::Config,
    pipeline::{self, Statistics},
    services::{
        HttpFetcher, Throttle, WalkOptions, discover_root_indexes, discovery::listing_url_for,
    },
    storage::{CheckpointStore, FileCheckpointStore, LocalDocumentStore},
    utils::report,
};

/// ecli-crawler - ECLI sitemap crawler
#[derive(Parser, Debug)]
#[command(
    name = "ecli-crawler",
    version,
    about = "Crawl ECLI sitemaps and ingest case-law metadata"
)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "storage/config.toml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Walk every root index and ingest all records
    Ingest {
        /// First root index to visit (a retained checkpoint may start later)
        #[arg(long, default_value_t = 0)]
        start_offset: usize,

        /// Root indexes to visit in this run
        #[arg(long)]
        max_indexes: Option<usize>,

        /// Records to ingest in this run
        #[arg(long)]
        max_documents: Option<usize>,

        /// Pause between requests in milliseconds
        #[arg(long)]
        delay_ms: Option<u64>,

        /// Records between checkpoint saves
        #[arg(long)]
        batch_size: Option<usize>,
    },

    /// Sample a few root indexes and extrapolate the corpus size
    Survey {
        /// Root indexes to sample
        #[arg(long)]
        max_indexes: Option<usize>,

        /// Pause between requests in milliseconds
        #[arg(long)]
        delay_ms: Option<u64>,
    },

    /// List the root sitemap indexes
    Discover {
        /// Site to inspect instead of the configured listing
        #[arg(long)]
        site: Option<String>,
    },

    /// Show statistics of a retained checkpoint
    Stats {
        #[arg(long, value_enum, default_value_t = RunKind::Ingest)]
        run: RunKind,
    },

    /// Delete a retained checkpoint
    Reset {
        #[arg(long, value_enum, default_value_t = RunKind::Ingest)]
        run: RunKind,
    },

    /// Validate the configuration file
    Validate,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum RunKind {
    Ingest,
    Survey,
}

impl RunKind {
    fn checkpoint_name(self) -> &'static str {
        match self {
            RunKind::Ingest => "ingest",
            RunKind::Survey => "survey",
        }
    }
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

/// Flag flipped by Ctrl-C; the walker stops at the next unit of work.
fn install_cancel_handler() -> Arc<AtomicBool> {
    let flag = Arc::new(AtomicBool::new(false));
    let handler_flag = Arc::clone(&flag);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::warn!("Interrupt received, stopping after the current step...");
            handler_flag.store(true, Ordering::Relaxed);
        }
    });
    flag
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = Config::load_or_default(&cli.config);
    log::debug!("Configuration: {:?}", config);

    match cli.command {
        Command::Ingest {
            start_offset,
            max_indexes,
            max_documents,
            delay_ms,
            batch_size,
        } => {
            config.validate()?;
            let fetcher = HttpFetcher::from_config(&config.crawler)?;
            let checkpoints =
                FileCheckpointStore::new(&config.checkpoint.dir, RunKind::Ingest.checkpoint_name());
            let documents = LocalDocumentStore::new(&config.destination.root);

            let options = WalkOptions {
                start_offset,
                max_indexes,
                max_documents,
                batch_size: batch_size.unwrap_or(config.checkpoint.batch_size),
            };
            let throttle =
                Throttle::from_millis(delay_ms.unwrap_or(config.crawler.ingest_delay_ms));

            pipeline::run_ingest(
                &config,
                &fetcher,
                &checkpoints,
                &documents,
                options,
                throttle,
                Some(install_cancel_handler()),
            )
            .await?;
        }

        Command::Survey {
            max_indexes,
            delay_ms,
        } => {
            config.validate()?;
            let fetcher = HttpFetcher::from_config(&config.crawler)?;
            let checkpoints =
                FileCheckpointStore::new(&config.checkpoint.dir, RunKind::Survey.checkpoint_name());
            let throttle =
                Throttle::from_millis(delay_ms.unwrap_or(config.crawler.survey_delay_ms));

            pipeline::run_survey(
                &config,
                &fetcher,
                &checkpoints,
                max_indexes.unwrap_or(config.survey.max_indexes),
                throttle,
                Some(install_cancel_handler()),
            )
            .await?;
        }

        Command::Discover { site } => {
            let listing_url = match site {
                Some(site) => listing_url_for(&site)?,
                None => config.crawler.listing_url.clone(),
            };
            let fetcher = HttpFetcher::from_config(&config.crawler)?;
            let roots = discover_root_indexes(&fetcher, &listing_url).await?;
            report::header("Root sitemap indexes");
            for (i, url) in roots.iter().enumerate() {
                report::sub_item(&format!("{:>5}  {}", i, url));
            }
        }

        Command::Stats { run } => {
            let checkpoints = FileCheckpointStore::new(&config.checkpoint.dir, run.checkpoint_name());
            match checkpoints.load().await? {
                Some(checkpoint) => {
                    let stats = Statistics::from_checkpoint(&checkpoint, Utc::now());
                    report::header(&format!("{} checkpoint", run.checkpoint_name()));
                    report::sub_item(&format!("File: {}", checkpoints.path().display()));
                    report::sub_item(&format!("Started: {}", checkpoint.started_at));
                    report::sub_item(&format!("Updated: {}", checkpoint.updated_at));
                    report::summary("Statistics", &stats.report());
                    for error in checkpoint.errors.iter().rev().take(10) {
                        report::sub_item(&error.describe());
                    }
                }
                None => log::info!("No retained {} checkpoint.", run.checkpoint_name()),
            }
        }

        Command::Reset { run } => {
            let checkpoints = FileCheckpointStore::new(&config.checkpoint.dir, run.checkpoint_name());
            checkpoints.clear().await?;
            report::success(&format!(
                "Cleared {} checkpoint at {}",
                run.checkpoint_name(),
                checkpoints.path().display()
            ));
        }

        Command::Validate => {
            log::info!("Validating configuration...");

            if let Err(e) = config.validate() {
                log::error!("Config validation failed: {}", e);
                return Err(e);
            }
            report::success("Config OK");
            report::sub_item(&format!("User agent: {}", config.crawler.user_agent));
            report::sub_item(&format!("Timeout: {}s", config.crawler.timeout_secs));
            report::sub_item(&format!("Listing: {}", config.crawler.listing_url));
            report::sub_item(&format!("Checkpoints: {}", config.checkpoint.dir.display()));
            report::sub_item(&format!(
                "Destination: {} ({})",
                config.destination.root.display(),
                config.destination.collection_id
            ));
        }
    }

    Ok(())
}
