//! Application configuration structures.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::models::DestinationContext;

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// HTTP and crawling behavior settings
    #[serde(default)]
    pub crawler: CrawlerConfig,

    /// Checkpoint location and flush cadence
    #[serde(default)]
    pub checkpoint: CheckpointConfig,

    /// Destination store settings
    #[serde(default)]
    pub destination: DestinationConfig,

    /// Sampled survey runs
    #[serde(default)]
    pub survey: SurveyConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.crawler.user_agent.trim().is_empty() {
            return Err(AppError::validation("crawler.user_agent is empty"));
        }
        if self.crawler.timeout_secs == 0 {
            return Err(AppError::validation("crawler.timeout_secs must be > 0"));
        }
        url::Url::parse(&self.crawler.listing_url).map_err(|e| {
            AppError::validation(format!(
                "crawler.listing_url '{}' is invalid: {e}",
                self.crawler.listing_url
            ))
        })?;
        if self.checkpoint.batch_size == 0 {
            return Err(AppError::validation("checkpoint.batch_size must be > 0"));
        }
        if self.destination.collection_id.trim().is_empty() {
            return Err(AppError::validation("destination.collection_id is empty"));
        }
        if self.destination.uploader_id.trim().is_empty() {
            return Err(AppError::validation("destination.uploader_id is empty"));
        }
        if self.survey.max_indexes == 0 {
            return Err(AppError::validation("survey.max_indexes must be > 0"));
        }
        Ok(())
    }
}

/// HTTP client and crawling behavior settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlerConfig {
    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Per-request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,

    /// Root listing (robots.txt) URL
    #[serde(default = "defaults::listing_url")]
    pub listing_url: String,

    /// Delay between units of work for ingest runs
    #[serde(default = "defaults::ingest_delay")]
    pub ingest_delay_ms: u64,

    /// Delay between units of work for survey runs
    #[serde(default = "defaults::survey_delay")]
    pub survey_delay_ms: u64,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::timeout(),
            listing_url: defaults::listing_url(),
            ingest_delay_ms: defaults::ingest_delay(),
            survey_delay_ms: defaults::survey_delay(),
        }
    }
}

/// Checkpoint persistence settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckpointConfig {
    /// Directory holding `<run>.checkpoint.json` files
    #[serde(default = "defaults::checkpoint_dir")]
    pub dir: PathBuf,

    /// Records between checkpoint flushes
    #[serde(default = "defaults::batch_size")]
    pub batch_size: usize,
}

impl Default for CheckpointConfig {
    fn default() -> Self {
        Self {
            dir: defaults::checkpoint_dir(),
            batch_size: defaults::batch_size(),
        }
    }
}

/// Destination store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DestinationConfig {
    /// Root directory of the local document store
    #[serde(default = "defaults::destination_root")]
    pub root: PathBuf,

    #[serde(default = "defaults::collection_id")]
    pub collection_id: String,

    #[serde(default = "defaults::uploader_id")]
    pub uploader_id: String,

    /// Summary length limit in grapheme clusters
    #[serde(default = "defaults::summary_graphemes")]
    pub summary_graphemes: usize,
}

impl DestinationConfig {
    pub fn context(&self) -> DestinationContext {
        DestinationContext {
            collection_id: self.collection_id.clone(),
            uploader_id: self.uploader_id.clone(),
            summary_graphemes: self.summary_graphemes,
        }
    }
}

impl Default for DestinationConfig {
    fn default() -> Self {
        Self {
            root: defaults::destination_root(),
            collection_id: defaults::collection_id(),
            uploader_id: defaults::uploader_id(),
            summary_graphemes: defaults::summary_graphemes(),
        }
    }
}

/// Sampled survey settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SurveyConfig {
    /// Root indexes visited by a survey unless overridden
    #[serde(default = "defaults::survey_max_indexes")]
    pub max_indexes: usize,
}

impl Default for SurveyConfig {
    fn default() -> Self {
        Self {
            max_indexes: defaults::survey_max_indexes(),
        }
    }
}

mod defaults {
    use std::path::PathBuf;

    // Crawler defaults
    pub fn user_agent() -> String {
        "Mozilla/5.0 (compatible; ecli-crawler/0.1)".into()
    }
    pub fn timeout() -> u64 {
        30
    }
    pub fn listing_url() -> String {
        "https://juportal.be/robots.txt".into()
    }
    pub fn ingest_delay() -> u64 {
        2000
    }
    pub fn survey_delay() -> u64 {
        100
    }

    // Checkpoint defaults
    pub fn checkpoint_dir() -> PathBuf {
        PathBuf::from("storage/checkpoints")
    }
    pub fn batch_size() -> usize {
        50
    }

    // Destination defaults
    pub fn destination_root() -> PathBuf {
        PathBuf::from("storage/documents")
    }
    pub fn collection_id() -> String {
        "ecli".into()
    }
    pub fn uploader_id() -> String {
        "ecli-crawler".into()
    }
    pub fn summary_graphemes() -> usize {
        500
    }

    // Survey defaults
    pub fn survey_max_indexes() -> usize {
        10
    }
}
