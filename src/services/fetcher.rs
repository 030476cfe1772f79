// src/services/fetcher.rs

//! Rate-limited fetch client.
//!
//! One request is in flight at a time; the walker calls [`Throttle::pause`]
//! after every sitemap, index and batch before issuing the next request.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use thiserror::Error;

use crate::error::Result;
use crate::models::CrawlerConfig;
use crate::utils::http;

/// Classified failure of a single retrieval.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// Connection, DNS, TLS or body read failure
    #[error("unreachable: {0}")]
    Unreachable(String),

    /// Server answered with a non-2xx status
    #[error("HTTP status {0}")]
    HttpStatus(u16),

    /// Per-request timeout elapsed
    #[error("timed out")]
    Timeout,
}

impl FetchError {
    fn from_reqwest(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            Self::Timeout
        } else if let Some(status) = error.status() {
            Self::HttpStatus(status.as_u16())
        } else {
            Self::Unreachable(error.to_string())
        }
    }
}

/// Retrieves a resource as text.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch_text(&self, url: &str) -> std::result::Result<String, FetchError>;
}

/// [`Fetcher`] backed by a shared reqwest client.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Build a fetcher with the configured user agent and timeout.
    pub fn from_config(config: &CrawlerConfig) -> Result<Self> {
        Ok(Self::new(http::create_client(config)?))
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch_text(&self, url: &str) -> std::result::Result<String, FetchError> {
        log::debug!("GET {}", url);
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(FetchError::from_reqwest)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::HttpStatus(status.as_u16()));
        }

        response.text().await.map_err(FetchError::from_reqwest)
    }
}

/// Inter-request delay applied between units of work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Throttle {
    delay: Duration,
}

impl Throttle {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }

    pub fn from_millis(delay_ms: u64) -> Self {
        Self::new(Duration::from_millis(delay_ms))
    }

    /// No delay at all.
    pub fn none() -> Self {
        Self::new(Duration::ZERO)
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Suspend for the configured delay.
    pub async fn pause(&self) {
        if self.delay.as_millis() > 0 {
            tokio::time::sleep(self.delay).await;
        }
    }
}
