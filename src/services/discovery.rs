// src/services/discovery.rs

//! Root index discovery from the site's robots listing.

use url::Url;

use crate::error::{AppError, Result};
use crate::services::Fetcher;
use crate::utils::resolve;

/// Directive introducing a root sitemap index in the listing.
pub const SITEMAP_DIRECTIVE: &str = "sitemap:";

/// Listing location for a site: `<origin>/robots.txt`.
pub fn listing_url_for(site: &str) -> Result<String> {
    let base = Url::parse(site)?;
    Ok(base.join("/robots.txt")?.to_string())
}

/// Extract root index URLs from listing text, in file order.
pub fn parse_listing(text: &str, listing_url: &str) -> Vec<String> {
    text.lines()
        .filter_map(|line| {
            let line = line.trim_start();
            let head = line.get(..SITEMAP_DIRECTIVE.len())?;
            if !head.eq_ignore_ascii_case(SITEMAP_DIRECTIVE) {
                return None;
            }
            let payload = line[SITEMAP_DIRECTIVE.len()..].trim();
            if payload.is_empty() {
                return None;
            }
            Some(resolve(listing_url, payload).unwrap_or_else(|| payload.to_string()))
        })
        .collect()
}

/// Fetch the listing and return its root sitemap indexes.
///
/// Failing to fetch the listing is fatal for the run.
pub async fn discover_root_indexes(fetcher: &dyn Fetcher, listing_url: &str) -> Result<Vec<String>> {
    let text = fetcher
        .fetch_text(listing_url)
        .await
        .map_err(|e| AppError::listing(listing_url, e))?;

    let roots = parse_listing(&text, listing_url);
    log::info!("Discovered {} root sitemap indexes", roots.len());
    Ok(roots)
}
