//! Shared helpers.

pub mod http;
pub mod report;

use url::Url;

/// Absolute form of a sitemap location found in a document at `base_url`.
///
/// Absolute locations pass through unchanged. Returns `None` when neither
/// the base nor the joined location is a valid URL.
pub fn resolve(base_url: &str, location: &str) -> Option<String> {
    if let Ok(absolute) = Url::parse(location) {
        return Some(absolute.to_string());
    }
    let joined = Url::parse(base_url).ok()?.join(location).ok()?;
    Some(joined.to_string())
}
