// src/services/sitemap.rs

//! Targeted pattern extraction over sitemap XML.

use std::sync::OnceLock;

use regex::Regex;

use crate::utils::resolve;

fn loc_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?s)<(?:[\w.-]+:)?loc(?:\s[^>]*[^/>\s])?\s*>(.*?)</(?:[\w.-]+:)?loc\s*>")
            .expect("static loc pattern compiles")
    })
}

fn url_block_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?s)<(?:[\w.-]+:)?url(?:\s[^>]*[^/>\s])?\s*>.*?</(?:[\w.-]+:)?url\s*>")
            .expect("static url pattern compiles")
    })
}

/// Payloads of every `<loc>` element, in document order.
///
/// Relative locations are resolved against `base_url`.
pub fn extract_locations(xml: &str, base_url: &str) -> Vec<String> {
    loc_pattern()
        .captures_iter(xml)
        .filter_map(|caps| caps.get(1))
        .map(|m| text_content(m.as_str()))
        .filter(|loc| !loc.is_empty())
        .map(|loc| resolve(base_url, &loc).unwrap_or(loc))
        .collect()
}

/// Every `<url>…</url>` block, in document order.
pub fn extract_entries(xml: &str) -> Vec<&str> {
    url_block_pattern()
        .find_iter(xml)
        .map(|m| m.as_str())
        .collect()
}

/// Decode an element payload: unwrap CDATA, unescape entities, trim.
pub fn text_content(raw: &str) -> String {
    let trimmed = raw.trim();
    if let Some(inner) = trimmed
        .strip_prefix("<![CDATA[")
        .and_then(|rest| rest.strip_suffix("]]>"))
    {
        return inner.trim().to_string();
    }
    match quick_xml::escape::unescape(trimmed) {
        Ok(text) => text.trim().to_string(),
        Err(e) => {
            log::debug!("Keeping raw payload, unescape failed: {}", e);
            trimmed.to_string()
        }
    }
}
