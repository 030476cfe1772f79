// src/services/parser.rs

//! Sitemap entry parser.
//!
//! Turns one `<url>…</url>` block into an [`EcliDocument`]. Element names
//! are matched by local name so any namespace prefix (`dcterms:`, `dc:`,
//! none) is accepted.

use regex::Regex;

use crate::error::{AppError, Result};
use crate::models::{Ecli, EcliDocument, LangMap, Language};
use crate::services::sitemap::text_content;

/// Compiled element patterns, built once per walker.
#[derive(Debug, Clone)]
pub struct EntryParser {
    identifier: Regex,
    urls: Regex,
    location: Regex,
    court: Regex,
    decision_date: Regex,
    issued_date: Regex,
    document_type: Regex,
    coverage: Regex,
    language: Regex,
    creator: Regex,
    subject: Regex,
    abstract_text: Regex,
    description: Regex,
    references: Regex,
    lang_attr: Regex,
}

/// One element occurrence: its attribute text and decoded payload.
struct Occurrence {
    attrs: String,
    text: String,
}

impl EntryParser {
    pub fn new() -> Self {
        Self {
            identifier: Self::element("isVersionOf"),
            urls: Self::element("identifier"),
            location: Self::element("loc"),
            court: Self::element("court"),
            decision_date: Self::element("date"),
            issued_date: Self::element("issued"),
            document_type: Self::element("type"),
            coverage: Self::element("coverage"),
            language: Self::element("language"),
            creator: Self::element("creator"),
            subject: Self::element("subject"),
            abstract_text: Self::element("abstract"),
            description: Self::element("description"),
            references: Self::element("references"),
            lang_attr: Regex::new(r#"(?:xml:lang|hreflang|lang)\s*=\s*["']([^"']+)["']"#)
                .expect("static lang attribute pattern compiles"),
        }
    }

    /// Pattern for a non-self-closing element with the given local name.
    ///
    /// Whitespace is allowed before `>`; `<name/>` and `<name />` never match.
    fn element(local_name: &str) -> Regex {
        let pattern = format!(
            r"(?s)<(?:[\w.-]+:)?{name}(\s[^>]*[^/>\s])?\s*>(.*?)</(?:[\w.-]+:)?{name}\s*>",
            name = regex::escape(local_name)
        );
        Regex::new(&pattern).expect("element pattern built from escaped name compiles")
    }

    /// Parse one sitemap entry.
    ///
    /// Returns `Ok(None)` when the entry has no identifier; such entries are
    /// dropped without being treated as failures. An identifier that is
    /// present but not a valid ECLI is an error.
    pub fn parse_entry(&self, raw: &str) -> Result<Option<EcliDocument>> {
        let Some(raw_identifier) = self.first(&self.identifier, raw) else {
            return Ok(None);
        };
        let identifier: Ecli = raw_identifier.parse().map_err(AppError::Parse)?;

        let mut doc = EcliDocument::new(identifier);
        doc.urls = self.lang_map(&self.urls, raw);
        doc.location = self.first(&self.location, raw);
        doc.court = self.first(&self.court, raw);
        doc.decision_date = self.first(&self.decision_date, raw);
        doc.issued_date = self.first(&self.issued_date, raw);
        doc.document_type = self.first(&self.document_type, raw);
        doc.jurisdiction_coverage = self.first(&self.coverage, raw);
        doc.authoritative_languages = self
            .all(&self.language, raw)
            .filter_map(|occ| match occ.text.parse::<Language>() {
                Ok(lang) => Some(lang),
                Err(e) => {
                    log::debug!("{}: {}", doc.identifier, e);
                    None
                }
            })
            .collect();
        doc.creator = self.lang_map(&self.creator, raw);
        doc.subject = self.lang_map(&self.subject, raw);
        doc.abstract_text = self.lang_map(&self.abstract_text, raw);
        doc.description_text = self.lang_map(&self.description, raw);
        doc.references = self.all(&self.references, raw).map(|occ| occ.text).collect();

        Ok(Some(doc))
    }

    /// Non-empty occurrences of an element, in source order.
    fn all<'a>(&self, pattern: &'a Regex, raw: &'a str) -> impl Iterator<Item = Occurrence> + 'a {
        pattern.captures_iter(raw).filter_map(|caps| {
            let text = text_content(caps.get(2)?.as_str());
            if text.is_empty() {
                return None;
            }
            Some(Occurrence {
                attrs: caps.get(1).map_or(String::new(), |m| m.as_str().to_string()),
                text,
            })
        })
    }

    fn first(&self, pattern: &Regex, raw: &str) -> Option<String> {
        self.all(pattern, raw).next().map(|occ| occ.text)
    }

    /// Language-tagged occurrences; untagged or unsupported ones are skipped.
    fn lang_map(&self, pattern: &Regex, raw: &str) -> LangMap {
        let mut map = LangMap::new();
        for occ in self.all(pattern, raw) {
            let lang = self
                .lang_attr
                .captures(&occ.attrs)
                .and_then(|caps| caps.get(1))
                .and_then(|code| code.as_str().parse::<Language>().ok());
            if let Some(lang) = lang {
                map.insert(lang, occ.text);
            }
        }
        map
    }
}

impl Default for EntryParser {
    fn default() -> Self {
        Self::new()
    }
}
