//! ECLI document record and its language-keyed fields.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Languages a sitemap entry may carry text in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Fr,
    Nl,
    De,
    En,
}

impl Language {
    pub const ALL: [Language; 4] = [Language::Fr, Language::Nl, Language::De, Language::En];

    /// Order used when a single value must be picked from a [`LangMap`].
    pub const CANONICAL_ORDER: [Language; 3] = [Language::Fr, Language::Nl, Language::De];

    pub fn code(&self) -> &'static str {
        match self {
            Language::Fr => "fr",
            Language::Nl => "nl",
            Language::De => "de",
            Language::En => "en",
        }
    }

    fn slot(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Language {
    type Err = String;

    /// Accepts bare codes and regional tags (`fr-BE`, `nl_be`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let primary = s
            .trim()
            .split(['-', '_'])
            .next()
            .unwrap_or_default()
            .to_ascii_lowercase();
        match primary.as_str() {
            "fr" | "fra" | "fre" => Ok(Language::Fr),
            "nl" | "nld" | "dut" => Ok(Language::Nl),
            "de" | "deu" | "ger" => Ok(Language::De),
            "en" | "eng" => Ok(Language::En),
            _ => Err(format!("unsupported language code '{s}'")),
        }
    }
}

/// Fixed-size mapping from [`Language`] to optional text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    from = "BTreeMap<Language, String>",
    into = "BTreeMap<Language, String>"
)]
pub struct LangMap {
    slots: [Option<String>; 4],
}

impl LangMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, lang: Language) -> Option<&str> {
        self.slots[lang.slot()].as_deref()
    }

    /// Set the value for a language, replacing any earlier one.
    pub fn insert(&mut self, lang: Language, value: impl Into<String>) {
        self.slots[lang.slot()] = Some(value.into());
    }

    pub fn is_empty(&self) -> bool {
        self.slots.iter().all(Option::is_none)
    }

    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Language, &str)> {
        Language::ALL
            .into_iter()
            .filter_map(|lang| self.get(lang).map(|v| (lang, v)))
    }

    /// French, then Dutch, then German. English is never selected.
    pub fn canonical_entry(&self) -> Option<(Language, &str)> {
        Language::CANONICAL_ORDER
            .into_iter()
            .find_map(|lang| self.get(lang).map(|v| (lang, v)))
    }

    /// Canonical text, or the empty string when no canonical language is present.
    pub fn canonical(&self) -> &str {
        self.canonical_entry().map_or("", |(_, v)| v)
    }
}

impl From<BTreeMap<Language, String>> for LangMap {
    fn from(map: BTreeMap<Language, String>) -> Self {
        let mut out = LangMap::new();
        for (lang, value) in map {
            out.insert(lang, value);
        }
        out
    }
}

impl From<LangMap> for BTreeMap<Language, String> {
    fn from(map: LangMap) -> Self {
        Language::ALL
            .into_iter()
            .zip(map.slots)
            .filter_map(|(lang, value)| value.map(|v| (lang, v)))
            .collect()
    }
}

/// A parsed European Case-Law Identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Ecli {
    pub country: String,
    pub court: String,
    pub year: u16,
    pub serial: String,
}

fn ecli_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?i)^ECLI:([A-Z]{2}):([A-Z0-9.]{1,7}):(\d{4}):([A-Z0-9.]{1,25})$")
            .expect("static ECLI pattern compiles")
    })
}

impl FromStr for Ecli {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let caps = ecli_pattern()
            .captures(s.trim())
            .ok_or_else(|| format!("'{s}' is not a valid ECLI"))?;
        let year = caps[3]
            .parse()
            .map_err(|e| format!("invalid year in '{s}': {e}"))?;
        Ok(Ecli {
            country: caps[1].to_ascii_uppercase(),
            court: caps[2].to_ascii_uppercase(),
            year,
            serial: caps[4].to_ascii_uppercase(),
        })
    }
}

impl TryFrom<String> for Ecli {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Ecli> for String {
    fn from(ecli: Ecli) -> Self {
        ecli.to_string()
    }
}

impl fmt::Display for Ecli {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ECLI:{}:{}:{:04}:{}",
            self.country, self.court, self.year, self.serial
        )
    }
}

/// One case-law record parsed from a sitemap `<url>` entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EcliDocument {
    pub identifier: Ecli,

    /// Source URL per language
    #[serde(default)]
    pub urls: LangMap,

    /// The entry's own `<loc>`, if any
    #[serde(default)]
    pub location: Option<String>,

    #[serde(default)]
    pub court: Option<String>,
    #[serde(default)]
    pub decision_date: Option<String>,
    #[serde(default)]
    pub issued_date: Option<String>,
    #[serde(default)]
    pub document_type: Option<String>,
    #[serde(default)]
    pub jurisdiction_coverage: Option<String>,

    /// Languages marked authoritative, in source order
    #[serde(default)]
    pub authoritative_languages: Vec<Language>,

    #[serde(default)]
    pub creator: LangMap,
    #[serde(default)]
    pub subject: LangMap,
    #[serde(default)]
    pub abstract_text: LangMap,
    #[serde(default)]
    pub description_text: LangMap,

    /// Related identifiers, in source order
    #[serde(default)]
    pub references: Vec<String>,
}

impl EcliDocument {
    pub fn new(identifier: Ecli) -> Self {
        Self {
            identifier,
            urls: LangMap::new(),
            location: None,
            court: None,
            decision_date: None,
            issued_date: None,
            document_type: None,
            jurisdiction_coverage: None,
            authoritative_languages: Vec::new(),
            creator: LangMap::new(),
            subject: LangMap::new(),
            abstract_text: LangMap::new(),
            description_text: LangMap::new(),
            references: Vec::new(),
        }
    }

    /// Canonical source URL, falling back to the entry location.
    pub fn canonical_url(&self) -> Option<&str> {
        self.urls
            .canonical_entry()
            .map(|(_, url)| url)
            .or(self.location.as_deref())
    }
}
