//! # Corpus Reader
//!
//! Parses citation export files into a normalized [`Corpus`].
//!
//! Two export formats are recognized, selected by the caller from the
//! uploaded file's extension (never sniffed from content):
//! - `.txt`: Web of Science / ISI tagged plain text ([`wos`])
//! - `.bib`: Scopus BibTeX ([`bibtex`])
//!
//! Both readers reduce records and references to the same [`MatchKey`]
//! shapes, so citation resolution is format independent.

pub mod bibtex;
pub mod wos;

use crate::primitives::MAX_FIELD_LENGTH;
use crate::{Corpus, Locator, MatchKey, PublicationRecord, RecordId, TreeError};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

lazy_static! {
    /// DOI as it appears in reference strings, with or without prefix.
    static ref DOI_PATTERN: Regex = Regex::new(
        r#"(?i)(?:doi[:\s]*|(?:https?://)?(?:dx\.)?doi\.org/)?(10\.\d{4,}/[^\s\]\)>,;"']+)"#
    )
    .expect("valid DOI pattern");

    /// Four-digit publication year between 1500 and 2099.
    static ref YEAR_PATTERN: Regex = Regex::new(r"\b(1[5-9]\d{2}|20\d{2})\b")
        .expect("valid year pattern");
}

// =============================================================================
// SOURCE FORMAT
// =============================================================================

/// Recognized citation export formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceFormat {
    /// Web of Science / ISI tagged plain text (`.txt`).
    WebOfScience,
    /// Scopus BibTeX export (`.bib`).
    Bibtex,
}

impl SourceFormat {
    /// Map a file extension (with or without leading dot) to a format.
    pub fn from_extension(ext: &str) -> Result<Self, TreeError> {
        let normalized = ext.trim().trim_start_matches('.').to_ascii_lowercase();
        match normalized.as_str() {
            "txt" => Ok(SourceFormat::WebOfScience),
            "bib" => Ok(SourceFormat::Bibtex),
            _ => Err(TreeError::UnsupportedFormat(if normalized.is_empty() {
                "(no extension)".to_string()
            } else {
                format!(".{}", normalized)
            })),
        }
    }

    /// Map a file name or path to a format using its extension.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, TreeError> {
        let ext = path
            .as_ref()
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default();
        Self::from_extension(ext)
    }
}

impl fmt::Display for SourceFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceFormat::WebOfScience => f.write_str("web_of_science"),
            SourceFormat::Bibtex => f.write_str("bibtex"),
        }
    }
}

// =============================================================================
// ENTRY POINT
// =============================================================================

/// Parse raw export bytes into a corpus.
///
/// Nothing is returned on failure: a malformed file never yields a partial
/// corpus.
pub fn parse(raw: &[u8], format: SourceFormat) -> Result<Corpus, TreeError> {
    let text = decode(raw);
    let records = match format {
        SourceFormat::WebOfScience => wos::parse_records(&text)?,
        SourceFormat::Bibtex => bibtex::parse_records(&text)?,
    };
    collect(records)
}

/// Gather parsed records into a corpus.
fn collect(records: Vec<PublicationRecord>) -> Result<Corpus, TreeError> {
    let mut corpus = Corpus::new();
    for record in records {
        corpus.push(record);
    }
    if corpus.duplicates_dropped() > 0 {
        tracing::warn!(
            duplicates = corpus.duplicates_dropped(),
            "corpus contained repeated record identifiers"
        );
    }
    Ok(corpus)
}

/// Fail once a reader has produced more than `limit` records.
fn check_record_limit(count: usize, limit: usize, line: usize) -> Result<(), TreeError> {
    if count > limit {
        return Err(TreeError::malformed(
            line,
            format!("file holds more than the {} records allowed", limit),
        ));
    }
    Ok(())
}

/// Decode bytes as UTF-8, falling back to Latin-1, and strip a BOM.
fn decode(raw: &[u8]) -> String {
    let raw = raw.strip_prefix(&[0xEF, 0xBB, 0xBF][..]).unwrap_or(raw);
    match std::str::from_utf8(raw) {
        Ok(text) => text.to_string(),
        Err(e) => {
            tracing::debug!(offset = e.valid_up_to(), "input is not UTF-8, reading it as Latin-1");
            raw.iter().copied().map(char::from).collect()
        }
    }
}

// =============================================================================
// NORMALIZATION HELPERS
// =============================================================================

/// Surname key of an author string.
///
/// Handles `"Surname, Given"`, `"Surname GI"` (WoS reference style) and
/// `"Surname"`: lowercased, letters and digits only.
pub fn surname_key(author: &str) -> String {
    let author = author.trim();
    let surname = match author.split_once(',') {
        Some((surname, _)) => surname.to_string(),
        None => {
            let mut tokens: Vec<&str> = author.split_whitespace().collect();
            if tokens.len() > 1 && tokens.last().is_some_and(|t| is_initials(t)) {
                tokens.pop();
            }
            tokens.join(" ")
        }
    };
    surname
        .chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Whether a token looks like author initials (`J`, `JA`, `J.A.`).
fn is_initials(token: &str) -> bool {
    let letters: Vec<char> = token.chars().filter(|c| *c != '.' && *c != '-').collect();
    !letters.is_empty() && letters.len() <= 3 && letters.iter().all(|c| c.is_uppercase())
}

/// Locator key of a page or volume string: `"P100-110"` → `"100"`.
pub fn locator_key(raw: &str) -> String {
    let trimmed = raw.trim();
    let trimmed = trimmed
        .strip_prefix("pp.")
        .or_else(|| trimmed.strip_prefix("p."))
        .unwrap_or(trimmed)
        .trim();
    let trimmed = match trimmed.chars().next() {
        Some('P' | 'V' | 'p' | 'v')
            if trimmed.chars().nth(1).is_some_and(|c| c.is_ascii_digit()) =>
        {
            &trimmed[1..]
        }
        _ => trimmed,
    };
    trimmed
        .split(['-', '–', ' ', '(', ','])
        .next()
        .unwrap_or_default()
        .chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

/// First DOI found in free text, normalized to lowercase without trailing punctuation.
pub fn find_doi(text: &str) -> Option<String> {
    let capture = DOI_PATTERN.captures(text)?.get(1)?;
    Some(normalize_doi(capture.as_str()))
}

/// Clean up a DOI string: strip URL prefixes and trailing punctuation, lowercase.
pub fn normalize_doi(doi: &str) -> String {
    let mut result = doi.trim().to_string();
    for prefix in ["https://doi.org/", "http://doi.org/", "https://dx.doi.org/", "http://dx.doi.org/", "doi:"] {
        if result.to_ascii_lowercase().starts_with(prefix) {
            result = result[prefix.len()..].trim().to_string();
        }
    }
    let trailing: &[char] = &['.', ',', ';', ':', ')', ']', '>', '"', '\'', ' '];
    while result.ends_with(trailing) {
        result.pop();
    }
    result.to_lowercase()
}

/// First plausible publication year found in free text.
pub fn find_year(text: &str) -> Option<i32> {
    YEAR_PATTERN
        .captures(text)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Resolution keys of a reference, most specific first.
///
/// A page locator is preferred to a volume locator; the bare author/year key
/// is only offered when the reference carries no locator at all.
pub fn reference_keys(
    doi: Option<String>,
    first_author: Option<&str>,
    year: Option<i32>,
    page: Option<&str>,
    volume: Option<&str>,
) -> Vec<MatchKey> {
    let mut keys = Vec::new();
    if let Some(doi) = doi.filter(|d| !d.is_empty()) {
        keys.push(MatchKey::Doi(doi));
    }
    let surname = first_author.map(surname_key).filter(|s| !s.is_empty());
    if let (Some(surname), Some(year)) = (surname, year) {
        let page = page.map(locator_key).filter(|l| !l.is_empty()).map(Locator::Page);
        let volume = volume
            .map(locator_key)
            .filter(|l| !l.is_empty())
            .map(Locator::Volume);
        let mut locators: Vec<Locator> = page.into_iter().chain(volume).collect();
        if locators.is_empty() {
            locators.push(Locator::Unspecified);
        }
        for locator in locators {
            keys.push(MatchKey::Citation {
                surname: surname.clone(),
                year,
                locator,
            });
        }
    }
    keys
}

/// Identifier for a record whose export carries none.
///
/// Uses the DOI, then the most specific citation key, then a title slug.
pub(crate) fn derived_id(record: &PublicationRecord) -> RecordId {
    if let Some(key) = record.match_keys().into_iter().next() {
        return RecordId::new(key.to_string());
    }
    let mut slug = String::new();
    for word in record
        .title
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
    {
        if !slug.is_empty() {
            slug.push('-');
        }
        slug.extend(word.chars().flat_map(char::to_lowercase));
        if slug.len() >= 80 {
            break;
        }
    }
    RecordId::new(format!("title:{}", slug))
}

/// Truncate an over-long field value at a character boundary.
pub(crate) fn clamp_field(value: &str) -> String {
    if value.len() <= MAX_FIELD_LENGTH {
        return value.to_string();
    }
    let mut end = MAX_FIELD_LENGTH;
    while !value.is_char_boundary(end) {
        end -= 1;
    }
    value[..end].to_string()
}

/// Parse a year field, tolerating surrounding text (`"2001a"`, `"(2001)"`).
pub(crate) fn parse_year(raw: &str) -> Option<i32> {
    raw.trim().parse().ok().or_else(|| find_year(raw))
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_mapping() {
        assert_eq!(
            SourceFormat::from_extension("txt").expect("txt"),
            SourceFormat::WebOfScience
        );
        assert_eq!(
            SourceFormat::from_extension(".BIB").expect("bib"),
            SourceFormat::Bibtex
        );
        assert!(matches!(
            SourceFormat::from_extension("pdf"),
            Err(TreeError::UnsupportedFormat(ext)) if ext == ".pdf"
        ));
        assert!(matches!(
            SourceFormat::from_path("savedrecs"),
            Err(TreeError::UnsupportedFormat(_))
        ));
        assert_eq!(
            SourceFormat::from_path("exports/savedrecs.txt").expect("path"),
            SourceFormat::WebOfScience
        );
    }

    #[test]
    fn surname_key_variants() {
        assert_eq!(surname_key("Smith, John A."), "smith");
        assert_eq!(surname_key("Smith JA"), "smith");
        assert_eq!(surname_key("de la Cruz J"), "delacruz");
        assert_eq!(surname_key("de la Cruz, J."), "delacruz");
        assert_eq!(surname_key("Aristotle"), "aristotle");
    }

    #[test]
    fn locator_key_variants() {
        assert_eq!(locator_key("P100"), "100");
        assert_eq!(locator_key("V12"), "12");
        assert_eq!(locator_key("pp. 100-110"), "100");
        assert_eq!(locator_key("100–110"), "100");
        assert_eq!(locator_key("e1234"), "e1234");
    }

    #[test]
    fn doi_extraction() {
        assert_eq!(
            find_doi("Smith J, 2001, NATURE, V410, P100, DOI 10.1038/35065000.").as_deref(),
            Some("10.1038/35065000")
        );
        assert_eq!(
            normalize_doi("https://doi.org/10.1000/ABC;"),
            "10.1000/abc"
        );
        assert!(find_doi("no identifier here").is_none());
    }

    #[test]
    fn reference_keys_prefer_locators() {
        let keys = reference_keys(None, Some("Smith J"), Some(2001), Some("P100"), Some("V4"));
        assert_eq!(keys.len(), 2);
        assert_eq!(keys[0].to_string(), "ref:smith|2001|p100");
        assert_eq!(keys[1].to_string(), "ref:smith|2001|v4");

        let bare = reference_keys(None, Some("Smith J"), Some(2001), None, None);
        assert_eq!(bare[0].to_string(), "ref:smith|2001|");

        assert!(reference_keys(None, None, Some(2001), None, None).is_empty());
    }

    #[test]
    fn decode_strips_bom() {
        let mut raw = vec![0xEF, 0xBB, 0xBF];
        raw.extend_from_slice("AU Müller".as_bytes());
        assert_eq!(decode(&raw), "AU Müller");
    }

    #[test]
    fn decode_falls_back_to_latin1() {
        assert_eq!(decode(b"AU M\xfcller, J\nTI Se\xf1al"), "AU Müller, J\nTI Señal");

        let mut raw = vec![0xEF, 0xBB, 0xBF];
        raw.extend_from_slice(b"PT J\xff");
        assert_eq!(decode(&raw), "PT J\u{ff}");
    }

    #[test]
    fn record_limit() {
        assert!(check_record_limit(3, 3, 9).is_ok());
        assert!(matches!(
            check_record_limit(4, 3, 9),
            Err(TreeError::MalformedInput { line: 9, .. })
        ));
    }

    #[test]
    fn latin1_export_keeps_accented_names() {
        let raw = b"PT J\nAU M\xfcller, J\nTI Se\xf1ales\nUT X\nER\n";
        let corpus = parse(raw, SourceFormat::WebOfScience).expect("parse");
        let record = corpus.records().first().expect("record");
        assert_eq!(record.title, "Se\u{f1}ales");
        assert_eq!(record.authors, vec!["M\u{fc}ller, J".to_string()]);
    }
}
