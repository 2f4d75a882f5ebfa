//! # Core Type Definitions
//!
//! This module contains the shared types of the science tree engine:
//! - Identifiers (`RecordId`, `VertexId`)
//! - Parsed bibliographic data (`PublicationRecord`, `Reference`, `Corpus`)
//! - The typed attribute side channel (`FieldValue`, `ExtraValue`)
//! - Caller options (`TreeOptions`, `Locale`)
//! - Error types (`TreeError`)
//!
//! ## Determinism Guarantees
//!
//! All collections are `BTreeMap`/`BTreeSet` or insertion-ordered `Vec`s.
//! Identifiers implement `Ord` so every iteration order is reproducible.

use crate::primitives::{DEFAULT_CITATION_WEIGHT_STEP, DEFAULT_REDUCTION_BUDGET};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use thiserror::Error;

// =============================================================================
// IDENTIFIERS
// =============================================================================

/// Stable identifier of a publication, derived from the source data.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(pub String);

impl RecordId {
    /// Create a new record identifier.
    #[must_use]
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Arena index of a vertex inside a [`crate::CitationGraph`].
///
/// Assigned in corpus order, never reused within one graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct VertexId(pub u32);

// =============================================================================
// MATCH KEYS
// =============================================================================

/// Key used to resolve a cited work against the records of a corpus.
///
/// Both export formats reduce their records and their references to the
/// same key shapes, so resolution does not depend on the source format.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum MatchKey {
    /// Lowercased DOI.
    Doi(String),
    /// First-author surname, year and a locator.
    Citation {
        surname: String,
        year: i32,
        locator: Locator,
    },
}

/// Position of a work inside its venue.
///
/// A page only ever matches a page and a volume only a volume.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Locator {
    /// First page (or article number).
    Page(String),
    Volume(String),
    /// Author and year alone.
    Unspecified,
}

impl fmt::Display for MatchKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchKey::Doi(doi) => write!(f, "doi:{}", doi),
            MatchKey::Citation {
                surname,
                year,
                locator,
            } => write!(f, "ref:{}|{}|{}", surname, year, locator),
        }
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Locator::Page(page) => write!(f, "p{}", page),
            Locator::Volume(volume) => write!(f, "v{}", volume),
            Locator::Unspecified => Ok(()),
        }
    }
}

// =============================================================================
// ATTRIBUTE SIDE CHANNEL
// =============================================================================

/// A source field that has no dedicated slot in [`PublicationRecord`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Null,
    Bool(bool),
    Number(i64),
    Text(String),
    /// Multi-valued field. Compound values never reach the output nodes.
    List(Vec<String>),
}

impl FieldValue {
    /// Interpret a single raw value: integers become numbers, the rest text.
    #[must_use]
    pub fn from_raw(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return FieldValue::Null;
        }
        match trimmed.parse::<i64>() {
            Ok(n) if !trimmed.starts_with('+') && !(trimmed.starts_with('0') && trimmed.len() > 1) => {
                FieldValue::Number(n)
            }
            _ => FieldValue::Text(trimmed.to_string()),
        }
    }

    /// Scalar projection used by the classifier. Lists yield `None`.
    #[must_use]
    pub fn to_scalar(&self) -> Option<ExtraValue> {
        match self {
            FieldValue::Null => Some(ExtraValue::Null),
            FieldValue::Bool(b) => Some(ExtraValue::Bool(*b)),
            FieldValue::Number(n) => Some(ExtraValue::Number(*n)),
            FieldValue::Text(s) => Some(ExtraValue::Text(s.clone())),
            FieldValue::List(_) => None,
        }
    }
}

/// A scalar attribute copied through to a classified node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ExtraValue {
    Null,
    Bool(bool),
    Number(i64),
    Text(String),
}

// =============================================================================
// PUBLICATION RECORD
// =============================================================================

/// External identifiers of a publication. All optional.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ExternalIds {
    pub doi: Option<String>,
    pub pmid: Option<String>,
    pub arxiv_id: Option<String>,
    pub url: Option<String>,
}

/// One cited work, as written in the source file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reference {
    /// The reference text exactly as exported.
    pub raw: String,
    /// Keys tried in order when resolving this reference.
    pub keys: Vec<MatchKey>,
}

impl Reference {
    /// Create a reference from its raw text and resolution keys.
    #[must_use]
    pub fn new(raw: impl Into<String>, keys: Vec<MatchKey>) -> Self {
        Self {
            raw: raw.into(),
            keys,
        }
    }
}

/// One bibliographic entry extracted from an export file.
///
/// Created by the corpus reader and never modified afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicationRecord {
    pub id: RecordId,
    pub title: String,
    pub authors: Vec<String>,
    pub year: Option<i32>,
    pub venue: Option<String>,
    pub ids: ExternalIds,
    /// Citation count reported by the export (0 when absent).
    pub times_cited: u64,
    pub volume: Option<String>,
    pub first_page: Option<String>,
    /// Cited works in source order. May point outside the corpus.
    pub references: Vec<Reference>,
    /// Remaining source fields, keyed by their source tag or field name.
    pub fields: BTreeMap<String, FieldValue>,
}

impl PublicationRecord {
    /// Create a record with only the required attributes set.
    #[must_use]
    pub fn new(id: RecordId, title: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            authors: Vec::new(),
            year: None,
            venue: None,
            ids: ExternalIds::default(),
            times_cited: 0,
            volume: None,
            first_page: None,
            references: Vec::new(),
            fields: BTreeMap::new(),
        }
    }

    /// Keys under which other records may cite this one, most specific first.
    #[must_use]
    pub fn match_keys(&self) -> Vec<MatchKey> {
        let mut keys = Vec::new();
        if let Some(doi) = &self.ids.doi {
            keys.push(MatchKey::Doi(doi.to_lowercase()));
        }
        let surname = self
            .authors
            .first()
            .map(|a| crate::formats::surname_key(a))
            .filter(|s| !s.is_empty());
        if let (Some(surname), Some(year)) = (surname, self.year) {
            let page = self
                .first_page
                .as_deref()
                .map(crate::formats::locator_key)
                .filter(|l| !l.is_empty())
                .map(Locator::Page);
            let volume = self
                .volume
                .as_deref()
                .map(crate::formats::locator_key)
                .filter(|l| !l.is_empty())
                .map(Locator::Volume);
            for locator in page
                .into_iter()
                .chain(volume)
                .chain(std::iter::once(Locator::Unspecified))
            {
                keys.push(MatchKey::Citation {
                    surname: surname.clone(),
                    year,
                    locator,
                });
            }
        }
        keys
    }
}

// =============================================================================
// CORPUS
// =============================================================================

/// The normalized set of records parsed from one file.
///
/// Records keep file order. A second record with an already seen identifier
/// is dropped and counted.
#[derive(Debug, Clone, Default)]
pub struct Corpus {
    records: Vec<PublicationRecord>,
    seen: BTreeSet<RecordId>,
    duplicates_dropped: usize,
}

impl Corpus {
    /// Create an empty corpus.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a record. Returns `false` if its identifier was already present.
    pub fn push(&mut self, record: PublicationRecord) -> bool {
        if !self.seen.insert(record.id.clone()) {
            self.duplicates_dropped = self.duplicates_dropped.saturating_add(1);
            return false;
        }
        self.records.push(record);
        true
    }

    /// Records in file order.
    #[must_use]
    pub fn records(&self) -> &[PublicationRecord] {
        &self.records
    }

    /// Number of distinct records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the corpus holds no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Number of records dropped because their identifier repeated.
    #[must_use]
    pub fn duplicates_dropped(&self) -> usize {
        self.duplicates_dropped
    }

    /// Total references across all records, resolvable or not.
    #[must_use]
    pub fn reference_count(&self) -> usize {
        self.records.iter().map(|r| r.references.len()).sum()
    }

    /// Consume the corpus, yielding its records.
    #[must_use]
    pub fn into_records(self) -> Vec<PublicationRecord> {
        self.records
    }
}

// =============================================================================
// OPTIONS
// =============================================================================

/// Language of the human-readable type labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Locale {
    #[default]
    #[serde(rename = "en")]
    English,
    #[serde(rename = "es")]
    Spanish,
}

/// Caller-tunable knobs of one generation run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TreeOptions {
    /// Language of `type_label`.
    pub locale: Locale,
    /// Upper bound on reduction work.
    pub reduction_budget: u64,
    /// Divisor applied to external citation counts to obtain evidence weight.
    pub citation_weight_step: u64,
}

impl Default for TreeOptions {
    fn default() -> Self {
        Self {
            locale: Locale::English,
            reduction_budget: DEFAULT_REDUCTION_BUDGET,
            citation_weight_step: DEFAULT_CITATION_WEIGHT_STEP,
        }
    }
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors that can occur while generating a science tree.
///
/// - No silent failures
/// - Field-level problems are recovered with defaults and never reach here
/// - The core never panics; every failure is a variant of this enum
#[derive(Debug, Error)]
pub enum TreeError {
    /// The declared file type is not one of the recognized export formats.
    #[error("Unsupported format: {0} (expected .txt Web of Science export or .bib BibTeX export)")]
    UnsupportedFormat(String),

    /// The file claims a supported format but does not follow its grammar.
    #[error("Malformed input (line {line}): {message}")]
    MalformedInput { line: usize, message: String },

    /// Parsing succeeded but no classifiable citation structure emerged.
    #[error(
        "Empty tree: no publication cites another publication of the same file; \
         upload a corpus with more cross-cited records"
    )]
    EmptyTree,

    /// Unexpected failure during graph construction or reduction.
    #[error("Processing error: {0}")]
    Processing(String),

    /// An I/O error occurred (shell layer only).
    #[error("I/O error: {0}")]
    Io(String),

    /// A serialization or deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl TreeError {
    /// Shorthand for [`TreeError::MalformedInput`].
    #[must_use]
    pub fn malformed(line: usize, message: impl Into<String>) -> Self {
        TreeError::MalformedInput {
            line,
            message: message.into(),
        }
    }

    /// Stable machine-readable name of the error kind.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            TreeError::UnsupportedFormat(_) => "unsupported_format",
            TreeError::MalformedInput { .. } => "malformed_input",
            TreeError::EmptyTree => "empty_tree",
            TreeError::Processing(_) => "processing_error",
            TreeError::Io(_) => "io_error",
            TreeError::Serialization(_) => "serialization_error",
        }
    }

    /// Whether the uploader can fix the problem by changing the file.
    #[must_use]
    pub fn is_user_correctable(&self) -> bool {
        matches!(
            self,
            TreeError::UnsupportedFormat(_) | TreeError::MalformedInput { .. } | TreeError::EmptyTree
        )
    }
}

// =============================================================================
// TESTS
// =============================================================================
