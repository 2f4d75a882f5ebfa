//! # sciencetree-core
//!
//! The deterministic citation-tree engine for Science Tree - THE LOGIC.
//!
//! This crate turns one bibliographic export file (Web of Science plain text
//! or Scopus BibTeX) into a tree of publications classified as roots
//! (works whose weight lies mostly in the chain of works they cite),
//! trunks (balanced between citing and being cited) and leaves (works whose
//! weight lies mostly in the works citing them), each with a relevance score.
//!
//! ## Architectural Constraints
//!
//! The core:
//! - Is pure: no async, no network, no filesystem access
//! - Is deterministic: `BTreeMap`/`BTreeSet` only, integer scoring
//! - Is stateless: every call owns its corpus, graph and result
//! - Never panics: every failure is a [`TreeError`]

// =============================================================================
// MODULES
// =============================================================================

pub mod classifier;
pub mod compositor;
pub mod export;
pub mod formats;
pub mod graph;
pub mod pipeline;
pub mod primitives;
pub mod reduction;
pub mod statistics;
pub mod types;

// =============================================================================
// RE-EXPORTS: Core Types (from types module)
// =============================================================================

pub use types::{
    Corpus, ExternalIds, ExtraValue, FieldValue, Locale, Locator, MatchKey, PublicationRecord,
    RecordId, Reference, TreeError, TreeOptions, VertexId,
};

// =============================================================================
// RE-EXPORTS: Tree Engine
// =============================================================================

pub use classifier::{ClassifiedNode, Group, classify};
pub use compositor::{Link, TreeMetadata, TreeResult, collect_links, compose, compose_at};
pub use graph::{CitationGraph, StructuralScores, Vertex, build_graph};
pub use pipeline::{CorpusReport, generate_tree, generate_tree_with, inspect};
pub use reduction::{Budget, reduce};
pub use statistics::{StatisticsAccumulator, TreeStatistics, aggregate};

// =============================================================================
// RE-EXPORTS: Formats (from formats module)
// =============================================================================

pub use formats::{SourceFormat, parse};
