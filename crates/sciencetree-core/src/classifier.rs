//! # Classifier
//!
//! Turns scored vertices into [`ClassifiedNode`]s.
//!
//! - Vertices whose `root + trunk + leaf` is zero carry no signal and are dropped
//! - The group is the strict argmax of the three scores; any tie is a leaf
//! - Scalar side-channel fields are copied through, lists are not

use crate::graph::CitationGraph;
use crate::{ExtraValue, Locale, RecordId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Keys of the fixed node shape. Side-channel fields never shadow them.
pub const FIXED_FIELDS: &[&str] = &[
    "id",
    "label",
    "root",
    "trunk",
    "leaf",
    "total_value",
    "group",
    "type_label",
    "_sap",
    "year",
    "authors",
    "venue",
    "times_cited",
    "doi",
    "pmid",
    "arxiv_id",
    "url",
];

// =============================================================================
// GROUP
// =============================================================================

/// Structural role of a publication.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Group {
    /// Weight reachable through the works it cites dominates.
    Root,
    /// Cited and citing weight balance out.
    Trunk,
    /// Weight of the works citing it dominates.
    Leaf,
}

impl Group {
    /// Strict argmax over the three scores. Ties of any kind yield `Leaf`.
    #[must_use]
    pub fn from_scores(root: u64, trunk: u64, leaf: u64) -> Self {
        if root > trunk && root > leaf {
            Group::Root
        } else if trunk > root && trunk > leaf {
            Group::Trunk
        } else {
            Group::Leaf
        }
    }

    /// Human-readable label in the given locale.
    #[must_use]
    pub fn label(&self, locale: Locale) -> &'static str {
        match (locale, self) {
            (Locale::English, Group::Root) => "Root",
            (Locale::English, Group::Trunk) => "Trunk",
            (Locale::English, Group::Leaf) => "Leaf",
            (Locale::Spanish, Group::Root) => "Raíz",
            (Locale::Spanish, Group::Trunk) => "Tronco",
            (Locale::Spanish, Group::Leaf) => "Hoja",
        }
    }

    /// Machine-readable name.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Group::Root => "root",
            Group::Trunk => "trunk",
            Group::Leaf => "leaf",
        }
    }
}

impl fmt::Display for Group {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// CLASSIFIED NODE
// =============================================================================

/// One publication of the final tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassifiedNode {
    pub id: RecordId,
    /// Title of the publication.
    pub label: String,
    pub root: u64,
    pub trunk: u64,
    pub leaf: u64,
    pub total_value: u64,
    pub group: Group,
    pub type_label: String,
    /// Relevance score.
    #[serde(rename = "_sap")]
    pub sap: u64,
    pub year: Option<i32>,
    pub authors: Vec<String>,
    pub venue: Option<String>,
    pub times_cited: u64,
    pub doi: Option<String>,
    pub pmid: Option<String>,
    pub arxiv_id: Option<String>,
    pub url: Option<String>,
    /// Scalar source fields, flattened into the node object.
    #[serde(flatten)]
    pub extra: BTreeMap<String, ExtraValue>,
}

// =============================================================================
// CLASSIFICATION
// =============================================================================

/// Classify every scored vertex, in vertex order.
#[must_use]
pub fn classify(graph: &CitationGraph, locale: Locale) -> Vec<ClassifiedNode> {
    let mut nodes = Vec::new();
    let mut dropped = 0usize;

    for (_, vertex) in graph.vertices() {
        let scores = vertex.scores;
        let total_value = scores.total_value();
        if total_value == 0 {
            dropped = dropped.saturating_add(1);
            continue;
        }

        let record = &vertex.record;
        let group = Group::from_scores(scores.root, scores.trunk, scores.leaf);
        let extra = record
            .fields
            .iter()
            .filter(|(key, _)| !FIXED_FIELDS.contains(&key.as_str()))
            .filter_map(|(key, value)| value.to_scalar().map(|v| (key.clone(), v)))
            .collect();

        nodes.push(ClassifiedNode {
            id: record.id.clone(),
            label: record.title.clone(),
            root: scores.root,
            trunk: scores.trunk,
            leaf: scores.leaf,
            total_value,
            group,
            type_label: group.label(locale).to_string(),
            sap: scores.sap,
            year: record.year,
            authors: record.authors.clone(),
            venue: record.venue.clone(),
            times_cited: record.times_cited,
            doi: record.ids.doi.clone(),
            pmid: record.ids.pmid.clone(),
            arxiv_id: record.ids.arxiv_id.clone(),
            url: record.ids.url.clone(),
            extra,
        });
    }

    if dropped > 0 {
        tracing::debug!(dropped, kept = nodes.len(), "zero-value vertices dropped");
    }
    nodes
}

// =============================================================================
// TESTS
// =============================================================================
