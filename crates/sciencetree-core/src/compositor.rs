//! # Compositor
//!
//! Output assembly for the science tree.
//!
//! - Nodes are ordered by relevance, highest first; ties keep vertex order
//! - Links are kept only between emitted nodes
//! - No formatting logic here: rendering lives in [`crate::export`]

use crate::classifier::ClassifiedNode;
use crate::formats::SourceFormat;
use crate::graph::CitationGraph;
use crate::primitives::ALGORITHM_VERSION;
use crate::statistics::TreeStatistics;
use crate::{RecordId, TreeError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

// =============================================================================
// RESULT TYPES
// =============================================================================

/// A citation between two emitted nodes: `source` cites `target`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Link {
    pub source: RecordId,
    pub target: RecordId,
}

/// Provenance of a [`TreeResult`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeMetadata {
    /// Caller-supplied label, echoed verbatim.
    pub seed: String,
    pub algorithm_version: String,
    pub node_count: usize,
    pub link_count: usize,
    pub generated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_format: Option<SourceFormat>,
    /// Records parsed from the source file, before filtering.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub record_count: Option<usize>,
}

/// The complete science tree of one corpus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeResult {
    pub nodes: Vec<ClassifiedNode>,
    pub links: Vec<Link>,
    pub statistics: TreeStatistics,
    pub metadata: TreeMetadata,
}

// =============================================================================
// COMPOSITION
// =============================================================================

/// Citation links of a reduced graph, expressed as record identifiers.
#[must_use]
pub fn collect_links(graph: &CitationGraph) -> Vec<Link> {
    graph
        .edges()
        .filter_map(|(from, to)| {
            let source = graph.vertex(from)?.record.id.clone();
            let target = graph.vertex(to)?.record.id.clone();
            Some(Link { source, target })
        })
        .collect()
}

/// Assemble a result stamped with the current time.
pub fn compose(
    seed: &str,
    nodes: Vec<ClassifiedNode>,
    links: Vec<Link>,
    statistics: TreeStatistics,
) -> Result<TreeResult, TreeError> {
    compose_at(seed, nodes, links, statistics, Utc::now())
}

/// Assemble a result with an explicit generation timestamp.
///
/// Fails with [`TreeError::EmptyTree`] when no node survived classification.
pub fn compose_at(
    seed: &str,
    mut nodes: Vec<ClassifiedNode>,
    mut links: Vec<Link>,
    statistics: TreeStatistics,
    generated_at: DateTime<Utc>,
) -> Result<TreeResult, TreeError> {
    if nodes.is_empty() {
        return Err(TreeError::EmptyTree);
    }

    // Stable: equal relevance keeps vertex order.
    nodes.sort_by(|a, b| b.sap.cmp(&a.sap));

    let emitted: BTreeSet<&RecordId> = nodes.iter().map(|n| &n.id).collect();
    links.retain(|link| emitted.contains(&link.source) && emitted.contains(&link.target));

    let metadata = TreeMetadata {
        seed: seed.to_string(),
        algorithm_version: ALGORITHM_VERSION.to_string(),
        node_count: nodes.len(),
        link_count: links.len(),
        generated_at,
        source_format: None,
        record_count: None,
    };

    Ok(TreeResult {
        nodes,
        links,
        statistics,
        metadata,
    })
}

// =============================================================================
// TESTS
// =============================================================================
