//! # Pipeline
//!
//! The single external operation of the engine:
//!
//! ```text
//! bytes -> Corpus -> CitationGraph -> reduce -> classify -> aggregate -> compose
//! ```
//!
//! Every call owns its corpus, graph and result. Nothing is shared between
//! calls, so concurrent callers need no coordination.

use crate::classifier::classify;
use crate::compositor::{TreeResult, collect_links, compose};
use crate::formats::{self, SourceFormat};
use crate::graph::build_graph;
use crate::reduction::reduce;
use crate::statistics::aggregate;
use crate::{TreeError, TreeOptions};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Generate a tree, choosing the format from a file name or extension.
///
/// `format_hint` may be `"txt"`, `".bib"` or a file name such as
/// `"savedrecs.txt"`.
pub fn generate_tree(seed: &str, bytes: &[u8], format_hint: &str) -> Result<TreeResult, TreeError> {
    let format = format_from_hint(format_hint)?;
    generate_tree_with(seed, bytes, format, &TreeOptions::default())
}

/// Generate a tree from an already resolved format with explicit options.
pub fn generate_tree_with(
    seed: &str,
    bytes: &[u8],
    format: SourceFormat,
    options: &TreeOptions,
) -> Result<TreeResult, TreeError> {
    let corpus = formats::parse(bytes, format)?;
    let record_count = corpus.len();
    tracing::debug!(
        %format,
        records = record_count,
        references = corpus.reference_count(),
        "corpus parsed"
    );

    let graph = build_graph(corpus);
    if graph.dangling_references() > 0 {
        tracing::warn!(
            dangling = graph.dangling_references(),
            "references to works outside the corpus were dropped"
        );
    }

    let graph = reduce(graph, options)?;
    let nodes = classify(&graph, options.locale);
    let links = collect_links(&graph);
    let statistics = aggregate(&nodes);
    tracing::debug!(
        nodes = nodes.len(),
        links = links.len(),
        roots = statistics.roots,
        trunks = statistics.trunks,
        leaves = statistics.leaves,
        "nodes classified"
    );

    let mut result = compose(seed, nodes, links, statistics)?;
    result.metadata.source_format = Some(format);
    result.metadata.record_count = Some(record_count);
    Ok(result)
}

/// Resolve a format hint that is either an extension or a file name.
pub fn format_from_hint(hint: &str) -> Result<SourceFormat, TreeError> {
    let hint = hint.trim();
    if Path::new(hint).extension().is_some() {
        SourceFormat::from_path(hint)
    } else {
        SourceFormat::from_extension(hint)
    }
}

// =============================================================================
// INSPECTION
// =============================================================================

/// Corpus and graph statistics of a file, without composing a tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorpusReport {
    pub format: SourceFormat,
    pub records: usize,
    pub duplicates_dropped: usize,
    pub references: usize,
    /// Distinct citations resolved inside the corpus.
    pub citations: usize,
    pub dangling_references: usize,
    /// Vertices left after reduction.
    pub reduced_vertices: usize,
    /// Edges left after reduction.
    pub reduced_edges: usize,
    /// Vertices that would be emitted as nodes.
    pub classified: usize,
}

/// Parse and reduce a file, reporting what each stage kept.
pub fn inspect(bytes: &[u8], format: SourceFormat, options: &TreeOptions) -> Result<CorpusReport, TreeError> {
    let corpus = formats::parse(bytes, format)?;
    let records = corpus.len();
    let duplicates_dropped = corpus.duplicates_dropped();
    let references = corpus.reference_count();

    let graph = build_graph(corpus);
    let citations = graph.edge_count();
    let dangling_references = graph.dangling_references();

    let graph = reduce(graph, options)?;
    let classified = classify(&graph, options.locale).len();

    Ok(CorpusReport {
        format,
        records,
        duplicates_dropped,
        references,
        citations,
        dangling_references,
        reduced_vertices: graph.vertex_count(),
        reduced_edges: graph.edge_count(),
        classified,
    })
}

// =============================================================================
// TESTS
// =============================================================================
