//! # Citation Graph
//!
//! The deterministic citation graph of one corpus.
//!
//! Vertices live in an arena keyed by [`VertexId`]; edges `a -> b` mean
//! "a cites b". Adjacency is kept in both directions so that citers and
//! cited works are equally cheap to walk. All storage is `BTreeMap`/`BTreeSet`.

use crate::{Corpus, MatchKey, PublicationRecord, VertexId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, VecDeque};

// =============================================================================
// SCORES
// =============================================================================

/// Structural scores of one vertex. Never negative by construction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructuralScores {
    /// Cited-chain weight left over after the trunk share.
    pub root: u64,
    /// `min` of the cited-chain and citing-chain weights.
    pub trunk: u64,
    /// Citing-chain weight left over after the trunk share.
    pub leaf: u64,
    /// Relevance: number of maximal citation chains through the vertex.
    pub sap: u64,
}

impl StructuralScores {
    /// `root + trunk + leaf`, saturating.
    #[must_use]
    pub fn total_value(&self) -> u64 {
        self.root.saturating_add(self.trunk).saturating_add(self.leaf)
    }
}

/// A vertex: the record it stands for and its scores.
#[derive(Debug, Clone)]
pub struct Vertex {
    pub record: PublicationRecord,
    pub scores: StructuralScores,
}

// =============================================================================
// GRAPH
// =============================================================================

/// Directed citation graph over the records of one corpus.
#[derive(Debug, Clone, Default)]
pub struct CitationGraph {
    /// Arena: VertexId -> Vertex
    vertices: BTreeMap<VertexId, Vertex>,

    /// Cited works: citer -> {cited}
    out_edges: BTreeMap<VertexId, BTreeSet<VertexId>>,

    /// Citers: cited -> {citer}
    in_edges: BTreeMap<VertexId, BTreeSet<VertexId>>,

    /// References that matched no record of the corpus.
    dangling_references: usize,

    /// Records dropped by the corpus because their identifier repeated.
    duplicates_dropped: usize,

    /// Next available VertexId
    next_vertex_id: u32,
}

impl CitationGraph {
    /// Create a new empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a vertex for a record and return its id.
    pub fn add_vertex(&mut self, record: PublicationRecord) -> VertexId {
        let id = VertexId(self.next_vertex_id);
        self.next_vertex_id = self.next_vertex_id.saturating_add(1);
        self.vertices.insert(
            id,
            Vertex {
                record,
                scores: StructuralScores::default(),
            },
        );
        id
    }

    /// Insert the edge `from -> to`.
    ///
    /// Returns `false` if either endpoint is unknown or the edge already exists.
    pub fn add_edge(&mut self, from: VertexId, to: VertexId) -> bool {
        if !self.vertices.contains_key(&from) || !self.vertices.contains_key(&to) {
            return false;
        }
        let inserted = self.out_edges.entry(from).or_default().insert(to);
        self.in_edges.entry(to).or_default().insert(from);
        inserted
    }

    /// Remove the edge `from -> to`. Returns whether it existed.
    pub fn remove_edge(&mut self, from: VertexId, to: VertexId) -> bool {
        let removed = self
            .out_edges
            .get_mut(&from)
            .is_some_and(|targets| targets.remove(&to));
        if removed {
            if let Some(sources) = self.in_edges.get_mut(&to) {
                sources.remove(&from);
            }
            prune_empty(&mut self.out_edges, from);
            prune_empty(&mut self.in_edges, to);
        }
        removed
    }

    /// Remove a vertex together with every edge touching it.
    pub fn remove_vertex(&mut self, id: VertexId) -> Option<Vertex> {
        let vertex = self.vertices.remove(&id)?;
        for target in self.out_edges.remove(&id).unwrap_or_default() {
            if let Some(sources) = self.in_edges.get_mut(&target) {
                sources.remove(&id);
            }
            prune_empty(&mut self.in_edges, target);
        }
        for source in self.in_edges.remove(&id).unwrap_or_default() {
            if let Some(targets) = self.out_edges.get_mut(&source) {
                targets.remove(&id);
            }
            prune_empty(&mut self.out_edges, source);
        }
        Some(vertex)
    }

    /// Lookup a vertex by id.
    #[must_use]
    pub fn vertex(&self, id: VertexId) -> Option<&Vertex> {
        self.vertices.get(&id)
    }

    /// Replace the scores of a vertex. Unknown ids are ignored.
    pub fn set_scores(&mut self, id: VertexId, scores: StructuralScores) {
        if let Some(vertex) = self.vertices.get_mut(&id) {
            vertex.scores = scores;
        }
    }

    /// Vertex ids in ascending (corpus) order.
    pub fn vertex_ids(&self) -> impl Iterator<Item = VertexId> + '_ {
        self.vertices.keys().copied()
    }

    /// Vertices in ascending id order.
    pub fn vertices(&self) -> impl Iterator<Item = (VertexId, &Vertex)> + '_ {
        self.vertices.iter().map(|(id, v)| (*id, v))
    }

    /// Works cited by `id`.
    pub fn successors(&self, id: VertexId) -> impl Iterator<Item = VertexId> + '_ {
        self.out_edges.get(&id).into_iter().flatten().copied()
    }

    /// Works citing `id`.
    pub fn predecessors(&self, id: VertexId) -> impl Iterator<Item = VertexId> + '_ {
        self.in_edges.get(&id).into_iter().flatten().copied()
    }

    /// All edges in `(from, to)` order.
    pub fn edges(&self) -> impl Iterator<Item = (VertexId, VertexId)> + '_ {
        self.out_edges
            .iter()
            .flat_map(|(from, targets)| targets.iter().map(move |to| (*from, *to)))
    }

    /// Whether the edge `from -> to` exists.
    #[must_use]
    pub fn contains_edge(&self, from: VertexId, to: VertexId) -> bool {
        self.out_edges
            .get(&from)
            .is_some_and(|targets| targets.contains(&to))
    }

    /// Number of works cited by `id`.
    #[must_use]
    pub fn out_degree(&self, id: VertexId) -> usize {
        self.out_edges.get(&id).map_or(0, BTreeSet::len)
    }

    /// Number of works citing `id`.
    #[must_use]
    pub fn in_degree(&self, id: VertexId) -> usize {
        self.in_edges.get(&id).map_or(0, BTreeSet::len)
    }

    /// Whether a vertex has no edges at all.
    #[must_use]
    pub fn is_isolated(&self, id: VertexId) -> bool {
        self.out_degree(id) == 0 && self.in_degree(id) == 0
    }

    /// Get the total number of vertices.
    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Get the total number of edges.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.out_edges.values().map(BTreeSet::len).sum()
    }

    /// References that could not be resolved within the corpus.
    #[must_use]
    pub fn dangling_references(&self) -> usize {
        self.dangling_references
    }

    /// Records the corpus dropped as duplicates before the graph was built.
    #[must_use]
    pub fn duplicates_dropped(&self) -> usize {
        self.duplicates_dropped
    }

    /// Whether the graph has no directed cycle (self-loops included).
    ///
    /// Kahn's algorithm: a graph is acyclic iff every vertex can be emitted.
    #[must_use]
    pub fn is_acyclic(&self) -> bool {
        let mut pending: BTreeMap<VertexId, usize> = self
            .vertex_ids()
            .map(|id| (id, self.in_degree(id)))
            .collect();
        let mut ready: VecDeque<VertexId> = pending
            .iter()
            .filter(|(_, d)| **d == 0)
            .map(|(id, _)| *id)
            .collect();
        let mut emitted = 0usize;

        while let Some(id) = ready.pop_front() {
            emitted = emitted.saturating_add(1);
            for next in self.successors(id) {
                if let Some(degree) = pending.get_mut(&next) {
                    *degree = degree.saturating_sub(1);
                    if *degree == 0 {
                        ready.push_back(next);
                    }
                }
            }
        }
        emitted == self.vertex_count()
    }
}

/// Drop an adjacency entry whose set became empty.
fn prune_empty(map: &mut BTreeMap<VertexId, BTreeSet<VertexId>>, id: VertexId) {
    if map.get(&id).is_some_and(BTreeSet::is_empty) {
        map.remove(&id);
    }
}

// =============================================================================
// CONSTRUCTION
// =============================================================================

/// Build the citation graph of a corpus.
///
/// One vertex per record in corpus order. Each match key points at the first
/// record exposing it. A reference resolves through its keys in order (DOI
/// first); references matching no record are counted as dangling.
#[must_use]
pub fn build_graph(corpus: Corpus) -> CitationGraph {
    let mut graph = CitationGraph::new();
    graph.duplicates_dropped = corpus.duplicates_dropped();

    let mut index: BTreeMap<MatchKey, VertexId> = BTreeMap::new();
    let mut ids = Vec::with_capacity(corpus.len());
    for record in corpus.into_records() {
        let keys = record.match_keys();
        let id = graph.add_vertex(record);
        for key in keys {
            index.entry(key).or_insert(id);
        }
        ids.push(id);
    }

    let mut resolved = Vec::new();
    let mut dangling = 0usize;
    for id in &ids {
        let Some(vertex) = graph.vertex(*id) else {
            continue;
        };
        for reference in &vertex.record.references {
            match reference.keys.iter().find_map(|key| index.get(key)) {
                Some(target) => resolved.push((*id, *target)),
                None => dangling = dangling.saturating_add(1),
            }
        }
    }

    for (from, to) in resolved {
        graph.add_edge(from, to);
    }
    graph.dangling_references = dangling;

    tracing::debug!(
        vertices = graph.vertex_count(),
        edges = graph.edge_count(),
        dangling,
        "citation graph built"
    );
    graph
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{RecordId, Reference};

    fn record(id: &str, doi: &str, cites: &[&str]) -> PublicationRecord {
        let mut record = PublicationRecord::new(RecordId::new(id), format!("Title {}", id));
        record.ids.doi = Some(doi.to_string());
        record.references = cites
            .iter()
            .map(|d| Reference::new(*d, vec![MatchKey::Doi((*d).to_string())]))
            .collect();
        record
    }

    fn corpus(records: Vec<PublicationRecord>) -> Corpus {
        let mut corpus = Corpus::new();
        for r in records {
            corpus.push(r);
        }
        corpus
    }

    #[test]
    fn build_resolves_references_by_key() {
        let graph = build_graph(corpus(vec![
            record("a", "10.1/a", &["10.1/b", "10.1/zzz"]),
            record("b", "10.1/b", &["10.1/c"]),
            record("c", "10.1/c", &[]),
        ]));

        assert_eq!(graph.vertex_count(), 3);
        assert_eq!(graph.edge_count(), 2);
        assert!(graph.contains_edge(VertexId(0), VertexId(1)));
        assert!(graph.contains_edge(VertexId(1), VertexId(2)));
        assert_eq!(graph.dangling_references(), 1);
    }

    #[test]
    fn duplicate_references_collapse() {
        let graph = build_graph(corpus(vec![
            record("a", "10.1/a", &["10.1/b", "10.1/b"]),
            record("b", "10.1/b", &[]),
        ]));
        assert_eq!(graph.edge_count(), 1);
    }

    #[test]
    fn first_record_wins_shared_key() {
        let graph = build_graph(corpus(vec![
            record("a", "10.1/a", &["10.1/shared"]),
            record("b", "10.1/shared", &[]),
            record("c", "10.1/shared", &[]),
        ]));
        assert!(graph.contains_edge(VertexId(0), VertexId(1)));
        assert!(!graph.contains_edge(VertexId(0), VertexId(2)));
    }

    #[test]
    fn remove_vertex_drops_incident_edges() {
        let mut graph = build_graph(corpus(vec![
            record("a", "10.1/a", &["10.1/b"]),
            record("b", "10.1/b", &["10.1/c"]),
            record("c", "10.1/c", &[]),
        ]));
        assert!(graph.remove_vertex(VertexId(1)).is_some());
        assert_eq!(graph.edge_count(), 0);
        assert!(graph.is_isolated(VertexId(0)));
        assert!(graph.is_isolated(VertexId(2)));
        assert!(graph.remove_vertex(VertexId(1)).is_none());
    }

    #[test]
    fn acyclicity_detection() {
        let mut graph = CitationGraph::new();
        let a = graph.add_vertex(PublicationRecord::new(RecordId::new("a"), "A"));
        let b = graph.add_vertex(PublicationRecord::new(RecordId::new("b"), "B"));
        assert!(graph.add_edge(a, b));
        assert!(graph.is_acyclic());
        assert!(graph.add_edge(b, a));
        assert!(!graph.is_acyclic());
        assert!(graph.remove_edge(b, a));
        assert!(graph.is_acyclic());
        assert!(graph.add_edge(a, a));
        assert!(!graph.is_acyclic());
    }

    #[test]
    fn edges_to_unknown_vertices_are_rejected() {
        let mut graph = CitationGraph::new();
        let a = graph.add_vertex(PublicationRecord::new(RecordId::new("a"), "A"));
        assert!(!graph.add_edge(a, VertexId(99)));
        assert_eq!(graph.edge_count(), 0);
    }

    #[test]
    fn total_value_saturates() {
        let scores = StructuralScores {
            root: u64::MAX,
            trunk: 1,
            leaf: 1,
            sap: 0,
        };
        assert_eq!(scores.total_value(), u64::MAX);
    }
}
