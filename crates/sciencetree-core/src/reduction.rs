//! # Reduction
//!
//! Turns a raw citation graph into a scored, acyclic tree structure.
//!
//! Passes, in order:
//! 1. [`clean`]: drop self-citations and isolated vertices
//! 2. [`extract_tree`]: remove every edge inside a cycle, then the vertices
//!    left isolated by that
//! 3. [`score`]: compute [`StructuralScores`] on the resulting DAG
//!
//! Every pass charges one shared [`Budget`]. All arithmetic is saturating
//! `u64`; no floating point.

use crate::graph::{CitationGraph, StructuralScores};
use crate::{TreeError, TreeOptions, VertexId};
use std::collections::{BTreeMap, BTreeSet};

// =============================================================================
// BUDGET
// =============================================================================

/// Work budget shared by the reduction passes.
///
/// One step is one vertex or edge visit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Budget {
    limit: u64,
    used: u64,
}

impl Budget {
    /// Create a budget allowing `limit` steps.
    #[must_use]
    pub fn new(limit: u64) -> Self {
        Self { limit, used: 0 }
    }

    /// Charge `steps`, failing once the limit would be exceeded.
    pub fn charge(&mut self, steps: u64) -> Result<(), TreeError> {
        let used = self.used.saturating_add(steps);
        if used > self.limit {
            return Err(TreeError::Processing(format!(
                "reduction budget of {} steps exhausted",
                self.limit
            )));
        }
        self.used = used;
        Ok(())
    }

    /// Steps charged so far.
    #[must_use]
    pub fn used(&self) -> u64 {
        self.used
    }

    /// Steps still available.
    #[must_use]
    pub fn remaining(&self) -> u64 {
        self.limit.saturating_sub(self.used)
    }
}

// =============================================================================
// ENTRY POINT
// =============================================================================

/// Run every reduction pass on `graph`.
///
/// A graph without citations reduces to an empty graph, not an error.
pub fn reduce(mut graph: CitationGraph, options: &TreeOptions) -> Result<CitationGraph, TreeError> {
    let mut budget = Budget::new(options.reduction_budget);
    clean(&mut graph, &mut budget)?;
    extract_tree(&mut graph, &mut budget)?;
    score(&mut graph, options.citation_weight_step, &mut budget)?;
    tracing::debug!(
        vertices = graph.vertex_count(),
        edges = graph.edge_count(),
        steps = budget.used(),
        remaining = budget.remaining(),
        "reduction finished"
    );
    Ok(graph)
}

// =============================================================================
// CLEAN
// =============================================================================

/// Drop self-citations and vertices without any edge.
///
/// Duplicate edges cannot exist: adjacency is set-based.
pub fn clean(graph: &mut CitationGraph, budget: &mut Budget) -> Result<(), TreeError> {
    let ids: Vec<VertexId> = graph.vertex_ids().collect();
    budget.charge(ids.len() as u64)?;

    let mut self_citations = 0usize;
    for id in &ids {
        if graph.remove_edge(*id, *id) {
            self_citations = self_citations.saturating_add(1);
        }
    }
    let isolated = remove_isolated(graph, budget)?;

    tracing::debug!(self_citations, isolated, "graph cleaned");
    Ok(())
}

/// Remove every vertex with no edge. Returns how many were removed.
fn remove_isolated(graph: &mut CitationGraph, budget: &mut Budget) -> Result<usize, TreeError> {
    budget.charge(graph.vertex_count() as u64)?;
    let isolated: Vec<VertexId> = graph
        .vertex_ids()
        .filter(|id| graph.is_isolated(*id))
        .collect();
    for id in &isolated {
        graph.remove_vertex(*id);
    }
    Ok(isolated.len())
}

// =============================================================================
// TREE EXTRACTION
// =============================================================================

/// Strongly connected components, each sorted ascending, in completion order.
///
/// Iterative Tarjan: no recursion, so deep citation chains cannot overflow
/// the stack.
pub fn strongly_connected_components(
    graph: &CitationGraph,
    budget: &mut Budget,
) -> Result<Vec<Vec<VertexId>>, TreeError> {
    const UNVISITED: usize = usize::MAX;

    let ids: Vec<VertexId> = graph.vertex_ids().collect();
    let position: BTreeMap<VertexId, usize> =
        ids.iter().enumerate().map(|(i, id)| (*id, i)).collect();
    let successors: Vec<Vec<usize>> = ids
        .iter()
        .map(|id| {
            graph
                .successors(*id)
                .filter_map(|s| position.get(&s).copied())
                .collect()
        })
        .collect();

    let n = ids.len();
    let mut index = vec![UNVISITED; n];
    let mut low = vec![0usize; n];
    let mut on_stack = vec![false; n];
    let mut stack: Vec<usize> = Vec::new();
    let mut next_index = 0usize;
    let mut components = Vec::new();

    for start in 0..n {
        if index[start] != UNVISITED {
            continue;
        }
        budget.charge(1)?;
        index[start] = next_index;
        low[start] = next_index;
        next_index = next_index.saturating_add(1);
        stack.push(start);
        on_stack[start] = true;

        // (vertex, position of the next successor to visit)
        let mut frames: Vec<(usize, usize)> = vec![(start, 0)];

        while let Some(frame) = frames.last_mut() {
            let v = frame.0;
            if let Some(&w) = successors[v].get(frame.1) {
                frame.1 = frame.1.saturating_add(1);
                budget.charge(1)?;
                if index[w] == UNVISITED {
                    index[w] = next_index;
                    low[w] = next_index;
                    next_index = next_index.saturating_add(1);
                    stack.push(w);
                    on_stack[w] = true;
                    frames.push((w, 0));
                } else if on_stack[w] {
                    low[v] = low[v].min(index[w]);
                }
                continue;
            }

            frames.pop();
            if let Some(&(parent, _)) = frames.last() {
                low[parent] = low[parent].min(low[v]);
            }
            if low[v] == index[v] {
                let mut component = Vec::new();
                while let Some(w) = stack.pop() {
                    on_stack[w] = false;
                    component.push(ids[w]);
                    if w == v {
                        break;
                    }
                }
                component.sort_unstable();
                components.push(component);
            }
        }
    }

    Ok(components)
}

/// Break every cycle, then drop vertices left without edges.
///
/// All edges whose endpoints share a strongly connected component are
/// removed. The choice depends only on graph structure, never on vertex ids.
/// Returns the number of edges removed.
pub fn extract_tree(graph: &mut CitationGraph, budget: &mut Budget) -> Result<usize, TreeError> {
    let components = strongly_connected_components(graph, budget)?;
    let mut component_of: BTreeMap<VertexId, usize> = BTreeMap::new();
    for (c, members) in components.iter().enumerate() {
        for id in members {
            component_of.insert(*id, c);
        }
    }

    budget.charge(graph.edge_count() as u64)?;
    let internal: Vec<(VertexId, VertexId)> = graph
        .edges()
        .filter(|(from, to)| component_of.get(from) == component_of.get(to))
        .collect();
    for (from, to) in &internal {
        graph.remove_edge(*from, *to);
    }
    let isolated = remove_isolated(graph, budget)?;

    let cyclic_components = components.iter().filter(|c| c.len() > 1).count();
    if !internal.is_empty() {
        tracing::debug!(
            cyclic_components,
            edges_removed = internal.len(),
            isolated,
            "citation cycles broken"
        );
    }
    Ok(internal.len())
}

// =============================================================================
// SCORING
// =============================================================================

/// Score every vertex of an acyclic graph.
///
/// - `w(v) = 1 + times_cited / citation_weight_step` (a step of 0 ignores citation counts)
/// - `down(v)`: weight reachable along the works `v` cites
/// - `up(v)`: weight reaching `v` from the works citing it
/// - `trunk = min(up, down)`, `root = down - trunk`, `leaf = up - trunk`
/// - `sap = paths_from_sources * paths_to_sinks`, 0 for isolated vertices
///
/// Fails with `Processing` if the graph still contains a cycle.
pub fn score(
    graph: &mut CitationGraph,
    citation_weight_step: u64,
    budget: &mut Budget,
) -> Result<(), TreeError> {
    let order = topological_order(graph, budget)?;

    let weight: BTreeMap<VertexId, u64> = graph
        .vertices()
        .map(|(id, v)| {
            let bonus = v
                .record
                .times_cited
                .checked_div(citation_weight_step)
                .unwrap_or(0);
            (id, bonus.saturating_add(1))
        })
        .collect();
    let weight_of = |id: VertexId| weight.get(&id).copied().unwrap_or(1);

    let mut up: BTreeMap<VertexId, u64> = BTreeMap::new();
    let mut from_sources: BTreeMap<VertexId, u64> = BTreeMap::new();
    for id in &order {
        budget.charge(graph.in_degree(*id).saturating_add(1) as u64)?;
        let mut total = 0u64;
        let mut paths = 0u64;
        for parent in graph.predecessors(*id) {
            total = total
                .saturating_add(weight_of(parent))
                .saturating_add(up.get(&parent).copied().unwrap_or(0));
            paths = paths.saturating_add(from_sources.get(&parent).copied().unwrap_or(0));
        }
        up.insert(*id, total);
        from_sources.insert(*id, if graph.in_degree(*id) == 0 { 1 } else { paths });
    }

    let mut down: BTreeMap<VertexId, u64> = BTreeMap::new();
    let mut to_sinks: BTreeMap<VertexId, u64> = BTreeMap::new();
    for id in order.iter().rev() {
        budget.charge(graph.out_degree(*id).saturating_add(1) as u64)?;
        let mut total = 0u64;
        let mut paths = 0u64;
        for child in graph.successors(*id) {
            total = total
                .saturating_add(weight_of(child))
                .saturating_add(down.get(&child).copied().unwrap_or(0));
            paths = paths.saturating_add(to_sinks.get(&child).copied().unwrap_or(0));
        }
        down.insert(*id, total);
        to_sinks.insert(*id, if graph.out_degree(*id) == 0 { 1 } else { paths });
    }

    for id in order {
        let up = up.get(&id).copied().unwrap_or(0);
        let down = down.get(&id).copied().unwrap_or(0);
        let trunk = up.min(down);
        let sap = if graph.is_isolated(id) {
            0
        } else {
            from_sources
                .get(&id)
                .copied()
                .unwrap_or(0)
                .saturating_mul(to_sinks.get(&id).copied().unwrap_or(0))
        };
        graph.set_scores(
            id,
            StructuralScores {
                root: down - trunk,
                trunk,
                leaf: up - trunk,
                sap,
            },
        );
    }
    Ok(())
}

/// Kahn's algorithm, smallest ready id first.
fn topological_order(graph: &CitationGraph, budget: &mut Budget) -> Result<Vec<VertexId>, TreeError> {
    let mut pending: BTreeMap<VertexId, usize> = graph
        .vertex_ids()
        .map(|id| (id, graph.in_degree(id)))
        .collect();
    let mut ready: BTreeSet<VertexId> = pending
        .iter()
        .filter(|(_, d)| **d == 0)
        .map(|(id, _)| *id)
        .collect();
    let mut order = Vec::with_capacity(pending.len());

    while let Some(id) = ready.pop_first() {
        budget.charge(graph.out_degree(id).saturating_add(1) as u64)?;
        order.push(id);
        for next in graph.successors(id) {
            if let Some(degree) = pending.get_mut(&next) {
                *degree = degree.saturating_sub(1);
                if *degree == 0 {
                    ready.insert(next);
                }
            }
        }
    }

    if order.len() != graph.vertex_count() {
        return Err(TreeError::Processing(format!(
            "cannot score a cyclic graph: {} of {} vertices lie on or behind a cycle",
            graph.vertex_count().saturating_sub(order.len()),
            graph.vertex_count()
        )));
    }
    Ok(order)
}

// =============================================================================
// TESTS
// =============================================================================
