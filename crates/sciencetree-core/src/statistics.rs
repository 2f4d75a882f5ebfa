//! # Tree Statistics
//!
//! Corpus-wide aggregates over the classified nodes.
//!
//! Counts and sums are integers. The only floating point values are the two
//! averages, computed once at [`StatisticsAccumulator::finish`].

use crate::classifier::{ClassifiedNode, Group};
use serde::{Deserialize, Serialize};

/// Aggregates of one tree.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TreeStatistics {
    pub roots: usize,
    pub trunks: usize,
    pub leaves: usize,
    pub total: usize,
    pub total_value_sum: u64,
    /// `total_value_sum / total`, 0 when there are no nodes.
    pub average_value: f64,
    pub total_sap: u64,
    /// `total_sap / total`, 0 when there are no nodes.
    pub average_sap: f64,
    pub max_sap: u64,
    /// Smallest positive relevance, 0 if no node has any.
    pub min_sap: u64,
}

/// Running aggregate. `merge` is associative and commutative, so partial
/// accumulators may be combined in any order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatisticsAccumulator {
    roots: usize,
    trunks: usize,
    leaves: usize,
    total_value_sum: u64,
    total_sap: u64,
    max_sap: u64,
    min_positive_sap: Option<u64>,
}

impl StatisticsAccumulator {
    /// Create an empty accumulator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one node.
    pub fn push(&mut self, node: &ClassifiedNode) {
        match node.group {
            Group::Root => self.roots = self.roots.saturating_add(1),
            Group::Trunk => self.trunks = self.trunks.saturating_add(1),
            Group::Leaf => self.leaves = self.leaves.saturating_add(1),
        }
        self.total_value_sum = self.total_value_sum.saturating_add(node.total_value);
        self.total_sap = self.total_sap.saturating_add(node.sap);
        self.max_sap = self.max_sap.max(node.sap);
        if node.sap > 0 {
            self.min_positive_sap = Some(self.min_positive_sap.map_or(node.sap, |m| m.min(node.sap)));
        }
    }

    /// Combine with another accumulator.
    #[must_use]
    pub fn merge(self, other: Self) -> Self {
        let min_positive_sap = match (self.min_positive_sap, other.min_positive_sap) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        };
        Self {
            roots: self.roots.saturating_add(other.roots),
            trunks: self.trunks.saturating_add(other.trunks),
            leaves: self.leaves.saturating_add(other.leaves),
            total_value_sum: self.total_value_sum.saturating_add(other.total_value_sum),
            total_sap: self.total_sap.saturating_add(other.total_sap),
            max_sap: self.max_sap.max(other.max_sap),
            min_positive_sap,
        }
    }

    /// Number of nodes seen.
    #[must_use]
    pub fn total(&self) -> usize {
        self.roots
            .saturating_add(self.trunks)
            .saturating_add(self.leaves)
    }

    /// Produce the final statistics.
    #[must_use]
    pub fn finish(self) -> TreeStatistics {
        let total = self.total();
        TreeStatistics {
            roots: self.roots,
            trunks: self.trunks,
            leaves: self.leaves,
            total,
            total_value_sum: self.total_value_sum,
            average_value: mean(self.total_value_sum, total),
            total_sap: self.total_sap,
            average_sap: mean(self.total_sap, total),
            max_sap: self.max_sap,
            min_sap: self.min_positive_sap.unwrap_or(0),
        }
    }
}

/// Aggregate a node list in one pass.
#[must_use]
pub fn aggregate(nodes: &[ClassifiedNode]) -> TreeStatistics {
    let mut acc = StatisticsAccumulator::new();
    for node in nodes {
        acc.push(node);
    }
    acc.finish()
}

#[allow(clippy::float_arithmetic)]
fn mean(sum: u64, count: usize) -> f64 {
    if count == 0 {
        0.0
    } else {
        sum as f64 / count as f64
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RecordId;
    use std::collections::BTreeMap;

    fn node(id: &str, group: Group, total_value: u64, sap: u64) -> ClassifiedNode {
        ClassifiedNode {
            id: RecordId::new(id),
            label: id.to_string(),
            root: 0,
            trunk: 0,
            leaf: total_value,
            total_value,
            group,
            type_label: String::new(),
            sap,
            year: None,
            authors: Vec::new(),
            venue: None,
            times_cited: 0,
            doi: None,
            pmid: None,
            arxiv_id: None,
            url: None,
            extra: BTreeMap::new(),
        }
    }

    #[test]
    fn empty_input_yields_zeroes() {
        let stats = aggregate(&[]);
        assert_eq!(stats, TreeStatistics::default());
        assert_eq!(stats.average_value, 0.0);
    }

    #[test]
    fn counts_sums_and_extremes() {
        let nodes = vec![
            node("a", Group::Root, 4, 0),
            node("b", Group::Trunk, 2, 3),
            node("c", Group::Leaf, 6, 9),
            node("d", Group::Leaf, 4, 1),
        ];
        let stats = aggregate(&nodes);
        assert_eq!((stats.roots, stats.trunks, stats.leaves, stats.total), (1, 1, 2, 4));
        assert_eq!(stats.total_value_sum, 16);
        assert_eq!(stats.average_value, 4.0);
        assert_eq!(stats.total_sap, 13);
        assert_eq!(stats.average_sap, 3.25);
        assert_eq!(stats.max_sap, 9);
        assert_eq!(stats.min_sap, 1);
    }

    #[test]
    fn min_sap_ignores_zero() {
        let stats = aggregate(&[node("a", Group::Leaf, 1, 0)]);
        assert_eq!(stats.min_sap, 0);
        assert_eq!(stats.max_sap, 0);
    }

    #[test]
    fn merge_matches_single_pass() {
        let nodes = vec![
            node("a", Group::Root, 4, 2),
            node("b", Group::Trunk, 2, 3),
            node("c", Group::Leaf, 6, 9),
        ];
        let mut left = StatisticsAccumulator::new();
        left.push(&nodes[0]);
        let mut right = StatisticsAccumulator::new();
        right.push(&nodes[1]);
        right.push(&nodes[2]);

        assert_eq!(right.merge(left).finish(), aggregate(&nodes));
        assert_eq!(left.merge(StatisticsAccumulator::new()), left);
    }
}
