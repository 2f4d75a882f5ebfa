//! # Export
//!
//! Serializations derived from a [`TreeResult`] alone:
//! - JSON: lossless, pretty-printed, readable back with [`from_json`]
//! - CSV summary: one row per node (title, year, type, relevance, times cited)

use crate::compositor::TreeResult;
use crate::TreeError;
use serde::{Deserialize, Serialize};

/// Header line of the CSV summary.
pub const CSV_HEADER: &str = "title,year,type,relevance,times_cited";

/// One line of the tabular summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryRow {
    pub title: String,
    pub year: Option<i32>,
    #[serde(rename = "type")]
    pub type_label: String,
    pub relevance: u64,
    pub times_cited: u64,
}

// =============================================================================
// JSON
// =============================================================================

/// Pretty JSON of the whole result.
pub fn to_json(result: &TreeResult) -> Result<String, TreeError> {
    serde_json::to_string_pretty(result).map_err(|e| TreeError::Serialization(e.to_string()))
}

/// Read back a result produced by [`to_json`].
pub fn from_json(json: &str) -> Result<TreeResult, TreeError> {
    serde_json::from_str(json).map_err(|e| TreeError::Serialization(e.to_string()))
}

// =============================================================================
// SUMMARY
// =============================================================================

/// Summary rows in node order (relevance descending).
#[must_use]
pub fn summary_rows(result: &TreeResult) -> Vec<SummaryRow> {
    result
        .nodes
        .iter()
        .map(|node| SummaryRow {
            title: node.label.clone(),
            year: node.year,
            type_label: node.type_label.clone(),
            relevance: node.sap,
            times_cited: node.times_cited,
        })
        .collect()
}

/// CSV rendering of [`summary_rows`], with a header line.
#[must_use]
pub fn to_csv(result: &TreeResult) -> String {
    let mut out = String::from(CSV_HEADER);
    out.push('\n');
    for row in summary_rows(result) {
        let year = row.year.map(|y| y.to_string()).unwrap_or_default();
        out.push_str(&format!(
            "{},{},{},{},{}\n",
            csv_field(&row.title),
            year,
            csv_field(&row.type_label),
            row.relevance,
            row.times_cited
        ));
    }
    out
}

/// Quote a field when it contains a separator, quote or line break.
fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

// =============================================================================
// TESTS
// =============================================================================
