//! # Tree Benchmarks
//!
//! Performance benchmarks for sciencetree-core reduction and parsing.
//!
//! Run with: `cargo bench -p sciencetree-core`

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use sciencetree_core::{
    CitationGraph, PublicationRecord, RecordId, SourceFormat, TreeOptions, VertexId, parse, reduce,
};
use std::hint::black_box;

/// Layered citation graph: every record cites the `fan_out` records of the next layer.
fn create_layered_graph(layers: u32, width: u32, fan_out: u32) -> CitationGraph {
    let mut graph = CitationGraph::new();
    for i in 0..layers * width {
        graph.add_vertex(PublicationRecord::new(
            RecordId::new(format!("r{}", i)),
            format!("Record {}", i),
        ));
    }
    for layer in 0..layers.saturating_sub(1) {
        for i in 0..width {
            for k in 0..fan_out {
                let from = layer * width + i;
                let to = (layer + 1) * width + (i + k) % width;
                graph.add_edge(VertexId(from), VertexId(to));
            }
        }
    }
    graph
}

/// Ring of records, each citing the next: one large cycle.
fn create_ring_graph(size: u32) -> CitationGraph {
    let mut graph = CitationGraph::new();
    for i in 0..size {
        graph.add_vertex(PublicationRecord::new(
            RecordId::new(format!("r{}", i)),
            format!("Record {}", i),
        ));
    }
    for i in 0..size {
        graph.add_edge(VertexId(i), VertexId((i + 1) % size));
    }
    graph
}

/// Web of Science export with a chain of `size` records.
fn create_wos_chain(size: usize) -> String {
    let mut text = String::from("FN Clarivate Analytics Web of Science\nVR 1.0\n");
    for i in 0..size {
        text.push_str(&format!(
            "PT J\nAU Author{}, A\nTI Paper number {}\nPY 2000\nBP {}\n",
            i, i, i
        ));
        if i + 1 < size {
            text.push_str(&format!("CR Author{} A, 2000, J TEST, V1, P{}\n", i + 1, i + 1));
        }
        text.push_str(&format!("UT WOS:{}\nER\n\n", i));
    }
    text.push_str("EF\n");
    text
}

// =============================================================================
// BENCHMARKS
// =============================================================================

fn bench_reduce_layered(c: &mut Criterion) {
    let mut group = c.benchmark_group("reduce_layered");

    for layers in [5u32, 10, 20].iter() {
        let graph = create_layered_graph(*layers, 100, 3);
        group.bench_with_input(BenchmarkId::from_parameter(layers), &graph, |b, graph| {
            b.iter(|| black_box(reduce(graph.clone(), &TreeOptions::default())));
        });
    }

    group.finish();
}

fn bench_reduce_cycle(c: &mut Criterion) {
    let mut group = c.benchmark_group("reduce_cycle");

    for size in [100u32, 1000, 10000].iter() {
        let graph = create_ring_graph(*size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &graph, |b, graph| {
            b.iter(|| black_box(reduce(graph.clone(), &TreeOptions::default())));
        });
    }

    group.finish();
}

fn bench_parse_wos(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse_wos");

    for size in [100usize, 1000].iter() {
        let text = create_wos_chain(*size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &text, |b, text| {
            b.iter(|| black_box(parse(text.as_bytes(), SourceFormat::WebOfScience)));
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_reduce_layered,
    bench_reduce_cycle,
    bench_parse_wos
);
criterion_main!(benches);
