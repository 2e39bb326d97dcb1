//! Performance benchmarks for mindmap core operations
//!
//! Run with: `cargo bench -p mindmap-core`
//!
//! These benchmarks measure critical path performance:
//! - Codec parse/serialize in both dialects (1000-node documents)
//! - Validation of a parsed document
//! - One atomic mutation over raw text (the full parse → serialize pipeline)
//! - Search over a large tree

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use mindmap_core::codec::{CodecOptions, Dialect, FormatCodec};
use mindmap_core::services::{CreateNodeParams, MutationEngine, SchemaValidator, SearchQuery};
use serde_json::{json, Value};

/// Generate a document with `node_count` nodes, ten children per branch
fn generate_document(node_count: usize) -> Value {
    fn node(next: &mut usize, remaining: &mut usize, depth: usize) -> Value {
        let id = *next;
        *next += 1;
        *remaining -= 1;

        let mut children = Vec::new();
        if depth < 3 {
            for _ in 0..10 {
                if *remaining == 0 {
                    break;
                }
                children.push(node(next, remaining, depth + 1));
            }
        }

        json!({
            "id": format!("n{}", id),
            "title": format!("Topic {} at depth {}", id, depth),
            "description": if id % 3 == 0 { json!(format!("Notes for topic {}", id)) } else { Value::Null },
            "tags": if id % 5 == 0 { json!(["review"]) } else { json!([]) },
            "customFields": { "estimate": id % 8 },
            "children": children
        })
    }

    let mut next = 0;
    let mut remaining = node_count;
    json!({
        "version": "1.0",
        "title": "Benchmark",
        "schema": { "fields": [ { "name": "estimate", "type": "number" } ] },
        "tags": [ { "name": "review", "color": "#ff0000" } ],
        "root": node(&mut next, &mut remaining, 0)
    })
}

/// Benchmark parse and serialize for both dialects
///
/// Target: a 1000-node document parses in well under the 1s debounce window
fn bench_codec(c: &mut Criterion) {
    let codec = FormatCodec::new(CodecOptions::default());
    let doc = generate_document(1000);

    let mut group = c.benchmark_group("codec");
    for dialect in [Dialect::Strict, Dialect::Authorable] {
        let text = codec.serialize(&doc, dialect).unwrap();

        group.bench_with_input(BenchmarkId::new("parse", dialect), &text, |b, text| {
            b.iter(|| black_box(codec.parse(text, dialect).unwrap()));
        });
        group.bench_with_input(BenchmarkId::new("serialize", dialect), &doc, |b, doc| {
            b.iter(|| black_box(codec.serialize(doc, dialect).unwrap()));
        });
    }
    group.finish();
}

fn bench_validate(c: &mut Criterion) {
    let validator = SchemaValidator::new();
    let doc = generate_document(1000);

    c.bench_function("validate_1000_nodes", |b| {
        b.iter(|| black_box(validator.validate(&doc)));
    });
}

/// Benchmark one create_node over raw text
///
/// Includes parse, validate, build, mutate, re-validate and serialize.
fn bench_mutation(c: &mut Criterion) {
    let engine = MutationEngine::default();
    let mut group = c.benchmark_group("create_node");
    group.sample_size(20);

    for dialect in [Dialect::Strict, Dialect::Authorable] {
        let text = engine
            .codec()
            .serialize(&generate_document(1000), dialect)
            .unwrap();

        group.bench_with_input(BenchmarkId::new("1000_nodes", dialect), &text, |b, text| {
            b.iter(|| {
                let outcome = engine
                    .create_node(text, dialect, CreateNodeParams::new("n1", "Benchmark child"))
                    .unwrap();
                black_box(outcome.text)
            });
        });
    }
    group.finish();
}

fn bench_search(c: &mut Criterion) {
    let engine = MutationEngine::default();
    let text = engine
        .codec()
        .serialize(&generate_document(1000), Dialect::Strict)
        .unwrap();
    let query = SearchQuery::new("topic 1").with_limit(50);

    c.bench_function("search_1000_nodes", |b| {
        b.iter(|| black_box(engine.search_nodes(&text, Dialect::Strict, &query).unwrap()));
    });
}

criterion_group!(benches, bench_codec, bench_validate, bench_mutation, bench_search);
criterion_main!(benches);
