//! Criterion measurement of the DocMap <-> BSON conversion every façade call
//! pays on the way to and from the driver. Nested documents mirror a typical
//! event record so the numbers reflect per-document overhead, not I/O.

use std::hint::black_box;

use chrono::{Duration, Utc};
use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use mongo_middleware::mongo::{from_document, into_document};
use mongo_middleware::prelude::*;

fn event(i: i64) -> DocMap {
    DocMap::new()
        .with("userId", format!("user-{i}"))
        .with("updatedAt", Utc::now() - Duration::minutes(i))
        .with("score", i as f64 * 0.5)
        .with(
            "tags",
            vec![DocValues::from("alpha"), DocValues::from("beta"), DocValues::from(i)],
        )
        .with(
            "profile",
            DocMap::new()
                .with("active", i % 2 == 0)
                .with("visits", i)
                .with("note", DocValues::Null),
        )
}

/// Batch sizes to measure; override with `BENCH_BATCH_SIZES=10,500`.
fn batch_sizes() -> Vec<usize> {
    std::env::var("BENCH_BATCH_SIZES")
        .ok()
        .map(|raw| {
            raw.split(',')
                .filter_map(|s| s.trim().parse().ok())
                .collect::<Vec<usize>>()
        })
        .filter(|sizes| !sizes.is_empty())
        .unwrap_or_else(|| vec![1, 100, 1_000])
}

fn bench_conversion(c: &mut Criterion) {
    let mut group = c.benchmark_group("document_conversion");
    for size in batch_sizes() {
        let docs: Vec<DocMap> = (0..size as i64).map(event).collect();
        group.throughput(Throughput::Elements(size as u64));

        group.bench_with_input(BenchmarkId::new("to_bson", size), &docs, |b, docs| {
            b.iter(|| {
                for doc in docs {
                    black_box(into_document(doc.clone()).expect("convertible"));
                }
            });
        });

        let bson_docs: Vec<_> = docs
            .iter()
            .map(|doc| into_document(doc.clone()).expect("convertible"))
            .collect();
        group.bench_with_input(BenchmarkId::new("from_bson", size), &bson_docs, |b, docs| {
            b.iter(|| {
                for doc in docs {
                    black_box(from_document(doc.clone()));
                }
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_conversion);
criterion_main!(benches);
