use chrono::{TimeZone, Utc};
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use sitepulse::aggregate::{AggregationEngine, PageViewAttributes};
use sitepulse::query::analytics::query_analytics;
use sitepulse::query::range::TimeRange;
use sitepulse::storage::duckdb_store::DuckDbStore;
use std::sync::Arc;

fn page_view(i: usize) -> PageViewAttributes {
    PageViewAttributes {
        path: format!("/page-{}", i % 100),
        visitor_id: format!("visitor-{}", i % 1000),
        session_id: Some(format!("session-{}", i % 250)),
        device_type: "desktop".to_string(),
        os: "Linux".to_string(),
        country: "US".to_string(),
        occurred_at: Utc.with_ymd_and_hms(2024, 1, 15, 10, 0, 0).unwrap(),
    }
}

/// Steady-state `record_page_view` on a warm store.
///
/// Store setup and migrations run outside `b.iter()` so only the fact insert
/// and rollup upsert are timed.
fn bench_record_page_view(c: &mut Criterion) {
    let mut group = c.benchmark_group("record_page_view");

    for size in [100, 1_000] {
        let engine = AggregationEngine::new(Arc::new(DuckDbStore::open_in_memory().unwrap()));

        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
            b.iter(|| {
                for i in 0..size {
                    engine.record_page_view("bench.example.com", page_view(i)).unwrap();
                }
            });
        });
    }

    group.finish();
}

fn bench_query_analytics(c: &mut Criterion) {
    let mut group = c.benchmark_group("query_analytics");

    let engine = AggregationEngine::new(Arc::new(DuckDbStore::open_in_memory().unwrap()));
    for i in 0..10_000 {
        engine.record_page_view("bench.example.com", page_view(i)).unwrap();
    }
    let now = Utc.with_ymd_and_hms(2024, 1, 20, 12, 0, 0).unwrap();

    group.bench_function("last7days_10k", |b| {
        b.iter(|| {
            query_analytics(engine.store(), "bench.example.com", TimeRange::Last7Days, now).unwrap();
        });
    });

    group.finish();
}

criterion_group!(benches, bench_record_page_view, bench_query_analytics);
criterion_main!(benches);
