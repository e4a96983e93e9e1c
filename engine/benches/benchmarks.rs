//! Performance benchmarks for jobsync-engine

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use jobsync_engine::{
    Customer, Enricher, JobFilter, JobStatus, Pagination, ReferenceData, RemoteJobRow,
    RepairPlan, StaffMember, StaffRole, Store, StoreSnapshot, Watermark,
};

fn references() -> ReferenceData {
    ReferenceData {
        customers: (0..200)
            .map(|i| Customer {
                id: format!("c{}", i),
                name: format!("Customer {}", i),
                email: None,
                phone: None,
                address: None,
            })
            .collect(),
        salesmen: (0..20)
            .map(|i| StaffMember {
                id: format!("s{}", i),
                name: format!("Salesman {}", i),
                email: None,
                role: StaffRole::Salesman,
            })
            .collect(),
        ..ReferenceData::default()
    }
}

fn remote_rows(count: usize) -> Vec<RemoteJobRow> {
    (0..count)
        .map(|i| {
            let created = Watermark::parse(&format!(
                "2024-{:02}-{:02}T{:02}:00:00Z",
                i % 12 + 1,
                i % 28 + 1,
                i % 24
            ));
            RemoteJobRow {
                jo_number: Some(format!("JO-{:05}", i)),
                // every 50th customer reference dangles
                customer_id: Some(format!("c{}", if i % 50 == 0 { 9999 } else { i % 200 })),
                salesman_id: Some(format!("s{}", i % 20)),
                status: Some(JobStatus::ALL[i % JobStatus::ALL.len()]),
                branch: Some(if i % 3 == 0 { "North" } else { "Main" }.to_string()),
                details: Some(format!("<p>Tarpaulin print run {}</p>", i)),
                created_at: Some(created.clone()),
                updated_at: Some(created),
                ..RemoteJobRow::minimal(format!("job-{}", i), None)
            }
        })
        .collect()
}

fn populated_store(count: usize) -> Store {
    let mut store = Store::new();
    store.replace_references(references());
    let records = Enricher::new(store.references()).enrich_batch(remote_rows(count));
    store.upsert_jobs(records);
    store
}

fn bench_enrichment(c: &mut Criterion) {
    let mut group = c.benchmark_group("enrichment");

    for size in [100, 1000].iter() {
        group.bench_with_input(BenchmarkId::new("enrich_batch", size), size, |b, &size| {
            let mut store = Store::new();
            store.replace_references(references());
            let rows = remote_rows(size);

            b.iter(|| Enricher::new(store.references()).enrich_batch(black_box(rows.clone())))
        });
    }

    group.bench_function("upsert_unchanged_1000", |b| {
        let mut store = populated_store(1000);
        let records = Enricher::new(store.references()).enrich_batch(remote_rows(1000));

        b.iter(|| store.upsert_jobs(black_box(records.clone())))
    });

    group.finish();
}

fn bench_queries(c: &mut Criterion) {
    let mut group = c.benchmark_group("queries");
    let store = populated_store(2500);

    group.bench_function("first_page_2500", |b| {
        b.iter(|| {
            store
                .query_jobs()
                .paginate(black_box(Pagination::page(1, 20)))
                .run()
        })
    });

    group.bench_function("status_and_search_2500", |b| {
        let filter = JobFilter {
            status: Some("pending".into()),
            search: Some("customer 1".into()),
            ..JobFilter::default()
        };
        b.iter(|| store.query_jobs().filter(black_box(filter.clone())).run())
    });

    group.bench_function("unpaginated_2500", |b| {
        b.iter(|| {
            store
                .query_jobs()
                .paginate(black_box(Pagination::unpaginated()))
                .run()
        })
    });

    group.finish();
}

fn bench_repair_plan(c: &mut Criterion) {
    let mut group = c.benchmark_group("repair_plan");

    for size in [500, 2500].iter() {
        group.bench_with_input(BenchmarkId::new("compute", size), size, |b, &size| {
            let store = populated_store(size);
            let local = store.job_versions();
            // remote has 10% more rows than the cache
            let remote: Vec<_> = (0..size + size / 10)
                .map(|i| {
                    RemoteJobRow::minimal(
                        format!("job-{}", i),
                        Some(Watermark::parse("2024-06-01T00:00:00Z")),
                    )
                })
                .collect();

            b.iter(|| RepairPlan::compute(black_box(&local), black_box(&remote)))
        });
    }

    group.finish();
}

fn bench_snapshot(c: &mut Criterion) {
    let mut group = c.benchmark_group("snapshot");

    for size in [500, 2500].iter() {
        group.bench_with_input(BenchmarkId::new("export", size), size, |b, &size| {
            let store = populated_store(size);
            b.iter(|| store.export_state())
        });

        group.bench_with_input(BenchmarkId::new("from_json", size), size, |b, &size| {
            let json = populated_store(size)
                .export_state()
                .to_json()
                .unwrap_or_default();
            b.iter(|| StoreSnapshot::from_json(black_box(&json)))
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_enrichment,
    bench_queries,
    bench_repair_plan,
    bench_snapshot,
);
criterion_main!(benches);
