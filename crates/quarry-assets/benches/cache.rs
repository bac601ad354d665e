//! Benchmarks for resource cache lookups and generated inserts.

use std::sync::Arc;

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use quarry_assets::*;

fn populated_manager(size: usize) -> ResourceManager {
    let manager = ResourceManager::new(
        "bench",
        Arc::new(BackendRegistry::new()),
        ManagerConfig::default(),
    );
    for i in 0..size {
        let bytes: Arc<[u8]> = Arc::from(vec![i as u8; 16]);
        manager.insert_generated(
            &format!("generated://blob{}", i),
            ResourceType::Data,
            Arc::new(move || Ok(ResourceData::Bytes(Arc::clone(&bytes)))),
        );
    }
    manager
}

fn bench_cache_hit(c: &mut Criterion) {
    let mut group = c.benchmark_group("cache_hit");

    for size in [10, 100, 1000] {
        let manager = populated_manager(size);
        let paths: Vec<String> = (0..size).map(|i| format!("generated://blob{}", i)).collect();

        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::new("get_resource", size), &paths, |b, paths| {
            b.iter(|| {
                let mut found = 0;
                for path in paths {
                    if manager.get_resource(black_box(path)).is_some() {
                        found += 1;
                    }
                }
                found
            });
        });

        group.bench_with_input(BenchmarkId::new("load_sync", size), &paths, |b, paths| {
            b.iter(|| {
                let mut found = 0;
                for path in paths {
                    if manager.load_sync(black_box(path), ResourceType::Data).is_some() {
                        found += 1;
                    }
                }
                found
            });
        });
    }

    group.finish();
}

fn bench_insert_generated(c: &mut Criterion) {
    let mut group = c.benchmark_group("insert_generated");

    for size in [10, 100] {
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
            b.iter(|| populated_manager(black_box(size)));
        });
    }

    group.finish();
}

fn bench_statistics(c: &mut Criterion) {
    let manager = populated_manager(1000);
    c.bench_function("statistics_1000", |b| b.iter(|| manager.statistics()));
}

criterion_group!(benches, bench_cache_hit, bench_insert_generated, bench_statistics);
criterion_main!(benches);
