//! Benchmarks for readdirinfo
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use std::sync::Arc;

fn benchmark_pool_execute(c: &mut Criterion) {
    use readdirinfo::WorkerPool;

    c.bench_function("pool_execute_round_trip", |b| {
        let pool = WorkerPool::new(1).unwrap();
        let (tx, rx) = crossbeam_channel::unbounded();

        b.iter(|| {
            let tx = tx.clone();
            pool.execute(Box::new(move || tx.send(()).unwrap())).unwrap();
            black_box(rx.recv().unwrap());
        })
    });
}

fn benchmark_classification(c: &mut Criterion) {
    use readdirinfo::EntryType;

    c.bench_function("classify_d_type", |b| {
        b.iter(|| {
            for d_type in 0u8..=15 {
                black_box(EntryType::from_d_type(black_box(d_type)));
            }
        })
    });
}

fn populated_dir(files: usize) -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    for i in 0..files {
        std::fs::write(dir.path().join(format!("file{i:05}.dat")), b"payload").unwrap();
    }
    dir
}

fn benchmark_list_entries(c: &mut Criterion) {
    use readdirinfo::dirent::list_entries;

    let dir = populated_dir(1000);

    c.bench_function("list_entries_1000", |b| {
        b.iter(|| {
            let entries = list_entries(black_box(dir.path())).unwrap();
            black_box(entries);
        })
    });
}

fn benchmark_coordinator_round_trip(c: &mut Criterion) {
    use readdirinfo::{FsScanner, ListingCoordinator, WorkerPool};

    let dir = populated_dir(100);
    let pool = Arc::new(WorkerPool::new(4).unwrap());
    let mut coordinator = ListingCoordinator::with_scanner(pool, FsScanner);

    c.bench_function("coordinator_round_trip_x16", |b| {
        b.iter(|| {
            for _ in 0..16 {
                coordinator
                    .submit(dir.path(), |outcome| {
                        black_box(outcome.map(|entries| entries.len()).ok());
                    })
                    .unwrap();
            }
            coordinator.run_until_idle();
        })
    });
}

criterion_group!(
    benches,
    benchmark_pool_execute,
    benchmark_classification,
    benchmark_list_entries,
    benchmark_coordinator_round_trip
);
criterion_main!(benches);
