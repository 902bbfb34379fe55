//! Lock manager benchmarks.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use detcc_bench::random_workload;
use detcc_core::{
    ExclusiveOnly, LockManager, LockPolicy, ReadyQueue, SharedExclusive, TransactionId,
};
use detcc_testkit::{release_locks, request_locks, TxnSpec};
use std::collections::VecDeque;

/// Benchmark uncontended acquire/release of a single key.
fn bench_uncontended(c: &mut Criterion) {
    let mut group = c.benchmark_group("uncontended_lock");

    group.bench_function("exclusive_only", |b| {
        let mut lm: LockManager<u64, ExclusiveOnly> = LockManager::new(ReadyQueue::new());
        let mut id = 0u64;
        b.iter(|| {
            id += 1;
            let txn = TransactionId::new(id);
            black_box(lm.write_lock(txn, black_box(7)).unwrap());
            lm.release(txn, &7).unwrap();
        });
    });

    group.bench_function("shared_exclusive", |b| {
        let mut lm: LockManager<u64, SharedExclusive> = LockManager::new(ReadyQueue::new());
        let mut id = 0u64;
        b.iter(|| {
            id += 1;
            let txn = TransactionId::new(id);
            black_box(lm.read_lock(txn, black_box(7)).unwrap());
            lm.release(txn, &7).unwrap();
        });
    });

    group.finish();
}

/// Request every lock of a workload, then release in ready order.
fn drive<P: LockPolicy>(workload: &[TxnSpec]) -> usize {
    let ready = ReadyQueue::new();
    let mut lm: LockManager<u64, P> = LockManager::new(ready.clone());
    let mut runnable = VecDeque::new();

    for spec in workload {
        if request_locks(&mut lm, spec).unwrap() {
            runnable.push_back(spec.id);
        }
    }

    let mut done = 0;
    while let Some(id) = runnable.pop_front() {
        let spec = &workload[(id.as_u64() - 1) as usize];
        release_locks(&mut lm, spec).unwrap();
        runnable.extend(ready.drain());
        done += 1;
    }
    done
}

/// Benchmark full grant/release cascades over contended workloads.
fn bench_contended_workload(c: &mut Criterion) {
    let mut group = c.benchmark_group("contended_workload");

    for key_count in [16u64, 256, 4096].iter() {
        let workload = random_workload(1_000, *key_count, 4, 2);
        group.throughput(Throughput::Elements(workload.len() as u64));

        group.bench_with_input(
            BenchmarkId::new("exclusive_only", key_count),
            &workload,
            |b, workload| b.iter(|| black_box(drive::<ExclusiveOnly>(workload))),
        );
        group.bench_with_input(
            BenchmarkId::new("shared_exclusive", key_count),
            &workload,
            |b, workload| b.iter(|| black_box(drive::<SharedExclusive>(workload))),
        );
    }

    group.finish();
}

criterion_group!(benches, bench_uncontended, bench_contended_workload);

criterion_main!(benches);
