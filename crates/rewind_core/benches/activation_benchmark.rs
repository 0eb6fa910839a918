//! # Activation Queue Benchmark
//!
//! Measures push throughput and the cost of one batched drain.

#![allow(missing_docs)]

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rewind_core::{ActivationQueue, BodyHandle};

fn bench_push(c: &mut Criterion) {
    let mut group = c.benchmark_group("activation_push");

    for count in [1_000u32, 10_000, 25_000] {
        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, &count| {
            let queue = ActivationQueue::with_capacity(count as usize);
            b.iter(|| {
                for i in 0..count {
                    queue.push(BodyHandle::new(i, 0));
                }
                queue.clear();
            });
        });
    }

    group.finish();
}

fn bench_drain(c: &mut Criterion) {
    c.bench_function("activation_drain_10k", |b| {
        let queue = ActivationQueue::with_capacity(10_000);
        b.iter(|| {
            for i in 0..10_000 {
                queue.push(BodyHandle::new(i, 0));
            }
            let mut total = 0usize;
            queue.drain_with(|batch| total += batch.len());
            black_box(total)
        });
    });
}

criterion_group!(benches, bench_push, bench_drain);
criterion_main!(benches);
