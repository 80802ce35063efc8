use std::thread;
use std::time::Duration;

use criterion::{criterion_group, criterion_main, Criterion};
use rand::prelude::*;
use workpool::ThreadPool;

fn roundtrip_bench(c: &mut Criterion) {
    let mut group = c.benchmark_group("roundtrip");

    for &size in &[1, num_cpus::get()] {
        group.bench_function(format!("workers_{}", size), |b| {
            b.iter_batched(
                || ThreadPool::new(size).unwrap(),
                |pool| {
                    for _ in 0..100 {
                        let id = loop {
                            match pool.acquire(|| {}) {
                                Some(id) => break id,
                                None => thread::yield_now(),
                            }
                        };
                        pool.wait(id).unwrap();
                    }
                },
                criterion::BatchSize::SmallInput,
            );
        });
    }

    group.finish();
}

fn mixed_load_bench(c: &mut Criterion) {
    let mut group = c.benchmark_group("mixed_load");

    group.bench_function("random_job_durations", |b| {
        b.iter_batched(
            || ThreadPool::new(num_cpus::get()).unwrap(),
            |pool| {
                let mut rng = thread_rng();
                let mut claimed = Vec::new();
                for _ in 0..50 {
                    let micros = rng.gen_range(0..50);
                    let id = loop {
                        let job = move || thread::sleep(Duration::from_micros(micros));
                        match pool.acquire(job) {
                            Some(id) => break id,
                            None => thread::yield_now(),
                        }
                    };
                    claimed.push(id);
                }
                for id in claimed {
                    pool.wait(id).unwrap();
                }
            },
            criterion::BatchSize::SmallInput,
        );
    });

    group.finish();
}

criterion_group!(benches, roundtrip_bench, mixed_load_bench);
criterion_main!(benches);
