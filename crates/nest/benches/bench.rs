use core::hint::black_box;
use criterion::{Criterion, Throughput, criterion_group, criterion_main};
use nest::{NEST_EPOCH, SnowflakeGenerator, TimeSource};
use std::{
    sync::{Arc, Barrier},
    thread::scope,
    time::Instant,
};

// Number of IDs generated per benchmark iteration (per-thread for
// multi-threaded).
const TOTAL_IDS: usize = 4096;

/// Keeps the timestamp fixed and far enough from the epoch. Never more than
/// 4096 IDs are minted per generator, so the sequence never runs out.
struct FixedMockTime {
    millis: i64,
}

impl TimeSource for FixedMockTime {
    fn current_millis(&self) -> i64 {
        self.millis
    }
}

fn bench_single_thread(c: &mut Criterion) {
    let mut group = c.benchmark_group("mono/next_id");
    group.throughput(Throughput::Elements(TOTAL_IDS as u64));

    group.bench_function(format!("fixed_time/elems/{TOTAL_IDS}"), |b| {
        b.iter_custom(|iters| {
            let start = Instant::now();
            for _ in 0..iters {
                let generator = SnowflakeGenerator::with_time_source(
                    1,
                    1,
                    NEST_EPOCH,
                    FixedMockTime {
                        millis: NEST_EPOCH + 1,
                    },
                )
                .unwrap();
                for _ in 0..TOTAL_IDS {
                    black_box(generator.next_id().unwrap());
                }
            }
            start.elapsed()
        });
    });

    group.bench_function(format!("system_clock/elems/{TOTAL_IDS}"), |b| {
        let generator = SnowflakeGenerator::new(1, 1, NEST_EPOCH).unwrap();
        b.iter(|| {
            for _ in 0..TOTAL_IDS {
                black_box(generator.next_id().unwrap());
            }
        });
    });

    group.finish();
}

fn bench_batch(c: &mut Criterion) {
    const BATCH: i64 = 1000;

    let mut group = c.benchmark_group("mono/next_ids");
    group.throughput(Throughput::Elements(BATCH as u64));

    group.bench_function(format!("system_clock/elems/{BATCH}"), |b| {
        let generator = SnowflakeGenerator::new(1, 1, NEST_EPOCH).unwrap();
        b.iter(|| black_box(generator.next_ids(BATCH).unwrap()));
    });

    group.finish();
}

fn bench_contended(c: &mut Criterion) {
    let mut group = c.benchmark_group("multi/next_id");

    for threads in [2, 4, 8, num_cpus::get()] {
        group.throughput(Throughput::Elements((threads * TOTAL_IDS) as u64));
        group.bench_function(format!("threads/{threads}/elems/{TOTAL_IDS}"), |b| {
            b.iter_custom(|iters| {
                let generator = Arc::new(SnowflakeGenerator::new(1, 1, NEST_EPOCH).unwrap());
                let barrier = Arc::new(Barrier::new(threads + 1));
                let mut elapsed = core::time::Duration::ZERO;

                for _ in 0..iters {
                    // `scope` joins every worker before returning.
                    let start = scope(|s| {
                        for _ in 0..threads {
                            let generator = Arc::clone(&generator);
                            let barrier = Arc::clone(&barrier);
                            s.spawn(move || {
                                barrier.wait();
                                for _ in 0..TOTAL_IDS {
                                    black_box(generator.next_id().unwrap());
                                }
                            });
                        }
                        barrier.wait();
                        Instant::now()
                    });
                    elapsed += start.elapsed();
                }
                elapsed
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_single_thread, bench_batch, bench_contended);
criterion_main!(benches);
