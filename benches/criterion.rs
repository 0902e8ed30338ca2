// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::{
    hint::black_box,
    sync::{
        Arc, Barrier,
        atomic::{AtomicI32, Ordering},
    },
    thread,
    time::{Duration, Instant},
};

use arm_atomics::AtomicCell;
use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};

// Each pair measures one of our primitives next to the closest
// core::sync::atomic operation on the same cell width.
macro_rules! bench_harness {
    ($($name:literal => |$cell:ident, $baseline:ident| $ours:expr, $theirs:expr;)*) => {
        fn bench_uncontended(c: &mut Criterion) {
            let mut group = c.benchmark_group("uncontended");
            $(
                {
                    let $cell = AtomicCell::new(0);
                    group.bench_function(BenchmarkId::new("arm_atomics", $name), |b| {
                        b.iter(|| black_box($ours))
                    });
                    let $baseline = AtomicI32::new(0);
                    group.bench_function(BenchmarkId::new("core", $name), |b| {
                        b.iter(|| black_box($theirs))
                    });
                }
            )*
            group.finish();
        }
    };
}

bench_harness!(
    "acquire_load" => |cell, baseline| cell.acquire_load(), baseline.load(Ordering::Acquire);
    "release_store" => |cell, baseline| cell.release_store(black_box(1)), baseline.store(black_box(1), Ordering::Release);
    "cas" => |cell, baseline| cell.cas(0, 0), baseline.compare_exchange(0, 0, Ordering::Relaxed, Ordering::Relaxed);
    "acquire_cas" => |cell, baseline| cell.acquire_cas(0, 0), baseline.compare_exchange(0, 0, Ordering::Acquire, Ordering::Acquire);
    "add" => |cell, baseline| cell.add(black_box(1)), baseline.fetch_add(black_box(1), Ordering::SeqCst);
    "and" => |cell, baseline| cell.and(black_box(-1)), baseline.fetch_and(black_box(-1), Ordering::SeqCst);
    "or" => |cell, baseline| cell.or(black_box(0)), baseline.fetch_or(black_box(0), Ordering::SeqCst);
    "swap" => |cell, baseline| cell.swap(black_box(0)), baseline.swap(black_box(0), Ordering::SeqCst);
);

/// Runs `iters` increments split across `threads` threads hammering one cell
/// and returns the wall time of the slowest thread.
fn contended_inc(threads: usize, iters: u64) -> Duration {
    let cell = Arc::new(AtomicCell::new(0));
    let start = Arc::new(Barrier::new(threads));
    let per_thread = iters.div_ceil(threads as u64);
    let handles: Vec<_> = (0..threads)
        .map(|_| {
            let cell = Arc::clone(&cell);
            let start = Arc::clone(&start);
            thread::spawn(move || {
                start.wait();
                let begin = Instant::now();
                for _ in 0..per_thread {
                    cell.inc();
                }
                begin.elapsed()
            })
        })
        .collect();
    handles
        .into_iter()
        .map(|handle| handle.join().unwrap())
        .max()
        .unwrap_or_default()
}

fn bench_contended(c: &mut Criterion) {
    let mut group = c.benchmark_group("contended_inc");
    for threads in [2, 4, 8] {
        group.bench_with_input(BenchmarkId::from_parameter(threads), &threads, |b, &threads| {
            b.iter_custom(|iters| contended_inc(threads, iters))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_uncontended, bench_contended);
criterion_main!(benches);
