// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::{
    sync::{Arc, Barrier},
    thread,
};

use arm_atomics::{
    AtomicCell, acquire_load, add, and, cas, dec, inc, or, release_cas, release_store,
    unsynchronized_load, unsynchronized_store,
};

const THREADS: usize = 8;

/// Spins on `flag` for a while, then yields until it holds `expected`.
fn wait_for(flag: &AtomicCell, expected: i32) {
    let mut polls = 0;
    while acquire_load(flag) != expected {
        if polls < 100 {
            polls += 1;
            std::hint::spin_loop();
        } else {
            thread::yield_now();
        }
    }
}

fn run_on_threads(threads: usize, body: impl Fn(usize) + Send + Sync + 'static) {
    let body = Arc::new(body);
    let start = Arc::new(Barrier::new(threads));
    let handles: Vec<_> = (0..threads)
        .map(|index| {
            let body = Arc::clone(&body);
            let start = Arc::clone(&start);
            thread::spawn(move || {
                start.wait();
                body(index);
            })
        })
        .collect();
    for handle in handles {
        handle.join().expect("worker thread panicked");
    }
}

#[test]
fn add_loses_no_updates() {
    const ITERATIONS: usize = 20_000;
    let cell = Arc::new(AtomicCell::new(0));

    let shared = Arc::clone(&cell);
    run_on_threads(THREADS, move |_| {
        for _ in 0..ITERATIONS {
            add(1, &shared);
        }
    });

    assert_eq!(cell.acquire_load(), (THREADS * ITERATIONS) as i32);
}

#[test]
fn inc_and_dec_cancel_out() {
    const ITERATIONS: usize = 10_000;
    let cell = Arc::new(AtomicCell::new(100));

    let shared = Arc::clone(&cell);
    run_on_threads(THREADS, move |index| {
        for _ in 0..ITERATIONS {
            if index % 2 == 0 {
                inc(&shared);
            } else {
                dec(&shared);
            }
        }
    });

    assert_eq!(cell.acquire_load(), 100);
}

#[test]
fn exactly_one_cas_wins_per_round() {
    const ROUNDS: i32 = 200;
    let cell = Arc::new(AtomicCell::new(0));
    let winners = Arc::new(AtomicCell::new(0));
    let round_start = Arc::new(Barrier::new(THREADS));

    let shared = Arc::clone(&cell);
    let shared_winners = Arc::clone(&winners);
    run_on_threads(THREADS, move |index| {
        for round in 0..ROUNDS {
            round_start.wait();
            // Every thread tries to move the cell from this round's value to a
            // distinct value of its own.
            let old_value = round * (THREADS as i32 + 1);
            let new_value = old_value + 1 + index as i32;
            if release_cas(old_value, new_value, &shared) == 0 {
                inc(&shared_winners);
            }
            round_start.wait();
            if index == 0 {
                release_store((round + 1) * (THREADS as i32 + 1), &shared);
            }
        }
    });

    assert_eq!(winners.acquire_load(), ROUNDS);
}

#[test]
fn cas_increment_loop_loses_no_updates() {
    const ITERATIONS: usize = 5_000;
    let cell = Arc::new(AtomicCell::new(0));

    let shared = Arc::clone(&cell);
    run_on_threads(THREADS, move |_| {
        for _ in 0..ITERATIONS {
            loop {
                let current = unsynchronized_load(&shared);
                if cas(current, current.wrapping_add(1), &shared) == 0 {
                    break;
                }
            }
        }
    });

    assert_eq!(cell.acquire_load(), (THREADS * ITERATIONS) as i32);
}

#[test]
fn bit_owners_never_clobber_each_other() {
    const ITERATIONS: usize = 5_000;
    let cell = Arc::new(AtomicCell::new(0));

    let shared = Arc::clone(&cell);
    run_on_threads(THREADS, move |index| {
        let bit = 1 << index;
        for _ in 0..ITERATIONS {
            let before = or(bit, &shared);
            assert_eq!(before & bit, 0, "bit {index} was set by someone else");
            let before = and(!bit, &shared);
            assert_eq!(before & bit, bit, "bit {index} was cleared by someone else");
        }
    });

    assert_eq!(cell.acquire_load(), 0);
}

#[test]
fn release_store_publishes_payload() {
    const ROUNDS: i32 = 2_000;
    let payload = Arc::new(AtomicCell::new(0));
    let flag = Arc::new(AtomicCell::new(0));

    let writer_payload = Arc::clone(&payload);
    let writer_flag = Arc::clone(&flag);
    let writer = thread::spawn(move || {
        for round in 1..=ROUNDS {
            // Wait until the reader consumed the previous round.
            wait_for(&writer_flag, 0);
            unsynchronized_store(round * 3, &writer_payload);
            release_store(round, &writer_flag);
        }
    });

    for round in 1..=ROUNDS {
        wait_for(&flag, round);
        assert_eq!(unsynchronized_load(&payload), round * 3);
        release_store(0, &flag);
    }

    writer.join().expect("writer thread panicked");
}
