// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The contention checks.
//!
//! Every check starts its workers behind a barrier so they collide as much as
//! possible, polls [`crate::stop_requested`] at checkpoints and verifies its
//! invariant against the work that actually completed.

use std::{
    sync::{Arc, Barrier},
    thread,
    time::{Duration, Instant},
};

use arm_atomics::AtomicCell;

use crate::{StressConfig, StressError, stop_requested, wait::FlagWait};

/// How often the counting loops look at the stop flag.
const CHECKPOINT: u64 = 1 << 12;

/// Flag value the message passing threads use to tell each other to quit.
const ABORTED: i32 = -1;

/// Number of payload words published per message passing round.
const PAYLOAD_WORDS: usize = 4;

/// Upper bound on worker threads for every check.
pub const MAX_THREADS: usize = 4096;

/// Every bitops thread owns one bit of a 32-bit word, sign bit excluded.
pub const BITOPS_MAX_THREADS: usize = 31;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckReport {
    pub name: &'static str,
    pub threads: usize,
    /// Primitive operations issued on the shared cells.
    pub operations: u64,
    pub elapsed: Duration,
    /// Whether the check stopped early because a stop was requested.
    pub interrupted: bool,
}

impl CheckReport {
    /// Operations per second over the whole check.
    pub fn throughput(&self) -> f64 {
        let seconds = self.elapsed.as_secs_f64();
        if seconds == 0.0 {
            0.0
        } else {
            self.operations as f64 / seconds
        }
    }
}

/// Runs `body` on `threads` threads released together and collects the
/// results in thread order.
fn run_workers<T: Send + 'static>(
    threads: usize,
    body: impl Fn(usize) -> T + Send + Sync + 'static,
) -> Result<Vec<T>, StressError> {
    let body = Arc::new(body);
    let start = Arc::new(Barrier::new(threads));
    let handles: Vec<_> = (0..threads)
        .map(|index| {
            let body = Arc::clone(&body);
            let start = Arc::clone(&start);
            thread::spawn(move || {
                start.wait();
                body(index)
            })
        })
        .collect();
    handles
        .into_iter()
        .map(|handle| handle.join().map_err(|_| StressError::WorkerPanicked))
        .collect()
}

fn require_threads(threads: usize) -> Result<(), StressError> {
    if threads == 0 {
        return Err(StressError::InvalidConfig("at least one thread is required"));
    }
    if threads > MAX_THREADS {
        return Err(StressError::InvalidConfig("at most 4096 threads are supported"));
    }
    Ok(())
}

/// Every thread repeatedly does `inc`, `add(delta)` and `dec` on one shared
/// counter, with a per-thread delta. The counter must end at the sum of all
/// completed deltas.
pub fn add_check(config: &StressConfig) -> Result<CheckReport, StressError> {
    require_threads(config.threads)?;
    let counter = Arc::new(AtomicCell::new(0));
    let iterations = config.iterations;

    let begin = Instant::now();
    let shared = Arc::clone(&counter);
    let completed = run_workers(config.threads, move |index| {
        let delta = (index % 5) as i32 + 1;
        let mut done = 0u64;
        while done < iterations {
            if done % CHECKPOINT == 0 && stop_requested() {
                break;
            }
            shared.inc();
            shared.add(delta);
            shared.dec();
            done += 1;
        }
        (delta, done)
    })?;
    let elapsed = begin.elapsed();

    let expected = completed
        .iter()
        .fold(0i32, |sum, &(delta, done)| sum.wrapping_add(delta.wrapping_mul(done as i32)));
    let actual = counter.acquire_load();
    if actual != expected {
        return Err(StressError::LostUpdates { expected, actual });
    }

    let done: u64 = completed.iter().map(|&(_, done)| done).sum();
    Ok(CheckReport {
        name: "add",
        threads: config.threads,
        operations: done * 3,
        elapsed,
        interrupted: done < iterations * config.threads as u64,
    })
}

struct RaceState {
    cell: AtomicCell,
    winners: AtomicCell,
    halt: AtomicCell,
    bad_round: AtomicCell,
    bad_winners: AtomicCell,
    round_barrier: Barrier,
}

/// Value the raced cell holds at the start of `round`. Rounds are spaced so
/// that no thread's replacement value can collide with a later round.
fn round_base(round: i32, threads: usize) -> i32 {
    round.wrapping_mul(threads as i32 + 1)
}

/// Per round, every thread races one `release_cas` from the same starting
/// value to a value of its own. Exactly one of them may win.
pub fn cas_race_check(config: &StressConfig) -> Result<CheckReport, StressError> {
    require_threads(config.threads)?;
    let threads = config.threads;
    let rounds = config.rounds;
    let state = Arc::new(RaceState {
        cell: AtomicCell::new(round_base(0, threads)),
        winners: AtomicCell::new(0),
        halt: AtomicCell::new(0),
        bad_round: AtomicCell::new(-1),
        bad_winners: AtomicCell::new(0),
        round_barrier: Barrier::new(threads),
    });

    let begin = Instant::now();
    let shared = Arc::clone(&state);
    let completed = run_workers(threads, move |index| {
        let state = &*shared;
        let mut round = 0;
        while round < rounds {
            state.round_barrier.wait();
            let old_value = round_base(round, threads);
            let new_value = old_value.wrapping_add(1 + index as i32);
            if state.cell.release_cas(old_value, new_value) == 0 {
                state.winners.inc();
            }
            state.round_barrier.wait();

            if index == 0 {
                let winners = state.winners.swap(0);
                if winners != 1 {
                    state.bad_round.release_store(round);
                    state.bad_winners.release_store(winners);
                    state.halt.release_store(1);
                } else if stop_requested() {
                    state.halt.release_store(1);
                }
                state.cell.release_store(round_base(round + 1, threads));
            }
            state.round_barrier.wait();

            round += 1;
            if state.halt.acquire_load() != 0 {
                break;
            }
        }
        round
    })?;
    let elapsed = begin.elapsed();

    let bad_round = state.bad_round.acquire_load();
    if bad_round >= 0 {
        return Err(StressError::CasWinners {
            round: bad_round,
            winners: state.bad_winners.acquire_load(),
        });
    }

    let rounds_done = completed.first().copied().unwrap_or(0);
    Ok(CheckReport {
        name: "cas-race",
        threads,
        operations: rounds_done as u64 * threads as u64,
        elapsed,
        interrupted: rounds_done < rounds,
    })
}

fn payload_value(round: i32, word: usize) -> i32 {
    round.wrapping_mul(0x9E37_79B9_u32 as i32).wrapping_add(word as i32)
}

struct Mailbox {
    flag: AtomicCell,
    payload: [AtomicCell; PAYLOAD_WORDS],
}

/// A writer publishes a multi-word payload with plain stores followed by a
/// `release_store` of the round number into a flag; a reader waits for the
/// flag with `acquire_load` and must then see the whole payload.
pub fn message_passing_check(config: &StressConfig) -> Result<CheckReport, StressError> {
    if config.rounds < 1 {
        return Err(StressError::InvalidConfig("at least one round is required"));
    }
    let rounds = config.rounds;
    let mailbox = Arc::new(Mailbox {
        flag: AtomicCell::new(0),
        payload: Default::default(),
    });

    let begin = Instant::now();
    let shared = Arc::clone(&mailbox);
    let results = run_workers(2, move |index| {
        let mailbox = &*shared;
        if index == 0 {
            write_rounds(mailbox, rounds)
        } else {
            read_rounds(mailbox, rounds)
        }
    })?;
    let elapsed = begin.elapsed();

    let mut rounds_done = rounds;
    for result in results {
        rounds_done = rounds_done.min(result?);
    }

    Ok(CheckReport {
        name: "message-passing",
        threads: 2,
        operations: rounds_done as u64 * (PAYLOAD_WORDS as u64 + 2) * 2,
        elapsed,
        interrupted: rounds_done < rounds,
    })
}

fn write_rounds(mailbox: &Mailbox, rounds: i32) -> Result<i32, StressError> {
    let mut wait = FlagWait::new();
    for round in 1..=rounds {
        if wait.until(&mailbox.flag, |flag| flag == 0 || flag == ABORTED) == ABORTED {
            return Ok(round - 1);
        }
        if stop_requested() {
            mailbox.flag.release_store(ABORTED);
            return Ok(round - 1);
        }
        for (word, cell) in mailbox.payload.iter().enumerate() {
            cell.unsynchronized_store(payload_value(round, word));
        }
        mailbox.flag.release_store(round);
    }
    Ok(rounds)
}

fn read_rounds(mailbox: &Mailbox, rounds: i32) -> Result<i32, StressError> {
    let mut wait = FlagWait::new();
    for round in 1..=rounds {
        if wait.until(&mailbox.flag, |flag| flag == round || flag == ABORTED) == ABORTED {
            return Ok(round - 1);
        }
        for (word, cell) in mailbox.payload.iter().enumerate() {
            let expected = payload_value(round, word);
            let observed = cell.unsynchronized_load();
            if observed != expected {
                mailbox.flag.release_store(ABORTED);
                return Err(StressError::StalePayload {
                    round,
                    word,
                    expected,
                    observed,
                });
            }
        }
        mailbox.flag.release_store(0);
    }
    Ok(rounds)
}

/// Every thread owns one bit of a shared word and flips it with `or`/`and`
/// and with a pair of `xor`s. The value returned by each operation tells
/// whether anybody else touched the bit.
pub fn bitops_check(config: &StressConfig) -> Result<CheckReport, StressError> {
    require_threads(config.threads)?;
    if config.threads > BITOPS_MAX_THREADS {
        return Err(StressError::InvalidConfig("bitops supports at most 31 threads"));
    }
    let word = Arc::new(AtomicCell::new(0));
    let iterations = config.iterations;

    let begin = Instant::now();
    let shared = Arc::clone(&word);
    let results = run_workers(config.threads, move |index| {
        let bit = 1i32 << index;
        let clobbered = |previous: i32| StressError::BitClobbered {
            bit: index as u32,
            previous,
        };
        let mut done = 0u64;
        while done < iterations {
            if done % CHECKPOINT == 0 && stop_requested() {
                break;
            }
            let previous = shared.or(bit);
            if previous & bit != 0 {
                return Err(clobbered(previous));
            }
            let previous = shared.xor(bit);
            if previous & bit == 0 {
                return Err(clobbered(previous));
            }
            let previous = shared.xor(bit);
            if previous & bit != 0 {
                return Err(clobbered(previous));
            }
            shared.or(bit);
            let previous = shared.and(!bit);
            if previous & bit == 0 {
                return Err(clobbered(previous));
            }
            done += 1;
        }
        Ok(done)
    })?;
    let elapsed = begin.elapsed();

    let mut done = 0u64;
    for result in results {
        done += result?;
    }
    let value = word.acquire_load();
    if value != 0 {
        return Err(StressError::LeftoverBits { value });
    }

    Ok(CheckReport {
        name: "bitops",
        threads: config.threads,
        operations: done * 5,
        elapsed,
        interrupted: done < iterations * config.threads as u64,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small() -> StressConfig {
        StressConfig {
            threads: 4,
            iterations: 2_000,
            rounds: 200,
        }
    }

    #[test]
    fn add_check_passes() {
        let report = add_check(&small()).unwrap();
        assert_eq!(report.operations, 4 * 2_000 * 3);
        assert!(!report.interrupted);
    }

    #[test]
    fn cas_race_check_passes() {
        let report = cas_race_check(&small()).unwrap();
        assert_eq!(report.operations, 4 * 200);
        assert!(!report.interrupted);
    }

    #[test]
    fn message_passing_check_passes() {
        let report = message_passing_check(&small()).unwrap();
        assert_eq!(report.threads, 2);
        assert!(!report.interrupted);
    }

    #[test]
    fn bitops_check_passes() {
        let report = bitops_check(&small()).unwrap();
        assert_eq!(report.operations, 4 * 2_000 * 5);
    }

    #[test]
    fn invalid_configs_are_rejected() {
        let none = StressConfig {
            threads: 0,
            ..small()
        };
        assert!(matches!(add_check(&none), Err(StressError::InvalidConfig(_))));

        let wide = StressConfig {
            threads: 32,
            ..small()
        };
        assert!(matches!(bitops_check(&wide), Err(StressError::InvalidConfig(_))));

        let empty = StressConfig {
            rounds: 0,
            ..small()
        };
        assert!(matches!(
            message_passing_check(&empty),
            Err(StressError::InvalidConfig(_))
        ));
    }

    #[test]
    fn oversized_thread_counts_are_rejected_before_spawning() {
        let huge = StressConfig {
            threads: i32::MAX as usize,
            rounds: 1,
            ..small()
        };
        assert!(matches!(cas_race_check(&huge), Err(StressError::InvalidConfig(_))));
        assert!(matches!(add_check(&huge), Err(StressError::InvalidConfig(_))));
        assert!(matches!(bitops_check(&huge), Err(StressError::InvalidConfig(_))));
    }

    #[test]
    fn bitops_config_is_clamped() {
        let wide = StressConfig {
            threads: 40,
            iterations: 100,
            ..small()
        }
        .for_bitops();
        assert_eq!(wide.threads, BITOPS_MAX_THREADS);
        assert!(bitops_check(&wide).is_ok());
        assert_eq!(small().for_bitops(), small());
    }

    #[test]
    fn message_passing_completes_many_rounds() {
        let config = StressConfig {
            rounds: 20_000,
            ..small()
        };
        let report = message_passing_check(&config).unwrap();
        assert!(!report.interrupted);
        assert_eq!(report.operations, 20_000 * (PAYLOAD_WORDS as u64 + 2) * 2);
    }

    #[test]
    fn round_bases_leave_room_for_every_thread() {
        for threads in 1..8 {
            let base = round_base(3, threads);
            let highest = base + threads as i32;
            assert!(highest < round_base(4, threads));
        }
    }
}
