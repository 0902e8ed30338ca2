// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Contention checks for the `arm_atomics` primitives.
//!
//! > [!IMPORTANT]
//! > This library exists to back the `atomics_stress` binary and might not
//! > adhere to semver versioning.

mod checks;
mod error;
mod report;
mod wait;

pub use checks::{
    BITOPS_MAX_THREADS, CheckReport, MAX_THREADS, add_check, bitops_check, cas_race_check,
    message_passing_check,
};
pub use error::StressError;
pub use report::{print_failure, print_report};

use arm_atomics::AtomicCell;

static STOP: AtomicCell = AtomicCell::new(0);

/// Asks every running check to wind down at its next checkpoint. The checks
/// still verify whatever work completed before they stopped.
pub fn request_stop() {
    STOP.release_store(1);
}

pub fn stop_requested() -> bool {
    STOP.acquire_load() != 0
}

/// Parameters shared by the checks. Not every check reads every field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StressConfig {
    /// Number of worker threads hammering the shared cells.
    pub threads: usize,
    /// Operations per thread for the counting checks.
    pub iterations: u64,
    /// Rounds for the round-based checks.
    pub rounds: i32,
}

impl StressConfig {
    /// The same configuration with at most one thread per bit the bitops
    /// check can hand out.
    pub fn for_bitops(self) -> Self {
        Self {
            threads: self.threads.min(BITOPS_MAX_THREADS),
            ..self
        }
    }
}

impl Default for StressConfig {
    fn default() -> Self {
        Self {
            threads: default_threads(),
            iterations: 100_000,
            rounds: 10_000,
        }
    }
}

/// One worker per available core, or four when that cannot be queried.
pub fn default_threads() -> usize {
    std::thread::available_parallelism().map_or(4, usize::from)
}
