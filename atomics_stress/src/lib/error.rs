// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::{error::Error, fmt};

/// A broken invariant found by one of the checks, or a reason a check could
/// not run.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum StressError {
    /// The shared counter does not account for every completed update.
    LostUpdates { expected: i32, actual: i32 },
    /// A compare-and-swap round did not have exactly one winner.
    CasWinners { round: i32, winners: i32 },
    /// A reader saw the flag of a round but not the payload published before it.
    StalePayload {
        round: i32,
        word: usize,
        expected: i32,
        observed: i32,
    },
    /// A thread found its private bit in the wrong state.
    BitClobbered { bit: u32, previous: i32 },
    /// The bits left in the shared word after every owner cleared its own.
    LeftoverBits { value: i32 },
    /// A worker thread panicked.
    WorkerPanicked,
    /// The check cannot run with the given parameters.
    InvalidConfig(&'static str),
}

impl fmt::Display for StressError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StressError::LostUpdates { expected, actual } => {
                write!(f, "lost updates: expected {expected}, found {actual}")
            }
            StressError::CasWinners { round, winners } => {
                write!(f, "round {round} had {winners} compare-and-swap winners, expected 1")
            }
            StressError::StalePayload {
                round,
                word,
                expected,
                observed,
            } => write!(
                f,
                "round {round}: payload word {word} read {observed} after the flag was observed, expected {expected}"
            ),
            StressError::BitClobbered { bit, previous } => {
                write!(f, "bit {bit} was changed by another thread (previous value {previous:#010x})")
            }
            StressError::LeftoverBits { value } => {
                write!(f, "bits {value:#010x} were still set after every owner cleared its bit")
            }
            StressError::WorkerPanicked => write!(f, "a worker thread panicked"),
            StressError::InvalidConfig(reason) => write!(f, "invalid configuration: {reason}"),
        }
    }
}

impl Error for StressError {}
