// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Waiting on a flag another thread is about to change.

use std::{hint, thread};

use arm_atomics::AtomicCell;

/// Polls spent with a spin hint before every further poll yields the CPU.
const SPIN_LIMIT: u32 = 100;

/// Spins on a flag for a bounded number of polls, then yields between polls.
/// On a uniprocessor the thread that will change the flag can only run once
/// the waiter gives up its time slice.
#[derive(Debug, Default)]
pub(crate) struct FlagWait {
    polls: u32,
}

impl FlagWait {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Waits until `ready` accepts the value of `flag`, as read with
    /// `acquire_load`, and returns that value.
    pub(crate) fn until(&mut self, flag: &AtomicCell, mut ready: impl FnMut(i32) -> bool) -> i32 {
        self.polls = 0;
        loop {
            let value = flag.acquire_load();
            if ready(value) {
                return value;
            }
            self.pause();
        }
    }

    fn pause(&mut self) {
        if self.yielding() {
            thread::yield_now();
        } else {
            self.polls += 1;
            hint::spin_loop();
        }
    }

    fn yielding(&self) -> bool {
        self.polls >= SPIN_LIMIT
    }
}

#[test]
fn test_flag_wait_yields_after_spin_limit() {
    let mut wait = FlagWait::new();
    for _ in 0..SPIN_LIMIT {
        assert!(!wait.yielding());
        wait.pause();
    }
    assert!(wait.yielding());
    wait.pause();
    assert_eq!(wait.polls, SPIN_LIMIT);
}

#[test]
fn test_flag_wait_sees_other_thread() {
    use std::sync::Arc;

    let flag = Arc::new(AtomicCell::new(0));
    let setter = {
        let flag = Arc::clone(&flag);
        thread::spawn(move || {
            for value in 1..=50 {
                FlagWait::new().until(&flag, move |current| current == value - 1);
                flag.release_store(value);
            }
        })
    };
    let mut wait = FlagWait::new();
    let mut seen = 0;
    while seen < 50 {
        seen = wait.until(&flag, move |current| current > seen);
    }
    setter.join().unwrap();
    assert_eq!(flag.acquire_load(), 50);
}
