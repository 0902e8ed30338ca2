// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

// pause between lost exclusive passes
//
// the retry loops never give up: a lost monitor means another core committed,
// so some thread made progress. with the `backoff` feature a loser spins for
// 1, 2, 4, .. up to 64 pause hints before its next pass, which spreads out
// cores hammering the same cache line. without it this is a zero-sized no-op
// and the loops retry immediately.

#[derive(Debug, Default)]
pub(crate) struct Backoff {
    #[cfg(feature = "backoff")]
    step: u32,
}

impl Backoff {
    #[cfg(feature = "backoff")]
    const SPIN_LIMIT: u32 = 6;

    #[inline(always)]
    pub(crate) fn new() -> Self {
        Self::default()
    }

    #[inline(always)]
    pub(crate) fn snooze(&mut self) {
        #[cfg(feature = "backoff")]
        {
            for _ in 0..1u32 << self.step {
                core::hint::spin_loop();
            }
            if self.step < Self::SPIN_LIMIT {
                self.step += 1;
            }
        }
    }
}

#[cfg(feature = "backoff")]
#[test]
fn test_backoff_is_capped() {
    let mut backoff = Backoff::new();
    for _ in 0..32 {
        backoff.snooze();
    }
    assert_eq!(backoff.step, Backoff::SPIN_LIMIT);
}

#[cfg(not(feature = "backoff"))]
#[test]
fn test_backoff_is_free_when_disabled() {
    let mut backoff = Backoff::new();
    backoff.snooze();
    assert_eq!(core::mem::size_of::<Backoff>(), 0);
}
