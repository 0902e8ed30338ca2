// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use crate::{AtomicCell, backoff::Backoff, barrier::memory_barrier, exclusive::cas_pass};

/// Retries compare-and-swap passes until one completes without losing the
/// exclusive monitor and returns the value that pass observed.
///
/// A pass that observes a mismatch never attempts the store and therefore
/// always completes, so a failed comparison costs exactly one pass.
#[inline(always)]
fn cas_loop(old_value: i32, new_value: i32, cell: &AtomicCell) -> i32 {
    let mut backoff = Backoff::new();
    loop {
        let pass = cas_pass(cell.as_ptr(), old_value, new_value);
        if !pass.lost {
            return pass.observed;
        }
        backoff.snooze();
    }
}

#[inline(always)]
pub(crate) fn compare_exchange(
    old_value: i32,
    new_value: i32,
    cell: &AtomicCell,
) -> Result<i32, i32> {
    let observed = cas_loop(old_value, new_value, cell);
    if observed == old_value {
        Ok(observed)
    } else {
        Err(observed)
    }
}

// `cas` takes an expected value, a replacement value and a cell. If the cell
// holds the expected value the replacement is stored. It returns 0 when the
// swap happened and 1 when the comparison failed and the cell was left alone.

/// Compare-and-swap with no ordering. Returns 0 on success.
///
/// ```
/// use arm_atomics::{AtomicCell, cas};
///
/// let cell = AtomicCell::new(5);
/// assert_eq!(cas(5, 7, &cell), 0);
/// assert_ne!(cas(5, 9, &cell), 0);
/// assert_eq!(cell.into_inner(), 7);
/// ```
#[inline(always)]
pub fn cas(old_value: i32, new_value: i32, cell: &AtomicCell) -> i32 {
    (cas_loop(old_value, new_value, cell) != old_value) as i32
}

/// [`cas`] followed by a full barrier, whether or not the swap happened.
#[inline(always)]
pub fn acquire_cas(old_value: i32, new_value: i32, cell: &AtomicCell) -> i32 {
    let status = cas(old_value, new_value, cell);
    memory_barrier();
    status
}

/// A full barrier followed by [`cas`].
#[inline(always)]
pub fn release_cas(old_value: i32, new_value: i32, cell: &AtomicCell) -> i32 {
    memory_barrier();
    cas(old_value, new_value, cell)
}

#[test]
fn test_cas() {
    let cell = AtomicCell::new(5);
    assert_eq!(cas(5, 7, &cell), 0);
    assert_eq!(unsafe { cell.as_ptr().read() }, 7);

    let cell = AtomicCell::new(9);
    assert_ne!(cas(5, 7, &cell), 0);
    assert_eq!(unsafe { cell.as_ptr().read() }, 9);
}

#[test]
fn test_cas_variants() {
    let cell = AtomicCell::new(0);

    assert_eq!(acquire_cas(0, -1, &cell), 0, "acquire initial");
    assert_eq!(acquire_cas(0, 1, &cell), 1, "acquire subsequent");
    assert_eq!(unsafe { cell.as_ptr().read() }, -1);

    assert_eq!(release_cas(-1, i32::MAX, &cell), 0, "release initial");
    assert_eq!(release_cas(-1, 1, &cell), 1, "release subsequent");
    assert_eq!(unsafe { cell.as_ptr().read() }, i32::MAX);

    assert_eq!(cas(i32::MAX, i32::MIN, &cell), 0, "plain initial");
    assert_eq!(cas(i32::MAX, 0, &cell), 1, "plain subsequent");
    assert_eq!(cell.into_inner(), i32::MIN);
}

#[test]
fn test_cas_same_value() {
    let cell = AtomicCell::new(3);
    assert_eq!(cas(3, 3, &cell), 0);
    assert_eq!(cell.into_inner(), 3);
}
