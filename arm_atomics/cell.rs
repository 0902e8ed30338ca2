// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use core::{cell::UnsafeCell, fmt};

/// A 4-byte, 4-byte-aligned signed integer shared between threads.
///
/// The cell is plain memory: it has the layout of an `i32`, owns no other
/// resources and is only ever updated as a whole. All access from shared
/// references goes through the primitives of this crate, which are also
/// available as methods.
///
/// ```
/// use arm_atomics::AtomicCell;
///
/// let refs = AtomicCell::new(1);
/// refs.inc();
/// assert_eq!(refs.dec(), 2);
/// assert_eq!(refs.acquire_load(), 1);
/// ```
#[repr(transparent)]
pub struct AtomicCell {
    value: UnsafeCell<i32>,
}

const _: () = {
    assert!(core::mem::size_of::<AtomicCell>() == 4);
    assert!(core::mem::align_of::<AtomicCell>() == 4);
};

// SAFETY: every shared access is a single-copy atomic 32-bit load or store or
// an exclusive-access pass.
unsafe impl Sync for AtomicCell {}

impl AtomicCell {
    pub const fn new(value: i32) -> Self {
        Self {
            value: UnsafeCell::new(value),
        }
    }

    /// Views caller-owned memory as a cell.
    ///
    /// # Safety
    ///
    /// `ptr` must be non-null, 4-byte aligned and valid for reads and writes
    /// for all of `'a`. While the returned reference lives, the memory must
    /// only be accessed through the primitives of this crate.
    pub unsafe fn from_ptr<'a>(ptr: *mut i32) -> &'a AtomicCell {
        // SAFETY: AtomicCell is repr(transparent) over UnsafeCell<i32>, which
        // has the layout of i32. The caller upholds validity and lifetime.
        unsafe { &*ptr.cast::<AtomicCell>() }
    }

    /// Raw pointer to the underlying integer.
    #[inline(always)]
    pub const fn as_ptr(&self) -> *mut i32 {
        self.value.get()
    }

    pub fn get_mut(&mut self) -> &mut i32 {
        self.value.get_mut()
    }

    pub fn into_inner(self) -> i32 {
        self.value.into_inner()
    }

    /// See [`crate::unsynchronized_load`].
    #[inline(always)]
    pub fn unsynchronized_load(&self) -> i32 {
        crate::unsynchronized_load(self)
    }

    /// See [`crate::unsynchronized_store`].
    #[inline(always)]
    pub fn unsynchronized_store(&self, value: i32) {
        crate::unsynchronized_store(value, self)
    }

    /// See [`crate::acquire_load`].
    #[inline(always)]
    pub fn acquire_load(&self) -> i32 {
        crate::acquire_load(self)
    }

    /// See [`crate::release_load`].
    #[inline(always)]
    pub fn release_load(&self) -> i32 {
        crate::release_load(self)
    }

    /// See [`crate::acquire_store`].
    #[inline(always)]
    pub fn acquire_store(&self, value: i32) {
        crate::acquire_store(value, self)
    }

    /// See [`crate::release_store`].
    #[inline(always)]
    pub fn release_store(&self, value: i32) {
        crate::release_store(value, self)
    }

    /// See [`crate::cas`]. Returns 0 when the swap happened.
    #[inline(always)]
    pub fn cas(&self, old_value: i32, new_value: i32) -> i32 {
        crate::cas(old_value, new_value, self)
    }

    /// See [`crate::acquire_cas`].
    #[inline(always)]
    pub fn acquire_cas(&self, old_value: i32, new_value: i32) -> i32 {
        crate::acquire_cas(old_value, new_value, self)
    }

    /// See [`crate::release_cas`].
    #[inline(always)]
    pub fn release_cas(&self, old_value: i32, new_value: i32) -> i32 {
        crate::release_cas(old_value, new_value, self)
    }

    /// Stores `new_value` if the cell holds `old_value`.
    ///
    /// Returns `Ok` with the previous value when the swap happened and `Err`
    /// with the value that was observed otherwise. No barrier is applied,
    /// exactly like [`crate::cas`].
    #[inline(always)]
    pub fn compare_exchange(&self, old_value: i32, new_value: i32) -> Result<i32, i32> {
        crate::cas::compare_exchange(old_value, new_value, self)
    }

    /// See [`crate::add`].
    #[inline(always)]
    pub fn add(&self, increment: i32) -> i32 {
        crate::add(increment, self)
    }

    /// See [`crate::inc`].
    #[inline(always)]
    pub fn inc(&self) -> i32 {
        crate::inc(self)
    }

    /// See [`crate::dec`].
    #[inline(always)]
    pub fn dec(&self) -> i32 {
        crate::dec(self)
    }

    /// See [`crate::and`].
    #[inline(always)]
    pub fn and(&self, mask: i32) -> i32 {
        crate::and(mask, self)
    }

    /// See [`crate::or`].
    #[inline(always)]
    pub fn or(&self, mask: i32) -> i32 {
        crate::or(mask, self)
    }

    /// See [`crate::xor`].
    #[inline(always)]
    pub fn xor(&self, mask: i32) -> i32 {
        crate::xor(mask, self)
    }

    /// See [`crate::swap`].
    #[inline(always)]
    pub fn swap(&self, value: i32) -> i32 {
        crate::swap(value, self)
    }
}

impl Default for AtomicCell {
    fn default() -> Self {
        Self::new(0)
    }
}

impl From<i32> for AtomicCell {
    fn from(value: i32) -> Self {
        Self::new(value)
    }
}

impl fmt::Debug for AtomicCell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("AtomicCell")
            .field(&self.unsynchronized_load())
            .finish()
    }
}

#[test]
fn test_cell_is_plain_memory() {
    let mut raw = [7i32, -1];
    let base = raw.as_mut_ptr();
    // SAFETY: the array outlives the views and is only touched through them.
    let (first, second) = unsafe { (AtomicCell::from_ptr(base), AtomicCell::from_ptr(base.add(1))) };
    assert_eq!(first.unsynchronized_load(), 7);
    assert_eq!(second.unsynchronized_load(), -1);
    assert_eq!(first.as_ptr(), base);

    second.release_store(3);
    assert_eq!(raw, [7, 3]);
}

#[test]
fn test_cell_ownership_helpers() {
    let mut cell = AtomicCell::from(41);
    *cell.get_mut() += 1;
    assert_eq!(format!("{cell:?}"), "AtomicCell(42)");
    assert_eq!(cell.into_inner(), 42);
    assert_eq!(AtomicCell::default().into_inner(), 0);
}

#[test]
fn test_compare_exchange_reports_observed_value() {
    let cell = AtomicCell::new(5);
    assert_eq!(cell.compare_exchange(5, 7), Ok(5));
    assert_eq!(cell.compare_exchange(5, 9), Err(7));
    assert_eq!(cell.into_inner(), 7);
}
