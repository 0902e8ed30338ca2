// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use crate::{AtomicCell, barrier::memory_barrier};

/// Single-copy atomic 32-bit read with no ordering.
#[inline(always)]
pub fn unsynchronized_load(cell: &AtomicCell) -> i32 {
    let value: i32;
    let ptr = cell.as_ptr();

    #[cfg(target_arch = "arm")]
    // SAFETY: ptr comes from a live AtomicCell; it is never null, dangling, or unaligned.
    unsafe {
        core::arch::asm!(
            "ldr {value}, [{ptr}]",
            ptr = in(reg) ptr,
            value = lateout(reg) value,
            options(nostack, preserves_flags, readonly)
        );
    }

    #[cfg(target_arch = "aarch64")]
    // SAFETY: ptr comes from a live AtomicCell; it is never null, dangling, or unaligned.
    unsafe {
        core::arch::asm!(
            "ldr {value:w}, [{ptr}]",
            ptr = in(reg) ptr,
            value = lateout(reg) value,
            options(nostack, preserves_flags, readonly)
        );
    }

    #[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
    // SAFETY: ptr comes from a live AtomicCell; it is never null, dangling, or unaligned.
    unsafe {
        core::arch::asm!(
            "mov {value:e}, dword ptr [{ptr}]",
            ptr = in(reg) ptr,
            value = lateout(reg) value,
            options(nostack, preserves_flags, readonly)
        );
    }

    value
}

/// Single-copy atomic 32-bit write with no ordering.
#[inline(always)]
pub fn unsynchronized_store(value: i32, cell: &AtomicCell) {
    let ptr = cell.as_ptr();

    #[cfg(target_arch = "arm")]
    // SAFETY: ptr comes from a live AtomicCell; it is never null, dangling, or unaligned.
    unsafe {
        core::arch::asm!(
            "str {value}, [{ptr}]",
            ptr = in(reg) ptr,
            value = in(reg) value,
            options(nostack, preserves_flags)
        );
    }

    #[cfg(target_arch = "aarch64")]
    // SAFETY: ptr comes from a live AtomicCell; it is never null, dangling, or unaligned.
    unsafe {
        core::arch::asm!(
            "str {value:w}, [{ptr}]",
            ptr = in(reg) ptr,
            value = in(reg) value,
            options(nostack, preserves_flags)
        );
    }

    #[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
    // SAFETY: ptr comes from a live AtomicCell; it is never null, dangling, or unaligned.
    unsafe {
        core::arch::asm!(
            "mov dword ptr [{ptr}], {value:e}",
            ptr = in(reg) ptr,
            value = in(reg) value,
            options(nostack, preserves_flags)
        );
    }
}

/// Reads the cell, then fences: no later access can be observed before the
/// read.
#[inline(always)]
pub fn acquire_load(cell: &AtomicCell) -> i32 {
    let value = unsynchronized_load(cell);
    memory_barrier();
    value
}

/// Fences, then reads the cell.
#[inline(always)]
pub fn release_load(cell: &AtomicCell) -> i32 {
    memory_barrier();
    unsynchronized_load(cell)
}

/// Writes the cell, then fences.
#[inline(always)]
pub fn acquire_store(value: i32, cell: &AtomicCell) {
    unsynchronized_store(value, cell);
    memory_barrier();
}

/// Fences, then writes the cell: no earlier access can be observed after the
/// write.
#[inline(always)]
pub fn release_store(value: i32, cell: &AtomicCell) {
    memory_barrier();
    unsynchronized_store(value, cell);
}

#[test]
fn test_load() {
    let cell = AtomicCell::new(-0x0102_0304);

    assert_eq!(unsynchronized_load(&cell), -0x0102_0304);
    assert_eq!(acquire_load(&cell), -0x0102_0304);
    assert_eq!(release_load(&cell), -0x0102_0304);
    assert_eq!(cell.into_inner(), -0x0102_0304);
}

#[test]
fn test_store() {
    let cell = AtomicCell::new(0);

    unsynchronized_store(i32::MIN, &cell);
    assert_eq!(unsynchronized_load(&cell), i32::MIN);

    acquire_store(i32::MAX, &cell);
    assert_eq!(acquire_load(&cell), i32::MAX);

    release_store(-1, &cell);
    assert_eq!(release_load(&cell), -1);

    release_store(0, &cell);
    assert_eq!(cell.into_inner(), 0);
}

#[test]
fn test_store_touches_only_its_cell() {
    let cells = [AtomicCell::new(1), AtomicCell::new(2), AtomicCell::new(3)];

    release_store(-1, &cells[1]);
    assert_eq!(cells.map(AtomicCell::into_inner), [1, -1, 3]);
}
