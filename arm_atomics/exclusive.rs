// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Single exclusive-load/exclusive-store passes.
//!
//! Each function here runs exactly one pass and reports what the exclusive
//! load observed and whether the exclusive store lost the monitor to another
//! observer. The retry loops live in `cas` and `fetch_op`.
//!
//! x86 hosts have no exclusive monitor. There a pass is a plain load followed
//! by `lock cmpxchg`, and a failed `cmpxchg` stands in for a lost monitor.

#[derive(Clone, Copy, Debug)]
pub(crate) struct Pass {
    pub(crate) observed: i32,
    pub(crate) lost: bool,
}

// Thumb-2 requires the conditional store to sit in an IT block; A32 does not
// know the instruction.
#[cfg(all(target_arch = "arm", atomics_thumb2))]
macro_rules! it_eq {
    () => {
        "it eq"
    };
}

#[cfg(all(target_arch = "arm", not(atomics_thumb1), not(atomics_thumb2)))]
macro_rules! it_eq {
    () => {
        ""
    };
}

/// One pass of compare-and-swap. The store is only attempted when the loaded
/// value equals `old_value`; a mismatch ends the pass with `lost == false`.
#[cfg(all(target_arch = "arm", not(atomics_thumb1)))]
#[inline(always)]
pub(crate) fn cas_pass(ptr: *mut i32, old_value: i32, new_value: i32) -> Pass {
    let observed: i32;
    let status: u32;
    // SAFETY: ptr comes from a live AtomicCell; it is never null, dangling, or unaligned.
    unsafe {
        core::arch::asm!(
            "ldrex {observed}, [{ptr}]",
            "mov {status}, #0",
            "teq {observed}, {old_value}",
            it_eq!(),
            "strexeq {status}, {new_value}, [{ptr}]",
            observed = out(reg) observed,
            status = out(reg) status,
            ptr = in(reg) ptr,
            old_value = in(reg) old_value,
            new_value = in(reg) new_value,
            options(nostack)
        );
    }
    Pass {
        observed,
        lost: status != 0,
    }
}

#[cfg(all(target_arch = "arm", atomics_thumb1))]
#[inline(always)]
pub(crate) fn cas_pass(ptr: *mut i32, old_value: i32, new_value: i32) -> Pass {
    let observed: i32;
    let status: u32;
    // SAFETY: ptr comes from a live AtomicCell; it is never null, dangling, or unaligned.
    // The pass runs in A32 state and returns to Thumb state before the block ends.
    unsafe {
        core::arch::asm!(
            switch_to_arm!(),
            "ldrex {observed}, [{ptr}]",
            "mov {status}, #0",
            "teq {observed}, {old_value}",
            "strexeq {status}, {new_value}, [{ptr}]",
            switch_to_thumb!(),
            observed = out(reg) observed,
            status = out(reg) status,
            switch = out(reg) _,
            ptr = in(reg) ptr,
            old_value = in(reg) old_value,
            new_value = in(reg) new_value,
            options(nostack)
        );
    }
    Pass {
        observed,
        lost: status != 0,
    }
}

#[cfg(target_arch = "aarch64")]
#[inline(always)]
pub(crate) fn cas_pass(ptr: *mut i32, old_value: i32, new_value: i32) -> Pass {
    let observed: i32;
    let status: u32;
    // SAFETY: ptr comes from a live AtomicCell; it is never null, dangling, or unaligned.
    unsafe {
        core::arch::asm!(
            "ldxr {observed:w}, [{ptr}]",
            "mov {status:w}, #0",
            "cmp {observed:w}, {old_value:w}",
            "b.ne 2f",
            "stxr {status:w}, {new_value:w}, [{ptr}]",
            "2:",
            observed = out(reg) observed,
            status = out(reg) status,
            ptr = in(reg) ptr,
            old_value = in(reg) old_value,
            new_value = in(reg) new_value,
            options(nostack)
        );
    }
    Pass {
        observed,
        lost: status != 0,
    }
}

#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
#[inline(always)]
pub(crate) fn cas_pass(ptr: *mut i32, old_value: i32, new_value: i32) -> Pass {
    let observed: i32;
    // SAFETY: ptr comes from a live AtomicCell; it is never null, dangling, or unaligned.
    unsafe {
        core::arch::asm!(
            "lock cmpxchg dword ptr [{ptr}], {new_value:e}",
            inout("eax") old_value => observed,
            ptr = in(reg) ptr,
            new_value = in(reg) new_value,
            options(nostack)
        );
    }
    // cmpxchg compares and stores in one locked step, nothing to lose.
    Pass {
        observed,
        lost: false,
    }
}

// Computes `{next}` from `{prev}` (the loaded value) and `{operand}`.
macro_rules! fetchop {
    (add, arm) => {
        "add {next}, {prev}, {operand}"
    };
    (and, arm) => {
        "and {next}, {prev}, {operand}"
    };
    (or, arm) => {
        "orr {next}, {prev}, {operand}"
    };
    (xor, arm) => {
        "eor {next}, {prev}, {operand}"
    };
    (swap, arm) => {
        "mov {next}, {operand}"
    };
    (add, aarch64) => {
        "add {next:w}, {prev:w}, {operand:w}"
    };
    (and, aarch64) => {
        "and {next:w}, {prev:w}, {operand:w}"
    };
    (or, aarch64) => {
        "orr {next:w}, {prev:w}, {operand:w}"
    };
    (xor, aarch64) => {
        "eor {next:w}, {prev:w}, {operand:w}"
    };
    (swap, aarch64) => {
        "mov {next:w}, {operand:w}"
    };
    // On x86 `{next}` already holds a copy of the loaded value.
    (add, x86) => {
        "add {next:e}, {operand:e}"
    };
    (and, x86) => {
        "and {next:e}, {operand:e}"
    };
    (or, x86) => {
        "or {next:e}, {operand:e}"
    };
    (xor, x86) => {
        "xor {next:e}, {operand:e}"
    };
    (swap, x86) => {
        "mov {next:e}, {operand:e}"
    };
}

macro_rules! gen_fetchop_pass {
    ($name: ident, $op: tt) => {
        /// One unconditional read-modify-write pass; `observed` is the value
        /// the new one was computed from.
        #[cfg(all(target_arch = "arm", not(atomics_thumb1)))]
        #[inline(always)]
        pub(crate) fn $name(ptr: *mut i32, operand: i32) -> Pass {
            let prev: i32;
            let status: u32;
            // SAFETY: ptr comes from a live AtomicCell; it is never null, dangling, or unaligned.
            unsafe {
                core::arch::asm!(
                    "ldrex {prev}, [{ptr}]",
                    fetchop!($op, arm),
                    "strex {status}, {next}, [{ptr}]",
                    prev = out(reg) prev,
                    next = out(reg) _,
                    status = out(reg) status,
                    ptr = in(reg) ptr,
                    operand = in(reg) operand,
                    options(nostack, preserves_flags)
                );
            }
            Pass {
                observed: prev,
                lost: status != 0,
            }
        }

        // Thumb-1 has no `ldrex`/`strex` either, so these passes take the
        // same detour through A32 state as `cas_pass`.
        #[cfg(all(target_arch = "arm", atomics_thumb1))]
        #[inline(always)]
        pub(crate) fn $name(ptr: *mut i32, operand: i32) -> Pass {
            let prev: i32;
            let status: u32;
            // SAFETY: ptr comes from a live AtomicCell; it is never null, dangling, or unaligned.
            unsafe {
                core::arch::asm!(
                    switch_to_arm!(),
                    "ldrex {prev}, [{ptr}]",
                    fetchop!($op, arm),
                    "strex {status}, {next}, [{ptr}]",
                    switch_to_thumb!(),
                    prev = out(reg) prev,
                    next = out(reg) _,
                    status = out(reg) status,
                    switch = out(reg) _,
                    ptr = in(reg) ptr,
                    operand = in(reg) operand,
                    options(nostack, preserves_flags)
                );
            }
            Pass {
                observed: prev,
                lost: status != 0,
            }
        }

        #[cfg(target_arch = "aarch64")]
        #[inline(always)]
        pub(crate) fn $name(ptr: *mut i32, operand: i32) -> Pass {
            let prev: i32;
            let status: u32;
            // SAFETY: ptr comes from a live AtomicCell; it is never null, dangling, or unaligned.
            unsafe {
                core::arch::asm!(
                    "ldxr {prev:w}, [{ptr}]",
                    fetchop!($op, aarch64),
                    "stxr {status:w}, {next:w}, [{ptr}]",
                    prev = out(reg) prev,
                    next = out(reg) _,
                    status = out(reg) status,
                    ptr = in(reg) ptr,
                    operand = in(reg) operand,
                    options(nostack, preserves_flags)
                );
            }
            Pass {
                observed: prev,
                lost: status != 0,
            }
        }

        #[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
        #[inline(always)]
        pub(crate) fn $name(ptr: *mut i32, operand: i32) -> Pass {
            let prev: i32;
            let lost: u8;
            // SAFETY: ptr comes from a live AtomicCell; it is never null, dangling, or unaligned.
            unsafe {
                core::arch::asm!(
                    "mov eax, dword ptr [{ptr}]",
                    "mov {next:e}, eax",
                    fetchop!($op, x86),
                    "lock cmpxchg dword ptr [{ptr}], {next:e}",
                    "setne {lost}",
                    out("eax") prev,
                    next = out(reg) _,
                    lost = out(reg_byte) lost,
                    ptr = in(reg) ptr,
                    operand = in(reg) operand,
                    options(nostack)
                );
            }
            Pass {
                observed: prev,
                lost: lost != 0,
            }
        }
    };
}

gen_fetchop_pass!(add_pass, add);
gen_fetchop_pass!(and_pass, and);
gen_fetchop_pass!(or_pass, or);
gen_fetchop_pass!(xor_pass, xor);
gen_fetchop_pass!(swap_pass, swap);

#[test]
fn test_cas_pass() {
    let mut cell = 5i32;
    let ptr = &raw mut cell;

    // The exclusive store may fail spuriously even without a competitor.
    let pass = loop {
        let pass = cas_pass(ptr, 5, 7);
        if !pass.lost {
            break pass;
        }
    };
    assert_eq!(pass.observed, 5);
    assert_eq!(cell, 7);

    let pass = cas_pass(ptr, 5, 9);
    assert_eq!(pass.observed, 7);
    assert!(!pass.lost, "a mismatch never attempts the store");
    assert_eq!(cell, 7);
}

#[test]
fn test_fetchop_passes() {
    // Same here; retry like the real loops do.
    fn run(ptr: *mut i32, pass: fn(*mut i32, i32) -> Pass, operand: i32) -> i32 {
        loop {
            let result = pass(ptr, operand);
            if !result.lost {
                return result.observed;
            }
        }
    }

    let mut cell = 0b1100i32;
    let ptr = &raw mut cell;

    assert_eq!(run(ptr, add_pass, 1), 0b1100);
    assert_eq!(run(ptr, and_pass, 0b0101), 0b1101);
    assert_eq!(run(ptr, or_pass, 0b1010), 0b0101);
    assert_eq!(run(ptr, xor_pass, 0b1111), 0b1111);
    assert_eq!(run(ptr, swap_pass, -8), 0b0000);
    assert_eq!(cell, -8);
}
