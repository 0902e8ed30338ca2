// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Compiler and hardware barriers.
//!
//! Whether the hardware barriers emit a fence instruction is decided by the
//! `smp` feature at build time. A uniprocessor cannot observe hardware
//! reordering across threads, so there the barriers only stop the compiler.

/// Keeps the compiler from moving or caching memory accesses across this
/// point. Emits no instruction.
#[inline(always)]
pub fn compiler_barrier() {
    // SAFETY: the block is empty. Without `nomem` the compiler must assume it
    // reads and writes any memory, which is the whole point.
    unsafe {
        core::arch::asm!("", options(nostack, preserves_flags));
    }
}

/// Full bidirectional fence: memory accesses issued before it are visible to
/// other cores before any access issued after it.
#[inline(always)]
pub fn memory_barrier() {
    #[cfg(not(feature = "smp"))]
    compiler_barrier();

    #[cfg(all(feature = "smp", target_arch = "arm", not(atomics_cp15_barrier)))]
    // SAFETY: barrier instruction, no operands.
    unsafe {
        core::arch::asm!("dmb ish", options(nostack, preserves_flags));
    }

    #[cfg(all(feature = "smp", target_arch = "arm", atomics_cp15_barrier))]
    cp15_data_memory_barrier();

    #[cfg(all(feature = "smp", target_arch = "aarch64"))]
    // SAFETY: barrier instruction, no operands.
    unsafe {
        core::arch::asm!("dmb ish", options(nostack, preserves_flags));
    }

    #[cfg(all(feature = "smp", any(target_arch = "x86", target_arch = "x86_64")))]
    // SAFETY: barrier instruction, no operands.
    unsafe {
        core::arch::asm!("mfence", options(nostack, preserves_flags));
    }
}

/// Orders stores before the barrier ahead of stores after it. Loads are not
/// ordered.
#[inline(always)]
pub fn memory_store_barrier() {
    #[cfg(not(feature = "smp"))]
    compiler_barrier();

    #[cfg(all(feature = "smp", target_arch = "arm", not(atomics_cp15_barrier)))]
    // SAFETY: barrier instruction, no operands.
    unsafe {
        core::arch::asm!("dmb st", options(nostack, preserves_flags));
    }

    // ARMv6 has no store-only barrier operation.
    #[cfg(all(feature = "smp", target_arch = "arm", atomics_cp15_barrier))]
    cp15_data_memory_barrier();

    #[cfg(all(feature = "smp", target_arch = "aarch64"))]
    // SAFETY: barrier instruction, no operands.
    unsafe {
        core::arch::asm!("dmb ishst", options(nostack, preserves_flags));
    }

    // x86 never reorders a store with an older store.
    #[cfg(all(feature = "smp", any(target_arch = "x86", target_arch = "x86_64")))]
    compiler_barrier();
}

/// ARMv6 data memory barrier through the system control coprocessor.
#[cfg(all(feature = "smp", target_arch = "arm", atomics_cp15_barrier))]
#[inline(always)]
fn cp15_data_memory_barrier() {
    #[cfg(not(atomics_thumb1))]
    // SAFETY: CP15 c7, c10, 5 is the ARMv6 DMB operation; the source register
    // must hold zero.
    unsafe {
        core::arch::asm!(
            "mcr p15, 0, {zero}, c7, c10, 5",
            zero = in(reg) 0u32,
            options(nostack, preserves_flags)
        );
    }

    #[cfg(atomics_thumb1)]
    // SAFETY: as above, wrapped in the A32 round trip because `mcr` has no
    // Thumb-1 encoding. `switch` is only used as the branch target register.
    unsafe {
        core::arch::asm!(
            switch_to_arm!(),
            "mcr p15, 0, {zero}, c7, c10, 5",
            switch_to_thumb!(),
            zero = in(reg) 0u32,
            switch = out(reg) _,
            options(nostack, preserves_flags)
        );
    }
}

#[test]
fn test_store_barrier_publishes_data() {
    use crate::{AtomicCell, unsynchronized_load, unsynchronized_store};

    static DATA: AtomicCell = AtomicCell::new(0);
    static FLAG: AtomicCell = AtomicCell::new(0);
    const ROUNDS: i32 = 1_000;

    // Only the explicit barriers order these plain accesses.
    let writer = std::thread::spawn(|| {
        for round in 1..=ROUNDS {
            while unsynchronized_load(&FLAG) != 0 {
                std::thread::yield_now();
            }
            memory_barrier();
            unsynchronized_store(round, &DATA);
            memory_store_barrier();
            unsynchronized_store(round, &FLAG);
        }
    });

    for round in 1..=ROUNDS {
        while unsynchronized_load(&FLAG) != round {
            std::thread::yield_now();
        }
        memory_barrier();
        assert_eq!(unsynchronized_load(&DATA), round);
        memory_barrier();
        unsynchronized_store(0, &FLAG);
    }
    writer.join().unwrap();
}
