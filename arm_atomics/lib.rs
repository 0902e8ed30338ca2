// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Lock-free 32-bit atomic primitives for ARM.
//!
//! Every read-modify-write operation is a retry loop around one
//! exclusive-load/exclusive-store pass (`ldrex`/`strex` on A32 and T32,
//! `ldxr`/`stxr` on AArch64). The loop is written once in Rust; only the
//! instruction block for a single pass differs per target.
//!
//! Memory ordering is spelled out in the name of each operation:
//!
//! | operation | ordering |
//! |---|---|
//! | [`unsynchronized_load`], [`unsynchronized_store`], [`cas`] | none |
//! | [`acquire_load`], [`acquire_store`], [`acquire_cas`] | barrier after |
//! | [`release_load`], [`release_store`], [`release_cas`] | barrier before |
//! | [`add`], [`inc`], [`dec`], [`and`], [`or`], [`xor`], [`swap`] | barrier before |
//!
//! Barriers are full `dmb ish` fences when the `smp` feature is enabled (the
//! default) and compiler-only barriers otherwise.
//!
//! On Thumb-1 builds, which cannot encode the exclusive-access instructions,
//! every exclusive pass hops into A32 state and back around the critical
//! instructions.

#![cfg_attr(not(test), no_std)]

// Thumb-1 cannot encode `ldrex`/`strex`/`mcr`: jump into A32 state right
// before them and back into Thumb state right after. Both expect a scratch
// operand named `switch`.
#[cfg(atomics_thumb1)]
macro_rules! switch_to_arm {
    () => {
        concat!("adr {switch}, 5f\n", "bx {switch}\n", ".align 2\n", ".arm\n", "5:")
    };
}

#[cfg(atomics_thumb1)]
macro_rules! switch_to_thumb {
    () => {
        concat!("adr {switch}, 6f+1\n", "bx {switch}\n", ".thumb\n", "6:")
    };
}

mod backoff;
mod barrier;
mod cas;
mod cell;
mod exclusive;
mod fetch_op;
mod ordered;
#[cfg(test)]
#[path = "target_caps.rs"]
mod target_caps;

pub use barrier::{compiler_barrier, memory_barrier, memory_store_barrier};
pub use cas::{acquire_cas, cas, release_cas};
pub use cell::AtomicCell;
pub use fetch_op::{add, and, dec, inc, or, swap, xor};
pub use ordered::{
    acquire_load, acquire_store, release_load, release_store, unsynchronized_load,
    unsynchronized_store,
};
