// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Fetch-and-op primitives.
//!
//! Every operation here fences once before its retry loop, regardless of the
//! caller's needs, and returns the value the cell held right before the
//! committing pass. Arithmetic wraps.

use crate::{
    AtomicCell,
    backoff::Backoff,
    barrier::memory_barrier,
    exclusive::{Pass, add_pass, and_pass, or_pass, swap_pass, xor_pass},
};

#[inline(always)]
fn fetch_op(operand: i32, cell: &AtomicCell, pass: fn(*mut i32, i32) -> Pass) -> i32 {
    memory_barrier();
    let mut backoff = Backoff::new();
    loop {
        let result = pass(cell.as_ptr(), operand);
        if !result.lost {
            return result.observed;
        }
        backoff.snooze();
    }
}

// `add` adds a value atomically to the cell and returns the old value in the
// cell. (There is no `sub`; add the negated value.)
#[inline(always)]
pub fn add(increment: i32, cell: &AtomicCell) -> i32 {
    fetch_op(increment, cell, add_pass)
}

#[inline(always)]
pub fn inc(cell: &AtomicCell) -> i32 {
    add(1, cell)
}

#[inline(always)]
pub fn dec(cell: &AtomicCell) -> i32 {
    add(-1, cell)
}

// `and` bitwise-ands a value atomically into the cell and returns the old value
// in the cell.
#[inline(always)]
pub fn and(mask: i32, cell: &AtomicCell) -> i32 {
    fetch_op(mask, cell, and_pass)
}

// `or` bitwise-ors a value atomically into the cell and returns the old value
// in the cell.
#[inline(always)]
pub fn or(mask: i32, cell: &AtomicCell) -> i32 {
    fetch_op(mask, cell, or_pass)
}

// `xor` bitwise-xors a value atomically into the cell and returns the old value
// in the cell.
#[inline(always)]
pub fn xor(mask: i32, cell: &AtomicCell) -> i32 {
    fetch_op(mask, cell, xor_pass)
}

/// Stores `value` unconditionally and returns the value it replaced.
#[inline(always)]
pub fn swap(value: i32, cell: &AtomicCell) -> i32 {
    fetch_op(value, cell, swap_pass)
}

#[test]
fn test_add() {
    let cell = AtomicCell::new(10);
    assert_eq!(add(3, &cell), 10);
    assert_eq!(add(-20, &cell), 13);
    assert_eq!(cell.into_inner(), -7);
}

#[test]
fn test_add_wraps() {
    let cell = AtomicCell::new(i32::MAX);
    assert_eq!(add(1, &cell), i32::MAX);
    assert_eq!(unsafe { cell.as_ptr().read() }, i32::MIN);
    assert_eq!(add(-1, &cell), i32::MIN);
    assert_eq!(cell.into_inner(), i32::MAX);
}

#[test]
fn test_inc_dec() {
    let cell = AtomicCell::new(0);
    let reference = AtomicCell::new(0);

    assert_eq!(inc(&cell), add(1, &reference), "inc initial");
    assert_eq!(inc(&cell), add(1, &reference), "inc subsequent");
    assert_eq!(dec(&cell), add(-1, &reference), "dec initial");
    assert_eq!(cell.into_inner(), 1);
    assert_eq!(reference.into_inner(), 1);

    let cell = AtomicCell::new(i32::MIN);
    assert_eq!(dec(&cell), i32::MIN);
    assert_eq!(cell.into_inner(), i32::MAX);
}

#[test]
fn test_bitwise() {
    let cell = AtomicCell::new(0b1010);

    assert_eq!(and(0b0110, &cell), 0b1010);
    assert_eq!(unsafe { cell.as_ptr().read() }, 0b0010);

    assert_eq!(or(0b1001, &cell), 0b0010);
    assert_eq!(unsafe { cell.as_ptr().read() }, 0b1011);

    assert_eq!(xor(-1, &cell), 0b1011);
    assert_eq!(unsafe { cell.as_ptr().read() }, !0b1011);

    assert_eq!(and(0, &cell), !0b1011);
    assert_eq!(cell.into_inner(), 0);
}

#[test]
fn test_swap() {
    let cell = AtomicCell::new(0);
    assert_eq!(swap(-1, &cell), 0, "initial");
    assert_eq!(swap(0, &cell), -1, "subsequent");
    assert_eq!(cell.into_inner(), 0);
}
