//! Holds the [`Stack`] and [`StackArena`] types and methods

// Copyright (c) 2025 Ferrous Systems
// SPDX-License-Identifier: GPL-3.0-or-later

use core::cell::{Cell, UnsafeCell};

use critical_section::{CriticalSection, Mutex};

use crate::Resource;

/// A block of stack memory, with the given size `LEN` bytes.
///
/// The value of `LEN` must be a multiple of 8, which is checked with an
/// assert.
///
/// We align stacks on 8-byte boundaries, as required by AAPCS.
#[repr(align(8))]
pub struct Stack<const LEN: usize> {
    /// The memory reserved for task stacks
    contents: UnsafeCell<[u8; LEN]>,
}

impl<const LEN: usize> Stack<LEN> {
    /// Create a new stack
    pub const fn new() -> Self {
        assert!(LEN.is_multiple_of(8));
        Self {
            contents: UnsafeCell::new([0u8; LEN]),
        }
    }

    /// Get the lowest address in the stack
    pub const fn base(&self) -> *mut u8 {
        self.contents.get() as *mut u8
    }

    /// Get the size of the stack in bytes
    pub const fn len(&self) -> usize {
        LEN
    }

    /// Is this a zero-sized stack?
    pub const fn is_empty(&self) -> bool {
        LEN == 0
    }
}

/// SAFETY: Our stack object only exposes pointers to itself, so is thread-safe
/// despite containing an `UnsafeCell`.
unsafe impl<const LEN: usize> Sync for Stack<LEN> {}

impl<const LEN: usize> Default for Stack<LEN> {
    fn default() -> Self {
        Stack::new()
    }
}

/// Hands out task stacks from a [`Stack`]
///
/// Stacks are carved off the bottom of the block and are never given back,
/// because tasks never exit.
pub(crate) struct StackArena {
    /// Lowest address of the block
    base: *mut u8,
    /// Size of the block, in bytes
    len: usize,
    /// How many bytes we have handed out so far
    used: Mutex<Cell<usize>>,
}

impl StackArena {
    /// Stacks are handed out in multiples of this many bytes
    pub(crate) const GRANULE: usize = 8;

    /// Make an arena covering the whole of the given block
    pub(crate) const fn new<const LEN: usize>(stack: &'static Stack<LEN>) -> StackArena {
        StackArena {
            base: stack.base(),
            len: LEN,
            used: Mutex::new(Cell::new(0)),
        }
    }

    /// Reserve `size` bytes (rounded up to a whole granule) for a task stack
    ///
    /// Returns the top of the new stack. This is a full-descending stack so
    /// the top address itself is never written.
    pub(crate) fn allocate(&self, cs: CriticalSection, size: usize) -> Result<*mut u32, Resource> {
        let used = self.used.borrow(cs);
        let size = size
            .checked_next_multiple_of(Self::GRANULE)
            .ok_or(Resource::StackMemory)?;
        let new_used = used
            .get()
            .checked_add(size)
            .filter(|n| *n <= self.len)
            .ok_or(Resource::StackMemory)?;
        used.set(new_used);
        // SAFETY: `new_used` is at most `len`, so this is at most one past
        // the end of the block, and the block is 8-byte aligned.
        Ok(unsafe { self.base.add(new_used) } as *mut u32)
    }

    /// How many bytes are left
    pub(crate) fn remaining(&self, cs: CriticalSection) -> usize {
        self.len - self.used.borrow(cs).get()
    }
}

/// SAFETY: The arena only hands out disjoint regions of a `'static` block,
/// and its bookkeeping is only touched inside a critical section.
unsafe impl Sync for StackArena {}


// End of File
