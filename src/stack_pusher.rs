//! Holds the [`StackPusher`] type and methods

// Copyright (c) 2025 Ferrous Systems
// SPDX-License-Identifier: GPL-3.0-or-later

/// A helper for pushing words into a full-descending Arm EABI stack
pub(crate) struct StackPusher(*mut u32);

impl StackPusher {
    /// Make a new full-descending stack from the given pointer
    ///
    /// It will not write to the given pointer, but it will write immediately
    /// below it - because this is a Full Descending stack.
    ///
    /// # Safety
    ///
    /// There must be enough free space below the given pointer to accept all
    /// the items you are going to push, and nobody else may be using that
    /// space.
    pub(crate) unsafe fn new(stack_top: *mut u32) -> StackPusher {
        StackPusher(stack_top)
    }

    /// Push a word onto the stack, moving the stack pointer down
    pub(crate) fn push(&mut self, value: u32) {
        // SAFETY: the caller of `new` promised us the space
        unsafe {
            self.0 = self.0.offset(-1);
            self.0.write_volatile(value);
        }
    }

    /// Push the same word `count` times
    pub(crate) fn push_n(&mut self, value: u32, count: usize) {
        for _ in 0..count {
            self.push(value);
        }
    }

    /// Get the current stack pointer
    pub(crate) fn current(&self) -> *mut u32 {
        self.0
    }
}


// End of File
