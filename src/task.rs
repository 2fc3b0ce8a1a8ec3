//! Holds the [`Task`] type and methods

// Copyright (c) 2025 Ferrous Systems
// SPDX-License-Identifier: GPL-3.0-or-later

use core::{
    cell::Cell,
    sync::atomic::{AtomicPtr, Ordering},
};

use critical_section::{CriticalSection, Mutex};

use crate::StackPusher;

/// The function a task runs. It must never return.
pub type TaskEntryFn = fn() -> !;

/// Where a task is in its life
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TaskState {
    /// Registered, but the scheduler has not started yet
    Created,
    /// Waiting for its turn on the CPU
    Ready,
    /// On the CPU
    Running,
    /// Sleeping until the tick count reaches `until`
    Blocked {
        /// The tick at which the task becomes ready again
        until: u32,
    },
}

impl TaskState {
    /// Can the scheduler pick this task?
    pub const fn is_runnable(self) -> bool {
        matches!(self, TaskState::Ready | TaskState::Running)
    }

    /// Is the task waiting for a tick?
    pub const fn is_blocked(self) -> bool {
        matches!(self, TaskState::Blocked { .. })
    }
}

/// A snapshot of everything we know about a registered task
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TaskInfo {
    name: &'static str,
    priority: u8,
    stack_size: usize,
    state: TaskState,
}

impl TaskInfo {
    /// Describe a newly registered task
    pub(crate) const fn new(
        name: &'static str,
        priority: u8,
        stack_size: usize,
        state: TaskState,
    ) -> TaskInfo {
        TaskInfo {
            name,
            priority,
            stack_size,
            state,
        }
    }

    /// The name given at registration
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// The priority given at registration
    pub const fn priority(&self) -> u8 {
        self.priority
    }

    /// The size of the stack, in bytes, after rounding
    pub const fn stack_size(&self) -> usize {
        self.stack_size
    }

    /// The state the task was in when the snapshot was taken
    pub const fn state(&self) -> TaskState {
        self.state
    }
}

/// A task control block
///
/// The scheduler owns a fixed table of these. An unused one is an empty
/// slot that [`crate::Scheduler::register`] can fill in.
///
/// The PendSV handler finds a task's saved stack pointer at offset zero, and
/// finds a task in the table by shifting its index left by
/// [`Task::SIZE_BITS`], so the layout is fixed and the size is a power of two.
#[repr(C, align(64))]
pub struct Task {
    /// The saved stack pointer. Must be the first field.
    stack: AtomicPtr<u32>,
    /// Everything else, or `None` if this slot is free
    info: Mutex<Cell<Option<TaskInfo>>>,
}

const _: () = assert!(core::mem::size_of::<Task>().is_power_of_two());

impl Task {
    /// log2 of the size of a task control block
    pub const SIZE_BITS: u32 = core::mem::size_of::<Task>().trailing_zeros();

    /// The value of the Processor Status Register when a task starts
    ///
    /// The only bit we need to set is the T bit, to indicate that the
    /// task should run in Thumb mode (the only supported mode on Armv7-M)
    const DEFAULT_XPSR: u32 = 1 << 24;

    /// The exception return value that takes us to Thread Mode, Process
    /// Stack, without FPU state
    const EXC_RETURN_THREAD_PSP: u32 = 0xFFFF_FFFD;

    /// Create an empty task slot
    pub const fn new() -> Task {
        Task {
            stack: AtomicPtr::new(core::ptr::null_mut()),
            info: Mutex::new(Cell::new(None)),
        }
    }

    /// Get the current stack pointer for this task
    pub fn stack(&self) -> *mut u32 {
        self.stack.load(Ordering::Relaxed)
    }

    /// Set the current stack pointer for this task
    ///
    /// # Safety
    ///
    /// The task will execute using the stack given, so it must point to the
    /// last item in a valid Arm EABI stack, with a full Stack Frame
    /// preceding it.
    pub(crate) unsafe fn set_stack(&self, new_stack: *mut u32) {
        self.stack.store(new_stack, Ordering::Relaxed)
    }

    /// Is this slot in use?
    pub(crate) fn is_used(&self, cs: CriticalSection) -> bool {
        self.info.borrow(cs).get().is_some()
    }

    /// Get the task details, if this slot is in use
    pub(crate) fn info(&self, cs: CriticalSection) -> Option<TaskInfo> {
        self.info.borrow(cs).get()
    }

    /// Get the task state, if this slot is in use
    pub(crate) fn state(&self, cs: CriticalSection) -> Option<TaskState> {
        self.info(cs).map(|info| info.state)
    }

    /// Change the state of a task in a used slot
    pub(crate) fn set_state(&self, cs: CriticalSection, state: TaskState) {
        let cell = self.info.borrow(cs);
        if let Some(mut info) = cell.get() {
            info.state = state;
            cell.set(Some(info));
        }
    }

    /// Fill in this slot
    ///
    /// Builds the initial stack frame on the given stack so that the first
    /// switch to this task starts `entry_fn`.
    ///
    /// # Safety
    ///
    /// `stack_top` must be the 8-byte aligned top of `info.stack_size()`
    /// bytes of memory that nothing else uses, and that size must be at least
    /// [`crate::Scheduler::MIN_STACK_SIZE`].
    pub(crate) unsafe fn occupy(
        &self,
        cs: CriticalSection,
        entry_fn: TaskEntryFn,
        stack_top: *mut u32,
        info: TaskInfo,
    ) {
        // SAFETY: our caller promised enough space
        let mut stack_pusher = unsafe { StackPusher::new(stack_top) };

        // Standard Arm exception frame

        // xPSR
        stack_pusher.push(Self::DEFAULT_XPSR);
        // PC, with the Thumb bit cleared as exception return requires
        stack_pusher.push(entry_fn as usize as u32 & !1);
        // LR, in case the task body ever returns
        stack_pusher.push(task_returned as usize as u32);
        // R12, R3, R2, R1, R0
        stack_pusher.push_n(0, 5);

        // Additional task state we persist

        // Extra copy of LR so we can check for FPU status. This copy does
        // not have the FPU bit set, so we don't need to push an Extended
        // Frame above, or the other 16 FPU registers, into the initial
        // state. This will return us to Thread Mode, Process Stack.
        stack_pusher.push(Self::EXC_RETURN_THREAD_PSP);

        // R4 - R11
        stack_pusher.push_n(0, 8);

        // SAFETY: the pointer we are passing is the last thing we pushed
        unsafe {
            self.set_stack(stack_pusher.current());
        }

        self.info.borrow(cs).set(Some(info));
    }
}

impl Default for Task {
    fn default() -> Self {
        Task::new()
    }
}

/// Where a task ends up if its body returns
extern "C" fn task_returned() -> ! {
    panic!("task returned from its entry function");
}

/// Has the tick count `now` reached `deadline`?
///
/// Copes with the tick counter wrapping, provided the two are less than
/// 2^31 ticks apart.
pub(crate) const fn deadline_reached(now: u32, deadline: u32) -> bool {
    (now.wrapping_sub(deadline) as i32) >= 0
}


// End of File
