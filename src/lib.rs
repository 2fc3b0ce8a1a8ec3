//! # TOTS: a Tiny Operating Task Scheduler
//!
//! A pre-emptive, priority-based scheduler for Arm Cortex-M.
//!
//! You provide a fixed table of task slots and a block of memory for task
//! stacks, register your tasks, and then hand the CPU over to the scheduler:
//!
//! ```rust,ignore
//! static SCHEDULER: Scheduler = Scheduler::new(
//!     {
//!         static TASKS: [Task; 2] = [const { Task::new() }; 2];
//!         &TASKS
//!     },
//!     {
//!         static STACKS: Stack<4096> = Stack::new();
//!         &STACKS
//!     },
//!     Config::new(),
//! );
//!
//! #[cortex_m_rt::entry]
//! fn main() -> ! {
//!     let cp = cortex_m::Peripherals::take().unwrap();
//!     SCHEDULER.register(blink, "Blink", 1024, 1).unwrap();
//!     SCHEDULER.start(cp.SYST, 25_000_000);
//! }
//!
//! fn blink() -> ! {
//!     loop {
//!         defmt::info!("LED Toggled!");
//!         tots::delay(SCHEDULER.config().ms_to_ticks(1000));
//!     }
//! }
//! ```
//!
//! Everything except the context switch itself also builds for the host, so
//! the scheduling policy can be tested with `cargo test`.

// Copyright (c) 2025 Ferrous Systems
// SPDX-License-Identifier: GPL-3.0-or-later

#![cfg_attr(not(test), no_std)]

#[macro_use]
mod fmt;

mod config;
mod error;
mod port;
mod scheduler;
mod stack;
mod stack_pusher;
mod task;

pub use config::Config;
pub use error::{Error, Resource, StartFailure};
pub use scheduler::{MAX_DELAY, Scheduler, TaskId};
pub use stack::Stack;
use stack_pusher::StackPusher;
pub use task::{Task, TaskEntryFn, TaskInfo, TaskState};

/// Delay the calling task for at least the given number of ticks
///
/// A delay of zero lets any other ready task of equal or higher priority run
/// first.
///
/// # Panics
///
/// Panics if the scheduler has not been started.
pub fn delay(ticks: u32) {
    match Scheduler::get_scheduler() {
        Some(scheduler) => scheduler.delay(ticks),
        None => panic!("delay() called before the scheduler started"),
    }
}

/// Get the current time in ticks
///
/// Returns `u32::MAX` if the scheduler has not been started.
pub fn now() -> u32 {
    match Scheduler::get_scheduler() {
        Some(scheduler) => scheduler.now(),
        None => u32::MAX,
    }
}

/// Get the ID of the running task
///
/// Returns the invalid ID if the scheduler has not been started.
pub fn task_id() -> TaskId {
    match Scheduler::get_scheduler() {
        Some(scheduler) => scheduler.current_task_id(),
        None => TaskId::invalid(),
    }
}

// End of File
