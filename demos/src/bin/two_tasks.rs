//! Two equal-priority tasks with different periods
//!
//! Task B runs every 500 ms and Task A every 1000 ms, so B should log twice
//! as often as A.

// Copyright (c) 2025 Ferrous Systems
// SPDX-License-Identifier: GPL-3.0-or-later

#![no_std]
#![no_main]

use tots::{Config, Scheduler, Stack, Task};
use tots_demos::{CORE_CLOCK_HZ, abort};

const CONFIG: Config = Config::new();

static SCHEDULER: Scheduler = Scheduler::new(
    {
        static TASKS: [Task; 2] = [const { Task::new() }; 2];
        &TASKS
    },
    {
        static STACKS: Stack<{ 2 * CONFIG.minimal_stack_size() }> = Stack::new();
        &STACKS
    },
    CONFIG,
);

#[cortex_m_rt::entry]
fn main() -> ! {
    let cp = cortex_m::Peripherals::take().unwrap();
    defmt::println!("=== Two task demo ===");

    let stack_size = CONFIG.minimal_stack_size();
    for (entry_fn, name) in [(task_a as tots::TaskEntryFn, "TaskA"), (task_b, "TaskB")] {
        if let Err(e) = SCHEDULER.register(entry_fn, name, stack_size, 1) {
            abort(e);
        }
    }

    // Never returns
    SCHEDULER.start(cp.SYST, CORE_CLOCK_HZ);
}

fn task_a() -> ! {
    loop {
        defmt::println!("Task A running");
        tots::delay(CONFIG.ms_to_ticks(1000));
    }
}

fn task_b() -> ! {
    loop {
        defmt::println!("Task B running");
        tots::delay(CONFIG.ms_to_ticks(500));
    }
}

// End of File
