//! The smallest possible demo: one task, once a second

// Copyright (c) 2025 Ferrous Systems
// SPDX-License-Identifier: GPL-3.0-or-later

#![no_std]
#![no_main]

use tots::{Config, Scheduler, Stack, Task};
use tots_demos::{CORE_CLOCK_HZ, TASK_STACK_SIZE, abort};

/// 100 Hz is plenty for a one second period
const CONFIG: Config = Config::new().with_tick_rate_hz(100);

static SCHEDULER: Scheduler = Scheduler::new(
    {
        static TASKS: [Task; 1] = [const { Task::new() }; 1];
        &TASKS
    },
    {
        static STACKS: Stack<TASK_STACK_SIZE> = Stack::new();
        &STACKS
    },
    CONFIG,
);

#[cortex_m_rt::entry]
fn main() -> ! {
    let cp = cortex_m::Peripherals::take().unwrap();
    if let Err(e) = SCHEDULER.register(task1, "Task1", TASK_STACK_SIZE, 1) {
        abort(e);
    }
    SCHEDULER.start(cp.SYST, CORE_CLOCK_HZ);
}

fn task1() -> ! {
    loop {
        defmt::println!("Task 1 running");
        tots::delay(CONFIG.ms_to_ticks(1000));
    }
}

// End of File
