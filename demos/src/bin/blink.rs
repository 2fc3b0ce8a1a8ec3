//! Blinks an imaginary LED once a second
//!
//! One task, which logs a line and then sleeps for 1000 ms, forever.

// Copyright (c) 2025 Ferrous Systems
// SPDX-License-Identifier: GPL-3.0-or-later

#![no_std]
#![no_main]

use tots::{Config, Scheduler, Stack, Task};
use tots_demos::{CORE_CLOCK_HZ, TASK_STACK_SIZE, abort};

static SCHEDULER: Scheduler = Scheduler::new(
    {
        static TASKS: [Task; 1] = [const { Task::new() }; 1];
        &TASKS
    },
    {
        static STACKS: Stack<TASK_STACK_SIZE> = Stack::new();
        &STACKS
    },
    Config::new(),
);

#[cortex_m_rt::entry]
fn main() -> ! {
    let cp = cortex_m::Peripherals::take().unwrap();
    defmt::println!("Blink demo start");
    if let Err(e) = SCHEDULER.register(blink, "Blink", TASK_STACK_SIZE, 1) {
        abort(e);
    }
    SCHEDULER.start(cp.SYST, CORE_CLOCK_HZ);
}

/// Our 'LED' task
fn blink() -> ! {
    loop {
        defmt::println!("LED Toggled!");
        tots::delay(SCHEDULER.config().ms_to_ticks(1000));
    }
}

// End of File
