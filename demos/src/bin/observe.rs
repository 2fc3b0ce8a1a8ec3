//! The two task demo, with a referee
//!
//! A higher priority task wakes after two seconds, checks that both workers
//! ran and that Task B ran twice as often as Task A, shuts the scheduler down
//! and exits QEMU with a pass or fail status.

// Copyright (c) 2025 Ferrous Systems
// SPDX-License-Identifier: GPL-3.0-or-later

#![no_std]
#![no_main]

use core::sync::atomic::{AtomicU32, Ordering};

use tots::{Config, Scheduler, Stack, Task};
use tots_demos::{CORE_CLOCK_HZ, TASK_STACK_SIZE, abort};

const CONFIG: Config = Config::new();

/// How long the referee watches for, in ms
const WINDOW_MS: u32 = 2000;

static SCHEDULER: Scheduler = Scheduler::new(
    {
        static TASKS: [Task; 3] = [const { Task::new() }; 3];
        &TASKS
    },
    {
        static STACKS: Stack<{ 3 * TASK_STACK_SIZE }> = Stack::new();
        &STACKS
    },
    CONFIG,
);

static A_RUNS: AtomicU32 = AtomicU32::new(0);
static B_RUNS: AtomicU32 = AtomicU32::new(0);

#[cortex_m_rt::entry]
fn main() -> ! {
    let cp = cortex_m::Peripherals::take().unwrap();
    defmt::println!("=== Two task demo, observed for {=u32} ms ===", WINDOW_MS);

    let tasks: [(tots::TaskEntryFn, &'static str, u8); 3] = [
        (task_a, "TaskA", 1),
        (task_b, "TaskB", 1),
        (referee, "Referee", 2),
    ];
    for (entry_fn, name, priority) in tasks {
        if let Err(e) = SCHEDULER.register(entry_fn, name, TASK_STACK_SIZE, priority) {
            abort(e);
        }
    }

    SCHEDULER.start(cp.SYST, CORE_CLOCK_HZ);
}

fn task_a() -> ! {
    loop {
        defmt::println!("Task A running");
        A_RUNS.fetch_add(1, Ordering::Relaxed);
        tots::delay(CONFIG.ms_to_ticks(1000));
    }
}

fn task_b() -> ! {
    loop {
        defmt::println!("Task B running");
        B_RUNS.fetch_add(1, Ordering::Relaxed);
        tots::delay(CONFIG.ms_to_ticks(500));
    }
}

/// Waits for the observation window to pass, then judges the workers
fn referee() -> ! {
    tots::delay(CONFIG.ms_to_ticks(WINDOW_MS));
    SCHEDULER.shutdown();

    let a = A_RUNS.load(Ordering::Relaxed);
    let b = B_RUNS.load(Ordering::Relaxed);
    let passed = a > 0 && b >= 2 * a - 1;
    defmt::println!(
        "Task A ran {=u32} times, Task B ran {=u32} times: {=str}",
        a,
        b,
        if passed { "PASS" } else { "FAIL" }
    );
    semihosting::process::exit(if passed { 0 } else { 1 });
}

// End of File
