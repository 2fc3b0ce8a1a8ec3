//! Common panic/fault/timestamp handlers for the demos

// Copyright (c) 2025 Ferrous Systems
// SPDX-License-Identifier: GPL-3.0-or-later

#![no_std]

use defmt_semihosting as _;

/// The core clock of the MPS2-AN385 board
pub const CORE_CLOCK_HZ: u32 = 25_000_000;

/// Stack size for each demo task, in bytes
pub const TASK_STACK_SIZE: usize = 1024;

/// Called when a panic occurs.
///
/// Logs the panic to defmt and then crashes the CPU.
#[panic_handler]
fn panic(info: &core::panic::PanicInfo) -> ! {
    defmt::println!("PANIC: {}", defmt::Debug2Format(info));
    cortex_m::asm::udf();
}

/// Called when a HardFault occurs.
///
/// Logs the fault to defmt and then crashes the CPU.
#[cortex_m_rt::exception]
unsafe fn HardFault(info: &cortex_m_rt::ExceptionFrame) -> ! {
    defmt::println!("FAULT: {}", defmt::Debug2Format(info));
    cortex_m::asm::udf();
}

/// Called when the scheduler refuses a task, or refuses to start.
///
/// Logs the error and then crashes the CPU, so a bad start-up is never
/// mistaken for a quiet one.
pub fn abort(error: tots::Error) -> ! {
    defmt::error!("Start-up failed: {}", error);
    cortex_m::asm::udf();
}

// Log scheduler ticks in the defmt logs
defmt::timestamp!("{=u32:010} {}", tots::now(), tots::task_id());

// End of File
