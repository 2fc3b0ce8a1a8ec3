//! Armv7-M EABIHF context switch

// Copyright (c) 2025 Ferrous Systems
// SPDX-License-Identifier: GPL-3.0-or-later

use crate::{Scheduler, Task, scheduler};

/// PendSV Handler for Armv7-M or Armv8-M Mainline EABIHF
///
/// Works like the EABI version, but also looks after the FPU.
///
/// Bit 4 of the exception return value in LR is clear if the interrupted
/// task was using the FPU. The hardware has then already stacked S0 to S15
/// and FPSCR (or reserved space for them), so we save S16 to S31 ourselves.
/// The same bit of the next task's saved exception return value tells us
/// whether to restore them.
#[unsafe(no_mangle)]
#[unsafe(naked)]
unsafe extern "C" fn PendSV() {
    // NOTE: This code must NOT touch r4-r11. It can ONLY touch r0-r3 and r12,
    // because those registers were stacked by the hardware on exception entry.

    core::arch::naked_asm!(r#"
    // Workaround https://github.com/rust-lang/rust/issues/127269
    .fpu vfpv3

    // r1 = the address of the running Scheduler
    ldr      r1, ={scheduler_ptr}
    ldr      r1, [r1]

    // r2 = the current task index, r0 = the next task index
    ldr      r2, [r1, {current_task_offset}]
    ldr      r0, [r1, {next_task_offset}]

    // already running the right task?
    cmp      r2, r0
    it       eq
    bxeq     lr

    // r3 = the address of the task control block table
    ldr      r3, [r1, {task_list_offset}]

    // an invalid current task means we are starting up, with nothing to save
    cmp      r2, #-1
    beq      1f

    // save the current task: r2 = its byte offset into the table
    lsl      r2, {task_size_bits}
    mrs      r0, psp
    tst      lr, #0x10
    it       eq
    vstmdbeq r0!, {{ s16 - s31 }}
    stmdb    r0!, {{ r4 - r11, lr }}
    // the saved stack pointer is the first word of the control block
    str      r0, [r3, r2]

    1:

    // restore the next task: r2 = its byte offset into the table
    ldr      r2, [r1, {next_task_offset}]
    lsl      r2, {task_size_bits}
    ldr      r0, [r3, r2]
    ldmia    r0!, {{ r4 - r11, lr }}
    tst      lr, #0x10
    it       eq
    vldmiaeq r0!, {{ s16 - s31 }}
    msr      psp, r0

    // the next task is now the current task
    ldr      r2, [r1, {next_task_offset}]
    str      r2, [r1, {current_task_offset}]

    // lr holds the restored exception return value
    bx       lr
    "#,
    scheduler_ptr = sym scheduler::SCHEDULER_PTR,
    current_task_offset = const Scheduler::CURRENT_TASK_OFFSET,
    next_task_offset = const Scheduler::NEXT_TASK_OFFSET,
    task_list_offset = const Scheduler::TASK_LIST_OFFSET,
    task_size_bits = const Task::SIZE_BITS,
    );
}

// End of File
