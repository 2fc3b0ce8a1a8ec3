//! Armv7-M EABI context switch

// Copyright (c) 2025 Ferrous Systems
// SPDX-License-Identifier: GPL-3.0-or-later

use crate::{Scheduler, Task, scheduler};

/// PendSV Handler for Armv7-M or Armv8-M Mainline EABI
///
/// The scheduler pends this exception whenever it has picked a new task. It
/// runs once all other exceptions have finished.
///
/// On entry the hardware has pushed xPSR, PC, LR, R12, R3, R2, R1 and R0
/// onto the PSP of the task we interrupted. We push R4 to R11 and the
/// exception return value below those, save the PSP in the task control
/// block, then do the reverse for the next task. Returning from this function
/// makes the hardware unstack the rest of the next task's registers.
///
/// If the scheduler changed its mind before we got here, and the next task is
/// the current task, we return straight away.
///
/// It is a naked function because we do not want the compiler pushing
/// anything else to the stack and re-using registers containing precious task
/// state.
#[unsafe(no_mangle)]
#[unsafe(naked)]
unsafe extern "C" fn PendSV() {
    // NOTE: This code must NOT touch r4-r11. It can ONLY touch r0-r3 and r12,
    // because those registers were stacked by the hardware on exception entry.

    core::arch::naked_asm!(r#"
    // r1 = the address of the running Scheduler
    ldr     r1, ={scheduler_ptr}
    ldr     r1, [r1]

    // r2 = the current task index, r0 = the next task index
    ldr     r2, [r1, {current_task_offset}]
    ldr     r0, [r1, {next_task_offset}]

    // already running the right task?
    cmp     r2, r0
    it      eq
    bxeq    lr

    // r3 = the address of the task control block table
    ldr     r3, [r1, {task_list_offset}]

    // an invalid current task means we are starting up, with nothing to save
    cmp     r2, #-1
    beq     1f

    // save the current task: r2 = its byte offset into the table
    lsl     r2, {task_size_bits}
    mrs     r0, psp
    stmdb   r0!, {{ r4 - r11, lr }}
    // the saved stack pointer is the first word of the control block
    str     r0, [r3, r2]

    1:

    // restore the next task: r2 = its byte offset into the table
    ldr     r2, [r1, {next_task_offset}]
    lsl     r2, {task_size_bits}
    ldr     r0, [r3, r2]
    ldmia   r0!, {{ r4 - r11, lr }}
    msr     psp, r0

    // the next task is now the current task
    ldr     r2, [r1, {next_task_offset}]
    str     r2, [r1, {current_task_offset}]

    // lr holds the restored exception return value
    bx      lr
    "#,
    scheduler_ptr = sym scheduler::SCHEDULER_PTR,
    current_task_offset = const Scheduler::CURRENT_TASK_OFFSET,
    next_task_offset = const Scheduler::NEXT_TASK_OFFSET,
    task_list_offset = const Scheduler::TASK_LIST_OFFSET,
    task_size_bits = const Task::SIZE_BITS,
    );
}

// End of File
