//! Armv6-M EABI context switch

// Copyright (c) 2025 Ferrous Systems
// SPDX-License-Identifier: GPL-3.0-or-later

use crate::{Scheduler, Task, scheduler};

/// PendSV Handler for Armv6-M or Armv8-M Baseline EABI
///
/// Does the same job as the Armv7-M handler using only the Thumb-1 subset.
/// That subset cannot store the high registers or `lr` with a multiple
/// store, so we borrow `sp` to push them onto the task's stack: the
/// exception return value first, then R4 to R7, then R8 to R11 by way of R4
/// to R7. The handler stack pointer waits in R12 meanwhile.
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
    // NOTE: This code must NOT touch r4-r11 before they are saved. It can
    // ONLY touch r0-r3 and r12, because those were stacked by the hardware
    // on exception entry.

    core::arch::naked_asm!(r#"
    // r1 = the address of the running Scheduler
    ldr     r1, ={scheduler_ptr}
    ldr     r1, [r1]

    // r2 = the current task index, r0 = the next task index
    ldr     r2, [r1, {current_task_offset}]
    ldr     r0, [r1, {next_task_offset}]

    // already running the right task?
    cmp     r2, r0
    bne     2f
    bx      lr

    2:

    // r3 = the address of the task control block table
    ldr     r3, [r1, {task_list_offset}]

    // park the handler stack pointer
    mov     r12, sp

    // an invalid current task means we are starting up, with nothing to save
    movs    r0, #1
    cmn     r2, r0
    beq     1f

    // save the current task: r2 = its byte offset into the table
    lsls    r2, {task_size_bits}
    mrs     r0, psp
    mov     sp, r0
    push    {{ lr }}
    push    {{ r4 - r7 }}
    mov     r4, r8
    mov     r5, r9
    mov     r6, r10
    mov     r7, r11
    push    {{ r4 - r7 }}
    // the saved stack pointer is the first word of the control block
    mov     r0, sp
    str     r0, [r3, r2]

    1:

    // restore the next task: r2 = its byte offset into the table
    ldr     r2, [r1, {next_task_offset}]
    lsls    r2, {task_size_bits}
    ldr     r0, [r3, r2]
    mov     sp, r0
    pop     {{ r4 - r7 }}
    mov     r8, r4
    mov     r9, r5
    mov     r10, r6
    mov     r11, r7
    pop     {{ r4 - r7 }}
    pop     {{ r0 }}
    mov     lr, r0
    mov     r0, sp
    msr     psp, r0

    // back onto the handler stack
    mov     sp, r12

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
