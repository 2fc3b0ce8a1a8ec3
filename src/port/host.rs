//! Host port

// Copyright (c) 2025 Ferrous Systems
// SPDX-License-Identifier: GPL-3.0-or-later

use crate::Scheduler;

/// Switch tasks
///
/// There are no task stacks to swap here, so the switch is finished at once.
pub(crate) fn request_switch(scheduler: &Scheduler) {
    scheduler.complete_switch();
}

/// Wait a bit, because the current task has nothing to do
pub(crate) fn idle() {
    core::hint::spin_loop();
}

// End of File
