//! The parts of the scheduler that depend on what we are running on
//!
//! On Arm we switch tasks in the PendSV exception and sleep with `wfi`. On
//! anything else (i.e. the build machine, when testing) there is no real
//! context switch - the scheduler's bookkeeping is updated straight away.

// Copyright (c) 2025 Ferrous Systems
// SPDX-License-Identifier: GPL-3.0-or-later

#[cfg(target_arch = "arm")]
mod arm;

#[cfg(target_arch = "arm")]
pub(crate) use arm::{idle, request_switch};

#[cfg(not(target_arch = "arm"))]
mod host;

#[cfg(not(target_arch = "arm"))]
pub(crate) use host::{idle, request_switch};

// End of File
