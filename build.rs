//! Build script for TOTS
//!
//! Works out which Arm architecture and ABI we are building for, so the right
//! context switch routine gets compiled in.

// Copyright (c) 2025 Ferrous Systems
// SPDX-License-Identifier: GPL-3.0-or-later

/// Entry point to the build script
fn main() {
    arm_targets::process();
}

// End of File
