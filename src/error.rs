//! Holds the [`Error`] type

// Copyright (c) 2025 Ferrous Systems
// SPDX-License-Identifier: GPL-3.0-or-later

/// Something the scheduler ran out of
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Resource {
    /// Every task slot is already in use
    TaskSlots,
    /// The stack arena cannot fit the requested stack
    StackMemory,
}

/// Why the scheduler refused to start
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StartFailure {
    /// Nothing has been registered, so there is nothing to run
    NoTasks,
    /// A scheduler is already running in this process
    AlreadyStarted,
    /// The tick rate cannot be produced from the given core clock
    InvalidTickRate,
}

/// The errors the scheduler can report
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// Could not allocate the control block or stack for a new task
    ResourceExhausted(Resource),
    /// Could not start the scheduler
    SchedulerStartFailure(StartFailure),
    /// The stack budget cannot hold the initial task state
    StackTooSmall {
        /// What the caller asked for, in bytes
        requested: usize,
        /// The smallest stack we accept, in bytes
        minimum: usize,
    },
    /// The priority is not below the configured number of priorities
    PriorityOutOfRange {
        /// What the caller asked for
        priority: u8,
        /// The configured number of priorities
        max: u8,
    },
}

impl core::fmt::Display for Error {
    fn fmt(&self, fmt: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Error::ResourceExhausted(Resource::TaskSlots) => {
                write!(fmt, "resource exhausted: no free task slots")
            }
            Error::ResourceExhausted(Resource::StackMemory) => {
                write!(fmt, "resource exhausted: not enough stack memory")
            }
            Error::SchedulerStartFailure(StartFailure::NoTasks) => {
                write!(fmt, "scheduler start failure: no tasks registered")
            }
            Error::SchedulerStartFailure(StartFailure::AlreadyStarted) => {
                write!(fmt, "scheduler start failure: already started")
            }
            Error::SchedulerStartFailure(StartFailure::InvalidTickRate) => {
                write!(fmt, "scheduler start failure: invalid tick rate")
            }
            Error::StackTooSmall { requested, minimum } => {
                write!(
                    fmt,
                    "stack of {requested} bytes is below the minimum of {minimum} bytes"
                )
            }
            Error::PriorityOutOfRange { priority, max } => {
                write!(fmt, "priority {priority} is out of range (max {max})")
            }
        }
    }
}

impl From<Resource> for Error {
    fn from(resource: Resource) -> Error {
        Error::ResourceExhausted(resource)
    }
}

impl From<StartFailure> for Error {
    fn from(failure: StartFailure) -> Error {
        Error::SchedulerStartFailure(failure)
    }
}


// End of File
