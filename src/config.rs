//! Holds the [`Config`] type

// Copyright (c) 2025 Ferrous Systems
// SPDX-License-Identifier: GPL-3.0-or-later

/// Scheduler configuration, fixed at build time
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Config {
    tick_rate_hz: u32,
    max_priorities: u8,
    time_slicing: bool,
    minimal_stack_size: usize,
}

impl Config {
    /// A 1 kHz tick, eight priorities, time slicing on, 512 byte stacks
    pub const DEFAULT: Config = Config {
        tick_rate_hz: 1000,
        max_priorities: 8,
        time_slicing: true,
        minimal_stack_size: 512,
    };

    /// Create the default configuration
    pub const fn new() -> Config {
        Config::DEFAULT
    }

    /// Set how many scheduler ticks happen per second
    pub const fn with_tick_rate_hz(self, tick_rate_hz: u32) -> Config {
        assert!(tick_rate_hz > 0);
        Config {
            tick_rate_hz,
            ..self
        }
    }

    /// Set how many priority levels there are
    ///
    /// Valid priorities are `0..max_priorities`, and higher numbers win.
    pub const fn with_max_priorities(self, max_priorities: u8) -> Config {
        assert!(max_priorities > 0);
        Config {
            max_priorities,
            ..self
        }
    }

    /// Should equal-priority tasks take turns on every tick?
    pub const fn with_time_slicing(self, time_slicing: bool) -> Config {
        Config {
            time_slicing,
            ..self
        }
    }

    /// Set the stack size applications should use for simple tasks
    pub const fn with_minimal_stack_size(self, minimal_stack_size: usize) -> Config {
        Config {
            minimal_stack_size,
            ..self
        }
    }

    /// Scheduler ticks per second
    pub const fn tick_rate_hz(&self) -> u32 {
        self.tick_rate_hz
    }

    /// The number of priority levels
    pub const fn max_priorities(&self) -> u8 {
        self.max_priorities
    }

    /// Do equal-priority tasks take turns on every tick?
    pub const fn time_slicing(&self) -> bool {
        self.time_slicing
    }

    /// Stack size, in bytes, for a task that does nothing much
    pub const fn minimal_stack_size(&self) -> usize {
        self.minimal_stack_size
    }

    /// Convert milliseconds to ticks, rounding down
    pub const fn ms_to_ticks(&self, ms: u32) -> u32 {
        let ticks = (ms as u64 * self.tick_rate_hz as u64) / 1000;
        if ticks > u32::MAX as u64 {
            u32::MAX
        } else {
            ticks as u32
        }
    }

    /// Work out the SysTick reload value that gives our tick rate
    ///
    /// Returns `None` if it does not fit in the 24-bit reload register.
    pub const fn systick_reload(&self, core_clock_hz: u32) -> Option<u32> {
        let cycles = core_clock_hz / self.tick_rate_hz;
        if cycles == 0 || cycles > 0x0100_0000 {
            None
        } else {
            Some(cycles - 1)
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config::new()
    }
}


// End of File
