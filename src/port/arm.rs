//! Cortex-M port
//!
//! Uses SysTick for the scheduler tick and PendSV for task switching.

// Copyright (c) 2025 Ferrous Systems
// SPDX-License-Identifier: GPL-3.0-or-later

use core::{convert::Infallible, sync::atomic::Ordering};

use cortex_m::peripheral::{SCB, SYST, syst::SystClkSource};

use crate::{Error, Scheduler, StartFailure, scheduler::SCHEDULER_PTR};

mod asm;

impl Scheduler {
    /// Run the scheduler
    ///
    /// Configures SysTick to interrupt `config().tick_rate_hz()` times a
    /// second, given the core runs at `core_clock_hz`, then switches to the
    /// highest priority task. Does not return unless something is wrong, in
    /// which case the scheduler is left as it was, so you can fix the problem
    /// (e.g. register a task) and try again.
    ///
    /// You should call it from `fn main()` once all your hardware is
    /// configured. We should be in Privileged Thread mode on the Main stack.
    pub fn try_start(
        &'static self,
        mut syst: SYST,
        core_clock_hz: u32,
    ) -> Result<Infallible, Error> {
        let reload = self
            .config()
            .systick_reload(core_clock_hz)
            .ok_or(StartFailure::InvalidTickRate)?;

        // remember where this object is - it's 'static so it cannot move
        let self_addr = self as *const Scheduler as *mut Scheduler;
        let claimed = critical_section::with(|_cs| {
            if SCHEDULER_PTR.load(Ordering::Acquire).is_null() {
                SCHEDULER_PTR.store(self_addr, Ordering::Release);
                true
            } else {
                false
            }
        });
        if !claimed {
            return Err(StartFailure::AlreadyStarted.into());
        }
        info!("Scheduler @ {=usize:08x}", self_addr as usize);

        // Must do this /after/ setting SCHEDULER_PTR because the SysTick
        // exception handler will use SCHEDULER_PTR. Ticks are ignored until
        // we launch.
        syst.set_reload(reload);
        syst.set_clock_source(SystClkSource::Core);
        syst.clear_current();
        syst.enable_counter();
        syst.enable_interrupt();

        // This pends PendSV, which fires as soon as the launch's critical
        // section ends and takes us into the first task
        if let Err(e) = self.launch() {
            syst.disable_interrupt();
            syst.disable_counter();
            SCHEDULER_PTR.store(core::ptr::null_mut(), Ordering::Release);
            return Err(e);
        }

        // flush the pipeline to ensure the PendSV fires before we reach the end of this function
        cortex_m::asm::isb();
        // impossible to get here
        unreachable!();
    }

    /// Run the scheduler, or log why not and panic
    ///
    /// See [`Scheduler::try_start`].
    pub fn start(&'static self, syst: SYST, core_clock_hz: u32) -> ! {
        match self.try_start(syst, core_clock_hz) {
            Ok(never) => match never {},
            Err(e) => {
                error!("Scheduler failed to start: {}", e);
                panic!("{}", e);
            }
        }
    }
}

/// Ask for the PendSV handler to switch to the scheduler's next task
pub(crate) fn request_switch(_scheduler: &Scheduler) {
    SCB::set_pendsv();
}

/// Sleep until the next interrupt, because the current task has nothing to do
pub(crate) fn idle() {
    cortex_m::asm::wfi();
    cortex_m::asm::isb();
}

/// SysTick Handler
#[unsafe(no_mangle)]
extern "C" fn SysTick() {
    if let Some(scheduler) = Scheduler::get_scheduler() {
        scheduler.sched_tick();
    }
}

// End of File
