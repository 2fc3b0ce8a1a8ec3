//! Contains the [`Scheduler`] type

// Copyright (c) 2025 Ferrous Systems
// SPDX-License-Identifier: GPL-3.0-or-later

use core::sync::atomic::{AtomicPtr, AtomicU8, AtomicU32, AtomicUsize, Ordering};

use critical_section::CriticalSection;

use crate::{
    Config, Error, Resource, Stack, StartFailure, Task, TaskEntryFn, TaskInfo, TaskState, port,
    stack::StackArena, task::deadline_reached,
};

/// The location of our one and only running [`Scheduler`] object.
///
/// We need this so that the free-standing exception handlers and the free
/// functions like [`crate::delay`] know where all our system state is.
pub(crate) static SCHEDULER_PTR: AtomicPtr<Scheduler> = AtomicPtr::new(core::ptr::null_mut());

/// The longest delay we accept, in ticks
///
/// Deadlines are compared with wrapping arithmetic, so they must be less than
/// half the range of the tick counter away.
pub const MAX_DELAY: u32 = i32::MAX as u32;

/// Identifies a registered task
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct TaskId(usize);

impl TaskId {
    /// Represents the Task ID we produce when the scheduler isn't running
    const INVALID_ID: usize = usize::MAX;

    /// Is this the invalid Task ID?
    pub const fn is_invalid(self) -> bool {
        self.0 == Self::INVALID_ID
    }

    /// The position of this task in the scheduler's task table
    pub const fn index(self) -> usize {
        self.0
    }

    /// Create an invalid Task ID
    pub(crate) const fn invalid() -> TaskId {
        TaskId(Self::INVALID_ID)
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for TaskId {
    fn format(&self, fmt: defmt::Formatter) {
        if self.is_invalid() {
            defmt::write!(fmt, "T---");
        } else {
            defmt::write!(fmt, "T{=usize:03}", self.0);
        }
    }
}

impl core::fmt::Display for TaskId {
    fn fmt(&self, fmt: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        if self.is_invalid() {
            write!(fmt, "T---")
        } else {
            write!(fmt, "T{:03}", self.0)
        }
    }
}

/// A pre-emptive, priority-based task-switching scheduler
///
/// The highest priority task that is ready always runs. Tasks of equal
/// priority take turns, round-robin, whenever the running task blocks or
/// yields, and on every tick if time slicing is enabled.
///
/// Build one as a `static`, register tasks with [`Scheduler::register`],
/// then hand over the CPU with `Scheduler::start`.
///
/// The Arm hardware will push {xPSR, PC, LR, R12, R3, R2, R1, R0} to PSP when
/// an exception occurs. We then push the rest (R11 to R4, and the exception
/// return value).
#[repr(C)]
pub struct Scheduler {
    /// Which task is currently running
    current_task: AtomicUsize,
    /// Which task should PendSV switch to next
    next_task: AtomicUsize,
    /// A fixed, static table of task slots
    task_list: &'static [Task],
    /// Current tick count
    ticks: AtomicU32,
    /// One of the `RUN_STATE_` values
    run_state: AtomicU8,
    /// Where task stacks come from
    stacks: StackArena,
    /// How we were configured
    config: Config,
}

impl Scheduler {
    /// The offset, in bytes, to the `current_task` field
    pub(crate) const CURRENT_TASK_OFFSET: usize = core::mem::offset_of!(Scheduler, current_task);

    /// The offset, in bytes, to the `next_task` field
    pub(crate) const NEXT_TASK_OFFSET: usize = core::mem::offset_of!(Scheduler, next_task);

    /// The offset, in bytes, to the `task_list` field
    pub(crate) const TASK_LIST_OFFSET: usize = core::mem::offset_of!(Scheduler, task_list);

    /// This is the minimum stack we can support, because of the state we need to push
    ///
    /// Make space for seventeen 32-bit words of task state, plus some
    /// headroom
    #[cfg(not(arm_abi = "eabihf"))]
    pub const MIN_STACK_SIZE: usize = (4 * 17) + 4;

    /// This is the minimum stack we can support, because of the state we need to push
    ///
    /// Make space for seventeen 32-bit words, thirty-two 32-bit FPU
    /// registers, plus FPU status register and its padding word, in the task
    /// state, plus some headroom
    #[cfg(arm_abi = "eabihf")]
    pub const MIN_STACK_SIZE: usize = (4 * 51) + 4;

    const RUN_STATE_IDLE: u8 = 0;
    const RUN_STATE_RUNNING: u8 = 1;
    const RUN_STATE_STOPPED: u8 = 2;

    /// Build the scheduler
    ///
    /// `task_list` sets how many tasks can be registered, and `stacks` is the
    /// memory their stacks are carved from.
    pub const fn new<const N: usize>(
        task_list: &'static [Task],
        stacks: &'static Stack<N>,
        config: Config,
    ) -> Scheduler {
        // Cannot schedule without at least one task slot
        assert!(!task_list.is_empty());
        Scheduler {
            current_task: AtomicUsize::new(TaskId::INVALID_ID),
            next_task: AtomicUsize::new(0),
            task_list,
            ticks: AtomicU32::new(0),
            run_state: AtomicU8::new(Self::RUN_STATE_IDLE),
            stacks: StackArena::new(stacks),
            config,
        }
    }

    /// Register a task
    ///
    /// The task gets `stack_size` bytes of stack (rounded up to a multiple of
    /// eight) and will run `entry_fn` once the scheduler picks it. Higher
    /// `priority` values run in preference to lower ones.
    ///
    /// If the scheduler is already running, the new task is ready at once and
    /// pre-empts the caller if it has a higher priority.
    pub fn register(
        &self,
        entry_fn: TaskEntryFn,
        name: &'static str,
        stack_size: usize,
        priority: u8,
    ) -> Result<TaskId, Error> {
        if stack_size < Self::MIN_STACK_SIZE {
            error!("Stack for {=str} too small: {=usize}", name, stack_size);
            return Err(Error::StackTooSmall {
                requested: stack_size,
                minimum: Self::MIN_STACK_SIZE,
            });
        }
        let max = self.config.max_priorities();
        if priority >= max {
            error!("Priority for {=str} out of range: {=u8}", name, priority);
            return Err(Error::PriorityOutOfRange { priority, max });
        }

        let result = critical_section::with(|cs| -> Result<TaskId, Error> {
            let (idx, task) = self
                .task_list
                .iter()
                .enumerate()
                .find(|(_, task)| !task.is_used(cs))
                .ok_or(Resource::TaskSlots)?;
            let stack_top = self.stacks.allocate(cs, stack_size)?;
            let running = self.is_running();
            let state = if running {
                TaskState::Ready
            } else {
                TaskState::Created
            };
            let info = TaskInfo::new(
                name,
                priority,
                stack_size.next_multiple_of(StackArena::GRANULE),
                state,
            );
            // SAFETY: The arena gave us this stack and nobody else has it, and
            // we checked it was big enough.
            unsafe {
                task.occupy(cs, entry_fn, stack_top, info);
            }
            if running {
                let selection = self.select(cs, false);
                self.dispatch(cs, selection);
            }
            Ok(TaskId(idx))
        });

        match result {
            Ok(task_id) => {
                info!("Registered {=str} as {} at priority {=u8}", name, task_id, priority);
                debug!(
                    "Initial frame for {} @ 0x{=usize:08x}",
                    task_id,
                    self.task_list[task_id.0].stack() as usize
                );
            }
            Err(e) => {
                error!("Failed to register {=str}: {}", name, e);
            }
        }
        result
    }

    /// Get the scheduler ready to run, and pick the first task
    ///
    /// This is the hardware independent part of starting the scheduler. All
    /// registered tasks become ready, and a switch to the highest priority
    /// one is requested.
    ///
    /// Fails if the scheduler has been started before, or if no tasks have
    /// been registered. In the latter case you may register some tasks and
    /// try again.
    pub fn launch(&self) -> Result<TaskId, Error> {
        critical_section::with(|cs| {
            // Armv6-M has no compare-and-swap, so the critical section guards
            // the run state instead
            if self.run_state.load(Ordering::Acquire) != Self::RUN_STATE_IDLE {
                error!("Tried to re-start scheduler!");
                return Err(StartFailure::AlreadyStarted.into());
            }
            self.run_state.store(Self::RUN_STATE_RUNNING, Ordering::Release);

            for task in self.task_list.iter() {
                if task.state(cs) == Some(TaskState::Created) {
                    task.set_state(cs, TaskState::Ready);
                }
            }
            match self.select(cs, false) {
                TaskSelection::NewTask(task_id) => {
                    info!("Launching with {}", task_id);
                    self.dispatch(cs, TaskSelection::NewTask(task_id));
                    Ok(task_id)
                }
                TaskSelection::CurrentTask | TaskSelection::NoTasks => {
                    error!("No tasks to run!");
                    self.run_state.store(Self::RUN_STATE_IDLE, Ordering::Release);
                    Err(StartFailure::NoTasks.into())
                }
            }
        })
    }

    /// Stop the scheduler
    ///
    /// Ticks stop counting and no further task switches happen. The calling
    /// task carries on running, and a stopped scheduler cannot be started
    /// again.
    pub fn shutdown(&self) {
        info!("Scheduler stopping at tick {=u32}", self.now());
        self.run_state.store(Self::RUN_STATE_STOPPED, Ordering::Release);
    }

    /// Call periodically, to get the scheduler to adjust which task should run next
    ///
    /// Advances the tick count, wakes any task whose delay has expired, and
    /// then selects which task should be running.
    ///
    /// Ideally call this from a SysTick handler
    pub fn sched_tick(&self) {
        if !self.is_running() {
            return;
        }
        critical_section::with(|cs| {
            let now = self.ticks.load(Ordering::Relaxed).wrapping_add(1);
            self.ticks.store(now, Ordering::Relaxed);
            trace!("Tick {=u32}", now);

            for (idx, task) in self.task_list.iter().enumerate() {
                if let Some(TaskState::Blocked { until }) = task.state(cs) {
                    if deadline_reached(now, until) {
                        trace!("- waking T{=usize:03}", idx);
                        task.set_state(cs, TaskState::Ready);
                    }
                }
            }

            let selection = self.select(cs, self.config.time_slicing());
            self.dispatch(cs, selection);
        });
    }

    /// Take the current task off the CPU
    ///
    /// With `ticks == 0` the task stays ready and we just let any other ready
    /// task of the same (or higher) priority have a go. Otherwise the task
    /// is blocked until `ticks` ticks from now (clamped to [`MAX_DELAY`]).
    ///
    /// This does not wait. On hardware, the switch happens as soon as the
    /// PendSV exception can fire; [`Scheduler::delay`] does the waiting.
    pub fn suspend_current(&self, ticks: u32) {
        if !self.is_running() {
            return;
        }
        critical_section::with(|cs| {
            let current = self.current_task.load(Ordering::Relaxed);
            let Some(task) = self.task_list.get(current) else {
                return;
            };
            if ticks > 0 {
                let until = self.now().wrapping_add(ticks.min(MAX_DELAY));
                trace!("- T{=usize:03} blocked until {=u32}", current, until);
                task.set_state(cs, TaskState::Blocked { until });
            }
            let selection = self.select(cs, true);
            self.dispatch(cs, selection);
        });
    }

    /// Delay the current task for at least the given number of ticks
    ///
    /// While nothing else is ready to run, the CPU sleeps until the next
    /// interrupt. Returns immediately if the scheduler is not running.
    pub fn delay(&self, ticks: u32) {
        let me = self.current_task.load(Ordering::Relaxed);
        self.suspend_current(ticks);
        while self.is_running() && self.is_blocked(me) {
            port::idle();
        }
    }

    /// Get current tick count
    pub fn now(&self) -> u32 {
        self.ticks.load(Ordering::Relaxed)
    }

    /// Has the scheduler been launched, and not shut down?
    pub fn is_running(&self) -> bool {
        self.run_state.load(Ordering::Acquire) == Self::RUN_STATE_RUNNING
    }

    /// Get the configuration we were built with
    pub const fn config(&self) -> &Config {
        &self.config
    }

    /// Get the current Task ID
    pub fn current_task_id(&self) -> TaskId {
        TaskId(self.current_task.load(Ordering::Relaxed))
    }

    /// Get a snapshot of a task's details
    ///
    /// Returns `None` if the ID does not refer to a registered task.
    pub fn task_info(&self, task_id: TaskId) -> Option<TaskInfo> {
        let task = self.task_list.get(task_id.0)?;
        critical_section::with(|cs| task.info(cs))
    }

    /// How many tasks have been registered
    pub fn task_count(&self) -> usize {
        critical_section::with(|cs| {
            self.task_list.iter().filter(|task| task.is_used(cs)).count()
        })
    }

    /// How many bytes of stack memory are still available for new tasks
    pub fn stack_remaining(&self) -> usize {
        critical_section::with(|cs| self.stacks.remaining(cs))
    }

    /// Get the handle to the global scheduler
    pub(crate) fn get_scheduler() -> Option<&'static Scheduler> {
        // Get our stashed pointer
        let scheduler_ptr = SCHEDULER_PTR.load(Ordering::Acquire);
        // Are we intialised?
        if scheduler_ptr.is_null() {
            None
        } else {
            // SAFETY: Only `Scheduler::try_start` writes to [`SCHEDULER_PTR`]
            // and it always sets it to be a valid pointer to a `'static`
            // [`Scheduler`].
            Some(unsafe { &*scheduler_ptr })
        }
    }

    /// Finish a task switch by making the next task the current task
    ///
    /// The PendSV handler does this itself on hardware.
    #[cfg_attr(target_arch = "arm", allow(dead_code))]
    pub(crate) fn complete_switch(&self) {
        self.current_task
            .store(self.next_task.load(Ordering::Relaxed), Ordering::Relaxed);
    }

    /// Is the given task waiting for a tick?
    fn is_blocked(&self, task_idx: usize) -> bool {
        critical_section::with(|cs| {
            self.task_list
                .get(task_idx)
                .and_then(|task| task.state(cs))
                .is_some_and(TaskState::is_blocked)
        })
    }

    /// Select the highest priority runnable task
    ///
    /// If `rotate` is set, ties go to the first candidate after the current
    /// task, so equal-priority tasks take turns. Otherwise ties go to the
    /// current task.
    fn select(&self, cs: CriticalSection, rotate: bool) -> TaskSelection {
        trace!("> picking a task");
        let current_task = self.current_task.load(Ordering::Relaxed);
        let num_tasks = self.task_list.len();
        let first = if current_task == TaskId::INVALID_ID {
            0
        } else if rotate {
            current_task + 1
        } else {
            current_task
        };

        let mut best: Option<(usize, u8)> = None;
        for offset in 0..num_tasks {
            let idx = (first + offset) % num_tasks;
            let Some(info) = self.task_list[idx].info(cs) else {
                continue;
            };
            // strictly greater, so the first one we find wins a tie
            if info.state().is_runnable()
                && best.is_none_or(|(_, priority)| info.priority() > priority)
            {
                best = Some((idx, info.priority()));
            }
        }

        let task_sel = match best {
            None => TaskSelection::NoTasks,
            Some((idx, _)) if idx == current_task => TaskSelection::CurrentTask,
            Some((idx, _)) => TaskSelection::NewTask(TaskId(idx)),
        };
        trace!("< picked {}", task_sel);
        task_sel
    }

    /// Act on a selection: update task states and request a switch if needed
    fn dispatch(&self, cs: CriticalSection, selection: TaskSelection) {
        match selection {
            TaskSelection::NewTask(task_id) => {
                for (idx, task) in self.task_list.iter().enumerate() {
                    if idx != task_id.0 && task.state(cs) == Some(TaskState::Running) {
                        task.set_state(cs, TaskState::Ready);
                    }
                }
                self.task_list[task_id.0].set_state(cs, TaskState::Running);
                self.next_task.store(task_id.0, Ordering::Relaxed);
                port::request_switch(self);
            }
            TaskSelection::CurrentTask => {
                let current_task = self.current_task.load(Ordering::Relaxed);
                self.task_list[current_task].set_state(cs, TaskState::Running);
                // cancels any switch still pending from an earlier selection
                self.next_task.store(current_task, Ordering::Relaxed);
            }
            TaskSelection::NoTasks => {
                trace!("- nothing to run");
            }
        }
    }
}

/// SAFETY: All the mutable state is atomic, or only touched inside a
/// critical section.
unsafe impl Sync for Scheduler {}

/// Describes which task we picked
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
enum TaskSelection {
    /// We picked a new task - do a task switch
    NewTask(TaskId),
    /// We like the current task - no switch required
    CurrentTask,
    /// There are no tasks - you should probably sleep
    NoTasks,
}


// End of File
