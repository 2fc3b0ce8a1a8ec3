//! Scheduling scenarios, driven one tick at a time on the host.
//!
//! There is no context switch on the host, so each task body is modelled as
//! "print a line, then delay for a period". Whenever the scheduler says a task
//! is running we record its line and suspend it; when nothing is running we
//! deliver a tick.

use std::{
    collections::HashMap,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    thread,
    time::Duration,
};

use tots::{
    Config, Error, MAX_DELAY, Resource, Scheduler, Stack, StartFailure, Task, TaskId, TaskState,
};

/// Task bodies never run on the host
fn body() -> ! {
    unreachable!("task bodies are simulated");
}

/// Build a scheduler with `slots` task slots and `STACK` bytes of stack memory
fn make_scheduler<const STACK: usize>(slots: usize, config: Config) -> &'static Scheduler {
    let tasks: Vec<Task> = (0..slots).map(|_| Task::new()).collect();
    let tasks: &'static [Task] = Box::leak(tasks.into_boxed_slice());
    let stacks: &'static Stack<STACK> = Box::leak(Box::new(Stack::new()));
    Box::leak(Box::new(Scheduler::new(tasks, stacks, config)))
}

struct Bench {
    scheduler: &'static Scheduler,
    /// What each task prints, and how long it then sleeps
    bodies: HashMap<TaskId, (&'static str, u32)>,
    /// Every line printed, with the tick it was printed on
    output: Vec<(u32, &'static str)>,
}

impl Bench {
    fn new() -> Bench {
        Bench::with_config(Config::new())
    }

    fn with_config(config: Config) -> Bench {
        Bench {
            scheduler: make_scheduler::<16384>(8, config),
            bodies: HashMap::new(),
            output: Vec::new(),
        }
    }

    fn spawn(&mut self, name: &'static str, line: &'static str, period: u32, priority: u8) -> TaskId {
        let task_id = self
            .scheduler
            .register(body, name, 1024, priority)
            .expect("registration failed");
        self.bodies.insert(task_id, (line, period));
        task_id
    }

    /// Run until the tick count reaches `end`
    fn run_until(&mut self, end: u32) {
        while self.scheduler.now() < end {
            let task_id = self.scheduler.current_task_id();
            let state = self.scheduler.task_info(task_id).map(|info| info.state());
            if state == Some(TaskState::Running) {
                let (line, period) = self.bodies[&task_id];
                self.output.push((self.scheduler.now(), line));
                self.scheduler.suspend_current(period);
            } else {
                self.scheduler.sched_tick();
            }
        }
    }

    fn count(&self, line: &str) -> usize {
        self.output.iter().filter(|(_, l)| *l == line).count()
    }

    /// The lines printed on the given tick, in order
    fn lines_at(&self, tick: u32) -> Vec<&'static str> {
        self.output
            .iter()
            .filter(|(t, _)| *t == tick)
            .map(|(_, l)| *l)
            .collect()
    }
}

#[test]
fn blink_over_five_seconds() {
    let mut bench = Bench::new();
    let period = bench.scheduler.config().ms_to_ticks(1000);
    bench.spawn("Blink", "LED Toggled!", period, 1);
    bench.scheduler.launch().unwrap();
    bench.run_until(5000);
    let count = bench.count("LED Toggled!");
    assert!((4..=6).contains(&count), "got {count} lines");
}

#[test]
fn repetitions_match_the_period() {
    for (period, window) in [(1, 50), (7, 100), (250, 1000), (1000, 5000), (333, 10_000)] {
        let mut bench = Bench::new();
        bench.spawn("Periodic", "tick", period, 1);
        bench.scheduler.launch().unwrap();
        bench.run_until(window);
        let expected = (window / period) as usize;
        let count = bench.count("tick");
        assert!(
            count + 1 >= expected && count <= expected + 1,
            "period {period} over {window}: got {count}, expected {expected}"
        );
    }
}

#[test]
fn two_tasks_share_the_cpu() {
    let mut bench = Bench::new();
    let config = *bench.scheduler.config();
    bench.spawn("TaskA", "Task A running", config.ms_to_ticks(1000), 1);
    bench.spawn("TaskB", "Task B running", config.ms_to_ticks(500), 1);
    bench.scheduler.launch().unwrap();
    bench.run_until(2000);

    let a = bench.count("Task A running");
    let b = bench.count("Task B running");
    assert!(a > 0 && b > 0, "a = {a}, b = {b}");
    assert_eq!(b, 2 * a);
}

#[test]
fn faster_task_runs_at_least_twice_as_often() {
    let mut bench = Bench::new();
    bench.spawn("Slow", "slow", 1000, 1);
    bench.spawn("Fast", "fast", 500, 1);
    bench.scheduler.launch().unwrap();
    bench.run_until(20_000);
    assert!(bench.count("fast") >= 2 * bench.count("slow"));
}

#[test]
fn starting_with_no_tasks_fails_cleanly() {
    let scheduler = make_scheduler::<4096>(2, Config::new());
    assert_eq!(
        scheduler.launch(),
        Err(Error::SchedulerStartFailure(StartFailure::NoTasks))
    );
    assert!(!scheduler.is_running());
    assert!(scheduler.current_task_id().is_invalid());

    // and we can recover
    let task_id = scheduler.register(body, "Late", 512, 0).unwrap();
    assert_eq!(scheduler.launch(), Ok(task_id));
    assert!(scheduler.is_running());
}

#[test]
fn starting_twice_fails() {
    let scheduler = make_scheduler::<4096>(2, Config::new());
    scheduler.register(body, "Only", 512, 0).unwrap();
    scheduler.launch().unwrap();
    assert_eq!(
        scheduler.launch(),
        Err(Error::SchedulerStartFailure(StartFailure::AlreadyStarted))
    );
}

#[test]
fn identical_registrations_are_independent() {
    let mut bench = Bench::new();
    let first = bench.spawn("Twin", "twin", 100, 1);
    let second = bench.spawn("Twin", "twin", 100, 1);
    assert_ne!(first, second);
    assert_eq!(bench.scheduler.task_count(), 2);

    bench.scheduler.launch().unwrap();
    bench.run_until(1000);
    assert_eq!(bench.count("twin"), 20);
    assert_eq!(bench.lines_at(0), ["twin", "twin"]);
}

#[test]
fn higher_priority_runs_first() {
    let mut bench = Bench::new();
    bench.spawn("Low", "low", 10, 1);
    let high = bench.spawn("High", "high", 10, 2);
    assert_eq!(bench.scheduler.launch(), Ok(high));
    bench.run_until(50);
    for tick in [0, 10, 20, 30, 40] {
        assert_eq!(bench.lines_at(tick), ["high", "low"], "at tick {tick}");
    }
}

#[test]
fn waking_high_priority_task_preempts() {
    let scheduler = make_scheduler::<4096>(4, Config::new());
    let low = scheduler.register(body, "Low", 512, 1).unwrap();
    let high = scheduler.register(body, "High", 512, 3).unwrap();
    assert_eq!(scheduler.launch(), Ok(high));

    scheduler.suspend_current(5);
    assert_eq!(scheduler.current_task_id(), low);
    for _ in 0..4 {
        scheduler.sched_tick();
        assert_eq!(scheduler.current_task_id(), low);
    }
    scheduler.sched_tick();
    assert_eq!(scheduler.now(), 5);
    assert_eq!(scheduler.current_task_id(), high);
    assert_eq!(
        scheduler.task_info(low).map(|info| info.state()),
        Some(TaskState::Ready)
    );
}

#[test]
fn registering_a_higher_priority_task_preempts() {
    let scheduler = make_scheduler::<4096>(4, Config::new());
    let low = scheduler.register(body, "Low", 512, 1).unwrap();
    scheduler.launch().unwrap();

    let peer = scheduler.register(body, "Peer", 512, 1).unwrap();
    assert_eq!(scheduler.current_task_id(), low);
    assert_eq!(
        scheduler.task_info(peer).map(|info| info.state()),
        Some(TaskState::Ready)
    );

    let high = scheduler.register(body, "High", 512, 2).unwrap();
    assert_eq!(scheduler.current_task_id(), high);
    assert_eq!(
        scheduler.task_info(low).map(|info| info.state()),
        Some(TaskState::Ready)
    );
}

#[test]
fn equal_priorities_take_turns_each_tick() {
    let scheduler = make_scheduler::<4096>(4, Config::new());
    let a = scheduler.register(body, "A", 512, 1).unwrap();
    let b = scheduler.register(body, "B", 512, 1).unwrap();
    scheduler.launch().unwrap();
    assert_eq!(scheduler.current_task_id(), a);

    scheduler.sched_tick();
    assert_eq!(scheduler.current_task_id(), b);
    assert_eq!(
        scheduler.task_info(a).map(|info| info.state()),
        Some(TaskState::Ready)
    );
    scheduler.sched_tick();
    assert_eq!(scheduler.current_task_id(), a);
}

#[test]
fn no_time_slicing_keeps_the_current_task() {
    let scheduler = make_scheduler::<4096>(4, Config::new().with_time_slicing(false));
    let a = scheduler.register(body, "A", 512, 1).unwrap();
    let b = scheduler.register(body, "B", 512, 1).unwrap();
    scheduler.launch().unwrap();
    for _ in 0..3 {
        scheduler.sched_tick();
        assert_eq!(scheduler.current_task_id(), a);
    }
    // yielding still hands over
    scheduler.suspend_current(0);
    assert_eq!(scheduler.current_task_id(), b);
}

#[test]
fn time_slicing_does_not_demote_a_higher_priority_task() {
    let scheduler = make_scheduler::<4096>(4, Config::new());
    let high = scheduler.register(body, "High", 512, 5).unwrap();
    let low = scheduler.register(body, "Low", 512, 1).unwrap();
    scheduler.launch().unwrap();
    for _ in 0..3 {
        scheduler.sched_tick();
        assert_eq!(scheduler.current_task_id(), high);
    }
    assert_eq!(
        scheduler.task_info(low).map(|info| info.state()),
        Some(TaskState::Ready)
    );
}

#[test]
fn states_follow_the_lifecycle() {
    let scheduler = make_scheduler::<4096>(4, Config::new());
    let a = scheduler.register(body, "A", 512, 1).unwrap();
    let b = scheduler.register(body, "B", 512, 1).unwrap();
    let state = |task_id| scheduler.task_info(task_id).map(|info| info.state());
    assert_eq!(state(a), Some(TaskState::Created));
    assert_eq!(state(b), Some(TaskState::Created));

    scheduler.launch().unwrap();
    assert_eq!(state(a), Some(TaskState::Running));
    assert_eq!(state(b), Some(TaskState::Ready));

    scheduler.suspend_current(100);
    assert_eq!(state(a), Some(TaskState::Blocked { until: 100 }));
    assert_eq!(state(b), Some(TaskState::Running));

    scheduler.suspend_current(u32::MAX);
    assert_eq!(state(b), Some(TaskState::Blocked { until: MAX_DELAY }));
    // nothing else can run, so b stays current while it idles
    assert_eq!(scheduler.current_task_id(), b);

    for _ in 0..100 {
        scheduler.sched_tick();
    }
    assert_eq!(state(a), Some(TaskState::Running));
    assert_eq!(scheduler.current_task_id(), a);
}

#[test]
fn running_out_of_task_slots() {
    let scheduler = make_scheduler::<8192>(2, Config::new());
    scheduler.register(body, "One", 512, 0).unwrap();
    scheduler.register(body, "Two", 512, 0).unwrap();
    assert_eq!(
        scheduler.register(body, "Three", 512, 0),
        Err(Error::ResourceExhausted(Resource::TaskSlots))
    );
}

#[test]
fn running_out_of_stack_memory() {
    let scheduler = make_scheduler::<2048>(4, Config::new());
    scheduler.register(body, "One", 1024, 0).unwrap();
    assert_eq!(scheduler.stack_remaining(), 1024);
    assert_eq!(
        scheduler.register(body, "Two", 1025, 0),
        Err(Error::ResourceExhausted(Resource::StackMemory))
    );
    // the failed attempt did not use a slot
    assert_eq!(scheduler.task_count(), 1);
    scheduler.register(body, "Two", 1024, 0).unwrap();
    assert_eq!(scheduler.stack_remaining(), 0);
}

#[test]
fn bad_arguments_are_rejected() {
    let scheduler = make_scheduler::<4096>(4, Config::new().with_max_priorities(4));
    assert_eq!(
        scheduler.register(body, "Tiny", 16, 0),
        Err(Error::StackTooSmall {
            requested: 16,
            minimum: Scheduler::MIN_STACK_SIZE
        })
    );
    assert_eq!(
        scheduler.register(body, "Lofty", 512, 4),
        Err(Error::PriorityOutOfRange {
            priority: 4,
            max: 4
        })
    );
    assert_eq!(scheduler.task_count(), 0);
    assert_eq!(scheduler.stack_remaining(), 4096);
}

#[test]
fn task_details() {
    let scheduler = make_scheduler::<4096>(4, Config::new());
    let task_id = scheduler.register(body, "Blink", 1001, 3).unwrap();
    assert_eq!(task_id.to_string(), "T000");
    let info = scheduler.task_info(task_id).unwrap();
    assert_eq!(info.name(), "Blink");
    assert_eq!(info.priority(), 3);
    assert_eq!(info.stack_size(), 1008);
    assert_eq!(scheduler.stack_remaining(), 4096 - 1008);
    assert_eq!(scheduler.task_info(scheduler.current_task_id()), None);
}

#[test]
fn shutdown_stops_the_clock() {
    let mut bench = Bench::new();
    let a = bench.spawn("A", "a", 10, 1);
    bench.scheduler.launch().unwrap();
    bench.run_until(25);
    bench.scheduler.shutdown();
    assert!(!bench.scheduler.is_running());

    let printed = bench.output.len();
    for _ in 0..100 {
        bench.scheduler.sched_tick();
    }
    assert_eq!(bench.scheduler.now(), 25);
    bench.scheduler.suspend_current(10);
    assert_eq!(bench.output.len(), printed);
    assert_eq!(bench.scheduler.current_task_id(), a);
    assert_eq!(
        bench.scheduler.launch(),
        Err(Error::SchedulerStartFailure(StartFailure::AlreadyStarted))
    );
}

/// Calls `sched_tick` from another thread until told to stop, like SysTick
struct Ticker {
    stop: Arc<AtomicBool>,
    handle: Option<thread::JoinHandle<()>>,
}

impl Ticker {
    fn start(scheduler: &'static Scheduler) -> Ticker {
        let stop = Arc::new(AtomicBool::new(false));
        let handle = thread::spawn({
            let stop = stop.clone();
            move || {
                while !stop.load(Ordering::Relaxed) {
                    scheduler.sched_tick();
                    thread::sleep(Duration::from_micros(200));
                }
            }
        });
        Ticker {
            stop,
            handle: Some(handle),
        }
    }
}

impl Drop for Ticker {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            handle.join().unwrap();
        }
    }
}

#[test]
fn delay_waits_at_least_the_given_ticks() {
    let scheduler = make_scheduler::<4096>(2, Config::new());
    let a = scheduler.register(body, "A", 1024, 1).unwrap();
    scheduler.launch().unwrap();

    let ticker = Ticker::start(scheduler);
    for _ in 0..3 {
        let t0 = scheduler.now();
        scheduler.delay(5);
        let elapsed = scheduler.now().wrapping_sub(t0);
        assert!(elapsed >= 5, "woke after {elapsed} ticks");
        assert_eq!(scheduler.current_task_id(), a);
        assert_eq!(
            scheduler.task_info(a).map(|info| info.state()),
            Some(TaskState::Running)
        );
    }
    drop(ticker);
}

#[test]
fn delay_returns_once_shut_down() {
    let scheduler = make_scheduler::<4096>(2, Config::new());
    let a = scheduler.register(body, "A", 1024, 1).unwrap();
    scheduler.launch().unwrap();

    let stopper = thread::spawn(move || {
        thread::sleep(Duration::from_millis(20));
        scheduler.shutdown();
    });
    scheduler.delay(MAX_DELAY);
    stopper.join().unwrap();

    assert!(!scheduler.is_running());
    assert_eq!(
        scheduler.task_info(a).map(|info| info.state()),
        Some(TaskState::Blocked { until: MAX_DELAY })
    );
}

#[test]
fn delay_zero_yields_without_blocking() {
    let scheduler = make_scheduler::<4096>(2, Config::new());
    let a = scheduler.register(body, "A", 1024, 1).unwrap();
    let b = scheduler.register(body, "B", 1024, 1).unwrap();
    assert_eq!(scheduler.launch(), Ok(a));

    // no ticks are delivered, so any waiting would hang
    scheduler.delay(0);
    assert_eq!(scheduler.current_task_id(), b);
    assert_eq!(
        scheduler.task_info(a).map(|info| info.state()),
        Some(TaskState::Ready)
    );
    assert_eq!(scheduler.now(), 0);
}

#[test]
fn free_functions_without_a_scheduler() {
    assert_eq!(tots::now(), u32::MAX);
    assert!(tots::task_id().is_invalid());
    assert_eq!(tots::task_id().to_string(), "T---");
}

#[test]
#[should_panic(expected = "before the scheduler started")]
fn delay_without_a_scheduler_panics() {
    tots::delay(1);
}
