//! # The scheduler core.
//!
//! A single-threaded cooperative run loop. Tasks are resumable computations
//! (futures) held in a FIFO queue; one *step* is one poll. Between steps a
//! task may hand the scheduler a signal (a timeout to track, an action to
//! defer until the task ends); everything else a task suspends on is an
//! opaque "resume me later".
//!
//! ## Tick structure
//!
//! Each outer iteration (*tick*):
//! 1. consult the memory watchdog; stop early if it trips;
//! 2. fill the running set from the queue head, up to `max_concurrent`;
//! 3. step every member once, in insertion order; survivors re-enqueue at
//!    the tail, terminated tasks are collected;
//! 4. run cleanup for the tick's terminated tasks, in termination order:
//!    fire the deferred action (driving a task-producing defer to completion
//!    synchronously), drop the side-table entries, route the outcome.
//!
//! Strict FIFO, no priorities: a task that never suspends monopolizes the
//! thread, by contract.
//!
//! ## Re-entrancy
//!
//! `run()`, `join`, `select` and the `ResultHandle` drivers may be invoked
//! from inside a task or a deferred action. Nested invocations share the
//! queue and return at their own termination condition; a per-task running
//! flag keeps a nested invocation from stepping a task that is already
//! mid-step.
//!
//! ## Example
//! ```
//! use std::time::Duration;
//! use strand::{spawn, run, sleep};
//!
//! spawn(async {
//!     sleep(Duration::from_millis(1)).await;
//!     Ok(())
//! });
//! run().unwrap();
//! ```

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::rc::Rc;
use std::task::{Context, Poll};
use std::thread;
use std::time::{Duration, Instant};

use futures::task::noop_waker;

use crate::cancel::CancelToken;
use crate::config::Config;
use crate::error::{RuntimeError, TaskError};
use crate::events::{Event, EventKind};
use crate::handle::ResultHandle;
use crate::memory::{self, MemoryWatchdog};
use crate::observers::{LogWriter, Observer};
use crate::repeat::{Repeater, RepeaterHandle};
use crate::signal::{self, CurrentTask, Signal};
use crate::task::{Task, TaskFuture, TaskId, TaskRef};
use crate::timeout::Deadline;

thread_local! {
    /// Stack of schedulers currently driving a run loop on this thread.
    /// Nested `run()` calls push the same scheduler again.
    static ACTIVE: RefCell<Vec<Rc<Scheduler>>> = const { RefCell::new(Vec::new()) };

    /// Process-wide default instance (one logical thread owns the runtime).
    static RUNTIME: Rc<Scheduler> = Scheduler::new();
}

/// An entry in the scheduler queue.
enum Entry {
    Task(TaskRef),
    Repeater(Rc<Repeater>),
}

/// What `enqueue` hands back to the composition primitives.
struct Spawned {
    id: TaskId,
    done: Rc<Cell<bool>>,
    token: CancelToken,
}

/// How long a run-loop invocation keeps going.
enum RunMode<'a> {
    /// Until the queue is empty (pacing may end a call early).
    UntilEmpty,
    /// Until one of the given completion flags is set.
    UntilFirst(&'a [Rc<Cell<bool>>]),
}

/// Single-threaded cooperative task scheduler.
///
/// Owns the queue, the side tables (`timeouts`, `defers`, `errors`), the
/// identity counter, pacing configuration, and the memory watchdog. The
/// free functions of this crate delegate to a thread-local default
/// instance; explicit instances behave identically.
pub struct Scheduler {
    /// FIFO of ready entries, dequeued from head, enqueued at tail.
    queue: RefCell<VecDeque<Entry>>,
    /// Pending deadline per live task, at most one each.
    timeouts: RefCell<HashMap<TaskId, Deadline>>,
    /// Pending deferred action per live task, at most one each.
    defers: RefCell<HashMap<TaskId, crate::defer::Defer>>,
    /// Terminal error per awaited task, read exactly once by its handle.
    errors: RefCell<HashMap<TaskId, TaskError>>,
    /// Identity source; wraps at the platform maximum.
    next_id: Cell<u64>,
    /// Tasks spawned and not yet cleaned up.
    live: Cell<usize>,
    config: RefCell<Config>,
    watchdog: MemoryWatchdog,
    observers: RefCell<Vec<Rc<dyn Observer>>>,
    logger: RefCell<Option<Rc<LogWriter>>>,
    /// Parent of every task token; `cleanup()` leaves it untouched.
    root: CancelToken,
}

impl Scheduler {
    /// Creates a scheduler with the default [`Config`].
    pub fn new() -> Rc<Self> {
        Self::with_config(Config::default())
    }

    /// Creates a scheduler with an explicit [`Config`].
    pub fn with_config(config: Config) -> Rc<Self> {
        let watchdog = MemoryWatchdog::new(
            config.soft_limit_mb,
            config.mem_check_interval,
            config.gc_interval,
        );
        let logging = config.logging;
        let sched = Rc::new(Scheduler {
            queue: RefCell::new(VecDeque::new()),
            timeouts: RefCell::new(HashMap::new()),
            defers: RefCell::new(HashMap::new()),
            errors: RefCell::new(HashMap::new()),
            next_id: Cell::new(0),
            live: Cell::new(0),
            config: RefCell::new(config),
            watchdog,
            observers: RefCell::new(Vec::new()),
            logger: RefCell::new(None),
            root: CancelToken::new(),
        });
        sched.set_logging(logging);
        sched
    }

    /// The scheduler currently driving a run loop on this thread, if any.
    pub(crate) fn active() -> Option<Rc<Scheduler>> {
        ACTIVE.with(|a| a.borrow().last().cloned())
    }

    // ---- Spawning ----

    /// Enqueues a task, fire-and-forget. Failures are published as events
    /// and dropped.
    pub fn spawn<F>(&self, task: F) -> TaskId
    where
        F: Future<Output = Result<(), TaskError>> + 'static,
    {
        self.enqueue(false, |_| Box::pin(task) as TaskFuture).id
    }

    /// Enqueues the task produced by `factory`, handing it its
    /// [`CancelToken`].
    pub fn spawn_fn<F, Fut>(&self, factory: F) -> TaskId
    where
        F: FnOnce(CancelToken) -> Fut,
        Fut: Future<Output = Result<(), TaskError>> + 'static,
    {
        self.enqueue(false, |token| Box::pin(factory(token)) as TaskFuture)
            .id
    }

    /// Enqueues a task and returns a [`ResultHandle`] for its outcome.
    pub fn watch<T, F>(self: &Rc<Self>, task: F) -> ResultHandle<T>
    where
        T: 'static,
        F: Future<Output = Result<T, TaskError>> + 'static,
    {
        self.watch_fn(move |_| task)
    }

    /// [`watch`](Scheduler::watch) with a factory that receives the task's
    /// [`CancelToken`].
    pub fn watch_fn<T, F, Fut>(self: &Rc<Self>, factory: F) -> ResultHandle<T>
    where
        T: 'static,
        F: FnOnce(CancelToken) -> Fut,
        Fut: Future<Output = Result<T, TaskError>> + 'static,
    {
        let slot: Rc<RefCell<Option<T>>> = Rc::new(RefCell::new(None));
        let out = Rc::clone(&slot);
        let spawned = self.enqueue(true, move |token| {
            let body = factory(token);
            Box::pin(async move {
                let value = body.await?;
                *out.borrow_mut() = Some(value);
                Ok(())
            }) as TaskFuture
        });
        ResultHandle::new(spawned.id, spawned.done, slot, Rc::clone(self))
    }

    fn enqueue(&self, awaited: bool, make: impl FnOnce(CancelToken) -> TaskFuture) -> Spawned {
        let id = self.next_task_id();
        let token = self.root.child();
        let task = Rc::new(Task::new(id, make(token.clone()), awaited, token.clone()));
        let done = Rc::clone(&task.done);
        self.live.set(self.live.get() + 1);
        self.queue.borrow_mut().push_back(Entry::Task(task));
        self.publish(Event::now(EventKind::TaskSpawned).with_task(id));
        Spawned { id, done, token }
    }

    fn next_task_id(&self) -> TaskId {
        let id = self.next_id.get();
        self.next_id.set(id.wrapping_add(1));
        TaskId(id)
    }

    // ---- Composition ----

    /// Enqueues every task and drives the loop until the queue is empty.
    ///
    /// Tasks spawned by those tasks are awaited too. Pacing does not apply;
    /// `join` honors its run-to-completion contract.
    pub fn join<I, F>(self: &Rc<Self>, tasks: I) -> Result<(), RuntimeError>
    where
        I: IntoIterator<Item = F>,
        F: Future<Output = Result<(), TaskError>> + 'static,
    {
        for task in tasks {
            self.spawn(task);
        }
        self.run_loop(RunMode::UntilEmpty, false).map(|_| ())
    }

    /// Enqueues every task and drives the loop until the first of them
    /// terminates. Returns the winner's position.
    ///
    /// Losers stay in the queue (a subsequent `run()` completes them), but
    /// their [`CancelToken`]s are cancelled so cooperative tasks can exit at
    /// their next suspension point.
    pub fn select<I, F>(self: &Rc<Self>, tasks: I) -> Result<usize, RuntimeError>
    where
        I: IntoIterator<Item = F>,
        F: Future<Output = Result<(), TaskError>> + 'static,
    {
        let mut entrants: Vec<Spawned> = Vec::new();
        for task in tasks {
            entrants.push(self.enqueue(false, |_| Box::pin(task) as TaskFuture));
        }
        if entrants.is_empty() {
            return Err(RuntimeError::InvalidArgument {
                reason: "select requires at least one task".into(),
            });
        }

        let flags: Vec<Rc<Cell<bool>>> = entrants.iter().map(|s| Rc::clone(&s.done)).collect();
        let winner = self
            .run_loop(RunMode::UntilFirst(&flags), false)?
            .unwrap_or(0);

        for (i, entrant) in entrants.iter().enumerate() {
            if i != winner {
                entrant.token.cancel();
            }
        }
        Ok(winner)
    }

    /// Registers a periodic repeater: every `interval`, the factory's
    /// product is spawned as a fresh task.
    ///
    /// The repeater is re-enqueued on every encounter, so `run()` and `join`
    /// will not return on their own while it lives; stop it via the handle
    /// or tear the runtime down with [`cleanup`](Scheduler::cleanup). A zero
    /// interval never fires.
    pub fn repeat<F, Fut>(&self, mut factory: F, interval: Duration) -> RepeaterHandle
    where
        F: FnMut() -> Fut + 'static,
        Fut: Future<Output = Result<(), TaskError>> + 'static,
    {
        let rep = Rc::new(Repeater::new(
            Box::new(move || Box::pin(factory()) as TaskFuture),
            interval,
        ));
        self.queue
            .borrow_mut()
            .push_back(Entry::Repeater(Rc::clone(&rep)));
        RepeaterHandle::new(rep)
    }

    // ---- Driving ----

    /// Drives the loop until the queue is empty, the pacing cap is reached,
    /// or the memory watchdog trips.
    pub fn run(self: &Rc<Self>) -> Result<(), RuntimeError> {
        let paced = self.config.borrow().pacing_enabled;
        self.run_loop(RunMode::UntilEmpty, paced).map(|_| ())
    }

    fn run_loop(
        self: &Rc<Self>,
        mode: RunMode<'_>,
        paced: bool,
    ) -> Result<Option<usize>, RuntimeError> {
        ACTIVE.with(|a| a.borrow_mut().push(Rc::clone(self)));
        let outcome = self.drive(&mode, paced);
        ACTIVE.with(|a| {
            a.borrow_mut().pop();
        });
        outcome
    }

    fn drive(&self, mode: &RunMode<'_>, paced: bool) -> Result<Option<usize>, RuntimeError> {
        if let Some(winner) = Self::winner(mode) {
            return Ok(Some(winner));
        }

        let mut steps: usize = 0;

        loop {
            if !self.watchdog.check_memory_usage(|| self.collect()) {
                let rss_mb = memory::current_rss_mb().unwrap_or(0);
                let limit_mb = self.config.borrow().soft_limit_mb;
                self.publish(
                    Event::now(EventKind::MemorySoftLimit)
                        .with_error(format!("rss={rss_mb}MB limit={limit_mb}MB")),
                );
                return Err(RuntimeError::ResourceExhausted { rss_mb, limit_mb });
            }

            // Fill the running set from the queue head.
            let admit = self.config.borrow().max_concurrent.max(1);
            let mut running: VecDeque<Entry> = VecDeque::new();
            {
                let mut queue = self.queue.borrow_mut();
                while running.len() < admit {
                    match queue.pop_front() {
                        Some(entry) => running.push_back(entry),
                        None => break,
                    }
                }
            }
            if running.is_empty() {
                return Ok(None);
            }

            let mut finished: Vec<(TaskRef, Result<(), TaskError>)> = Vec::new();
            let mut progressed = false;
            let mut paused = false;

            while let Some(entry) = running.pop_front() {
                match entry {
                    Entry::Repeater(rep) => {
                        if rep.is_stopped() {
                            continue;
                        }
                        let now = Instant::now();
                        if rep.fireable(now) {
                            let body = rep.make_task();
                            let spawned = self.enqueue(false, move |_| body);
                            rep.mark_fired(now);
                            self.publish(
                                Event::now(EventKind::RepeaterFired).with_task(spawned.id),
                            );
                            progressed = true;
                        }
                        self.queue.borrow_mut().push_back(Entry::Repeater(rep));
                    }
                    Entry::Task(task) => {
                        if task.running.get() {
                            // Mid-step in an outer invocation; don't touch it.
                            self.queue.borrow_mut().push_back(Entry::Task(task));
                            continue;
                        }
                        steps += 1;
                        progressed = true;
                        if let Some(outcome) = self.step(&task) {
                            finished.push((task, outcome));
                        }
                        if paced && steps >= self.config.borrow().max_steps_per_run {
                            paused = true;
                            break;
                        }
                    }
                }
            }

            // Unstepped remainder goes back to the queue head, in order.
            {
                let mut queue = self.queue.borrow_mut();
                while let Some(entry) = running.pop_back() {
                    queue.push_front(entry);
                }
            }

            // Cleanup for this tick's terminated tasks, in termination order.
            for (task, outcome) in finished {
                self.finish(&task, outcome);
            }

            if let Some(winner) = Self::winner(mode) {
                return Ok(Some(winner));
            }
            if paused {
                self.publish(Event::now(EventKind::RunPaused).with_attempt(steps as u64));
                return Ok(None);
            }
            if !progressed {
                // Nothing but unfireable repeaters; don't spin hot.
                thread::yield_now();
            }
        }
    }

    fn winner(mode: &RunMode<'_>) -> Option<usize> {
        match mode {
            RunMode::UntilFirst(flags) => flags.iter().position(|f| f.get()),
            RunMode::UntilEmpty => None,
        }
    }

    /// One step: poll the task once, register the signal it yielded, check
    /// its deadline. Returns the terminal outcome, or `None` if the task was
    /// re-enqueued.
    fn step(&self, task: &TaskRef) -> Option<Result<(), TaskError>> {
        let id = task.id;
        task.running.set(true);
        let previous = signal::enter(CurrentTask {
            id,
            token: task.token.clone(),
        });
        let _ = signal::take_deposit();

        let waker = noop_waker();
        let mut cx = Context::from_waker(&waker);
        let polled = panic::catch_unwind(AssertUnwindSafe(|| task.poll(&mut cx)));

        let deposit = signal::take_deposit();
        signal::exit(previous);
        task.running.set(false);

        match deposit {
            Some(Signal::Timeout(deadline)) => {
                self.timeouts.borrow_mut().insert(id, deadline);
            }
            Some(Signal::Defer(action)) => {
                self.defers.borrow_mut().insert(id, action);
            }
            None => {}
        }

        match polled {
            Err(payload) => Some(Err(TaskError::Fail {
                reason: panic_reason(payload),
            })),
            Ok(Poll::Ready(outcome)) => Some(outcome),
            Ok(Poll::Pending) => {
                let expired = self
                    .timeouts
                    .borrow()
                    .get(&id)
                    .map(|d| (d.is_expired(Instant::now()), d.limit()));
                if let Some((true, limit)) = expired {
                    Some(Err(TaskError::Timeout { timeout: limit }))
                } else {
                    self.queue.borrow_mut().push_back(Entry::Task(Rc::clone(task)));
                    None
                }
            }
        }
    }

    /// Terminal bookkeeping, exactly once per task: run the deferred action,
    /// drop the side-table entries, route the outcome.
    fn finish(&self, task: &TaskRef, outcome: Result<(), TaskError>) {
        let id = task.id;

        let deferred = self.defers.borrow_mut().remove(&id);
        if let Some(action) = deferred {
            if let Some(body) = action.fire() {
                drive_blocking(body);
            }
            self.publish(Event::now(EventKind::DeferRan).with_task(id));
        }

        self.timeouts.borrow_mut().remove(&id);

        match outcome {
            Ok(()) => {
                self.publish(Event::now(EventKind::TaskCompleted).with_task(id));
            }
            Err(err) => {
                let kind = if matches!(err, TaskError::Timeout { .. }) {
                    EventKind::TimeoutHit
                } else {
                    EventKind::TaskFailed
                };
                self.publish(Event::now(kind).with_task(id).with_error(err.to_string()));
                if task.awaited.get() {
                    self.errors.borrow_mut().insert(id, err);
                }
                // Not awaited: the event above is all the reporting there is.
            }
        }

        self.live.set(self.live.get().saturating_sub(1));
        task.done.set(true);
    }

    // ---- Introspection & teardown ----

    /// Number of tasks spawned and not yet terminated.
    pub fn pending_tasks(&self) -> usize {
        self.live.get()
    }

    /// True when no tasks are queued or live. Repeaters keep the scheduler
    /// non-idle.
    pub fn is_idle(&self) -> bool {
        self.queue.borrow().is_empty() && self.live.get() == 0
    }

    /// Explicit teardown: empties the queue and every side table, then runs
    /// a collect pass. Pending tasks and repeaters are discarded without
    /// cleanup; pending deferred actions do not run. Idempotent.
    pub fn cleanup(&self) {
        self.publish(Event::now(EventKind::CleanupRequested));
        self.queue.borrow_mut().clear();
        self.timeouts.borrow_mut().clear();
        self.defers.borrow_mut().clear();
        self.errors.borrow_mut().clear();
        self.live.set(0);
        self.force_collect();
    }

    /// Shrinks queue and side-table allocations back to occupancy.
    pub(crate) fn collect(&self) {
        self.queue.borrow_mut().shrink_to_fit();
        self.timeouts.borrow_mut().shrink_to_fit();
        self.defers.borrow_mut().shrink_to_fit();
        self.errors.borrow_mut().shrink_to_fit();
    }

    /// Advisory collection, throttled by the watchdog's gc interval.
    pub fn collect_garbage(&self) {
        self.watchdog.collect_garbage(|| self.collect());
    }

    /// Unconditional collect pass.
    pub fn force_collect(&self) {
        self.watchdog.force_collect(|| self.collect());
    }

    pub(crate) fn take_error(&self, id: TaskId) -> Option<TaskError> {
        self.errors.borrow_mut().remove(&id)
    }

    // ---- Configuration ----

    /// Caps how many task steps a single `run()` call may execute.
    pub fn set_max_steps_per_run(&self, steps: usize) -> Result<(), RuntimeError> {
        if steps == 0 {
            return Err(RuntimeError::InvalidArgument {
                reason: "max_steps_per_run must be positive".into(),
            });
        }
        self.config.borrow_mut().max_steps_per_run = steps;
        Ok(())
    }

    /// Enables or disables the per-run step cap.
    pub fn set_pacing_enabled(&self, enabled: bool) {
        self.config.borrow_mut().pacing_enabled = enabled;
    }

    /// Caps how many tasks enter the running set per tick.
    pub fn set_max_concurrent(&self, limit: usize) -> Result<(), RuntimeError> {
        if limit == 0 {
            return Err(RuntimeError::InvalidArgument {
                reason: "max_concurrent must be positive".into(),
            });
        }
        self.config.borrow_mut().max_concurrent = limit;
        Ok(())
    }

    /// Attaches or detaches the built-in [`LogWriter`] observer.
    pub fn set_logging(&self, enabled: bool) {
        self.config.borrow_mut().logging = enabled;
        let mut logger = self.logger.borrow_mut();
        if enabled {
            if logger.is_none() {
                *logger = Some(Rc::new(LogWriter));
            }
        } else {
            *logger = None;
        }
    }

    /// Updates the memory watchdog's soft limit. Zero disables it.
    pub fn set_soft_limit_mb(&self, mb: u64) {
        self.config.borrow_mut().soft_limit_mb = mb;
        self.watchdog.set_soft_limit_mb(mb);
    }

    /// Registers an observer for lifecycle events.
    pub fn add_observer(&self, observer: Rc<dyn Observer>) {
        self.observers.borrow_mut().push(observer);
    }

    /// Snapshot of the current configuration.
    pub fn config(&self) -> Config {
        self.config.borrow().clone()
    }

    /// Fans an event out to the logger and every observer. Panics inside an
    /// observer are caught and reported so they cannot take down the loop.
    pub(crate) fn publish(&self, event: Event) {
        let logger = self.logger.borrow().clone();
        if let Some(log) = logger {
            log.on_event(&event);
        }
        let observers: Vec<Rc<dyn Observer>> = self.observers.borrow().iter().cloned().collect();
        for observer in observers {
            if let Err(payload) =
                panic::catch_unwind(AssertUnwindSafe(|| observer.on_event(&event)))
            {
                eprintln!("[strand] observer panicked: {}", panic_reason(payload));
            }
        }
    }
}

/// Drives a deferred follow-up task to completion synchronously. Its own
/// suspensions are ignored, so it cannot delay other tasks; signals it
/// deposits are discarded.
fn drive_blocking(mut body: TaskFuture) {
    let waker = noop_waker();
    let mut cx = Context::from_waker(&waker);
    loop {
        let _ = signal::take_deposit();
        match body.as_mut().poll(&mut cx) {
            Poll::Ready(_) => {
                let _ = signal::take_deposit();
                return;
            }
            Poll::Pending => thread::yield_now(),
        }
    }
}

fn panic_reason(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "task panicked".to_string()
    }
}

// ---- Process-wide default instance ----

/// The thread's default scheduler.
///
/// The free functions below delegate to it; explicit [`Scheduler`] instances
/// behave identically.
pub fn runtime() -> Rc<Scheduler> {
    RUNTIME.with(Rc::clone)
}

/// Fire-and-forget a task on the default scheduler.
pub fn spawn<F>(task: F) -> TaskId
where
    F: Future<Output = Result<(), TaskError>> + 'static,
{
    runtime().spawn(task)
}

/// [`spawn`] with a factory that receives the task's [`CancelToken`].
pub fn spawn_fn<F, Fut>(factory: F) -> TaskId
where
    F: FnOnce(CancelToken) -> Fut,
    Fut: Future<Output = Result<(), TaskError>> + 'static,
{
    runtime().spawn_fn(factory)
}

/// Enqueue a task and get a [`ResultHandle`] for its outcome.
pub fn watch<T, F>(task: F) -> ResultHandle<T>
where
    T: 'static,
    F: Future<Output = Result<T, TaskError>> + 'static,
{
    runtime().watch(task)
}

/// [`watch`] with a factory that receives the task's [`CancelToken`].
pub fn watch_fn<T, F, Fut>(factory: F) -> ResultHandle<T>
where
    T: 'static,
    F: FnOnce(CancelToken) -> Fut,
    Fut: Future<Output = Result<T, TaskError>> + 'static,
{
    runtime().watch_fn(factory)
}

/// Run all given tasks (and everything they spawn) to completion.
pub fn join<I, F>(tasks: I) -> Result<(), RuntimeError>
where
    I: IntoIterator<Item = F>,
    F: Future<Output = Result<(), TaskError>> + 'static,
{
    runtime().join(tasks)
}

/// Run until the first of the given tasks terminates; returns its position.
pub fn select<I, F>(tasks: I) -> Result<usize, RuntimeError>
where
    I: IntoIterator<Item = F>,
    F: Future<Output = Result<(), TaskError>> + 'static,
{
    runtime().select(tasks)
}

/// Register a periodic repeater on the default scheduler.
pub fn repeat<F, Fut>(factory: F, interval: Duration) -> RepeaterHandle
where
    F: FnMut() -> Fut + 'static,
    Fut: Future<Output = Result<(), TaskError>> + 'static,
{
    runtime().repeat(factory, interval)
}

/// Drive the default scheduler until its queue is empty (or pacing or the
/// memory watchdog end the call early).
pub fn run() -> Result<(), RuntimeError> {
    runtime().run()
}

/// Tear down the default scheduler: empty the queue and side tables.
pub fn cleanup() {
    runtime().cleanup()
}

/// Caps how many task steps a single `run()` call may execute.
pub fn set_max_steps_per_run(steps: usize) -> Result<(), RuntimeError> {
    runtime().set_max_steps_per_run(steps)
}

/// Enables or disables the per-run step cap.
pub fn set_pacing_enabled(enabled: bool) {
    runtime().set_pacing_enabled(enabled)
}

/// Caps how many tasks enter the running set per tick.
pub fn set_max_concurrent(limit: usize) -> Result<(), RuntimeError> {
    runtime().set_max_concurrent(limit)
}

/// Attaches or detaches the built-in log observer.
pub fn set_logging(enabled: bool) {
    runtime().set_logging(enabled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::defer::defer;
    use crate::signal::yield_now;
    use crate::sleep::sleep;
    use crate::timeout::timeout;

    #[test]
    fn identity_wraps_at_platform_maximum() {
        let sched = Scheduler::new();
        sched.next_id.set(u64::MAX);
        let a = sched.spawn(async { Ok(()) });
        let b = sched.spawn(async { Ok(()) });
        assert_eq!(a, TaskId(u64::MAX));
        assert_eq!(b, TaskId(0));
        sched.run().unwrap();
    }

    #[test]
    fn fifo_within_a_tick() {
        let sched = Scheduler::new();
        let order: Rc<RefCell<Vec<&'static str>>> = Rc::new(RefCell::new(Vec::new()));

        let o = Rc::clone(&order);
        sched.spawn(async move {
            o.borrow_mut().push("a1");
            yield_now().await;
            o.borrow_mut().push("a2");
            Ok(())
        });
        let o = Rc::clone(&order);
        sched.spawn(async move {
            o.borrow_mut().push("b1");
            yield_now().await;
            o.borrow_mut().push("b2");
            Ok(())
        });

        sched.run().unwrap();
        assert_eq!(*order.borrow(), vec!["a1", "b1", "a2", "b2"]);
    }

    #[test]
    fn later_timeout_replaces_earlier() {
        let sched = Scheduler::new();
        sched.set_pacing_enabled(true);
        sched.set_max_steps_per_run(1).unwrap();

        let id = sched.spawn(async {
            timeout(Duration::from_secs(500)).await;
            timeout(Duration::from_secs(900)).await;
            sleep(Duration::from_millis(5)).await;
            Ok(())
        });

        sched.run().unwrap();
        let first = sched.timeouts.borrow().get(&id).map(|d| d.limit());
        assert_eq!(first, Some(Duration::from_secs(500)));

        sched.run().unwrap();
        let second = sched.timeouts.borrow().get(&id).map(|d| d.limit());
        assert_eq!(second, Some(Duration::from_secs(900)));

        sched.set_pacing_enabled(false);
        sched.run().unwrap();
        assert!(sched.timeouts.borrow().is_empty());
    }

    #[test]
    fn side_tables_are_empty_after_termination() {
        let sched = Scheduler::new();
        sched.spawn(async {
            defer(|| {}).await;
            timeout(Duration::from_secs(500)).await;
            Ok(())
        });
        sched.run().unwrap();
        assert!(sched.timeouts.borrow().is_empty());
        assert!(sched.defers.borrow().is_empty());
        assert!(sched.errors.borrow().is_empty());
        assert!(sched.is_idle());
    }

    #[test]
    fn cleanup_is_idempotent() {
        let sched = Scheduler::new();
        sched.spawn(async {
            sleep(Duration::from_secs(500)).await;
            Ok(())
        });
        sched.repeat(|| async { Ok(()) }, Duration::from_secs(1));

        sched.cleanup();
        let once = (
            sched.queue.borrow().len(),
            sched.live.get(),
            sched.errors.borrow().len(),
        );
        sched.cleanup();
        let twice = (
            sched.queue.borrow().len(),
            sched.live.get(),
            sched.errors.borrow().len(),
        );
        assert_eq!(once, twice);
        assert_eq!(once, (0, 0, 0));
    }

    #[test]
    fn admission_limits_tasks_per_tick() {
        let sched = Scheduler::new();
        sched.set_max_concurrent(1).unwrap();
        let order: Rc<RefCell<Vec<&'static str>>> = Rc::new(RefCell::new(Vec::new()));

        let o = Rc::clone(&order);
        sched.spawn(async move {
            o.borrow_mut().push("a");
            yield_now().await;
            o.borrow_mut().push("a");
            Ok(())
        });
        let o = Rc::clone(&order);
        sched.spawn(async move {
            o.borrow_mut().push("b");
            yield_now().await;
            o.borrow_mut().push("b");
            Ok(())
        });

        sched.run().unwrap();
        // One task per tick: a, then b, then a again, then b.
        assert_eq!(*order.borrow(), vec!["a", "b", "a", "b"]);
    }

    #[test]
    fn rejects_zero_pacing_values() {
        let sched = Scheduler::new();
        assert!(sched.set_max_steps_per_run(0).is_err());
        assert!(sched.set_max_concurrent(0).is_err());
    }

    #[test]
    fn panicking_task_fails_without_poisoning_the_loop() {
        let sched = Scheduler::new();
        let ran: Rc<Cell<bool>> = Rc::new(Cell::new(false));

        sched.spawn(async { panic!("boom") });
        let r = Rc::clone(&ran);
        sched.spawn(async move {
            r.set(true);
            Ok(())
        });

        sched.run().unwrap();
        assert!(ran.get());
        assert!(sched.is_idle());
    }
}
