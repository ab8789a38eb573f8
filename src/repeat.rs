//! # Periodic repeaters.
//!
//! A repeater pairs a task factory with an interval. It lives in the
//! scheduler queue alongside tasks; each time the run loop encounters it and
//! the interval has elapsed, the factory is invoked and its product is
//! spawned as a fresh task. The repeater itself is re-enqueued every time,
//! so it lives until it is stopped or the runtime is torn down with
//! `cleanup()`.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;
use std::time::{Duration, Instant};

use crate::task::TaskFuture;

pub(crate) type TaskFactory = Box<dyn FnMut() -> TaskFuture>;

/// Internal repeater record: factory, interval, last-fire timestamp.
pub(crate) struct Repeater {
    factory: RefCell<TaskFactory>,
    interval: Duration,
    last_fire: Cell<Instant>,
    stopped: Cell<bool>,
    fired: Cell<u64>,
}

impl Repeater {
    pub(crate) fn new(factory: TaskFactory, interval: Duration) -> Self {
        Repeater {
            factory: RefCell::new(factory),
            interval,
            last_fire: Cell::new(Instant::now()),
            stopped: Cell::new(false),
            fired: Cell::new(0),
        }
    }

    /// A repeater fires when its interval is positive and has elapsed.
    pub(crate) fn fireable(&self, now: Instant) -> bool {
        self.interval > Duration::ZERO && now.duration_since(self.last_fire.get()) >= self.interval
    }

    pub(crate) fn make_task(&self) -> TaskFuture {
        (self.factory.borrow_mut())()
    }

    pub(crate) fn mark_fired(&self, now: Instant) {
        self.last_fire.set(now);
        self.fired.set(self.fired.get() + 1);
    }

    pub(crate) fn is_stopped(&self) -> bool {
        self.stopped.get()
    }
}

impl fmt::Debug for Repeater {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Repeater")
            .field("interval", &self.interval)
            .field("stopped", &self.stopped.get())
            .field("fired", &self.fired.get())
            .finish_non_exhaustive()
    }
}

/// Handle to a live repeater.
///
/// Returned by [`repeat`](crate::repeat). Dropping the handle does not stop
/// the repeater; call [`stop`](RepeaterHandle::stop).
#[derive(Clone, Debug)]
pub struct RepeaterHandle {
    inner: Rc<Repeater>,
}

impl RepeaterHandle {
    pub(crate) fn new(inner: Rc<Repeater>) -> Self {
        RepeaterHandle { inner }
    }

    /// Restarts the interval from now without firing.
    pub fn reset_time(&self) {
        self.inner.last_fire.set(Instant::now());
    }

    /// Stops the repeater; it is dropped the next time the run loop
    /// encounters it.
    pub fn stop(&self) {
        self.inner.stopped.set(true);
    }

    /// How many times the repeater has fired so far.
    pub fn fired_count(&self) -> u64 {
        self.inner.fired.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_interval_never_fires() {
        let rep = Repeater::new(Box::new(|| Box::pin(async { Ok(()) })), Duration::ZERO);
        assert!(!rep.fireable(Instant::now() + Duration::from_secs(3600)));
    }

    #[test]
    fn fires_after_interval_elapses() {
        let rep = Repeater::new(
            Box::new(|| Box::pin(async { Ok(()) })),
            Duration::from_millis(10),
        );
        let now = Instant::now();
        assert!(!rep.fireable(now));
        assert!(rep.fireable(now + Duration::from_millis(10)));

        rep.mark_fired(now + Duration::from_millis(10));
        assert!(!rep.fireable(now + Duration::from_millis(15)));
        assert!(rep.fireable(now + Duration::from_millis(20)));
        assert_eq!(rep.fired.get(), 1);
    }
}
