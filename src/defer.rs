//! # Deferred actions.
//!
//! Yielding a [`Defer`] asks the scheduler to run a closure when the owning
//! task terminates, whether it returned, failed, or timed out. The closure
//! runs exactly once. A task that registers a second defer replaces the
//! first.
//!
//! A deferred action may itself be a task ([`defer_task`]); the scheduler
//! drives it to completion synchronously during cleanup. Its own suspensions
//! are ignored, so it cannot delay other tasks. Keep deferred work short.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use crate::error::TaskError;
use crate::signal::{self, Signal};
use crate::task::TaskFuture;

type DeferFn = Box<dyn FnOnce() -> Option<TaskFuture>>;

/// A deferred action captured for the owning task's cleanup.
///
/// Arguments ride in the closure capture.
pub struct Defer {
    action: DeferFn,
}

impl Defer {
    /// Wraps a plain closure.
    pub fn new<F>(action: F) -> Self
    where
        F: FnOnce() + 'static,
    {
        Defer {
            action: Box::new(move || {
                action();
                None
            }),
        }
    }

    /// Wraps a closure that produces a task to drive synchronously.
    pub fn task<F, Fut>(action: F) -> Self
    where
        F: FnOnce() -> Fut + 'static,
        Fut: Future<Output = Result<(), TaskError>> + 'static,
    {
        Defer {
            action: Box::new(move || Some(Box::pin(action()) as TaskFuture)),
        }
    }

    /// Consumes the defer, running the closure. Returns a follow-up task the
    /// scheduler must drive to completion before finishing cleanup.
    pub(crate) fn fire(self) -> Option<TaskFuture> {
        (self.action)()
    }
}

impl fmt::Debug for Defer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Defer").finish_non_exhaustive()
    }
}

/// Registers a deferred closure for the current task.
///
/// The returned future suspends exactly once; the scheduler records the
/// action when it processes the yield.
pub fn defer<F>(action: F) -> DeferRegistration
where
    F: FnOnce() + 'static,
{
    DeferRegistration {
        pending: Some(Defer::new(action)),
    }
}

/// Registers a deferred task-producing closure for the current task.
///
/// The produced task is driven to completion synchronously at cleanup.
pub fn defer_task<F, Fut>(action: F) -> DeferRegistration
where
    F: FnOnce() -> Fut + 'static,
    Fut: Future<Output = Result<(), TaskError>> + 'static,
{
    DeferRegistration {
        pending: Some(Defer::task(action)),
    }
}

/// Future returned by [`defer`] and [`defer_task`].
#[derive(Debug)]
pub struct DeferRegistration {
    pending: Option<Defer>,
}

impl Future for DeferRegistration {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, _: &mut Context<'_>) -> Poll<Self::Output> {
        match self.pending.take() {
            Some(d) => {
                signal::deposit(Signal::Defer(d));
                Poll::Pending
            }
            None => Poll::Ready(()),
        }
    }
}
