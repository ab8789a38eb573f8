//! # Yield signals and the current-task context.
//!
//! Between steps a task may hand the scheduler a [`Signal`]: a timeout to
//! track, or an action to defer until the task ends. The suspension futures
//! ([`timeout`](crate::timeout()), [`defer`](crate::defer())) deposit their
//! signal into a thread-local slot during the poll; the scheduler drains the
//! slot right after the step. Any other suspension is a plain "resume me
//! later" yield and deposits nothing.

use std::cell::RefCell;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use crate::cancel::CancelToken;
use crate::defer::Defer;
use crate::task::TaskId;
use crate::timeout::Deadline;

/// What a task can hand the scheduler when it suspends.
#[derive(Debug)]
pub(crate) enum Signal {
    /// Track a deadline; fail the task once it passes.
    Timeout(Deadline),
    /// Run this action when the task terminates.
    Defer(Defer),
}

#[derive(Clone, Debug)]
pub(crate) struct CurrentTask {
    pub(crate) id: TaskId,
    pub(crate) token: CancelToken,
}

thread_local! {
    /// The task whose step is currently executing, if any.
    static CURRENT: RefCell<Option<CurrentTask>> = const { RefCell::new(None) };
    /// Signal deposited by a suspension future during the current step.
    static DEPOSIT: RefCell<Option<Signal>> = const { RefCell::new(None) };
}

/// Installs `current` for the duration of a step, returning the previous
/// occupant so nested run-loop invocations restore it.
pub(crate) fn enter(current: CurrentTask) -> Option<CurrentTask> {
    CURRENT.with(|c| c.borrow_mut().replace(current))
}

pub(crate) fn exit(previous: Option<CurrentTask>) {
    CURRENT.with(|c| *c.borrow_mut() = previous);
}

/// Deposits a signal for the scheduler to register after this step.
/// A second deposit in the same step replaces the first.
pub(crate) fn deposit(signal: Signal) {
    DEPOSIT.with(|d| *d.borrow_mut() = Some(signal));
}

pub(crate) fn take_deposit() -> Option<Signal> {
    DEPOSIT.with(|d| d.borrow_mut().take())
}

/// Identity of the task currently being stepped, if any.
pub fn current_task_id() -> Option<TaskId> {
    CURRENT.with(|c| c.borrow().as_ref().map(|t| t.id))
}

/// Cancellation token of the task currently being stepped, if any.
///
/// Returns `None` outside of a task step.
pub fn current_token() -> Option<CancelToken> {
    CURRENT.with(|c| c.borrow().as_ref().map(|t| t.token.clone()))
}

/// Suspends the current task exactly once.
///
/// The scheduler treats the yield as an opaque "I'm alive, resume me later"
/// signal and re-enqueues the task at the tail of the queue.
pub fn yield_now() -> YieldNow {
    YieldNow { yielded: false }
}

/// Future returned by [`yield_now`].
#[derive(Debug)]
pub struct YieldNow {
    yielded: bool,
}

impl Future for YieldNow {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, _: &mut Context<'_>) -> Poll<Self::Output> {
        if self.yielded {
            Poll::Ready(())
        } else {
            self.yielded = true;
            Poll::Pending
        }
    }
}
