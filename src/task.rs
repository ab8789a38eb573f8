//! # Task records.
//!
//! A task is a resumable computation (a type-erased future) plus the
//! bookkeeping the scheduler needs: an identity, an awaited flag, a
//! re-entrancy guard, and a completion flag shared with any
//! [`ResultHandle`](crate::ResultHandle).

use std::cell::{Cell, RefCell};
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll};
use std::time::Instant;

use crate::cancel::CancelToken;
use crate::error::TaskError;

/// Type-erased task body. Single-threaded, so no `Send` bound.
pub type TaskFuture = Pin<Box<dyn Future<Output = Result<(), TaskError>>>>;

/// Unique identifier for a task.
///
/// Assigned from a monotonic counter that wraps at `u64::MAX` back to zero.
/// Unique among *live* tasks; reuse after wraparound is fine because every
/// per-id side-table entry is deleted at task completion.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct TaskId(pub(crate) u64);

impl TaskId {
    /// Raw numeric value, for logs and events.
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Shared handle to a task record for single-threaded contexts.
pub(crate) type TaskRef = Rc<Task>;

/// A unit of execution managed by the scheduler.
pub(crate) struct Task {
    /// Uniquely identifies the task among live tasks.
    pub(crate) id: TaskId,
    /// Pinned, heap-allocated, type-erased future.
    future: RefCell<TaskFuture>,
    /// True if an outer caller holds a `ResultHandle` for this task.
    pub(crate) awaited: Cell<bool>,
    /// True only while the task's step is executing (re-entrancy guard).
    pub(crate) running: Cell<bool>,
    /// Set by the scheduler at cleanup; observed by `ResultHandle`.
    pub(crate) done: Rc<Cell<bool>>,
    /// Cancellation token, child of the scheduler root.
    pub(crate) token: CancelToken,
    /// Birth timestamp.
    pub(crate) spawned_at: Instant,
}

impl Task {
    pub(crate) fn new(id: TaskId, future: TaskFuture, awaited: bool, token: CancelToken) -> Self {
        Task {
            id,
            future: RefCell::new(future),
            awaited: Cell::new(awaited),
            running: Cell::new(false),
            done: Rc::new(Cell::new(false)),
            token,
            spawned_at: Instant::now(),
        }
    }

    /// Polls the inner future once.
    pub(crate) fn poll(&self, cx: &mut Context<'_>) -> Poll<Result<(), TaskError>> {
        self.future.borrow_mut().as_mut().poll(cx)
    }
}

impl Task {
    /// How long the task has been alive.
    pub(crate) fn age(&self) -> std::time::Duration {
        self.spawned_at.elapsed()
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("id", &self.id)
            .field("awaited", &self.awaited)
            .field("running", &self.running)
            .field("done", &self.done.get())
            .field("age", &self.age())
            .finish()
    }
}
