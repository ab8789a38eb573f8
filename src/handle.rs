//! # Result handles.
//!
//! [`ResultHandle`] is the awaiter's view of a task spawned with
//! [`watch`](crate::watch): a typed slot for the return value plus the right
//! to read the task's terminal error exactly once.
//!
//! Inside another task, the handle is a future: awaiting it suspends until
//! the watched task terminates. Outside the runtime, the synchronous surface
//! ([`wait`](ResultHandle::wait), [`unwrap`](ResultHandle::unwrap),
//! [`unwrap_or`](ResultHandle::unwrap_or), [`expect`](ResultHandle::expect))
//! drives the run loop itself until the task is done.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll};

use crate::error::TaskError;
use crate::scheduler::Scheduler;
use crate::task::TaskId;

/// Awaiter's handle to a watched task.
///
/// Dropping the handle abandons the result; the watched task keeps running.
pub struct ResultHandle<T> {
    id: TaskId,
    done: Rc<Cell<bool>>,
    slot: Rc<RefCell<Option<T>>>,
    sched: Rc<Scheduler>,
}

impl<T> ResultHandle<T> {
    pub(crate) fn new(
        id: TaskId,
        done: Rc<Cell<bool>>,
        slot: Rc<RefCell<Option<T>>>,
        sched: Rc<Scheduler>,
    ) -> Self {
        ResultHandle {
            id,
            done,
            slot,
            sched,
        }
    }

    /// Identity of the watched task.
    pub fn task_id(&self) -> TaskId {
        self.id
    }

    /// Whether the watched task has terminated.
    pub fn is_done(&self) -> bool {
        self.done.get()
    }

    /// Drives the run loop until the watched task terminates, then returns
    /// its value or error.
    ///
    /// Returns `TaskError::Canceled` if the task was discarded by
    /// `cleanup()` before terminating.
    ///
    /// This is the entry-point surface: call it from outside the runtime.
    /// Inside a task, await the handle instead; a synchronous wait there
    /// can deadlock on work that has not been flushed yet.
    pub fn wait(self) -> Result<T, TaskError> {
        loop {
            if self.done.get() {
                return self.resolve();
            }
            if self.sched.is_idle() {
                return Err(TaskError::Canceled);
            }
            self.sched.run().map_err(TaskError::from)?;
        }
    }

    /// [`wait`](ResultHandle::wait), panicking on failure.
    pub fn unwrap(self) -> T {
        match self.wait() {
            Ok(value) => value,
            Err(e) => panic!("called `ResultHandle::unwrap()` on a failed task: {e}"),
        }
    }

    /// [`wait`](ResultHandle::wait), falling back to `default` on failure.
    pub fn unwrap_or(self, default: T) -> T {
        self.wait().unwrap_or(default)
    }

    /// [`wait`](ResultHandle::wait), panicking with `message` and the
    /// original cause on failure.
    pub fn expect(self, message: &str) -> T {
        match self.wait() {
            Ok(value) => value,
            Err(e) => panic!("{message}: {e}"),
        }
    }

    fn resolve(&self) -> Result<T, TaskError> {
        if let Some(value) = self.slot.borrow_mut().take() {
            return Ok(value);
        }
        match self.sched.take_error(self.id) {
            Some(err) => Err(err),
            None => Err(TaskError::Fail {
                reason: "task result already consumed".into(),
            }),
        }
    }
}

impl<T> fmt::Debug for ResultHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResultHandle")
            .field("task", &self.id)
            .field("done", &self.done.get())
            .finish_non_exhaustive()
    }
}

impl<T> Future for ResultHandle<T> {
    type Output = Result<T, TaskError>;

    fn poll(self: Pin<&mut Self>, _: &mut Context<'_>) -> Poll<Self::Output> {
        if self.done.get() {
            Poll::Ready(self.resolve())
        } else {
            Poll::Pending
        }
    }
}

impl<T> Drop for ResultHandle<T> {
    fn drop(&mut self) {
        // Discard an unread terminal error so the side table does not hold
        // entries for abandoned handles.
        if self.done.get() {
            let _ = self.sched.take_error(self.id);
        }
    }
}
