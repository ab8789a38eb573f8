//! # Cooperative cancellation.
//!
//! Every task owns a [`CancelToken`], a child of the scheduler's root token.
//! Cancellation is observable, never forced: a task that ignores its token
//! keeps running. Tokens form a chain; cancelling a parent is visible to all
//! of its children.
//!
//! Inside a task body the current token is reachable via
//! [`current_token`](crate::current_token).

use std::cell::Cell;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll};

#[derive(Debug)]
struct Inner {
    flag: Cell<bool>,
    parent: Option<Rc<Inner>>,
}

impl Inner {
    fn is_cancelled(&self) -> bool {
        if self.flag.get() {
            return true;
        }
        match &self.parent {
            Some(p) => p.is_cancelled(),
            None => false,
        }
    }
}

/// Cancellation token shared between the scheduler and a task.
///
/// Tasks should check [`is_cancelled`](CancelToken::is_cancelled) at their
/// suspension points (or await [`cancelled`](CancelToken::cancelled)) and exit
/// promptly when it reports true.
#[derive(Clone, Debug)]
pub struct CancelToken {
    inner: Rc<Inner>,
}

impl CancelToken {
    /// Creates a new root token.
    pub fn new() -> Self {
        Self {
            inner: Rc::new(Inner {
                flag: Cell::new(false),
                parent: None,
            }),
        }
    }

    /// Creates a child token. Cancelling `self` cancels the child;
    /// cancelling the child does not affect `self`.
    pub fn child(&self) -> Self {
        Self {
            inner: Rc::new(Inner {
                flag: Cell::new(false),
                parent: Some(Rc::clone(&self.inner)),
            }),
        }
    }

    /// Sets the cancellation flag.
    pub fn cancel(&self) {
        self.inner.flag.set(true);
    }

    /// Checks whether this token or any of its ancestors was cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.inner.is_cancelled()
    }

    /// Suspends until the token is cancelled.
    pub fn cancelled(&self) -> Cancelled {
        Cancelled {
            token: self.clone(),
        }
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

/// Future returned by [`CancelToken::cancelled`].
#[derive(Debug)]
pub struct Cancelled {
    token: CancelToken,
}

impl Future for Cancelled {
    type Output = ();

    fn poll(self: Pin<&mut Self>, _: &mut Context<'_>) -> Poll<Self::Output> {
        if self.token.is_cancelled() {
            Poll::Ready(())
        } else {
            Poll::Pending
        }
    }
}
