//! # Deadline tracking.
//!
//! Yielding a timeout asks the scheduler to fail the task if it is still
//! running once the deadline passes. The deadline is fixed at construction;
//! expiry is checked after every subsequent step of the owning task, so it is
//! observed at most one step after it becomes true.
//!
//! A task that registers a second timeout replaces the first: the side table
//! holds at most one deadline per task.
//!
//! # Example
//! ```no_run
//! use std::time::Duration;
//! use strand::{spawn, run, sleep, timeout};
//!
//! spawn(async {
//!     // Fail this task if it runs longer than two seconds.
//!     timeout(Duration::from_secs(2)).await;
//!     sleep(Duration::from_secs(5)).await;
//!     Ok(())
//! });
//! run().unwrap();
//! ```

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::{Duration, Instant};

use crate::signal::{self, Signal};

/// A deadline registered with the scheduler.
///
/// `Duration::ZERO` means "never expires".
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    at: Option<Instant>,
    limit: Duration,
}

impl Deadline {
    /// Creates a deadline `limit` from now. Zero means never.
    pub fn after(limit: Duration) -> Self {
        let at = if limit > Duration::ZERO {
            Some(Instant::now() + limit)
        } else {
            None
        };
        Deadline { at, limit }
    }

    /// Pure check: has the deadline passed at `now`?
    pub fn is_expired(&self, now: Instant) -> bool {
        matches!(self.at, Some(at) if now >= at)
    }

    /// The duration the deadline was constructed with.
    pub fn limit(&self) -> Duration {
        self.limit
    }
}

/// Registers a deadline for the current task.
///
/// The returned future suspends exactly once; the scheduler records the
/// deadline when it processes the yield. A zero duration registers a deadline
/// that never expires (useful to clear a previously registered one).
pub fn timeout(limit: Duration) -> Timeout {
    Timeout {
        deadline: Some(Deadline::after(limit)),
    }
}

/// Future returned by [`timeout`].
#[derive(Debug)]
pub struct Timeout {
    deadline: Option<Deadline>,
}

impl Future for Timeout {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, _: &mut Context<'_>) -> Poll<Self::Output> {
        match self.deadline.take() {
            Some(deadline) => {
                signal::deposit(Signal::Timeout(deadline));
                Poll::Pending
            }
            None => Poll::Ready(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_never_expires() {
        let d = Deadline::after(Duration::ZERO);
        assert!(!d.is_expired(Instant::now() + Duration::from_secs(3600)));
    }

    #[test]
    fn expiry_is_a_pure_function_of_now() {
        let d = Deadline::after(Duration::from_millis(10));
        let now = Instant::now();
        assert!(!d.is_expired(now));
        assert!(d.is_expired(now + Duration::from_millis(20)));
    }
}
