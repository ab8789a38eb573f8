//! # Runtime events emitted by the scheduler.
//!
//! The [`EventKind`] enum classifies event types across three categories:
//! - **Lifecycle events**: task execution flow (spawned, completed, failed,
//!   timeout, deferred cleanup)
//! - **Scheduling events**: pacing and repeaters (run paused, repeater fired,
//!   backoff scheduled)
//! - **Runtime events**: watchdog and teardown (memory soft limit, cleanup)
//!
//! The [`Event`] struct carries optional metadata such as the task id, error
//! messages, attempt counts, and delays.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases
//! monotonically, so observers can order events even if they buffer them.
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use strand::{Event, EventKind};
//!
//! let ev = Event::now(EventKind::TaskFailed)
//!     .with_error("boom")
//!     .with_attempt(3)
//!     .with_delay(Duration::from_secs(5));
//!
//! assert_eq!(ev.kind, EventKind::TaskFailed);
//! assert_eq!(ev.error.as_deref(), Some("boom"));
//! ```

use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::{Duration, SystemTime};

use crate::task::TaskId;

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of runtime events.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Task lifecycle events ===
    /// Task entered the queue.
    TaskSpawned,
    /// Task returned normally.
    TaskCompleted,
    /// Task failed with an error.
    TaskFailed,
    /// Task exceeded its registered deadline.
    TimeoutHit,
    /// Task's deferred action ran during cleanup.
    DeferRan,

    // === Scheduling events ===
    /// A `run()` call returned early because the pacing cap was reached.
    RunPaused,
    /// A repeater's interval elapsed and a fresh task was spawned.
    RepeaterFired,
    /// A retry block scheduled a delay before its next attempt.
    BackoffScheduled,

    // === Runtime events ===
    /// The memory watchdog stopped the run loop.
    MemorySoftLimit,
    /// Explicit teardown was requested.
    CleanupRequested,
}

/// Runtime event with optional metadata.
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp (may go backwards, use for logging only).
    pub at: SystemTime,
    /// The kind of event.
    pub kind: EventKind,
    /// Id of the task involved, if applicable.
    pub task: Option<TaskId>,
    /// Error message, if the event represents a failure.
    pub error: Option<String>,
    /// Attempt count (starting from 1), for retry events.
    pub attempt: Option<u64>,
    /// Backoff delay before the next attempt, if relevant.
    pub delay: Option<Duration>,
}

impl Event {
    /// Creates a new event of the given kind with the current timestamp and
    /// next sequence number.
    pub fn now(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            task: None,
            error: None,
            attempt: None,
            delay: None,
        }
    }

    /// Attaches a task id.
    pub fn with_task(mut self, id: TaskId) -> Self {
        self.task = Some(id);
        self
    }

    /// Attaches an error message.
    pub fn with_error(mut self, msg: impl Into<String>) -> Self {
        self.error = Some(msg.into());
        self
    }

    /// Attaches an attempt count.
    pub fn with_attempt(mut self, n: u64) -> Self {
        self.attempt = Some(n);
        self
    }

    /// Attaches a backoff delay.
    pub fn with_delay(mut self, d: Duration) -> Self {
        self.delay = Some(d);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seq_is_monotonic() {
        let a = Event::now(EventKind::TaskSpawned);
        let b = Event::now(EventKind::TaskCompleted);
        assert!(b.seq > a.seq);
    }
}
