//! # Error types used by the strand runtime and tasks.
//!
//! This module defines three error enums:
//!
//! - [`RuntimeError`] errors raised by the scheduler itself.
//! - [`TaskError`] errors raised by individual task executions.
//! - [`ChannelError`] errors raised by the in-memory channel collaborator.
//!
//! All types provide `as_label` for logs/metrics. [`TaskError`] additionally
//! exposes `is_retryable()` and `is_fatal()`.

use std::time::Duration;

use thiserror::Error;

/// # Errors produced by the strand scheduler.
///
/// These represent failures in the runtime machinery itself, as opposed to
/// failures of the tasks it drives.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// Caller passed a nonsensical argument to a runtime operation.
    #[error("invalid argument: {reason}")]
    InvalidArgument {
        /// Why the argument was rejected.
        reason: String,
    },
    /// The memory watchdog tripped: resident set exceeded the soft limit
    /// and a collect pass could not recover.
    #[error("memory soft limit exceeded: rss={rss_mb}MB limit={limit_mb}MB")]
    ResourceExhausted {
        /// Resident set size at the time of the check, in megabytes.
        rss_mb: u64,
        /// The configured soft limit, in megabytes.
        limit_mb: u64,
    },
}

impl RuntimeError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            RuntimeError::InvalidArgument { .. } => "runtime_invalid_argument",
            RuntimeError::ResourceExhausted { .. } => "runtime_resource_exhausted",
        }
    }
}

/// # Errors produced by task execution.
///
/// These represent failures of individual tasks driven by the scheduler.
/// Some errors are retryable (`Timeout`, `Fail`), others are terminal.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum TaskError {
    /// Task exceeded the deadline it registered via [`timeout`](crate::timeout()).
    #[error("timed out after {timeout:?}")]
    Timeout {
        /// The configured deadline duration.
        timeout: Duration,
    },

    /// Task execution failed with an arbitrary cause.
    #[error("execution failed: {reason}")]
    Fail {
        /// Human-readable failure cause.
        reason: String,
    },

    /// A [`retry`](crate::retry()) block used up every attempt.
    ///
    /// Wraps the error of the final attempt.
    #[error("retries exhausted after {attempts} attempts")]
    RetriesExhausted {
        /// How many attempts were issued.
        attempts: u32,
        /// The failure of the last attempt.
        #[source]
        source: Box<TaskError>,
    },

    /// Task observed its [`CancelToken`](crate::CancelToken) and stopped.
    ///
    /// This is **not an error** in the traditional sense, but signals
    /// intentional termination.
    #[error("task canceled")]
    Canceled,
}

impl TaskError {
    /// Returns a short stable label.
    pub fn as_label(&self) -> &'static str {
        match self {
            TaskError::Timeout { .. } => "task_timeout",
            TaskError::Fail { .. } => "task_failed",
            TaskError::RetriesExhausted { .. } => "task_retries_exhausted",
            TaskError::Canceled => "task_canceled",
        }
    }

    /// Indicates whether the error type is safe to retry.
    pub fn is_retryable(&self) -> bool {
        matches!(self, TaskError::Timeout { .. } | TaskError::Fail { .. })
    }

    /// Indicates whether the error is terminal for retry purposes.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            TaskError::RetriesExhausted { .. } | TaskError::Canceled
        )
    }
}

impl From<std::io::Error> for TaskError {
    fn from(e: std::io::Error) -> Self {
        TaskError::Fail {
            reason: e.to_string(),
        }
    }
}

impl From<RuntimeError> for TaskError {
    fn from(e: RuntimeError) -> Self {
        TaskError::Fail {
            reason: e.to_string(),
        }
    }
}

/// # Errors produced by the in-memory channel collaborator.
#[non_exhaustive]
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ChannelError {
    /// The channel is at capacity; the value was not enqueued.
    #[error("channel {id} is full")]
    Full {
        /// Numeric channel id.
        id: u64,
    },
    /// The channel holds no values.
    #[error("channel {id} is empty")]
    Empty {
        /// Numeric channel id.
        id: u64,
    },
    /// The channel id is not (or no longer) registered.
    #[error("channel {id} is closed")]
    Closed {
        /// Numeric channel id.
        id: u64,
    },
    /// A value of a different type was enqueued under this id.
    #[error("channel {id} holds a value of a different type")]
    TypeMismatch {
        /// Numeric channel id.
        id: u64,
    },
}

impl ChannelError {
    /// Returns a short stable label.
    pub fn as_label(&self) -> &'static str {
        match self {
            ChannelError::Full { .. } => "channel_full",
            ChannelError::Empty { .. } => "channel_empty",
            ChannelError::Closed { .. } => "channel_closed",
            ChannelError::TypeMismatch { .. } => "channel_type_mismatch",
        }
    }
}
