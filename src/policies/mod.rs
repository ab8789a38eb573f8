//! Policies for spacing repeated attempts:
//!  - [`BackoffPolicy`] for delay growth between failures;
//!  - [`JitterPolicy`] for randomizing those delays.
//!
//! Consumed by [`retry`](crate::retry) and by the socket collaborator's
//! reconnect loop.
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use strand::{BackoffPolicy, JitterPolicy};
//!
//! // Backoff: 1ms -> 2ms -> 4ms (capped by 8ms)
//! let backoff = BackoffPolicy {
//!     first: Duration::from_millis(1),
//!     max: Duration::from_millis(8),
//!     factor: 2.0,
//!     jitter: JitterPolicy::None,
//! };
//!
//! let mut prev = None;
//! let mut delays = Vec::new();
//! for _ in 0..4 {
//!     let d = backoff.next(prev);
//!     delays.push(d);
//!     prev = Some(d);
//! }
//!
//! assert_eq!(delays, vec![
//!     Duration::from_millis(1),
//!     Duration::from_millis(2),
//!     Duration::from_millis(4),
//!     Duration::from_millis(8),
//! ]);
//! ```

mod backoff;
mod jitter;

pub use backoff::BackoffPolicy;
pub use jitter::JitterPolicy;
