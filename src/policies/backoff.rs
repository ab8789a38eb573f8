//! # Backoff policy for repeated attempts.
//!
//! [`BackoffPolicy`] controls how delays grow after repeated failures.
//! It is parameterized by:
//! - [`BackoffPolicy::factor`] the multiplicative growth factor;
//! - [`BackoffPolicy::first`] the initial delay;
//! - [`BackoffPolicy::max`] the maximum delay cap.
//!
//! # Example
//! ```rust
//! use std::time::Duration;
//! use strand::{BackoffPolicy, JitterPolicy};
//!
//! let backoff = BackoffPolicy {
//!     first: Duration::from_millis(100),
//!     max: Duration::from_secs(10),
//!     factor: 2.0,
//!     jitter: JitterPolicy::None,
//! };
//!
//! // First attempt uses `first`.
//! assert_eq!(backoff.next(None), Duration::from_millis(100));
//! // Later attempts multiply the previous delay by `factor`.
//! assert_eq!(backoff.next(Some(Duration::from_millis(100))), Duration::from_millis(200));
//! // Delays are capped at `max`.
//! assert_eq!(backoff.next(Some(Duration::from_secs(20))), Duration::from_secs(10));
//! ```

use std::time::Duration;

use crate::policies::jitter::JitterPolicy;

/// Delay growth policy for [`retry`](crate::retry()) and reconnect loops.
#[derive(Clone, Copy, Debug)]
pub struct BackoffPolicy {
    /// Initial delay before the first retry.
    pub first: Duration,
    /// Maximum delay cap.
    pub max: Duration,
    /// Multiplicative growth factor (`>= 1.0` recommended).
    pub factor: f64,
    /// Jitter applied to the computed delay.
    pub jitter: JitterPolicy,
}

impl Default for BackoffPolicy {
    /// Returns a policy with:
    /// - `factor = 1.0` (constant delay);
    /// - `first = 100ms`;
    /// - `max = 30s`;
    /// - no jitter.
    fn default() -> Self {
        Self {
            first: Duration::from_millis(100),
            max: Duration::from_secs(30),
            factor: 1.0,
            jitter: JitterPolicy::None,
        }
    }
}

impl BackoffPolicy {
    /// Convenience constructor for the common exponential shape
    /// `first · factor^(k−1)`, uncapped in practice (24h cap), no jitter.
    pub fn exponential(first: Duration, factor: f64) -> Self {
        Self {
            first,
            max: Duration::from_secs(86_400),
            factor,
            jitter: JitterPolicy::None,
        }
    }

    /// Computes the next delay based on the previous one.
    ///
    /// The first delay is [`first`](BackoffPolicy::first); each later one is
    /// the previous delay scaled by [`factor`](BackoffPolicy::factor). The
    /// result is capped at [`max`](BackoffPolicy::max) and then shaped by
    /// the [`jitter`](BackoffPolicy::jitter) policy.
    pub fn next(&self, prev: Option<Duration>) -> Duration {
        let grown = match prev {
            None => self.first,
            Some(d) => scale(d, self.factor, self.max),
        };
        self.jitter
            .shape(grown.min(self.max), self.first, prev, self.max)
    }
}

/// Scales a delay by `factor`, saturating at `cap` when the product is not
/// representable.
fn scale(delay: Duration, factor: f64, cap: Duration) -> Duration {
    let secs = delay.as_secs_f64() * factor;
    if secs.is_finite() && secs >= 0.0 {
        Duration::try_from_secs_f64(secs).unwrap_or(cap)
    } else {
        cap
    }
}
