//! # Jitter policy for attempt delays.
//!
//! [`JitterPolicy`] adds randomness to backoff delays so that many tasks
//! retrying against the same resource do not fire in lockstep.
//!
//! - [`JitterPolicy::None`] no randomization, predictable delays
//! - [`JitterPolicy::Full`] random delay in [0, backoff_delay]
//! - [`JitterPolicy::Equal`] delay = backoff_delay/2 + random[0, backoff_delay/2]
//! - [`JitterPolicy::Decorrelated`] stateful jitter based on the previous delay
//!
//! The single entry point is [`shape`](JitterPolicy::shape); a
//! [`BackoffPolicy`](crate::BackoffPolicy) calls it with its full context so
//! every variant, including the stateful one, goes through the same door.

use std::time::Duration;

use rand::Rng;

/// Policy controlling randomization of attempt delays.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum JitterPolicy {
    /// No jitter: use the exact backoff delay (default).
    #[default]
    None,

    /// Full jitter: random in [0, delay]. Most aggressive spreading.
    Full,

    /// Equal jitter: delay/2 + random[0, delay/2]. Preserves ~75% of the
    /// original backoff on average.
    Equal,

    /// Decorrelated jitter: random in [base, prev·3], capped at `cap`.
    ///
    /// Ignores the computed delay; grows from the previous actual delay
    /// instead.
    Decorrelated,
}

impl JitterPolicy {
    /// Randomizes a computed backoff delay.
    ///
    /// - `delay`: the delay the backoff computed for this attempt
    /// - `base`: the backoff's initial delay
    /// - `prev`: the delay actually used before this one, if any
    /// - `cap`: the backoff's maximum delay
    ///
    /// Only `Decorrelated` consults `base`, `prev`, and `cap`.
    pub fn shape(
        &self,
        delay: Duration,
        base: Duration,
        prev: Option<Duration>,
        cap: Duration,
    ) -> Duration {
        match self {
            JitterPolicy::None => delay,
            JitterPolicy::Full => draw(Duration::ZERO, delay),
            JitterPolicy::Equal => {
                let half = delay / 2;
                half + draw(Duration::ZERO, half)
            }
            JitterPolicy::Decorrelated => {
                let floor = base.min(cap);
                let ceiling = prev
                    .unwrap_or(floor)
                    .saturating_mul(3)
                    .min(cap)
                    .max(floor);
                draw(floor, ceiling)
            }
        }
    }
}

/// Uniform draw from `[lo, hi]` at millisecond granularity. Degenerate
/// ranges return `lo`.
fn draw(lo: Duration, hi: Duration) -> Duration {
    let lo_ms = whole_ms(lo);
    let hi_ms = whole_ms(hi);
    if hi_ms <= lo_ms {
        return lo;
    }
    Duration::from_millis(rand::rng().random_range(lo_ms..=hi_ms))
}

fn whole_ms(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}
