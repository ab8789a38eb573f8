//! # Bounded retry with backoff.
//!
//! [`retry`] drives a factory's product as a sub-computation of the calling
//! task. Failed attempts are spaced by a [`BackoffPolicy`]; the delay is a
//! cooperative [`sleep`], so other tasks keep running between attempts. After
//! the attempt budget is spent, the last failure is returned wrapped in
//! [`TaskError::RetriesExhausted`].

use std::future::Future;
use std::time::Duration;

use crate::error::TaskError;
use crate::events::{Event, EventKind};
use crate::policies::BackoffPolicy;
use crate::scheduler::Scheduler;
use crate::sleep::sleep;

/// Retries `factory` up to `attempts` times, spacing failures by `policy`.
///
/// Every failure is considered retryable; use [`retry_if`] to filter.
///
/// # Example
/// ```no_run
/// use std::time::Duration;
/// use strand::{retry, BackoffPolicy, TaskError};
///
/// strand::spawn(async {
///     let body = retry(
///         || async { fetch_once().await },
///         3,
///         BackoffPolicy::exponential(Duration::from_secs(1), 2.0),
///     );
///     let value = body.await?;
///     println!("{value}");
///     Ok(())
/// });
/// # async fn fetch_once() -> Result<String, TaskError> { Ok(String::new()) }
/// ```
pub async fn retry<T, F, Fut>(
    factory: F,
    attempts: u32,
    policy: BackoffPolicy,
) -> Result<T, TaskError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, TaskError>>,
{
    retry_if(factory, attempts, policy, |_| true).await
}

/// Like [`retry`], but only re-enters when `should_retry` approves the
/// failure. A rejected failure is returned as-is, attempts left or not.
pub async fn retry_if<T, F, Fut, P>(
    mut factory: F,
    attempts: u32,
    policy: BackoffPolicy,
    mut should_retry: P,
) -> Result<T, TaskError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, TaskError>>,
    P: FnMut(&TaskError) -> bool,
{
    if attempts == 0 {
        return Err(TaskError::Fail {
            reason: "retry requires at least one attempt".into(),
        });
    }

    let mut prev_delay: Option<Duration> = None;
    let mut attempt: u32 = 0;

    loop {
        attempt += 1;
        match factory().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if !should_retry(&err) {
                    return Err(err);
                }
                if attempt >= attempts {
                    return Err(TaskError::RetriesExhausted {
                        attempts: attempt,
                        source: Box::new(err),
                    });
                }

                let delay = policy.next(prev_delay);
                prev_delay = Some(delay);

                if let Some(sched) = Scheduler::active() {
                    sched.publish(
                        Event::now(EventKind::BackoffScheduled)
                            .with_attempt(u64::from(attempt))
                            .with_delay(delay)
                            .with_error(err.to_string()),
                    );
                }

                sleep(delay).await;
            }
        }
    }
}
