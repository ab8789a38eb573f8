//! Cooperative delays. `sleep` yields until its deadline passes; it never
//! blocks the thread.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::{Duration, Instant};

/// Waits until `duration` has elapsed.
///
/// Equivalent to `sleep_until(Instant::now() + duration)`. A zero duration
/// completes on the first poll without suspending the task beyond one step.
pub fn sleep(duration: Duration) -> Sleep {
    Sleep {
        wake_at: Instant::now() + duration,
    }
}

/// Waits until `deadline` is reached.
pub fn sleep_until(deadline: Instant) -> Sleep {
    Sleep { wake_at: deadline }
}

/// Future returned by [`sleep`] and [`sleep_until`].
#[derive(Debug)]
pub struct Sleep {
    wake_at: Instant,
}

impl Future for Sleep {
    type Output = ();

    fn poll(self: Pin<&mut Self>, _: &mut Context<'_>) -> Poll<Self::Output> {
        if Instant::now() >= self.wake_at {
            Poll::Ready(())
        } else {
            Poll::Pending
        }
    }
}
