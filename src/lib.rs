//! # strand
//!
//! **Strand** is a single-threaded cooperative task runtime.
//!
//! It multiplexes many long-running logical tasks onto one execution thread,
//! giving synchronous environments `spawn`/`join`/`select`/`watch` semantics,
//! non-blocking sleeps, cancellable timeouts, scope-bound deferred cleanups,
//! periodic repeaters, bounded in-memory channels, and lazy byte-stream
//! reading. There is no parallelism and no preemption: tasks suspend only at
//! their own `await` points, and a task that never suspends monopolizes the
//! thread.
//!
//! ## Features
//!
//! | Area            | Description                                                  | Key types / functions                        |
//! |-----------------|--------------------------------------------------------------|----------------------------------------------|
//! | **Composition** | Fire-and-forget, run-all, first-wins, awaited results.       | [`spawn`], [`join`], [`select`], [`watch`]   |
//! | **Time**        | Cooperative delays, per-task deadlines, periodic repeaters.  | [`sleep()`], [`timeout()`], [`repeat()`]     |
//! | **Cleanup**     | Actions that run when the owning task ends, however it ends. | [`defer()`], [`defer_task`]                  |
//! | **Resilience**  | Bounded retry with backoff and jitter.                       | [`retry()`], [`BackoffPolicy`], [`JitterPolicy`] |
//! | **Pacing**      | Step caps per run call, admission limits, memory watchdog.   | [`set_max_steps_per_run`], [`set_max_concurrent`] |
//! | **Observability** | Lifecycle events with pluggable observers.                 | [`Event`], [`Observer`], [`set_logging`]     |
//! | **Collaborators** | Channels, byte streams, reconnecting sockets.              | [`Channel`], [`ByteStream`], [`NetClient`]   |
//!
//! ## Example
//!
//! ```
//! use std::time::Duration;
//! use strand::{defer, sleep, watch};
//!
//! let handle = watch(async {
//!     defer(|| println!("worker cleaned up")).await;
//!     sleep(Duration::from_millis(3)).await;
//!     Ok("work result")
//! });
//!
//! // Drives the runtime until the task terminates.
//! assert_eq!(handle.unwrap(), "work result");
//! ```
//!
//! The free functions drive a thread-local default [`Scheduler`]; explicit
//! instances created with [`Scheduler::new`] behave identically and are
//! handy in tests.
//!
//! ---

mod cancel;
mod channel;
mod config;
mod defer;
mod error;
mod events;
mod handle;
mod memory;
mod net;
mod observers;
mod policies;
mod repeat;
mod retry;
mod scheduler;
mod signal;
mod sleep;
mod stream;
mod task;
mod timeout;

// ---- Public re-exports ----

pub use cancel::{CancelToken, Cancelled};
pub use channel::{Channel, TrySendError};
pub use config::Config;
pub use defer::{defer, defer_task, Defer, DeferRegistration};
pub use error::{ChannelError, RuntimeError, TaskError};
pub use events::{Event, EventKind};
pub use handle::ResultHandle;
pub use memory::{current_rss_mb, MemoryWatchdog};
pub use net::{NetClient, Proto};
pub use observers::Observer;
pub use policies::{BackoffPolicy, JitterPolicy};
pub use repeat::RepeaterHandle;
pub use retry::{retry, retry_if};
pub use scheduler::{
    cleanup, join, repeat, run, runtime, select, set_logging, set_max_concurrent,
    set_max_steps_per_run, set_pacing_enabled, spawn, spawn_fn, watch, watch_fn, Scheduler,
};
pub use signal::{current_task_id, current_token, yield_now, YieldNow};
pub use sleep::{sleep, sleep_until, Sleep};
pub use stream::ByteStream;
pub use task::{TaskFuture, TaskId};
pub use timeout::{timeout, Deadline, Timeout};

// Optional: re-export the built-in stdout log observer type for manual
// `add_observer` use. `set_logging` does not depend on this feature.
// Enable with: `--features logging` (on by default).
#[cfg(feature = "logging")]
pub use observers::LogWriter;
