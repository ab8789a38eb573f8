//! Lifecycle events published by the scheduler.

mod event;

pub use event::{Event, EventKind};
