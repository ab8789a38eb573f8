//! Hooks into scheduler lifecycle events.

mod log;
mod observer;

pub use log::LogWriter;
pub use observer::Observer;
