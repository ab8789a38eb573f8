use crate::events::{Event, EventKind};
use crate::observers::Observer;

/// Base observer that logs events to stdout.
///
/// Attached by `set_logging(true)`. Useful for demos and debugging.
pub struct LogWriter;

impl Observer for LogWriter {
    fn on_event(&self, e: &Event) {
        match e.kind {
            EventKind::TaskSpawned => {
                if let Some(task) = e.task {
                    println!("[spawned] task={task}");
                }
            }
            EventKind::TaskCompleted => {
                if let Some(task) = e.task {
                    println!("[completed] task={task}");
                }
            }
            EventKind::TaskFailed => {
                println!("[failed] task={:?} err={:?}", e.task, e.error);
            }
            EventKind::TimeoutHit => {
                println!("[timeout] task={:?} err={:?}", e.task, e.error);
            }
            EventKind::DeferRan => {
                if let Some(task) = e.task {
                    println!("[defer] task={task}");
                }
            }
            EventKind::RunPaused => {
                println!("[paused] steps={:?}", e.attempt);
            }
            EventKind::RepeaterFired => {
                println!("[repeater] task={:?}", e.task);
            }
            EventKind::BackoffScheduled => {
                println!(
                    "[backoff] delay={:?} after_attempt={:?} err={:?}",
                    e.delay, e.attempt, e.error
                );
            }
            EventKind::MemorySoftLimit => {
                println!("[memory-soft-limit] err={:?}", e.error);
            }
            EventKind::CleanupRequested => {
                println!("[cleanup]");
            }
        }
    }
}
