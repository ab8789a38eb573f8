use crate::events::Event;

/// # Hook into scheduler lifecycle events.
///
/// Observers run synchronously inside the scheduler loop, so `on_event`
/// must be cheap; anything expensive belongs in a spawned task.
///
/// # Example
/// ```
/// use strand::{Event, EventKind, Observer};
///
/// struct Counter(std::cell::Cell<u64>);
///
/// impl Observer for Counter {
///     fn on_event(&self, e: &Event) {
///         if e.kind == EventKind::TaskFailed {
///             self.0.set(self.0.get() + 1);
///         }
///     }
/// }
/// ```
pub trait Observer {
    /// Called once per published event, in `seq` order.
    fn on_event(&self, event: &Event);
}
