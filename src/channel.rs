//! # Bounded in-memory channels.
//!
//! Channels are process-wide: a numeric id maps to an ordered sequence in a
//! global registry, so independently created handles with the same id talk
//! to the same queue. The registry is type-erased; a typed [`Channel<T>`]
//! handle downcasts on receive and reports a mismatch instead of panicking.
//!
//! Because the scheduler is single-threaded, access is serialized; the
//! cooperative [`send`](Channel::send)/[`recv`](Channel::recv) futures yield
//! to other tasks while the channel is full or empty.
//!
//! # Example
//! ```
//! use strand::Channel;
//!
//! let tx: Channel<u32> = Channel::open(7, 2);
//! let rx: Channel<u32> = Channel::open(7, 2);
//!
//! tx.try_send(1).unwrap();
//! tx.try_send(2).unwrap();
//! assert!(tx.try_send(3).is_err()); // at capacity
//!
//! assert_eq!(rx.try_recv().unwrap(), 1);
//! rx.close();
//! ```

use std::any::Any;
use std::collections::VecDeque;
use std::fmt;
use std::marker::PhantomData;
use std::sync::{LazyLock, Mutex};

use dashmap::DashMap;

use crate::error::ChannelError;
use crate::signal::yield_now;

struct Slot {
    capacity: usize,
    items: Mutex<VecDeque<Box<dyn Any + Send>>>,
}

/// Process-wide channel registry: id → ordered sequence.
static CHANNELS: LazyLock<DashMap<u64, Slot>> = LazyLock::new(DashMap::new);

/// Error returned by [`Channel::try_send`]; gives the value back.
#[derive(Debug)]
pub enum TrySendError<T> {
    /// The channel is at capacity.
    Full(T),
    /// The channel id is not registered.
    Closed(T),
}

impl<T> TrySendError<T> {
    /// Recovers the value that could not be sent.
    pub fn into_inner(self) -> T {
        match self {
            TrySendError::Full(v) | TrySendError::Closed(v) => v,
        }
    }

    /// True when the send failed because the channel was at capacity.
    pub fn is_full(&self) -> bool {
        matches!(self, TrySendError::Full(_))
    }
}

/// Typed handle to a process-wide channel.
///
/// Handles are cheap and copyable; every handle with the same id shares the
/// underlying queue. Dropping a handle does not close the channel; call
/// [`close`](Channel::close).
pub struct Channel<T> {
    id: u64,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for Channel<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Channel<T> {}

impl<T> fmt::Debug for Channel<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Channel").field("id", &self.id).finish()
    }
}

impl<T: Send + 'static> Channel<T> {
    /// Opens (or attaches to) the channel with the given id.
    ///
    /// `capacity` bounds the queue; zero means unbounded. If the channel
    /// already exists its original capacity is kept.
    pub fn open(id: u64, capacity: usize) -> Self {
        CHANNELS.entry(id).or_insert_with(|| Slot {
            capacity,
            items: Mutex::new(VecDeque::new()),
        });
        Channel {
            id,
            _marker: PhantomData,
        }
    }

    /// The channel's numeric id.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Appends a value, failing without enqueueing when at capacity or
    /// closed.
    pub fn try_send(&self, value: T) -> Result<(), TrySendError<T>> {
        let Some(slot) = CHANNELS.get(&self.id) else {
            return Err(TrySendError::Closed(value));
        };
        let mut items = slot.items.lock().unwrap_or_else(|e| e.into_inner());
        if slot.capacity > 0 && items.len() >= slot.capacity {
            return Err(TrySendError::Full(value));
        }
        items.push_back(Box::new(value));
        Ok(())
    }

    /// Removes the value at the head, failing when empty or closed.
    ///
    /// On a type mismatch the value is left at the head and an error is
    /// returned.
    pub fn try_recv(&self) -> Result<T, ChannelError> {
        let Some(slot) = CHANNELS.get(&self.id) else {
            return Err(ChannelError::Closed { id: self.id });
        };
        let mut items = slot.items.lock().unwrap_or_else(|e| e.into_inner());
        let Some(head) = items.pop_front() else {
            return Err(ChannelError::Empty { id: self.id });
        };
        match head.downcast::<T>() {
            Ok(value) => Ok(*value),
            Err(original) => {
                items.push_front(original);
                Err(ChannelError::TypeMismatch { id: self.id })
            }
        }
    }

    /// Appends a value, yielding to other tasks while the channel is full.
    pub async fn send(&self, value: T) -> Result<(), ChannelError> {
        let mut pending = value;
        loop {
            match self.try_send(pending) {
                Ok(()) => return Ok(()),
                Err(TrySendError::Closed(_)) => return Err(ChannelError::Closed { id: self.id }),
                Err(TrySendError::Full(value)) => {
                    pending = value;
                    yield_now().await;
                }
            }
        }
    }

    /// Removes the head value, yielding to other tasks while the channel is
    /// empty.
    pub async fn recv(&self) -> Result<T, ChannelError> {
        loop {
            match self.try_recv() {
                Ok(value) => return Ok(value),
                Err(ChannelError::Empty { .. }) => yield_now().await,
                Err(e) => return Err(e),
            }
        }
    }

    /// Number of queued values; zero once closed.
    pub fn len(&self) -> usize {
        CHANNELS
            .get(&self.id)
            .map(|slot| slot.items.lock().unwrap_or_else(|e| e.into_inner()).len())
            .unwrap_or(0)
    }

    /// True when no values are queued (or the channel is closed).
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// True once [`close`](Channel::close) removed the id from the registry.
    pub fn is_closed(&self) -> bool {
        !CHANNELS.contains_key(&self.id)
    }

    /// Removes the channel id from the registry, dropping queued values.
    pub fn close(&self) {
        CHANNELS.remove(&self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Ids namespaced per test so parallel test threads don't collide.
    #[test]
    fn fifo_order() {
        let ch: Channel<u32> = Channel::open(9_001, 0);
        ch.try_send(1).unwrap();
        ch.try_send(2).unwrap();
        assert_eq!(ch.try_recv().unwrap(), 1);
        assert_eq!(ch.try_recv().unwrap(), 2);
        assert_eq!(ch.try_recv(), Err(ChannelError::Empty { id: 9_001 }));
        ch.close();
    }

    #[test]
    fn full_send_leaves_queue_untouched() {
        let ch: Channel<u32> = Channel::open(9_002, 1);
        ch.try_send(1).unwrap();
        let rejected = ch.try_send(2).unwrap_err();
        assert!(rejected.is_full());
        assert_eq!(rejected.into_inner(), 2);
        assert_eq!(ch.len(), 1);
        ch.close();
    }

    #[test]
    fn closed_channel_rejects_both_sides() {
        let ch: Channel<u32> = Channel::open(9_003, 0);
        ch.close();
        assert!(ch.is_closed());
        assert!(matches!(ch.try_send(1), Err(TrySendError::Closed(1))));
        assert_eq!(ch.try_recv(), Err(ChannelError::Closed { id: 9_003 }));
    }

    #[test]
    fn type_mismatch_keeps_the_value() {
        let tx: Channel<u32> = Channel::open(9_004, 0);
        tx.try_send(7).unwrap();

        let wrong: Channel<String> = Channel::open(9_004, 0);
        assert_eq!(
            wrong.try_recv(),
            Err(ChannelError::TypeMismatch { id: 9_004 })
        );
        // The value survives for a correctly typed reader.
        assert_eq!(tx.try_recv().unwrap(), 7);
        tx.close();
    }
}
