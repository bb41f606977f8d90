//! Broadcast-based event bus.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use tokio::sync::broadcast;

use crate::event::{Event, EventEnvelope};

/// Default capacity of the broadcast channel (events older than this, if a
/// subscriber lags, are dropped for that subscriber per `tokio::broadcast`
/// semantics).
pub const DEFAULT_CHANNEL_CAPACITY: usize = 256;

/// Receiver handle for [`EventBus`] subscribers.
pub type EventReceiver = broadcast::Receiver<EventEnvelope>;

/// Publishes [`Event`]s, assigning each a monotonic sequence number and
/// timestamp, and broadcasts them to all current subscribers.
pub struct EventBus {
    tx: broadcast::Sender<EventEnvelope>,
    seq: AtomicU64,
}

impl EventBus {
    /// Create a bus with the default channel capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Create a bus with an explicit channel capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity);
        Self {
            tx,
            seq: AtomicU64::new(0),
        }
    }

    /// Subscribe to future events. Past events are not replayed.
    #[must_use]
    pub fn subscribe(&self) -> EventReceiver {
        self.tx.subscribe()
    }

    /// Publish an event. Returns the number of active subscribers that
    /// received it (zero is not an error — there may be no UI attached).
    pub fn publish(&self, event: Event) -> usize {
        let seq = self.seq.fetch_add(1, Ordering::Relaxed);
        let envelope = EventEnvelope {
            seq,
            timestamp: Utc::now(),
            event,
        };
        self.tx.send(envelope).unwrap_or(0)
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscribers_receive_events_in_order() {
        let bus = EventBus::new();
        let mut rx = bus.subscribe();

        bus.publish(Event::LinesClear);
        bus.publish(Event::HeaderRefresh);

        let first = rx.recv().await.unwrap();
        let second = rx.recv().await.unwrap();
        assert_eq!(first.seq, 0);
        assert_eq!(second.seq, 1);
        assert!(second.timestamp >= first.timestamp);
    }

    #[test]
    fn publish_with_no_subscribers_does_not_error() {
        let bus = EventBus::new();
        assert_eq!(bus.publish(Event::LinesClear), 0);
    }
}
