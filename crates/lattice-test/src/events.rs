//! Captures events published to an [`EventBus`] for assertion in tests.

use lattice_events::{Event, EventBus, EventReceiver};

/// Subscribes to an [`EventBus`] and buffers every event published after
/// subscription, for draining and asserting on in a test.
pub struct EventRecorder {
    rx: EventReceiver,
}

impl EventRecorder {
    /// Subscribe to `bus`. Events published before this call are not seen.
    #[must_use]
    pub fn new(bus: &EventBus) -> Self {
        Self { rx: bus.subscribe() }
    }

    /// Drain every event received so far, in publish order, without blocking.
    pub fn drain(&mut self) -> Vec<Event> {
        let mut events = Vec::new();
        while let Ok(envelope) = self.rx.try_recv() {
            events.push(envelope.event);
        }
        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drains_events_published_after_subscribing() {
        let bus = EventBus::new();
        let mut recorder = EventRecorder::new(&bus);

        bus.publish(Event::LinesClear);
        bus.publish(Event::HeaderRefresh);

        let events = recorder.drain();
        assert_eq!(events.len(), 2);
        assert!(matches!(events[0], Event::LinesClear));
        assert!(matches!(events[1], Event::HeaderRefresh));
        assert!(recorder.drain().is_empty());
    }
}
