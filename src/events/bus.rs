//! # Event bus for broadcasting controller events.
//!
//! [`Bus`] is a thin wrapper around [`tokio::sync::broadcast`]. The controller
//! publishes; the subscriber listener (and any external tap obtained through
//! [`ProvisionerHandle::events`](crate::ProvisionerHandle::events)) receives.
//!
//! ## Rules
//! - `publish()` never blocks; with no receivers the event is dropped.
//! - Capacity is a shared ring buffer; receivers that fall behind observe
//!   `RecvError::Lagged(n)` and skip the `n` oldest events.
//! - A receiver only sees events sent after it subscribed.

use tokio::sync::broadcast;

use super::event::Event;

/// Broadcast channel for controller events.
///
/// Cheap to clone (internally an `Arc`-backed sender).
#[derive(Clone, Debug)]
pub struct Bus {
    tx: broadcast::Sender<Event>,
}

impl Bus {
    /// Creates a bus with the given ring-buffer capacity (clamped to 1).
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel::<Event>(capacity.max(1));
        Self { tx }
    }

    /// Publishes an event to all active receivers. Never blocks.
    pub fn publish(&self, ev: Event) {
        let _ = self.tx.send(ev);
    }

    /// Creates an independent receiver observing subsequent events.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventKind;

    #[tokio::test]
    async fn test_publish_reaches_subscriber() {
        let bus = Bus::new(8);
        let mut rx = bus.subscribe();
        bus.publish(Event::now(EventKind::ConfigApplied));
        let ev = rx.recv().await.expect("event");
        assert_eq!(ev.kind, EventKind::ConfigApplied);
    }

    #[test]
    fn test_publish_without_receivers_is_fine() {
        let bus = Bus::new(1);
        bus.publish(Event::now(EventKind::ControllerStopped));
    }
}
