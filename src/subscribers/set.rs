//! # SubscriberSet: non-blocking fan-out over multiple subscribers.
//!
//! Distributes each [`Event`] to every subscriber without awaiting any of
//! them: one bounded queue and one worker task per subscriber.
//!
//! Guarantees:
//! - `emit(&Event)` returns immediately.
//! - Per-subscriber FIFO.
//! - A panicking subscriber is isolated; its worker keeps running.
//!
//! Not guaranteed:
//! - Ordering across different subscribers.
//! - Delivery under overflow: a full or closed queue drops the event for
//!   that subscriber only.

use std::sync::Arc;

use futures::FutureExt;
use tokio::sync::mpsc;

use crate::events::Event;

use super::Subscribe;

/// Handle to one subscriber's queue.
struct Lane {
    name: &'static str,
    tx: mpsc::Sender<Arc<Event>>,
}

/// Composite fan-out with per-subscriber bounded queues and worker tasks.
pub struct SubscriberSet {
    lanes: Vec<Lane>,
}

impl SubscriberSet {
    /// Creates the set and spawns one worker per subscriber.
    ///
    /// Workers exit when the set is dropped (their queues close).
    #[must_use]
    pub fn new(subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        let lanes = subscribers
            .into_iter()
            .map(|sub| {
                let (tx, rx) = mpsc::channel::<Arc<Event>>(sub.queue_capacity().max(1));
                let name = sub.name();
                tokio::spawn(drain(sub, rx));
                Lane { name, tx }
            })
            .collect();
        Self { lanes }
    }

    /// Fans one event out to all subscribers (non-blocking).
    ///
    /// If a subscriber's queue is full or its worker is gone, the event is
    /// dropped for that subscriber and a note goes to stderr.
    pub fn emit(&self, event: &Event) {
        let ev = Arc::new(event.clone());
        for lane in &self.lanes {
            if let Err(err) = lane.tx.try_send(Arc::clone(&ev)) {
                let why = match err {
                    mpsc::error::TrySendError::Full(_) => "queue full",
                    mpsc::error::TrySendError::Closed(_) => "worker closed",
                };
                eprintln!("[provisor] subscriber '{}' dropped event: {why}", lane.name);
            }
        }
    }

    /// True if there are no subscribers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lanes.is_empty()
    }

    /// Number of subscribers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lanes.len()
    }
}

/// Worker loop: feed queued events to one subscriber, isolating panics.
async fn drain(sub: Arc<dyn Subscribe>, mut rx: mpsc::Receiver<Arc<Event>>) {
    while let Some(ev) = rx.recv().await {
        let fut = sub.on_event(ev.as_ref());
        if let Err(panic) = std::panic::AssertUnwindSafe(fut).catch_unwind().await {
            eprintln!("[provisor] subscriber '{}' panicked: {panic:?}", sub.name());
        }
    }
}
