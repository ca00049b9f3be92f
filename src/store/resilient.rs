//! # ResilientWatch: lazy re-subscribing wrapper over one backing watch.
//!
//! The store's change channel closes when the backing watcher dies. The
//! control loop reads that close uniformly as "need to resubscribe", never as
//! fatal: it calls [`invalidate`](ResilientWatch::invalidate) and the next
//! [`recv`](ResilientWatch::recv) transparently establishes a fresh watch.
//! Transient store faults thus become automatic resubscription without any
//! reconnect logic in the state machine.
//!
//! ## States
//! ```text
//! unsubscribed ──ensure_subscribed()──► subscribed
//!      ▲                                    │
//!      └───────────invalidate()─────────────┘
//! ```
//!
//! Invariant: at most one live backing watch per instance.

use crate::events::{Bus, Event, EventKind};

use super::Watch;

/// Subscribe operation producing a fresh backing watch.
///
/// `Sync` because the owning controller task holds `&self` across `await`s.
pub type SubscribeFn<T> = Box<dyn FnMut() -> Watch<T> + Send + Sync>;

/// A possibly-absent backing watch that re-establishes itself on demand.
pub struct ResilientWatch<T> {
    name: &'static str,
    bus: Bus,
    subscribe: SubscribeFn<T>,
    watch: Option<Watch<T>>,
}

impl<T> ResilientWatch<T> {
    /// Creates an unsubscribed instance.
    ///
    /// `name` identifies this watch in events (`"environ-config"`,
    /// `"machines"`); `subscribe` is invoked each time a fresh backing watch
    /// is needed.
    pub fn new(
        name: &'static str,
        bus: Bus,
        subscribe: impl FnMut() -> Watch<T> + Send + Sync + 'static,
    ) -> Self {
        Self {
            name,
            bus,
            subscribe: Box::new(subscribe),
            watch: None,
        }
    }

    /// True if a backing watch is currently held.
    pub fn is_subscribed(&self) -> bool {
        self.watch.is_some()
    }

    /// Idempotent accessor: establishes the backing watch on first use after
    /// invalidation, returns the cached one otherwise.
    pub fn ensure_subscribed(&mut self) -> &mut Watch<T> {
        let Self {
            subscribe, watch, ..
        } = self;
        watch.get_or_insert_with(|| subscribe())
    }

    /// Receives the next value, subscribing first if necessary.
    ///
    /// `None` means the backing channel closed; the caller should
    /// [`invalidate`](Self::invalidate) and carry on — the next `recv`
    /// resubscribes.
    pub async fn recv(&mut self) -> Option<T> {
        self.ensure_subscribed().recv().await
    }

    /// Releases the backing watch (if any) and resets to unsubscribed.
    ///
    /// The release outcome is reported on the bus; a release error is
    /// attached as the event reason and never propagated.
    pub fn invalidate(&mut self) {
        if let Some(watch) = self.watch.take() {
            let ev = Event::now(EventKind::WatchInvalidated).with_watch(self.name);
            match watch.release() {
                Ok(()) => self.bus.publish(ev),
                Err(err) => self.bus.publish(ev.with_reason(err.to_string())),
            }
        }
    }
}
