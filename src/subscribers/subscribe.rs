//! # Core subscriber trait.
//!
//! `Subscribe` is the extension point for plugging event handlers into the
//! runtime. Each subscriber is driven by a dedicated worker fed from a bounded
//! queue owned by the [`SubscriberSet`](crate::subscribers::SubscriberSet), so
//! a slow subscriber never backs up the controller — its own events get
//! dropped instead.

use async_trait::async_trait;

use crate::events::Event;

/// Observer of controller events.
///
/// Called from a subscriber-dedicated worker task. Implementations may be
/// slow (I/O, batching) without affecting the controller or other
/// subscribers; prefer async I/O and cooperative waits all the same.
#[async_trait]
pub trait Subscribe: Send + Sync + 'static {
    /// Handles a single event.
    async fn on_event(&self, event: &Event);

    /// Human-readable name (for drop/panic reports).
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Capacity of this subscriber's queue; overflowing events are dropped
    /// for this subscriber only.
    fn queue_capacity(&self) -> usize {
        1024
    }
}
