//! # Controller lifecycle events.
//!
//! [`EventKind`] classifies everything the controller does that an observer
//! might care about: environments opened and rejected, configs applied and
//! refused, watches invalidated, machine deltas dispatched, shutdown.
//!
//! [`Event`] carries the kind plus optional metadata set per kind. Each event
//! has a globally unique, monotonically increasing sequence number (`seq`);
//! use it to restore order when events are observed out of band.
//!
//! ## Example
//! ```rust
//! use provisor::{Event, EventKind};
//!
//! let ev = Event::now(EventKind::EnvironRejected).with_reason("no such provider");
//! assert_eq!(ev.kind, EventKind::EnvironRejected);
//! assert_eq!(ev.reason.as_deref(), Some("no such provider"));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::{Duration, SystemTime};

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of controller events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Shutdown ===
    /// Shutdown requested through the supervisor handle.
    ///
    /// Sets: `at`, `seq`.
    ShutdownRequested,

    /// The control task exited; both watches have been released.
    ///
    /// Sets: `at`, `seq`.
    ControllerStopped,

    // === Watches ===
    /// A resilient watch released its backing store watch and reset to
    /// unsubscribed (after a channel close, or during final teardown).
    ///
    /// Sets:
    /// - `watch`: `"environ-config"` or `"machines"`
    /// - `reason`: release error, only when the release operation failed
    WatchInvalidated,

    // === Environment lifecycle ===
    /// A valid snapshot produced a live environment; controller is `Active`.
    ///
    /// Sets:
    /// - `provider`: the provider type that opened the environment
    EnvironOpened,

    /// A snapshot failed validation or construction while `Idle`;
    /// controller keeps waiting.
    ///
    /// Sets:
    /// - `reason`: validation/provider failure message
    EnvironRejected,

    /// A new configuration was applied to the live environment.
    ///
    /// Sets: `at`, `seq`.
    ConfigApplied,

    /// A snapshot failed validation while `Active`; the previous
    /// configuration stays in effect.
    ///
    /// Sets:
    /// - `reason`: validation failure message
    ConfigRejected,

    /// The live environment refused a validated configuration; the previous
    /// configuration stays in effect.
    ///
    /// Sets:
    /// - `reason`: provider failure message
    ApplyFailed,

    // === Machines ===
    /// A machine-set delta was handed to the dispatcher and it returned.
    ///
    /// Sets:
    /// - `added`/`removed`: delta sizes
    MachinesDispatched,

    /// The dispatcher exceeded the configured allowance; the delta was
    /// abandoned and the controller moved on.
    ///
    /// Sets:
    /// - `added`/`removed`: delta sizes
    /// - `timeout_ms`: the configured allowance (ms)
    DispatchTimedOut,
}

/// Controller event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,

    /// Watch name, for watch events.
    pub watch: Option<Arc<str>>,
    /// Provider type, for environment events.
    pub provider: Option<Arc<str>>,
    /// Human-readable reason (validation errors, release failures, ...).
    pub reason: Option<Arc<str>>,
    /// Dispatch allowance in milliseconds (compact).
    pub timeout_ms: Option<u32>,
    /// Machines added in the delta.
    pub added: Option<u32>,
    /// Machines removed in the delta.
    pub removed: Option<u32>,
}

impl Event {
    /// Creates an event of the given kind with the current timestamp and the
    /// next sequence number.
    pub fn now(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            watch: None,
            provider: None,
            reason: None,
            timeout_ms: None,
            added: None,
            removed: None,
        }
    }

    /// Attaches a watch name.
    #[inline]
    pub fn with_watch(mut self, watch: impl Into<Arc<str>>) -> Self {
        self.watch = Some(watch.into());
        self
    }

    /// Attaches a provider type.
    #[inline]
    pub fn with_provider(mut self, provider: impl Into<Arc<str>>) -> Self {
        self.provider = Some(provider.into());
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Attaches a dispatch allowance (stored as milliseconds).
    #[inline]
    pub fn with_timeout(mut self, d: Duration) -> Self {
        let ms = d.as_millis().min(u128::from(u32::MAX)) as u32;
        self.timeout_ms = Some(ms);
        self
    }

    /// Attaches machine delta sizes.
    #[inline]
    pub fn with_machines(mut self, added: usize, removed: usize) -> Self {
        self.added = Some(added.min(u32::MAX as usize) as u32);
        self.removed = Some(removed.min(u32::MAX as usize) as u32);
        self
    }
}
