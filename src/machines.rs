//! # Machine-set deltas and the provisioning extension point.
//!
//! [`MachinesChange`] is the payload the machines watch delivers: which
//! machine identifiers appeared and which disappeared since the last
//! observation. It is transient — moved into the dispatch call, never
//! retained by the controller.
//!
//! [`MachineDispatcher`] is the extension point where a surrounding system
//! plugs its provisioning policy in. The controller only guarantees the
//! concurrency contract around the call: a pending cancellation is observed
//! promptly, and an optional allowance
//! ([`Config::dispatch_timeout`](crate::Config::dispatch_timeout)) bounds how
//! long one call may hold the loop. What a delta *means* for infrastructure
//! is deliberately not decided here; [`NoopDispatcher`] is the default.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Observed change to the machine set.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MachinesChange {
    /// Machines that appeared.
    pub added: Vec<String>,
    /// Machines that disappeared.
    pub removed: Vec<String>,
}

impl MachinesChange {
    /// A delta that only adds machines.
    pub fn added<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            added: ids.into_iter().map(Into::into).collect(),
            removed: Vec::new(),
        }
    }

    /// True if the delta carries no changes.
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

/// Provisioning extension point invoked for every machine-set delta.
///
/// Implementations should honor cooperative cancellation where they can; the
/// controller additionally races the call against its own cancellation token
/// and the configured allowance.
#[async_trait]
pub trait MachineDispatcher: Send + Sync + 'static {
    /// Reacts to one machine-set delta.
    async fn dispatch(&self, change: MachinesChange);
}

/// Default dispatcher: accepts every delta and does nothing.
#[derive(Default)]
pub struct NoopDispatcher;

#[async_trait]
impl MachineDispatcher for NoopDispatcher {
    async fn dispatch(&self, _change: MachinesChange) {}
}
