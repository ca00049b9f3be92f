//! State-store boundary: watch handles and the resilient wrapper.
//!
//! The real store is an external collaborator. This module defines the
//! contract the controller consumes — [`StateStore`] handing out [`Watch`]
//! handles — plus [`ResilientWatch`], the lazy re-subscribing wrapper the
//! controller actually holds, and [`MemoryStore`], a scriptable in-process
//! implementation for tests and demos.

mod memory;
mod resilient;
mod watch;

pub use memory::MemoryStore;
pub use resilient::ResilientWatch;
pub use watch::Watch;

use crate::environs::ConfigSnapshot;
use crate::machines::MachinesChange;

/// Shared cluster state, observable through watches.
///
/// Both methods establish a fresh backing watch per call. Connection
/// management, retries and the wire format are the implementor's concern;
/// the controller only ever sees snapshots and a channel close.
pub trait StateStore: Send + Sync + 'static {
    /// Starts a watch over the environment configuration.
    fn watch_environ_config(&self) -> Watch<ConfigSnapshot>;

    /// Starts a watch over the machine set.
    fn watch_machines(&self) -> Watch<MachinesChange>;
}
