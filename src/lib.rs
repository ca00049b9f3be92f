//! # provisor
//!
//! Watch-driven provisioning controller for tokio: one supervised task that
//! observes cluster state through two independent watches and keeps a
//! provider-opened *environment* in sync with it.
//!
//! ## Core concepts
//! - **[`Provisioner`]** — the controller. A single spawned task runs a
//!   two-state loop: `Idle` (no usable environment, waiting for a valid
//!   configuration snapshot) and `Active` (owning a live [`Environ`] handle,
//!   reacting to config and machine-set changes).
//! - **[`StateStore`]** — where snapshots come from. Each watch is a plain
//!   channel of values; a closed channel means "resubscribe", never "die".
//!   [`MemoryStore`] is a scriptable in-process implementation.
//! - **[`Provider`] / [`ProviderRegistry`]** — how environments are opened.
//!   A snapshot's `"type"` key selects the provider.
//! - **[`MachineDispatcher`]** — the extension point invoked for every
//!   machine-set delta while `Active`.
//! - **[`Subscribe`] / [`ProvisionerHandle::events`]** — the observability
//!   surface; every decision the controller makes is published as an
//!   [`Event`].
//!
//! ## Data flow
//! ```text
//!   StateStore ──watch: ConfigSnapshot──►┐
//!                                        │    ┌───────────────┐
//!   StateStore ──watch: MachinesChange──►┼───►│  Provisioner   │──► Events ──► Bus
//!                                        │    │ Idle ⇄ Active │
//!   ProvisionerHandle ──cancel──────────►┘    └──────┬────────┘
//!                                                    │owns while Active
//!                                                    ▼
//!                                            Box<dyn Environ>
//! ```
//!
//! ## Resilience rules
//! - Invalid snapshots, unknown providers, failed construction and failed
//!   reconfiguration are reported and skipped; the loop never dies over input.
//! - A closed config channel while `Active` discards the environment and
//!   falls back to `Idle`; a closed machines channel is resubscribed in place.
//! - Only [`ProvisionerHandle::stop`] (or dropping the runtime) ends the loop.
//!
//! ## Quick start
//! ```rust
//! use std::sync::Arc;
//!
//! use serde_json::json;
//! use provisor::environs::dummy::DummyProvider;
//! use provisor::{ConfigSnapshot, EventKind, MemoryStore, Provisioner, ProviderRegistry};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() {
//!     let store = MemoryStore::new();
//!     let mut providers = ProviderRegistry::new();
//!     providers
//!         .register("dummy", Arc::new(DummyProvider::new()))
//!         .unwrap();
//!
//!     let handle = Provisioner::builder(Arc::new(store.clone()), providers).start();
//!     let mut events = handle.events();
//!
//!     let snapshot = ConfigSnapshot::from_value(json!({ "type": "dummy" })).unwrap();
//!     store.push_config(snapshot);
//!
//!     while let Ok(ev) = events.recv().await {
//!         if ev.kind == EventKind::EnvironOpened {
//!             break;
//!         }
//!     }
//!
//!     handle.stop().await.unwrap();
//! }
//! ```

mod config;
mod core;
mod error;

pub mod environs;
pub mod events;
pub mod machines;
pub mod store;
pub mod subscribers;

pub use config::Config;
pub use core::{Provisioner, ProvisionerBuilder, ProvisionerHandle};
pub use environs::{ConfigSnapshot, Environ, EnvironConfig, Provider, ProviderRegistry};
pub use error::{ConfigError, EnvironError, RuntimeError, WatchError};
pub use events::{Bus, Event, EventKind};
pub use machines::{MachineDispatcher, MachinesChange, NoopDispatcher};
pub use store::{MemoryStore, ResilientWatch, StateStore, Watch};
pub use subscribers::{Subscribe, SubscriberSet};

#[cfg(feature = "logging")]
pub use subscribers::LogWriter;
