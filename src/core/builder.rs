//! # ProvisionerBuilder: wiring and startup.
//!
//! The builder assembles the bus, the optional subscriber listener, both
//! resilient watches and the controller itself, then spawns the control task.
//! [`start`](ProvisionerBuilder::start) never blocks; everything after it goes
//! through the returned [`ProvisionerHandle`].

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::environs::ProviderRegistry;
use crate::events::Bus;
use crate::machines::{MachineDispatcher, NoopDispatcher};
use crate::store::{ResilientWatch, StateStore};
use crate::subscribers::{Subscribe, SubscriberSet};

use super::{Provisioner, ProvisionerHandle};

/// Builder for a running [`Provisioner`].
///
/// Obtained from [`Provisioner::builder`]; consumed by
/// [`start`](Self::start).
pub struct ProvisionerBuilder {
    cfg: Config,
    store: Arc<dyn StateStore>,
    providers: ProviderRegistry,
    dispatcher: Arc<dyn MachineDispatcher>,
    subscribers: Vec<Arc<dyn Subscribe>>,
}

impl ProvisionerBuilder {
    pub(crate) fn new(store: Arc<dyn StateStore>, providers: ProviderRegistry) -> Self {
        Self {
            cfg: Config::default(),
            store,
            providers,
            dispatcher: Arc::new(NoopDispatcher),
            subscribers: Vec::new(),
        }
    }

    /// Replaces the default [`Config`].
    #[must_use]
    pub fn with_config(mut self, cfg: Config) -> Self {
        self.cfg = cfg;
        self
    }

    /// Replaces the default no-op dispatcher.
    #[must_use]
    pub fn with_dispatcher(mut self, dispatcher: Arc<dyn MachineDispatcher>) -> Self {
        self.dispatcher = dispatcher;
        self
    }

    /// Attaches event subscribers (fan-out is non-blocking per subscriber).
    #[must_use]
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Wires everything up, spawns the control task and returns its handle.
    pub fn start(self) -> ProvisionerHandle {
        let bus = Bus::new(self.cfg.bus_capacity_clamped());

        if !self.subscribers.is_empty() {
            spawn_listener(bus.subscribe(), self.subscribers);
        }

        let token = CancellationToken::new();

        let store = Arc::clone(&self.store);
        let environ_watch = ResilientWatch::new("environ-config", bus.clone(), move || {
            store.watch_environ_config()
        });
        let store = self.store;
        let machines_watch =
            ResilientWatch::new("machines", bus.clone(), move || store.watch_machines());

        let provisioner = Provisioner {
            cfg: self.cfg,
            bus: bus.clone(),
            token: token.clone(),
            providers: self.providers,
            dispatcher: self.dispatcher,
            environ_watch,
            machines_watch,
        };

        let join = tokio::spawn(provisioner.run());
        ProvisionerHandle::new(token, bus, join)
    }
}

/// Forwards bus events into the subscriber set until the bus closes.
fn spawn_listener(
    mut rx: tokio::sync::broadcast::Receiver<crate::events::Event>,
    subscribers: Vec<Arc<dyn Subscribe>>,
) {
    use tokio::sync::broadcast::error::RecvError;

    let set = SubscriberSet::new(subscribers);
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(ev) => set.emit(&ev),
                Err(RecvError::Closed) => break,
                Err(RecvError::Lagged(_)) => continue,
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environs::ConfigSnapshot;
    use crate::events::{Event, EventKind};
    use crate::store::MemoryStore;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct Counter {
        seen: AtomicUsize,
    }

    #[async_trait]
    impl Subscribe for Counter {
        async fn on_event(&self, _event: &Event) {
            self.seen.fetch_add(1, Ordering::SeqCst);
        }

        fn name(&self) -> &'static str {
            "counter"
        }
    }

    #[tokio::test]
    async fn test_start_does_not_block_and_stops_cleanly() {
        let store = MemoryStore::new();
        let handle = Provisioner::builder(Arc::new(store), ProviderRegistry::new()).start();
        tokio::time::timeout(Duration::from_secs(1), handle.stop())
            .await
            .expect("stop should not hang")
            .expect("clean stop");
    }

    #[tokio::test]
    async fn test_subscribers_observe_controller_events() {
        let counter = Arc::new(Counter {
            seen: AtomicUsize::new(0),
        });
        let store = MemoryStore::new();
        let handle = Provisioner::builder(Arc::new(store.clone()), ProviderRegistry::new())
            .with_subscribers(vec![counter.clone()])
            .start();

        // No dummy provider registered, so this snapshot is rejected; the
        // rejection still reaches subscribers.
        let snapshot = ConfigSnapshot::from_value(json!({ "type": "dummy" })).expect("object");
        let mut rx = handle.events();
        store.push_config(snapshot);
        tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                let ev = rx.recv().await.expect("bus closed");
                if ev.kind == EventKind::EnvironRejected {
                    break;
                }
            }
        })
        .await
        .expect("rejection event");

        for _ in 0..100 {
            if counter.seen.load(Ordering::SeqCst) >= 1 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(counter.seen.load(Ordering::SeqCst) >= 1);

        handle.stop().await.expect("clean stop");
    }
}
