//! # Provisioner: the watch-driven reconfiguration controller.
//!
//! One tokio task runs a two-state supervisory loop over two independent,
//! lazily-established watches on cluster state:
//!
//! ```text
//!          ┌───────────────────────────────────────────────┐
//!          │ Idle (no usable environment)                  │
//!          │   cancel        → exit                        │
//!          │   snapshot      → open ok   → Active          │
//!          │                 → open err  → stay, report    │
//!          │   config closed → invalidate, stay            │
//!          └───────────────────────────────────────────────┘
//!          ┌───────────────────────────────────────────────┐
//!          │ Active (owns the Environ handle)              │
//!          │   cancel          → exit, handle discarded    │
//!          │   snapshot        → parse+apply or report     │
//!          │   config closed   → invalidate, drop handle,  │
//!          │                     back to Idle              │
//!          │   machines delta  → dispatch (cancellable)    │
//!          │   machines closed → invalidate, stay          │
//!          └───────────────────────────────────────────────┘
//! ```
//!
//! ## Rules
//! - The control task is the sole owner of the environment handle and both
//!   watch states; the handle exists exactly while the loop is in `Active`
//!   (it is a local of the `Active` sub-loop, not an `Option` field).
//! - A closed change channel is read as "resubscribe", never as fatal.
//! - Bad snapshots, failed construction and failed application are reported
//!   on the bus and skipped; only cancellation ends the loop.
//! - Waits return decisions as values so state mutation happens outside the
//!   `select!` borrows.
//! - No ordering is assumed between the configuration and machines streams.

use std::sync::Arc;

use tokio::time;
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::environs::{ConfigSnapshot, Environ, EnvironConfig, ProviderRegistry};
use crate::error::{EnvironError, RuntimeError};
use crate::events::{Bus, Event, EventKind};
use crate::machines::{MachineDispatcher, MachinesChange};
use crate::store::{ResilientWatch, StateStore};

use super::ProvisionerBuilder;

/// What woke the `Idle` wait.
enum IdleEvent {
    Shutdown,
    Snapshot(Option<ConfigSnapshot>),
}

/// What woke the `Active` wait.
enum ActiveEvent {
    Shutdown,
    Snapshot(Option<ConfigSnapshot>),
    Machines(Option<MachinesChange>),
}

/// Why the `Active` sub-loop ended.
enum ActiveExit {
    Shutdown,
    ConfigLost,
}

/// Whether a dispatch call ran to its end.
enum DispatchExit {
    Finished,
    Shutdown,
}

/// The watch-driven reconfiguration controller.
///
/// Constructed through [`Provisioner::builder`]; the builder spawns the
/// control task and returns a [`ProvisionerHandle`](super::ProvisionerHandle).
pub struct Provisioner {
    pub(crate) cfg: Config,
    pub(crate) bus: Bus,
    pub(crate) token: CancellationToken,
    pub(crate) providers: ProviderRegistry,
    pub(crate) dispatcher: Arc<dyn MachineDispatcher>,
    pub(crate) environ_watch: ResilientWatch<ConfigSnapshot>,
    pub(crate) machines_watch: ResilientWatch<MachinesChange>,
}

impl Provisioner {
    /// Starts building a controller over the given store and providers.
    pub fn builder(store: Arc<dyn StateStore>, providers: ProviderRegistry) -> ProvisionerBuilder {
        ProvisionerBuilder::new(store, providers)
    }

    /// The control loop. Runs until cancellation; releases both watches
    /// unconditionally on the way out.
    pub(crate) async fn run(mut self) -> Result<(), RuntimeError> {
        loop {
            match self.idle_wait().await {
                IdleEvent::Shutdown => break,
                IdleEvent::Snapshot(None) => self.environ_watch.invalidate(),
                IdleEvent::Snapshot(Some(snapshot)) => match self.open_environ(&snapshot) {
                    Err(err) => self.bus.publish(
                        Event::now(EventKind::EnvironRejected).with_reason(err.to_string()),
                    ),
                    Ok(environ) => {
                        self.bus.publish(
                            Event::now(EventKind::EnvironOpened).with_provider(environ.kind()),
                        );
                        if let ActiveExit::Shutdown = self.active(environ).await {
                            break;
                        }
                        // ConfigLost: the handle was discarded; wait for a
                        // fresh snapshot from Idle.
                    }
                },
            }
        }

        self.environ_watch.invalidate();
        self.machines_watch.invalidate();
        self.bus.publish(Event::now(EventKind::ControllerStopped));
        Ok(())
    }

    /// The `Active` sub-loop; owns the environment handle for its duration.
    async fn active(&mut self, mut environ: Box<dyn Environ>) -> ActiveExit {
        loop {
            match self.active_wait().await {
                ActiveEvent::Shutdown => return ActiveExit::Shutdown,
                ActiveEvent::Snapshot(None) => {
                    // Losing the configuration signal means the environment
                    // can no longer be trusted.
                    self.environ_watch.invalidate();
                    return ActiveExit::ConfigLost;
                }
                ActiveEvent::Snapshot(Some(snapshot)) => match EnvironConfig::parse(&snapshot) {
                    Err(err) => self.bus.publish(
                        Event::now(EventKind::ConfigRejected).with_reason(err.to_string()),
                    ),
                    Ok(cfg) => match environ.apply_config(cfg) {
                        Ok(()) => self.bus.publish(Event::now(EventKind::ConfigApplied)),
                        Err(err) => self.bus.publish(
                            Event::now(EventKind::ApplyFailed).with_reason(err.to_string()),
                        ),
                    },
                },
                ActiveEvent::Machines(None) => self.machines_watch.invalidate(),
                ActiveEvent::Machines(Some(change)) => {
                    if let DispatchExit::Shutdown = self.dispatch_machines(change).await {
                        return ActiveExit::Shutdown;
                    }
                }
            }
        }
    }

    async fn idle_wait(&mut self) -> IdleEvent {
        tokio::select! {
            _ = self.token.cancelled() => IdleEvent::Shutdown,
            snapshot = self.environ_watch.recv() => IdleEvent::Snapshot(snapshot),
        }
    }

    async fn active_wait(&mut self) -> ActiveEvent {
        tokio::select! {
            _ = self.token.cancelled() => ActiveEvent::Shutdown,
            snapshot = self.environ_watch.recv() => ActiveEvent::Snapshot(snapshot),
            change = self.machines_watch.recv() => ActiveEvent::Machines(change),
        }
    }

    fn open_environ(&self, snapshot: &ConfigSnapshot) -> Result<Box<dyn Environ>, EnvironError> {
        let cfg = EnvironConfig::parse(snapshot)?;
        self.providers.open(&cfg)
    }

    /// Hands one delta to the dispatcher, racing the call against the
    /// cancellation token and the configured allowance.
    async fn dispatch_machines(&self, change: MachinesChange) -> DispatchExit {
        let added = change.added.len();
        let removed = change.removed.len();
        let allowance = self.cfg.dispatch_allowance();
        let dispatcher = Arc::clone(&self.dispatcher);

        let work = async move {
            match allowance {
                Some(limit) => time::timeout(limit, dispatcher.dispatch(change))
                    .await
                    .is_ok(),
                None => {
                    dispatcher.dispatch(change).await;
                    true
                }
            }
        };

        tokio::select! {
            _ = self.token.cancelled() => DispatchExit::Shutdown,
            finished = work => {
                if finished {
                    self.bus.publish(
                        Event::now(EventKind::MachinesDispatched).with_machines(added, removed),
                    );
                } else {
                    self.bus.publish(
                        Event::now(EventKind::DispatchTimedOut)
                            .with_machines(added, removed)
                            .with_timeout(self.cfg.dispatch_timeout),
                    );
                }
                DispatchExit::Finished
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ProvisionerHandle;
    use crate::environs::dummy::{DummyProvider, DummyRecorder};
    use crate::machines::NoopDispatcher;
    use crate::store::MemoryStore;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;
    use std::time::Duration;
    use tokio::sync::broadcast;

    struct Rig {
        store: MemoryStore,
        recorder: Arc<DummyRecorder>,
        handle: ProvisionerHandle,
        events: broadcast::Receiver<Event>,
    }

    fn start_rig(cfg: Config, dispatcher: Arc<dyn MachineDispatcher>) -> Rig {
        let store = MemoryStore::new();
        let provider = DummyProvider::new();
        let recorder = provider.recorder();

        let mut providers = ProviderRegistry::new();
        providers
            .register("dummy", Arc::new(provider))
            .expect("register dummy");

        let handle = Provisioner::builder(Arc::new(store.clone()), providers)
            .with_config(cfg)
            .with_dispatcher(dispatcher)
            .start();
        let events = handle.events();

        Rig {
            store,
            recorder,
            handle,
            events,
        }
    }

    fn default_rig() -> Rig {
        start_rig(Config::default(), Arc::new(NoopDispatcher))
    }

    fn snapshot(value: serde_json::Value) -> ConfigSnapshot {
        ConfigSnapshot::from_value(value).expect("object snapshot")
    }

    async fn expect_kind(rx: &mut broadcast::Receiver<Event>, kind: EventKind) -> Event {
        time::timeout(Duration::from_secs(5), async {
            loop {
                let ev = rx.recv().await.expect("bus closed");
                if ev.kind == kind {
                    return ev;
                }
            }
        })
        .await
        .unwrap_or_else(|_| panic!("timed out waiting for {kind:?}"))
    }

    async fn wait_until(mut cond: impl FnMut() -> bool, what: &str) {
        time::timeout(Duration::from_secs(5), async {
            while !cond() {
                time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap_or_else(|_| panic!("timed out waiting until {what}"));
    }

    struct RecordingDispatcher {
        seen: Mutex<Vec<MachinesChange>>,
    }

    impl RecordingDispatcher {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                seen: Mutex::new(Vec::new()),
            })
        }

        fn seen(&self) -> Vec<MachinesChange> {
            self.seen
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner)
                .clone()
        }
    }

    #[async_trait]
    impl MachineDispatcher for RecordingDispatcher {
        async fn dispatch(&self, change: MachinesChange) {
            self.seen
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner)
                .push(change);
        }
    }

    struct StuckDispatcher;

    #[async_trait]
    impl MachineDispatcher for StuckDispatcher {
        async fn dispatch(&self, _change: MachinesChange) {
            time::sleep(Duration::from_secs(3600)).await;
        }
    }

    /// Drives a fresh rig into `Active` with a plain dummy snapshot.
    async fn activate(rig: &mut Rig) {
        rig.store.push_config(snapshot(json!({ "type": "dummy" })));
        expect_kind(&mut rig.events, EventKind::EnvironOpened).await;
    }

    #[tokio::test]
    async fn test_stop_before_any_event_is_prompt() {
        let rig = default_rig();
        let res = time::timeout(Duration::from_secs(1), rig.handle.stop())
            .await
            .expect("stop should not hang");
        assert!(res.is_ok());
    }

    #[tokio::test]
    async fn test_stop_twice_observes_same_outcome() {
        let rig = default_rig();
        assert!(rig.handle.stop().await.is_ok());
        assert!(rig.handle.stop().await.is_ok());
    }

    #[tokio::test]
    async fn test_invalid_snapshots_keep_idle() {
        let mut rig = default_rig();

        rig.store.push_config(snapshot(json!({ "name": "prod" })));
        let ev = expect_kind(&mut rig.events, EventKind::EnvironRejected).await;
        assert!(ev.reason.is_some());

        rig.store.push_config(snapshot(json!({ "type": "" })));
        expect_kind(&mut rig.events, EventKind::EnvironRejected).await;

        assert_eq!(rig.recorder.opens(), 0);
        // Idle never touches the machines stream.
        assert_eq!(rig.store.machine_watch_count(), 0);

        rig.handle.stop().await.expect("clean stop");
    }

    #[tokio::test]
    async fn test_unknown_provider_keeps_idle() {
        let mut rig = default_rig();
        rig.store.push_config(snapshot(json!({ "type": "ec2" })));
        let ev = expect_kind(&mut rig.events, EventKind::EnvironRejected).await;
        assert!(ev.reason.as_deref().is_some_and(|r| r.contains("ec2")));
        assert_eq!(rig.recorder.opens(), 0);
        rig.handle.stop().await.expect("clean stop");
    }

    #[tokio::test]
    async fn test_valid_snapshot_activates_once() {
        let mut rig = default_rig();
        activate(&mut rig).await;

        assert_eq!(rig.recorder.opens(), 1);
        assert_eq!(rig.store.config_watch_count(), 1);

        rig.handle.stop().await.expect("clean stop");
    }

    #[tokio::test]
    async fn test_broken_construction_then_recovery() {
        let mut rig = default_rig();

        rig.store
            .push_config(snapshot(json!({ "type": "dummy", "broken": true })));
        expect_kind(&mut rig.events, EventKind::EnvironRejected).await;
        assert_eq!(rig.recorder.opens(), 0);

        activate(&mut rig).await;
        assert_eq!(rig.recorder.opens(), 1);

        rig.handle.stop().await.expect("clean stop");
    }

    #[tokio::test]
    async fn test_reconfiguration_while_active() {
        let mut rig = default_rig();
        activate(&mut rig).await;

        rig.store
            .push_config(snapshot(json!({ "type": "dummy", "zone": "b" })));
        expect_kind(&mut rig.events, EventKind::ConfigApplied).await;

        let applied = rig.recorder.applied();
        assert_eq!(applied.len(), 1);
        assert_eq!(applied[0].get("zone"), Some(&json!("b")));
        // Reconfiguration updates in place, it does not rebuild.
        assert_eq!(rig.recorder.opens(), 1);

        rig.handle.stop().await.expect("clean stop");
    }

    #[tokio::test]
    async fn test_invalid_snapshot_while_active_is_skipped() {
        let mut rig = default_rig();
        activate(&mut rig).await;

        rig.store.push_config(snapshot(json!({ "type": 7 })));
        expect_kind(&mut rig.events, EventKind::ConfigRejected).await;
        assert!(rig.recorder.applied().is_empty());
        assert_eq!(rig.recorder.opens(), 1);

        // Still Active: the next valid snapshot applies to the same handle.
        rig.store
            .push_config(snapshot(json!({ "type": "dummy", "zone": "c" })));
        expect_kind(&mut rig.events, EventKind::ConfigApplied).await;
        assert_eq!(rig.recorder.opens(), 1);

        rig.handle.stop().await.expect("clean stop");
    }

    #[tokio::test]
    async fn test_refused_apply_keeps_previous_config() {
        let mut rig = default_rig();
        activate(&mut rig).await;

        rig.store
            .push_config(snapshot(json!({ "type": "dummy", "refuse-config": true })));
        expect_kind(&mut rig.events, EventKind::ApplyFailed).await;
        assert!(rig.recorder.applied().is_empty());

        rig.store
            .push_config(snapshot(json!({ "type": "dummy", "zone": "d" })));
        expect_kind(&mut rig.events, EventKind::ConfigApplied).await;
        assert_eq!(rig.recorder.opens(), 1);

        rig.handle.stop().await.expect("clean stop");
    }

    #[tokio::test]
    async fn test_config_close_falls_back_to_idle_and_rebuilds() {
        let mut rig = default_rig();
        activate(&mut rig).await;
        assert_eq!(rig.recorder.opens(), 1);

        rig.store.close_config();
        let ev = expect_kind(&mut rig.events, EventKind::WatchInvalidated).await;
        assert_eq!(ev.watch.as_deref(), Some("environ-config"));

        // Back in Idle the controller lazily resubscribes.
        let store = rig.store.clone();
        wait_until(|| store.config_watch_count() == 2, "config resubscription").await;

        rig.store
            .push_config(snapshot(json!({ "type": "dummy", "extra": "x" })));
        expect_kind(&mut rig.events, EventKind::EnvironOpened).await;
        assert_eq!(rig.recorder.opens(), 2);

        rig.handle.stop().await.expect("clean stop");
    }

    #[tokio::test]
    async fn test_machines_delta_reaches_dispatcher() {
        let dispatcher = RecordingDispatcher::new();
        let mut rig = start_rig(Config::default(), dispatcher.clone());
        activate(&mut rig).await;

        let store = rig.store.clone();
        wait_until(|| store.live_machine_watches() == 1, "machines watch").await;

        rig.store.push_machines(MachinesChange::added(["m-0", "m-1"]));
        let ev = expect_kind(&mut rig.events, EventKind::MachinesDispatched).await;
        assert_eq!(ev.added, Some(2));
        assert_eq!(ev.removed, Some(0));
        assert_eq!(dispatcher.seen().len(), 1);
        assert_eq!(dispatcher.seen()[0].added, vec!["m-0", "m-1"]);

        rig.handle.stop().await.expect("clean stop");
    }

    #[tokio::test]
    async fn test_machines_close_keeps_active() {
        let dispatcher = RecordingDispatcher::new();
        let mut rig = start_rig(Config::default(), dispatcher.clone());
        activate(&mut rig).await;

        let store = rig.store.clone();
        wait_until(|| store.live_machine_watches() == 1, "machines watch").await;

        rig.store.close_machines();
        let ev = expect_kind(&mut rig.events, EventKind::WatchInvalidated).await;
        assert_eq!(ev.watch.as_deref(), Some("machines"));

        // Still Active: configs keep applying to the same environment...
        rig.store
            .push_config(snapshot(json!({ "type": "dummy", "zone": "e" })));
        expect_kind(&mut rig.events, EventKind::ConfigApplied).await;
        assert_eq!(rig.recorder.opens(), 1);

        // ...and the machines watch comes back on its own.
        wait_until(|| store.machine_watch_count() == 2, "machines resubscription").await;
        rig.store.push_machines(MachinesChange::added(["m-2"]));
        expect_kind(&mut rig.events, EventKind::MachinesDispatched).await;

        rig.handle.stop().await.expect("clean stop");
    }

    #[tokio::test(start_paused = true)]
    async fn test_dispatch_allowance_abandons_stuck_dispatcher() {
        let cfg = Config {
            dispatch_timeout: Duration::from_millis(50),
            ..Config::default()
        };
        let mut rig = start_rig(cfg, Arc::new(StuckDispatcher));
        activate(&mut rig).await;

        let store = rig.store.clone();
        wait_until(|| store.live_machine_watches() == 1, "machines watch").await;

        rig.store.push_machines(MachinesChange::added(["m-0"]));
        let ev = expect_kind(&mut rig.events, EventKind::DispatchTimedOut).await;
        assert_eq!(ev.timeout_ms, Some(50));

        // The loop moved on: a config change still gets serviced.
        rig.store
            .push_config(snapshot(json!({ "type": "dummy", "zone": "f" })));
        expect_kind(&mut rig.events, EventKind::ConfigApplied).await;

        rig.handle.stop().await.expect("clean stop");
    }

    #[tokio::test]
    async fn test_stop_while_dispatcher_is_stuck() {
        let mut rig = start_rig(Config::default(), Arc::new(StuckDispatcher));
        activate(&mut rig).await;

        let store = rig.store.clone();
        wait_until(|| store.live_machine_watches() == 1, "machines watch").await;
        rig.store.push_machines(MachinesChange::added(["m-0"]));

        // Cancellation is observed even mid-dispatch.
        let res = time::timeout(Duration::from_secs(1), rig.handle.stop())
            .await
            .expect("stop should not hang");
        assert!(res.is_ok());
    }

    #[tokio::test]
    async fn test_stop_releases_both_watches() {
        let mut rig = default_rig();
        activate(&mut rig).await;

        let store = rig.store.clone();
        wait_until(|| store.live_machine_watches() == 1, "machines watch").await;

        rig.handle.stop().await.expect("clean stop");
        expect_kind(&mut rig.events, EventKind::ControllerStopped).await;
        assert_eq!(rig.store.live_config_watches(), 0);
        assert_eq!(rig.store.live_machine_watches(), 0);
    }
}
