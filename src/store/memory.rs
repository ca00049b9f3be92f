//! # MemoryStore: scriptable in-process state store.
//!
//! Stands in for the real store in unit tests and demos. Tests drive it
//! directly: [`push_config`](MemoryStore::push_config) delivers a snapshot to
//! every live configuration watch, [`close_config`](MemoryStore::close_config)
//! closes them (the controller observes end-of-channel and resubscribes
//! lazily), same pair for the machines stream. Counters expose how many
//! watches were ever opened and how many are live, so tests can pin down the
//! lazy-subscription contract.
//!
//! A fresh configuration watch immediately receives the latest pushed
//! snapshot, the way a real state watcher delivers current state on watch.
//! Closing the stream forgets it. Machine deltas are not replayed.
//!
//! Cloning is cheap and clones share the same state.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::mpsc;

use crate::environs::ConfigSnapshot;
use crate::error::WatchError;
use crate::machines::MachinesChange;

use super::{StateStore, Watch};

/// One registered watch channel.
struct Tap<T> {
    id: u64,
    tx: mpsc::UnboundedSender<T>,
}

/// One watchable stream of values.
struct Stream<T> {
    taps: Vec<Tap<T>>,
    opened: usize,
}

impl<T> Default for Stream<T> {
    fn default() -> Self {
        Self {
            taps: Vec::new(),
            opened: 0,
        }
    }
}

impl<T: Clone> Stream<T> {
    fn push(&mut self, value: T) {
        self.taps.retain(|tap| tap.tx.send(value.clone()).is_ok());
    }

    fn close(&mut self) {
        self.taps.clear();
    }

    fn remove(&mut self, id: u64) -> bool {
        let before = self.taps.len();
        self.taps.retain(|tap| tap.id != id);
        self.taps.len() != before
    }
}

#[derive(Default)]
struct Inner {
    next_id: u64,
    config: Stream<ConfigSnapshot>,
    last_config: Option<ConfigSnapshot>,
    machines: Stream<MachinesChange>,
}

/// Scriptable in-process [`StateStore`].
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
}

fn lock(inner: &Mutex<Inner>) -> MutexGuard<'_, Inner> {
    inner.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Delivers a configuration snapshot to all live configuration watches
    /// and remembers it for watches opened later.
    pub fn push_config(&self, snapshot: ConfigSnapshot) {
        let mut inner = lock(&self.inner);
        inner.last_config = Some(snapshot.clone());
        inner.config.push(snapshot);
    }

    /// Closes all live configuration watches (store-side fault simulation).
    ///
    /// Watches opened afterwards start fresh; the remembered snapshot is
    /// forgotten.
    pub fn close_config(&self) {
        let mut inner = lock(&self.inner);
        inner.last_config = None;
        inner.config.close();
    }

    /// Delivers a machine-set delta to all live machine watches.
    pub fn push_machines(&self, change: MachinesChange) {
        lock(&self.inner).machines.push(change);
    }

    /// Closes all live machine watches.
    pub fn close_machines(&self) {
        lock(&self.inner).machines.close();
    }

    /// Total configuration watches ever opened.
    pub fn config_watch_count(&self) -> usize {
        lock(&self.inner).config.opened
    }

    /// Total machine watches ever opened.
    pub fn machine_watch_count(&self) -> usize {
        lock(&self.inner).machines.opened
    }

    /// Configuration watches currently live (not closed, not released).
    pub fn live_config_watches(&self) -> usize {
        lock(&self.inner).config.taps.len()
    }

    /// Machine watches currently live.
    pub fn live_machine_watches(&self) -> usize {
        lock(&self.inner).machines.taps.len()
    }
}

impl StateStore for MemoryStore {
    fn watch_environ_config(&self) -> Watch<ConfigSnapshot> {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = {
            let mut inner = lock(&self.inner);
            let id = inner.next_id;
            inner.next_id += 1;
            if let Some(snapshot) = &inner.last_config {
                let _ = tx.send(snapshot.clone());
            }
            inner.config.taps.push(Tap { id, tx });
            inner.config.opened += 1;
            id
        };
        let shared = Arc::clone(&self.inner);
        Watch::new(rx, move || {
            if lock(&shared).config.remove(id) {
                Ok(())
            } else {
                Err(WatchError::AlreadyReleased)
            }
        })
    }

    fn watch_machines(&self) -> Watch<MachinesChange> {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = {
            let mut inner = lock(&self.inner);
            let id = inner.next_id;
            inner.next_id += 1;
            inner.machines.taps.push(Tap { id, tx });
            inner.machines.opened += 1;
            id
        };
        let shared = Arc::clone(&self.inner);
        Watch::new(rx, move || {
            if lock(&shared).machines.remove(id) {
                Ok(())
            } else {
                Err(WatchError::AlreadyReleased)
            }
        })
    }
}
