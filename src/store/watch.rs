//! # Watch: one backing subscription against the store.
//!
//! A [`Watch`] couples a receive channel of snapshots with the store-side
//! release operation. The channel closing (`recv()` → `None`) is the store's
//! way of saying the watcher died; it is never fatal to the caller — see
//! [`ResilientWatch`](crate::store::ResilientWatch) for the resubscription
//! contract.

use tokio::sync::mpsc;

use crate::error::WatchError;

/// Store-side release operation, invoked at most once.
///
/// `Sync` because the owning watch is held across `await`s by a spawned task.
pub type ReleaseFn = Box<dyn FnOnce() -> Result<(), WatchError> + Send + Sync>;

/// Handle to one live watch: a stream of values plus a release operation.
pub struct Watch<T> {
    rx: mpsc::UnboundedReceiver<T>,
    release: Option<ReleaseFn>,
}

impl<T> Watch<T> {
    /// Creates a watch from a channel and the matching release operation.
    pub fn new(
        rx: mpsc::UnboundedReceiver<T>,
        release: impl FnOnce() -> Result<(), WatchError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            rx,
            release: Some(Box::new(release)),
        }
    }

    /// Receives the next value; `None` means the store closed the watch.
    ///
    /// Cancel-safe: no value is lost if the future is dropped mid-wait.
    pub async fn recv(&mut self) -> Option<T> {
        self.rx.recv().await
    }

    /// Releases the watch store-side, consuming the handle.
    pub fn release(mut self) -> Result<(), WatchError> {
        match self.release.take() {
            Some(f) => f(),
            None => Ok(()),
        }
    }
}

impl<T> Drop for Watch<T> {
    fn drop(&mut self) {
        if let Some(f) = self.release.take() {
            let _ = f();
        }
    }
}
