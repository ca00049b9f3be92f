//! # ProvisionerHandle: lifecycle surface of a running controller.
//!
//! The handle carries the cancellation token and the join handle of the
//! spawned control task. Stopping is idempotent: the first
//! [`stop`](ProvisionerHandle::stop) publishes the shutdown request and
//! cancels; every later call (and every concurrent [`wait`]) observes the
//! same terminal outcome.
//!
//! [`wait`]: ProvisionerHandle::wait

use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::error::RuntimeError;
use crate::events::{Bus, Event, EventKind};

enum Terminal {
    Running(JoinHandle<Result<(), RuntimeError>>),
    Finished(Result<(), RuntimeError>),
}

/// Handle to a running [`Provisioner`](super::Provisioner).
pub struct ProvisionerHandle {
    token: CancellationToken,
    bus: Bus,
    stop_requested: AtomicBool,
    terminal: tokio::sync::Mutex<Terminal>,
}

impl ProvisionerHandle {
    pub(crate) fn new(
        token: CancellationToken,
        bus: Bus,
        join: JoinHandle<Result<(), RuntimeError>>,
    ) -> Self {
        Self {
            token,
            bus,
            stop_requested: AtomicBool::new(false),
            terminal: tokio::sync::Mutex::new(Terminal::Running(join)),
        }
    }

    /// Requests shutdown and waits for the control task to finish.
    ///
    /// Idempotent; concurrent and repeated calls all return the same terminal
    /// outcome.
    pub async fn stop(&self) -> Result<(), RuntimeError> {
        if !self.stop_requested.swap(true, Ordering::SeqCst) {
            self.bus.publish(Event::now(EventKind::ShutdownRequested));
            self.token.cancel();
        }
        self.join().await
    }

    /// Waits for the control task to finish without requesting shutdown.
    pub async fn wait(&self) -> Result<(), RuntimeError> {
        self.join().await
    }

    /// Taps the event bus; the receiver observes subsequent events only.
    pub fn events(&self) -> broadcast::Receiver<Event> {
        self.bus.subscribe()
    }

    // Cancel-safe: the join handle is awaited in place, so a caller dropped
    // mid-join leaves it intact for the next stop()/wait().
    async fn join(&self) -> Result<(), RuntimeError> {
        let mut terminal = self.terminal.lock().await;
        match &mut *terminal {
            Terminal::Finished(result) => result.clone(),
            Terminal::Running(join) => {
                let result = match join.await {
                    Ok(result) => result,
                    Err(err) => Err(RuntimeError::Panicked {
                        reason: err.to_string(),
                    }),
                };
                *terminal = Terminal::Finished(result.clone());
                result
            }
        }
    }
}
