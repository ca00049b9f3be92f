//! # Dummy provider: recording environment for tests and demos.
//!
//! [`DummyProvider`] opens environments that do nothing but record what
//! happened to them through a shared [`DummyRecorder`]. Two config attributes
//! act as failure switches so error paths can be exercised
//! deterministically:
//!
//! - `"broken": true` — `open` fails (construction failure while `Idle`)
//! - `"refuse-config": true` — `apply_config` fails (apply failure while
//!   `Active`; the previous configuration stays in effect)

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use crate::error::EnvironError;

use super::{Environ, EnvironConfig, Provider};

/// Shared record of everything dummy environments did.
#[derive(Default)]
pub struct DummyRecorder {
    opens: AtomicUsize,
    applied: Mutex<Vec<EnvironConfig>>,
}

impl DummyRecorder {
    /// Number of successful `open` calls.
    pub fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    /// Configurations successfully applied, in order.
    pub fn applied(&self) -> Vec<EnvironConfig> {
        self.applied
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

/// Provider of recording no-op environments.
#[derive(Default)]
pub struct DummyProvider {
    recorder: Arc<DummyRecorder>,
}

impl DummyProvider {
    /// Creates a provider with a fresh recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// The recorder shared with every environment this provider opens.
    pub fn recorder(&self) -> Arc<DummyRecorder> {
        Arc::clone(&self.recorder)
    }
}

impl Provider for DummyProvider {
    fn open(&self, cfg: &EnvironConfig) -> Result<Box<dyn Environ>, EnvironError> {
        if cfg.flag("broken") {
            return Err(EnvironError::Provider {
                reason: "dummy provider marked broken".into(),
            });
        }
        self.recorder.opens.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(DummyEnviron {
            cfg: cfg.clone(),
            recorder: Arc::clone(&self.recorder),
        }))
    }
}

/// A live dummy environment.
pub struct DummyEnviron {
    cfg: EnvironConfig,
    recorder: Arc<DummyRecorder>,
}

impl Environ for DummyEnviron {
    fn kind(&self) -> &str {
        self.cfg.kind()
    }

    fn apply_config(&mut self, cfg: EnvironConfig) -> Result<(), EnvironError> {
        if cfg.flag("refuse-config") {
            return Err(EnvironError::Provider {
                reason: "dummy environ refused the config".into(),
            });
        }
        self.recorder
            .applied
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(cfg.clone());
        self.cfg = cfg;
        Ok(())
    }
}
