//! # Provider registry.
//!
//! Maps provider types (the `"type"` config key) to [`Provider`]
//! implementations. The registry is assembled at startup and handed to the
//! controller; registration is rejected for duplicate types, lookup fails for
//! unknown ones.

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::EnvironError;

use super::{Environ, EnvironConfig, Provider};

/// Registry of environment providers, keyed by type.
#[derive(Default)]
pub struct ProviderRegistry {
    providers: HashMap<String, Arc<dyn Provider>>,
}

impl ProviderRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a provider under `kind`.
    ///
    /// Returns [`EnvironError::DuplicateProvider`] if the type is taken.
    pub fn register(
        &mut self,
        kind: impl Into<String>,
        provider: Arc<dyn Provider>,
    ) -> Result<(), EnvironError> {
        let kind = kind.into();
        if self.providers.contains_key(&kind) {
            return Err(EnvironError::DuplicateProvider { kind });
        }
        self.providers.insert(kind, provider);
        Ok(())
    }

    /// Opens an environment for the given validated configuration.
    pub fn open(&self, cfg: &EnvironConfig) -> Result<Box<dyn Environ>, EnvironError> {
        let provider = self
            .providers
            .get(cfg.kind())
            .ok_or_else(|| EnvironError::UnknownProvider {
                kind: cfg.kind().to_owned(),
            })?;
        provider.open(cfg)
    }
}
