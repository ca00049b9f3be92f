//! Error types used by the provisor runtime and its collaborators.
//!
//! This module defines four enums:
//!
//! - [`RuntimeError`] — the terminal error returned by the supervisor handle.
//! - [`WatchError`] — failures releasing a backing state-store watch.
//! - [`ConfigError`] — snapshot validation failures.
//! - [`EnvironError`] — environment construction and reconfiguration failures.
//!
//! Only [`RuntimeError`] ever reaches the caller of
//! [`stop()`](crate::ProvisionerHandle::stop). Everything else is recoverable
//! by design: the controller reports it on the event bus and keeps waiting for
//! the next usable event.

use thiserror::Error;

/// Terminal errors of the controller task.
///
/// Ordinary store churn and bad input never produce one of these; the only
/// non-`Ok` outcome is a panicked control task surfaced through the handle.
#[non_exhaustive]
#[derive(Error, Debug, Clone)]
pub enum RuntimeError {
    /// The control task panicked and was torn down by the runtime.
    #[error("controller task panicked: {reason}")]
    Panicked {
        /// Join error description from the runtime.
        reason: String,
    },
}

impl RuntimeError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            RuntimeError::Panicked { .. } => "runtime_panicked",
        }
    }
}

/// Errors releasing a backing watch against the state store.
///
/// Release failures are reported on the event bus by
/// [`ResilientWatch::invalidate`](crate::store::ResilientWatch::invalidate)
/// and never escalate.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum WatchError {
    /// The watch was already released store-side (e.g. the store closed it).
    #[error("watch already released")]
    AlreadyReleased,

    /// The store rejected the release operation.
    #[error("state store rejected release: {reason}")]
    Store {
        /// Store-side failure description.
        reason: String,
    },
}

impl WatchError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            WatchError::AlreadyReleased => "watch_already_released",
            WatchError::Store { .. } => "watch_store_rejected",
        }
    }
}

/// Snapshot validation failures.
///
/// A snapshot that fails validation is logged and skipped; the controller
/// keeps its previous state.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// The snapshot payload was not a JSON object.
    #[error("snapshot is not a JSON object")]
    NotAnObject,

    /// The snapshot carries no `"type"` key.
    #[error("missing required \"type\" key")]
    MissingType,

    /// The `"type"` key is present but not a non-empty string.
    #[error("\"type\" must be a non-empty string")]
    InvalidType,
}

/// Environment construction and reconfiguration failures.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum EnvironError {
    /// The snapshot failed validation before reaching a provider.
    #[error("invalid environment configuration: {0}")]
    Config(#[from] ConfigError),

    /// No provider is registered for the config's `"type"`.
    #[error("no provider registered for type {kind:?}")]
    UnknownProvider {
        /// The unrecognized provider type.
        kind: String,
    },

    /// A provider with this `"type"` is already registered.
    #[error("provider {kind:?} already registered")]
    DuplicateProvider {
        /// The conflicting provider type.
        kind: String,
    },

    /// The provider refused to open or reconfigure the environment.
    #[error("provider failed: {reason}")]
    Provider {
        /// Provider-side failure description.
        reason: String,
    },
}

impl EnvironError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            EnvironError::Config(_) => "environ_config_invalid",
            EnvironError::UnknownProvider { .. } => "environ_unknown_provider",
            EnvironError::DuplicateProvider { .. } => "environ_duplicate_provider",
            EnvironError::Provider { .. } => "environ_provider_failed",
        }
    }
}
