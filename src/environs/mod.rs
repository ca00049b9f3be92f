//! Environment boundary: snapshots, validated configs, providers.
//!
//! An *environment* is the provisioned backend the controller manages. The
//! controller never constructs one directly: a validated
//! [`EnvironConfig`] names a provider type, the [`ProviderRegistry`] looks the
//! [`Provider`] up and asks it to open an [`Environ`]. Reconfiguration goes
//! through [`Environ::apply_config`] on the live handle.

mod config;
mod registry;

pub mod dummy;

pub use config::{ConfigSnapshot, EnvironConfig};
pub use registry::ProviderRegistry;

use crate::error::EnvironError;

/// A live, provisioned environment.
///
/// Exclusively owned by the controller task for as long as the controller is
/// `Active`; discarded on the fall back to `Idle`. Operations are synchronous
/// and expected to be fast/local — callers needing prompt cancellation around
/// slow backends must layer their own timeout.
pub trait Environ: Send + 'static {
    /// The provider type this environment was opened with.
    fn kind(&self) -> &str;

    /// Applies a new validated configuration in place.
    ///
    /// On error the previous configuration must remain in effect.
    fn apply_config(&mut self, cfg: EnvironConfig) -> Result<(), EnvironError>;
}

/// Opens environments of one provider type.
pub trait Provider: Send + Sync + 'static {
    /// Constructs a live environment from a validated configuration.
    fn open(&self, cfg: &EnvironConfig) -> Result<Box<dyn Environ>, EnvironError>;
}
