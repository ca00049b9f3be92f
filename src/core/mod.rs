//! Runtime core: the controller loop and its lifecycle surface.
//!
//! - [`provisioner`]: the two-state (`Idle`/`Active`) supervisory loop;
//! - [`builder`]: wires bus, subscribers, watches and spawns the loop;
//! - [`handle`]: cancellation + join, the only way other code touches the
//!   running controller.

mod builder;
mod handle;
mod provisioner;

pub use builder::ProvisionerBuilder;
pub use handle::ProvisionerHandle;
pub use provisioner::Provisioner;
