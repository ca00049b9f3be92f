//! Event subscribers: the injected observability surface.
//!
//! Implement [`Subscribe`] to observe controller events (logging, metrics,
//! alerting); [`SubscriberSet`] fans events out without ever blocking the
//! control loop.

mod set;
mod subscribe;

pub mod embedded;

pub use set::SubscriberSet;
pub use subscribe::Subscribe;

#[cfg(feature = "logging")]
pub use embedded::LogWriter;
