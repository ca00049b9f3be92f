//! Runtime events and the bus they travel on.
//!
//! The controller is the sole publisher; subscribers observe what it did and
//! why. This replaces ambient global logging: anything worth logging is an
//! [`Event`] on the [`Bus`], and a logger is just one more subscriber.

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind};
