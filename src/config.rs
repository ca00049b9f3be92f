//! # Global runtime configuration.
//!
//! Provides [`Config`], the centralized settings for the controller runtime.
//!
//! ## Sentinel values
//! - `dispatch_timeout = 0s` → no allowance (dispatch runs until it finishes
//!   or the controller is cancelled)
//! - `bus_capacity` is clamped to a minimum of 1 by the bus

use std::time::Duration;

/// Global configuration for the controller runtime.
///
/// ## Field semantics
/// - `bus_capacity`: event bus ring buffer size (min 1; clamped)
/// - `dispatch_timeout`: upper bound for one machine-dispatch call
///   (`0s` = unbounded; cancellation is still observed either way)
#[derive(Clone, Debug)]
pub struct Config {
    /// Capacity of the event bus broadcast channel ring buffer.
    ///
    /// Slow subscribers that lag behind more than `bus_capacity` events
    /// observe `Lagged` and skip older items.
    pub bus_capacity: usize,

    /// Maximum time one [`MachineDispatcher`](crate::machines::MachineDispatcher)
    /// call may run before the controller abandons it and moves on.
    ///
    /// - `Duration::ZERO` = no bound
    /// - `> 0` = the call races against this allowance
    pub dispatch_timeout: Duration,
}

impl Config {
    /// Returns the dispatch allowance as an `Option`.
    ///
    /// - `None` → unbounded
    /// - `Some(d)` → each dispatch call is bounded by `d`
    #[inline]
    pub fn dispatch_allowance(&self) -> Option<Duration> {
        if self.dispatch_timeout == Duration::ZERO {
            None
        } else {
            Some(self.dispatch_timeout)
        }
    }

    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }
}

impl Default for Config {
    /// Default configuration:
    ///
    /// - `bus_capacity = 1024`
    /// - `dispatch_timeout = 0s` (unbounded)
    fn default() -> Self {
        Self {
            bus_capacity: 1024,
            dispatch_timeout: Duration::ZERO,
        }
    }
}
