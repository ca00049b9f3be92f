//! # LogWriter — simple event printer.
//!
//! A minimal subscriber that prints incoming [`Event`]s to stdout.
//! Use it for tests or demos.
//!
//! ## Example output
//! ```text
//! [environ-opened] provider="dummy"
//! [config-applied]
//! [config-rejected] reason="missing required \"type\" key"
//! [watch-invalidated] watch="environ-config"
//! [machines-dispatched] added=2 removed=0
//! [shutdown-requested]
//! [controller-stopped]
//! ```

use async_trait::async_trait;

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Event printer subscriber.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    /// Constructs a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        match e.kind {
            EventKind::ShutdownRequested => {
                println!("[shutdown-requested]");
            }
            EventKind::ControllerStopped => {
                println!("[controller-stopped]");
            }
            EventKind::WatchInvalidated => match &e.reason {
                Some(reason) => {
                    println!(
                        "[watch-invalidated] watch={:?} release_err={:?}",
                        e.watch, reason
                    );
                }
                None => println!("[watch-invalidated] watch={:?}", e.watch),
            },
            EventKind::EnvironOpened => {
                println!("[environ-opened] provider={:?}", e.provider);
            }
            EventKind::EnvironRejected => {
                println!("[environ-rejected] reason={:?}", e.reason);
            }
            EventKind::ConfigApplied => {
                println!("[config-applied]");
            }
            EventKind::ConfigRejected => {
                println!("[config-rejected] reason={:?}", e.reason);
            }
            EventKind::ApplyFailed => {
                println!("[apply-failed] reason={:?}", e.reason);
            }
            EventKind::MachinesDispatched => {
                println!(
                    "[machines-dispatched] added={:?} removed={:?}",
                    e.added, e.removed
                );
            }
            EventKind::DispatchTimedOut => {
                println!(
                    "[dispatch-timed-out] added={:?} removed={:?} timeout_ms={:?}",
                    e.added, e.removed, e.timeout_ms
                );
            }
        }
    }

    fn name(&self) -> &'static str {
        "LogWriter"
    }
}
