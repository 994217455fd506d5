//! Link status surface.
//! The supervisor projects every state change into a short human-readable
//! line; consumers must not block the caller.

use log::info;

/// Receives a status line on every link state change.
pub trait StatusReporter: Send + Sync {
    fn report(&self, status: &str);
}

/// Default reporter: writes the status line to the log.
pub struct LogStatusReporter;

impl StatusReporter for LogStatusReporter {
    fn report(&self, status: &str) {
        info!("Status: {}", status);
    }
}
