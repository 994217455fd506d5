//! Link supervision tuning.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::bluetooth::{
    MAX_RECONNECT_ATTEMPTS, OPERATION_TIMEOUT_SECS, PENDING_WRITE_CAP,
    RECONNECT_INITIAL_DELAY_MS, RECONNECT_MAX_DELAY_MS,
};

/// Tuning for the connection state machine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkConfig {
    /// Watchdog for a pending connect/discover/subscribe operation
    pub operation_timeout: Duration,
    /// First reconnect delay; doubles per attempt
    pub reconnect_initial_delay: Duration,
    /// Ceiling for the reconnect delay
    pub reconnect_max_delay: Duration,
    /// Attempts before the failure is surfaced instead of retried
    pub max_reconnect_attempts: u32,
    /// Outbound commands held while the link is not steady
    pub pending_write_cap: usize,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            operation_timeout: Duration::from_secs(OPERATION_TIMEOUT_SECS),
            reconnect_initial_delay: Duration::from_millis(RECONNECT_INITIAL_DELAY_MS),
            reconnect_max_delay: Duration::from_millis(RECONNECT_MAX_DELAY_MS),
            max_reconnect_attempts: MAX_RECONNECT_ATTEMPTS,
            pending_write_cap: PENDING_WRITE_CAP,
        }
    }
}
