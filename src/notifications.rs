//! Inbound host notification events.

use serde::{Deserialize, Serialize};

/// One notification posted on the host, as delivered by the platform's
/// notification-listener facility.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationEvent {
    /// Source package identifier
    pub package: String,
    pub title: String,
    pub body: String,
}

impl NotificationEvent {
    pub fn new(
        package: impl Into<String>,
        title: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self { package: package.into(), title: title.into(), body: body.into() }
    }
}
