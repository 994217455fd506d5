//! Shared data structures for the Bluetooth module.

use crate::config::DeviceTarget;
use crate::core::bluetooth::constants::{
    STATUS_DEVICE_NOT_FOUND, STATUS_OUT_OF_RANGE, STATUS_PEER_DISCONNECTED,
    STATUS_PROGRAMMATIC_DISCONNECT,
};
use crate::notifications::NotificationEvent;

/// One advertisement observed while scanning. A later sighting of the same
/// address supersedes the earlier one.
#[derive(Debug, Clone)]
pub struct ScanResult {
    /// Link address of the advertiser (MAC on most platforms, an opaque
    /// platform id where the MAC is hidden)
    pub address: String,
    /// Advertised name, if any
    pub name: Option<String>,
    /// Signal strength of the advertisement
    pub rssi: Option<i16>,
}

/// Lifecycle state of the watch link
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    Idle,
    Scanning,
    Connecting,
    Discovering,
    SubscribingNotify,
    /// Notifications are armed; outbound writes are permitted
    Steady,
    Disconnected(DisconnectReason),
    Reconnecting,
}

/// Why the link dropped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisconnectReason {
    OutOfRange,
    PeerDisconnected,
    DeviceNotFound,
    ProgrammaticDisconnect,
    /// The watch service is absent on the connected device; a configuration
    /// error, never retried automatically
    ServiceNotFound,
    Unhandled(u8),
}

impl DisconnectReason {
    /// Translates a raw platform status code. The only place the magic
    /// numbers are interpreted.
    pub fn from_status(status: u8) -> Self {
        match status {
            STATUS_OUT_OF_RANGE => Self::OutOfRange,
            STATUS_PEER_DISCONNECTED => Self::PeerDisconnected,
            STATUS_DEVICE_NOT_FOUND => Self::DeviceNotFound,
            STATUS_PROGRAMMATIC_DISCONNECT => Self::ProgrammaticDisconnect,
            other => Self::Unhandled(other),
        }
    }
}

/// Transport-originated event, serialized onto the supervisor's queue
#[derive(Debug, Clone)]
pub enum LinkEvent {
    DeviceSighted(ScanResult),
    /// The scan could not be started (adapter off or unavailable)
    ScanFailed,
    Connected,
    ServicesDiscovered { service_found: bool },
    SubscribeAcknowledged,
    /// Raw payload pushed by the watch's notification characteristic
    WatchNotification(Vec<u8>),
    Disconnected { status: u8 },
}

/// External command for the supervisor
#[derive(Debug, Clone)]
pub enum LinkCommand {
    Start(DeviceTarget),
    Stop,
    NotificationPosted(NotificationEvent),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_translate() {
        assert_eq!(DisconnectReason::from_status(8), DisconnectReason::OutOfRange);
        assert_eq!(DisconnectReason::from_status(19), DisconnectReason::PeerDisconnected);
        assert_eq!(DisconnectReason::from_status(133), DisconnectReason::DeviceNotFound);
        assert_eq!(
            DisconnectReason::from_status(0),
            DisconnectReason::ProgrammaticDisconnect
        );
        assert_eq!(DisconnectReason::from_status(62), DisconnectReason::Unhandled(62));
    }
}
