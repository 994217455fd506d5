//! Constants used throughout the bridge
//! This module collects the UUIDs, raw status codes and tuning values in
//! one place; nothing outside it hardcodes a magic number.

use uuid::Uuid;

/// The UUID of the SG2 watch service
pub const UUID_WATCH_SERVICE: Uuid = Uuid::from_u128(0x14701820_620a_3973_7c78_9cfff0876abd);

/// The UUID of the SG2 command characteristic (phone to watch)
pub const UUID_COMMAND_CHARACTERISTIC: Uuid =
    Uuid::from_u128(0x14702856_620a_3973_7c78_9cfff0876abd);

/// The UUID of the SG2 notification characteristic (watch to phone)
pub const UUID_NOTIFY_CHARACTERISTIC: Uuid =
    Uuid::from_u128(0x14702853_620a_3973_7c78_9cfff0876abd);

/// Client-configuration descriptor value the SG2 expects before it pushes
/// notifications
pub const CCC_ENABLE_NOTIFICATIONS: [u8; 2] = [0x01, 0x00];

/// Raw link status codes observed on connection state changes
pub const STATUS_OUT_OF_RANGE: u8 = 8;
pub const STATUS_PEER_DISCONNECTED: u8 = 19;
pub const STATUS_DEVICE_NOT_FOUND: u8 = 133;
pub const STATUS_PROGRAMMATIC_DISCONNECT: u8 = 0;

/// Synthesized locally when a pending operation watchdog fires
pub const STATUS_LOCAL_TIMEOUT: u8 = 0xFE;

/// Notification source packages that produce an SMS reminder on the watch
pub const SMS_PACKAGE_ALLOWLIST: [&str; 2] =
    ["com.google.android.apps.messaging", "com.zoho.mail"];

/// Watchdog for a pending connect/discover/subscribe operation in seconds
pub const OPERATION_TIMEOUT_SECS: u64 = 10;

/// First reconnect delay in milliseconds; doubles per attempt
pub const RECONNECT_INITIAL_DELAY_MS: u64 = 1000;

/// Ceiling for the reconnect delay in milliseconds
pub const RECONNECT_MAX_DELAY_MS: u64 = 60_000;

/// Reconnect attempts before the failure is surfaced instead of retried
pub const MAX_RECONNECT_ATTEMPTS: u32 = 10;

/// Outbound commands held while the link is not steady
pub const PENDING_WRITE_CAP: usize = 16;
