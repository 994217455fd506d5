//! SG2 watch bridge.
//! Discovers the paired SG2 smartwatch over BLE, keeps the link alive
//! through drops and radio trouble, and relays media controls, find-phone
//! pings and notification reminders between the watch and the host.

pub mod config;
pub mod core;
pub mod dispatch;
pub mod logging;
pub mod notifications;
pub mod status;
pub mod utils;

pub use crate::config::{DeviceStore, DeviceTarget, LinkConfig};
pub use crate::core::bluetooth::{NotificationFeed, WatchBridge};
pub use crate::notifications::NotificationEvent;
pub use crate::status::{LogStatusReporter, StatusReporter};
