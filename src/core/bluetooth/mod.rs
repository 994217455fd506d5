//! Bluetooth functionality for the SG2 bridge
//! This module handles all bluetooth operations including scanning,
//! connecting, subscribing to watch notifications and writing commands.

mod codec;
mod commands;
mod connection;
mod constants;
mod manager;
mod notification;
mod scanner;
mod transport;
mod types;

// Re-export types that should be publicly accessible
pub use codec::{DecodeError, OutboundCommand, PlaybackAction, WatchEvent, decode};
pub use commands::{CommandExecutor, CommandSender, TransportCommandSender};
pub use connection::LinkSupervisor;
pub use constants::*; // Re-export all constants
pub use manager::{NotificationFeed, WatchBridge};
pub use scanner::BluetoothScanner;
pub use transport::{BluestTransport, TransportError, WatchTransport};
pub use types::{DisconnectReason, LinkCommand, LinkEvent, LinkState, ScanResult};
