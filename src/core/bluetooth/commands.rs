//! Outbound watch command plumbing.
//! Writes go through the `CommandSender` seam so multi-write sequences can
//! be exercised without a radio.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Datelike, Local, Timelike};
use log::info;

use crate::core::bluetooth::codec::OutboundCommand;
use crate::core::bluetooth::transport::WatchTransport;

/// Command sender trait
#[async_trait]
pub trait CommandSender: Send + Sync {
    /// Send a command to the watch
    async fn send_command(&self, command: OutboundCommand) -> Result<()>;
}

/// Sends commands through the live transport's command characteristic.
#[derive(Clone)]
pub struct TransportCommandSender {
    transport: Arc<dyn WatchTransport>,
}

impl TransportCommandSender {
    pub fn new(transport: Arc<dyn WatchTransport>) -> Self {
        Self { transport }
    }
}

#[async_trait]
impl CommandSender for TransportCommandSender {
    async fn send_command(&self, command: OutboundCommand) -> Result<()> {
        let data = command.to_bytes();
        info!("Sending command to watch: {:?}", command);
        self.transport.write_command(&data).await?;
        Ok(())
    }
}

/// Command executor for the watch
pub struct CommandExecutor<T: CommandSender> {
    command_sender: T,
}

impl<T: CommandSender> CommandExecutor<T> {
    /// Create a new CommandExecutor
    pub fn new(command_sender: T) -> Self {
        Self { command_sender }
    }

    /// Send a single command.
    pub async fn send(&self, command: OutboundCommand) -> Result<()> {
        self.command_sender.send_command(command).await
    }

    /// Push the phone's wall clock to the watch, time first, then date.
    /// The watch expects the month as a zero-based index.
    pub async fn sync_datetime(&self, now: DateTime<Local>) -> Result<()> {
        self.command_sender
            .send_command(OutboundCommand::SetTime {
                hour: now.hour() as u8,
                minute: now.minute() as u8,
                second: now.second() as u8,
            })
            .await?;
        self.command_sender
            .send_command(OutboundCommand::SetDate {
                day: now.day() as u8,
                month: now.month0() as u8,
            })
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use chrono::TimeZone;

    use super::*;

    #[derive(Clone, Default)]
    struct RecordingSender {
        sent: Arc<Mutex<Vec<OutboundCommand>>>,
    }

    #[async_trait]
    impl CommandSender for RecordingSender {
        async fn send_command(&self, command: OutboundCommand) -> Result<()> {
            self.sent.lock().unwrap().push(command);
            Ok(())
        }
    }

    #[tokio::test]
    async fn datetime_sync_writes_time_then_date() {
        let sender = RecordingSender::default();
        let sent = sender.sent.clone();
        let executor = CommandExecutor::new(sender);
        let now = Local.with_ymd_and_hms(2021, 3, 5, 14, 30, 9).unwrap();

        executor.sync_datetime(now).await.unwrap();

        let sent = sent.lock().unwrap();
        assert_eq!(
            *sent,
            vec![
                OutboundCommand::SetTime { hour: 14, minute: 30, second: 9 },
                // March carried as 2: the watch counts months from zero.
                OutboundCommand::SetDate { day: 5, month: 2 },
            ]
        );
    }
}
