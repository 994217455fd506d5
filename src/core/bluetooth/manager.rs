//! Bridge facade.
//! Owns the transport and the supervisor task and exposes the only two
//! upward entry points, start and stop, plus the notification-event feed.

use std::sync::Arc;

use anyhow::{Result, anyhow};
use log::info;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::config::{DeviceTarget, LinkConfig};
use crate::core::bluetooth::connection::LinkSupervisor;
use crate::core::bluetooth::transport::{BluestTransport, WatchTransport};
use crate::core::bluetooth::types::{LinkCommand, LinkEvent};
use crate::dispatch::CommandDispatcher;
use crate::notifications::NotificationEvent;
use crate::status::StatusReporter;

/// Clonable handle the host's notification listener posts into.
#[derive(Clone)]
pub struct NotificationFeed {
    commands: mpsc::Sender<LinkCommand>,
}

impl NotificationFeed {
    pub async fn post(&self, event: NotificationEvent) -> Result<()> {
        self.commands
            .send(LinkCommand::NotificationPosted(event))
            .await
            .map_err(|_| anyhow!("link supervisor is gone"))
    }
}

pub struct WatchBridge {
    commands: mpsc::Sender<LinkCommand>,
    supervisor: Option<JoinHandle<()>>,
}

impl WatchBridge {
    /// Builds the bluest-backed transport and spawns the link supervisor.
    pub async fn new(
        dispatcher: CommandDispatcher,
        reporter: Arc<dyn StatusReporter>,
        config: LinkConfig,
    ) -> Result<Self> {
        let (events_tx, events_rx) = mpsc::channel(64);
        let transport = Arc::new(BluestTransport::new(events_tx).await?);
        Ok(Self::with_transport(transport, dispatcher, reporter, config, events_rx))
    }

    /// Wires a supervisor over an existing transport and its event channel.
    pub fn with_transport(
        transport: Arc<dyn WatchTransport>,
        dispatcher: CommandDispatcher,
        reporter: Arc<dyn StatusReporter>,
        config: LinkConfig,
        events: mpsc::Receiver<LinkEvent>,
    ) -> Self {
        let (commands_tx, commands_rx) = mpsc::channel(32);
        let supervisor =
            LinkSupervisor::new(transport, dispatcher, reporter, config, commands_rx, events);
        Self { commands: commands_tx, supervisor: Some(supervisor.spawn()) }
    }

    /// Begin scanning for and maintaining a link to the paired watch.
    pub async fn start(&self, target: DeviceTarget) -> Result<()> {
        self.commands
            .send(LinkCommand::Start(target))
            .await
            .map_err(|_| anyhow!("link supervisor is gone"))
    }

    /// Tear the link down and end the supervisor. Idempotent.
    pub async fn stop(&mut self) -> Result<()> {
        if self.commands.send(LinkCommand::Stop).await.is_err() {
            info!("Bridge already stopped");
            return Ok(());
        }
        if let Some(handle) = self.supervisor.take() {
            handle.await?;
        }
        Ok(())
    }

    /// Feed for host notification events.
    pub fn notification_feed(&self) -> NotificationFeed {
        NotificationFeed { commands: self.commands.clone() }
    }
}
