//! Watch link state machine.
//! A single supervisor task owns the connection lifecycle: scan, connect,
//! discover, subscribe, steady state and recovery. Transport events and
//! external commands arrive on one serialized queue; nothing else mutates
//! link state, and at most one outbound write is in flight at a time.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use chrono::Local;
use log::{debug, error, info, warn};
use rand::Rng;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::config::{DeviceTarget, LinkConfig};
use crate::core::bluetooth::codec::{self, OutboundCommand};
use crate::core::bluetooth::commands::{CommandExecutor, TransportCommandSender};
use crate::core::bluetooth::constants::{
    CCC_ENABLE_NOTIFICATIONS, STATUS_DEVICE_NOT_FOUND, STATUS_LOCAL_TIMEOUT,
};
use crate::core::bluetooth::transport::{TransportError, WatchTransport};
use crate::core::bluetooth::types::{
    DisconnectReason, LinkCommand, LinkEvent, LinkState, ScanResult,
};
use crate::dispatch::{CommandDispatcher, DispatchOutcome};
use crate::notifications::NotificationEvent;
use crate::status::StatusReporter;

/// Exponential backoff with jitter for reconnect scheduling.
struct Backoff {
    initial: Duration,
    max_delay: Duration,
    max_attempts: u32,
    base: Duration,
    attempt: u32,
}

impl Backoff {
    fn new(config: &LinkConfig) -> Self {
        Self {
            initial: config.reconnect_initial_delay,
            max_delay: config.reconnect_max_delay,
            max_attempts: config.max_reconnect_attempts,
            base: config.reconnect_initial_delay,
            attempt: 0,
        }
    }

    /// The delay before the next attempt, or None once attempts run out.
    fn next_delay(&mut self) -> Option<Duration> {
        if self.attempt >= self.max_attempts {
            return None;
        }
        self.attempt += 1;
        let jitter_ceiling = (self.base.as_millis() as u64 / 4).max(1);
        let jitter = rand::rng().random_range(0..jitter_ceiling);
        let delay = self.base + Duration::from_millis(jitter);
        self.base = (self.base * 2).min(self.max_delay);
        Some(delay)
    }

    fn reset(&mut self) {
        self.base = self.initial;
        self.attempt = 0;
    }
}

/// What an armed deadline means when it fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DeadlineKind {
    /// Watchdog on a pending connect/discover/subscribe operation
    Operation,
    /// Scheduled reconnect attempt
    Reconnect,
}

pub struct LinkSupervisor {
    transport: Arc<dyn WatchTransport>,
    dispatcher: CommandDispatcher,
    executor: CommandExecutor<TransportCommandSender>,
    reporter: Arc<dyn StatusReporter>,
    config: LinkConfig,
    state: LinkState,
    target: Option<DeviceTarget>,
    backoff: Backoff,
    pending_writes: VecDeque<OutboundCommand>,
    deadline: Option<(Instant, DeadlineKind)>,
    /// True from the first connect until the handle is released; the
    /// disconnect/close pair runs exactly once per connection.
    handle_open: bool,
    commands: mpsc::Receiver<LinkCommand>,
    events: mpsc::Receiver<LinkEvent>,
}

impl LinkSupervisor {
    pub fn new(
        transport: Arc<dyn WatchTransport>,
        dispatcher: CommandDispatcher,
        reporter: Arc<dyn StatusReporter>,
        config: LinkConfig,
        commands: mpsc::Receiver<LinkCommand>,
        events: mpsc::Receiver<LinkEvent>,
    ) -> Self {
        let executor = CommandExecutor::new(TransportCommandSender::new(transport.clone()));
        let backoff = Backoff::new(&config);
        Self {
            transport,
            dispatcher,
            executor,
            reporter,
            config,
            state: LinkState::Idle,
            target: None,
            backoff,
            pending_writes: VecDeque::new(),
            deadline: None,
            handle_open: false,
            commands,
            events,
        }
    }

    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    /// Processes the serialized command/event queue until stopped.
    pub async fn run(mut self) {
        loop {
            let deadline_at = self.deadline.map(|(at, _)| at);
            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(LinkCommand::Start(target)) => self.start(target).await,
                    Some(LinkCommand::NotificationPosted(event)) => {
                        self.on_notification_posted(event).await;
                    }
                    Some(LinkCommand::Stop) | None => {
                        self.shutdown().await;
                        break;
                    }
                },
                event = self.events.recv() => match event {
                    Some(event) => self.handle_event(event).await,
                    None => {
                        self.shutdown().await;
                        break;
                    }
                },
                _ = tokio::time::sleep_until(deadline_at.unwrap_or_else(Instant::now)),
                    if deadline_at.is_some() =>
                {
                    self.handle_deadline().await;
                }
            }
        }
    }

    async fn handle_event(&mut self, event: LinkEvent) {
        match event {
            LinkEvent::DeviceSighted(sighting) => self.on_sighted(sighting).await,
            LinkEvent::ScanFailed => self.on_scan_failed(),
            LinkEvent::Connected => self.on_connected().await,
            LinkEvent::ServicesDiscovered { service_found } => {
                self.on_discovered(service_found).await;
            }
            LinkEvent::SubscribeAcknowledged => self.on_subscribed().await,
            LinkEvent::WatchNotification(payload) => self.on_watch_notification(&payload).await,
            LinkEvent::Disconnected { status } => self.on_disconnected(status).await,
        }
    }

    async fn start(&mut self, target: DeviceTarget) {
        match self.state {
            LinkState::Idle | LinkState::Disconnected(_) => {}
            _ => {
                warn!("Start requested while {:?}; ignoring", self.state);
                return;
            }
        }
        info!(
            "Starting watch link to {} ({})",
            target.address,
            target.name.as_deref().unwrap_or("unnamed")
        );
        self.release_handle().await;
        self.clear_deadline();
        self.backoff.reset();
        self.target = Some(target);

        match self.transport.start_scan().await {
            Ok(()) => {
                self.set_state(LinkState::Scanning);
                self.report("Scanning");
            }
            Err(TransportError::AdapterUnavailable) => {
                error!("Bluetooth adapter unavailable; not scanning");
                self.report("Error (Bluetooth Off)");
            }
            Err(e) => {
                error!("Failed to start scan: {}", e);
                self.report("Error (Scan Failed)");
            }
        }
    }

    async fn on_sighted(&mut self, sighting: ScanResult) {
        if self.state != LinkState::Scanning {
            return;
        }
        let Some(target) = &self.target else { return };
        if !sighting.address.eq_ignore_ascii_case(&target.address) {
            debug!("Ignoring advertisement from {}", sighting.address);
            return;
        }
        info!(
            "Target device found: {} ({})",
            sighting.address,
            sighting.name.as_deref().unwrap_or("unnamed")
        );
        self.report("Scanning (Device Found)");

        if let Err(e) = self.transport.stop_scan().await {
            warn!("Failed to stop scan: {}", e);
        }
        self.set_state(LinkState::Connecting);
        self.report("Connecting");
        self.handle_open = true;
        self.arm_operation_deadline();
        if let Err(e) = self.transport.connect(&sighting.address).await {
            error!("Connect failed to start: {}", e);
            self.on_disconnected(STATUS_DEVICE_NOT_FOUND).await;
        }
    }

    fn on_scan_failed(&mut self) {
        if self.state != LinkState::Scanning {
            return;
        }
        error!("Scan failed; Bluetooth adapter off or unavailable");
        self.set_state(LinkState::Idle);
        self.report("Error (Bluetooth Off)");
    }

    async fn on_connected(&mut self) {
        if !matches!(self.state, LinkState::Connecting | LinkState::Reconnecting) {
            return;
        }
        self.set_state(LinkState::Discovering);
        self.report("Connected");
        self.arm_operation_deadline();
        if let Err(e) = self.transport.discover_services().await {
            error!("Service discovery failed to start: {}", e);
            self.on_disconnected(STATUS_LOCAL_TIMEOUT).await;
        }
    }

    async fn on_discovered(&mut self, service_found: bool) {
        if self.state != LinkState::Discovering {
            return;
        }
        if !service_found {
            error!("Watch service missing on the connected device");
            self.clear_deadline();
            self.set_state(LinkState::Disconnected(DisconnectReason::ServiceNotFound));
            self.report("Error (Service Missing)");
            // Wrong device or wrong firmware; stays down until an explicit
            // restart.
            self.release_handle().await;
            return;
        }
        self.set_state(LinkState::SubscribingNotify);
        self.arm_operation_deadline();
        if let Err(e) = self.transport.subscribe_notifications(&CCC_ENABLE_NOTIFICATIONS).await {
            error!("Notification subscription failed: {}", e);
            self.on_disconnected(STATUS_LOCAL_TIMEOUT).await;
        }
    }

    async fn on_subscribed(&mut self) {
        if self.state != LinkState::SubscribingNotify {
            return;
        }
        self.clear_deadline();
        self.backoff.reset();
        self.set_state(LinkState::Steady);
        self.report("Connected");
        info!("Watch link is up; notifications armed");
        self.flush_pending_writes().await;
    }

    async fn on_watch_notification(&mut self, payload: &[u8]) {
        if self.state != LinkState::Steady {
            debug!("Notification outside steady state; ignoring {:02x?}", payload);
            return;
        }
        let event = match codec::decode(payload) {
            Ok(event) => event,
            Err(e) => {
                warn!("Undecodable watch frame {:02x?}: {}", payload, e);
                return;
            }
        };
        debug!("Watch event: {:?}", event);
        match self.dispatcher.handle_watch_event(event) {
            DispatchOutcome::None => {}
            DispatchOutcome::SyncDateTime => {
                if let Err(e) = self.executor.sync_datetime(Local::now()).await {
                    warn!("Date/time sync failed: {}", e);
                }
            }
        }
    }

    async fn on_notification_posted(&mut self, event: NotificationEvent) {
        if let Some(command) = self.dispatcher.reminder_for(&event) {
            self.submit_write(command).await;
        }
    }

    async fn on_disconnected(&mut self, status: u8) {
        if !self.handle_open {
            debug!("Disconnect status {} with no open handle; ignoring", status);
            return;
        }
        if matches!(self.state, LinkState::Disconnected(_)) {
            debug!("Already disconnected; ignoring duplicate status {}", status);
            return;
        }
        let reason = DisconnectReason::from_status(status);
        error!("Link dropped: {:?} (status {})", reason, status);
        self.clear_deadline();
        self.set_state(LinkState::Disconnected(reason));
        self.report("Disconnected");
        self.schedule_reconnect();
    }

    fn schedule_reconnect(&mut self) {
        match self.backoff.next_delay() {
            Some(delay) => {
                info!("Reconnect attempt {} in {:?}", self.backoff.attempt, delay);
                self.deadline = Some((Instant::now() + delay, DeadlineKind::Reconnect));
            }
            None => {
                error!("Reconnect attempts exhausted; waiting for an explicit restart");
                self.report("Error (Reconnect Limit)");
            }
        }
    }

    async fn handle_deadline(&mut self) {
        let Some((_, kind)) = self.deadline.take() else { return };
        match kind {
            DeadlineKind::Operation => {
                warn!("Pending operation timed out in {:?}", self.state);
                if let Err(e) = self.transport.disconnect().await {
                    debug!("Disconnect after timeout: {}", e);
                }
                self.on_disconnected(STATUS_LOCAL_TIMEOUT).await;
            }
            DeadlineKind::Reconnect => {
                self.set_state(LinkState::Reconnecting);
                self.report("Reconnecting");
                self.arm_operation_deadline();
                if let Err(e) = self.transport.reconnect().await {
                    error!("Reconnect failed to start: {}", e);
                    self.on_disconnected(STATUS_DEVICE_NOT_FOUND).await;
                }
            }
        }
    }

    /// Writes now when the link is steady, otherwise holds the command in
    /// the bounded pending queue.
    async fn submit_write(&mut self, command: OutboundCommand) {
        if self.state == LinkState::Steady {
            if let Err(e) = self.executor.send(command).await {
                warn!("Write failed: {}", e);
            }
            return;
        }
        if self.pending_writes.len() >= self.config.pending_write_cap {
            warn!("Pending write queue full; dropping {:?}", command);
            self.report("Error (Write Queue Full)");
            return;
        }
        info!("Link not steady; queueing {:?}", command);
        self.pending_writes.push_back(command);
    }

    async fn flush_pending_writes(&mut self) {
        while let Some(command) = self.pending_writes.pop_front() {
            if self.state != LinkState::Steady {
                self.pending_writes.push_front(command);
                break;
            }
            if let Err(e) = self.executor.send(command).await {
                warn!("Queued write failed: {}", e);
            }
        }
    }

    async fn shutdown(&mut self) {
        info!("Stopping watch link");
        self.clear_deadline();
        if self.state == LinkState::Scanning {
            if let Err(e) = self.transport.stop_scan().await {
                warn!("Failed to stop scan during shutdown: {}", e);
            }
        }
        self.release_handle().await;
        self.set_state(LinkState::Idle);
        self.report("Stopped");
    }

    /// Disconnect, then close, exactly once per connection.
    async fn release_handle(&mut self) {
        if !self.handle_open {
            return;
        }
        self.handle_open = false;
        if let Err(e) = self.transport.disconnect().await {
            debug!("Disconnect during teardown: {}", e);
        }
        if let Err(e) = self.transport.close().await {
            warn!("Close failed: {}", e);
        }
    }

    fn arm_operation_deadline(&mut self) {
        self.deadline =
            Some((Instant::now() + self.config.operation_timeout, DeadlineKind::Operation));
    }

    fn clear_deadline(&mut self) {
        self.deadline = None;
    }

    fn set_state(&mut self, state: LinkState) {
        debug!("Link state {:?} -> {:?}", self.state, state);
        self.state = state;
    }

    /// Pure projection for the outside world; drives no logic.
    fn report(&self, status: &str) {
        self.reporter.report(status);
    }
}
