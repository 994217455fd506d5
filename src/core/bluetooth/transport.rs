//! Transport seam over the host BLE stack.
//! Operations are fire-and-forget: outcomes and unsolicited events arrive on
//! the supervisor's event channel. The transport matches only the UUIDs it
//! was given; what the payloads mean lives in the state machine and codec.

use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex};

use async_trait::async_trait;
use bluest::{Adapter, Characteristic, Device};
use log::{error, info, warn};
use thiserror::Error;
use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;

use crate::core::bluetooth::constants::{
    STATUS_DEVICE_NOT_FOUND, STATUS_OUT_OF_RANGE, UUID_COMMAND_CHARACTERISTIC,
    UUID_NOTIFY_CHARACTERISTIC, UUID_WATCH_SERVICE,
};
use crate::core::bluetooth::notification::pump_notifications;
use crate::core::bluetooth::scanner::BluetoothScanner;
use crate::core::bluetooth::types::LinkEvent;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("no Bluetooth adapter available")]
    AdapterUnavailable,
    #[error("device {0} has not been sighted")]
    UnknownDevice(String),
    #[error("no active connection")]
    NotConnected,
    #[error("service discovery has not completed")]
    NotDiscovered,
    #[error(transparent)]
    Ble(#[from] bluest::Error),
}

/// Capability set the link supervisor drives. All calls return quickly;
/// connection outcomes, notifications and drops are delivered as
/// [`LinkEvent`]s on the channel handed to the implementation.
#[async_trait]
pub trait WatchTransport: Send + Sync + 'static {
    async fn start_scan(&self) -> Result<(), TransportError>;
    async fn stop_scan(&self) -> Result<(), TransportError>;
    /// Connect to a previously sighted device by address.
    async fn connect(&self, address: &str) -> Result<(), TransportError>;
    /// Disconnect-then-connect on the cached handle; no re-scan.
    async fn reconnect(&self) -> Result<(), TransportError>;
    async fn discover_services(&self) -> Result<(), TransportError>;
    /// Write the client-configuration descriptor and start the
    /// notification pump.
    async fn subscribe_notifications(&self, ccc_value: &[u8]) -> Result<(), TransportError>;
    async fn write_command(&self, payload: &[u8]) -> Result<(), TransportError>;
    async fn disconnect(&self) -> Result<(), TransportError>;
    /// Release the connection handle. The supervisor calls this exactly once
    /// per connection.
    async fn close(&self) -> Result<(), TransportError>;
}

/// Live link handles for one connection. Recreated, not reused, across
/// reconnect attempts.
struct ConnectedWatch {
    device: Device,
    command_char: Option<Characteristic>,
    notify_char: Option<Characteristic>,
    pump_cancel: Option<CancellationToken>,
}

impl ConnectedWatch {
    fn new(device: Device) -> Self {
        Self { device, command_char: None, notify_char: None, pump_cancel: None }
    }

    fn cancel_pump(&mut self) {
        if let Some(token) = self.pump_cancel.take() {
            token.cancel();
        }
    }
}

/// Production transport backed by the `bluest` host stack.
pub struct BluestTransport {
    adapter: Adapter,
    events: mpsc::Sender<LinkEvent>,
    devices: Arc<StdMutex<HashMap<String, Device>>>,
    scanner: Mutex<BluetoothScanner>,
    connected: Arc<Mutex<Option<ConnectedWatch>>>,
}

impl BluestTransport {
    /// Waits for the default adapter and wires the scan worker.
    pub async fn new(events: mpsc::Sender<LinkEvent>) -> Result<Self, TransportError> {
        let adapter = Adapter::default()
            .await
            .ok_or(TransportError::AdapterUnavailable)?;
        adapter.wait_available().await?;
        info!("Bluetooth adapter is available.");

        let devices = Arc::new(StdMutex::new(HashMap::new()));
        let scanner = BluetoothScanner::new(adapter.clone(), devices.clone());

        Ok(Self {
            adapter,
            events,
            devices,
            scanner: Mutex::new(scanner),
            connected: Arc::new(Mutex::new(None)),
        })
    }

    async fn connected_device(&self) -> Result<Device, TransportError> {
        let guard = self.connected.lock().await;
        guard
            .as_ref()
            .map(|watch| watch.device.clone())
            .ok_or(TransportError::NotConnected)
    }

    fn spawn_connect(&self, device: Device) {
        let adapter = self.adapter.clone();
        let events = self.events.clone();
        tokio::spawn(async move {
            let outcome = if device.is_connected().await {
                Ok(())
            } else {
                adapter.connect_device(&device).await
            };
            let event = match outcome {
                Ok(()) => LinkEvent::Connected,
                Err(e) => {
                    error!("Connection attempt failed: {}", e);
                    LinkEvent::Disconnected { status: STATUS_DEVICE_NOT_FOUND }
                }
            };
            let _ = events.send(event).await;
        });
    }
}

#[async_trait]
impl WatchTransport for BluestTransport {
    async fn start_scan(&self) -> Result<(), TransportError> {
        self.scanner.lock().await.start(self.events.clone()).await
    }

    async fn stop_scan(&self) -> Result<(), TransportError> {
        self.scanner.lock().await.stop().await;
        Ok(())
    }

    async fn connect(&self, address: &str) -> Result<(), TransportError> {
        let device = {
            let devices = self.devices.lock().expect("device map poisoned");
            devices
                .get(address)
                .cloned()
                .ok_or_else(|| TransportError::UnknownDevice(address.to_string()))?
        };
        info!("Initiating connection to {}", address);
        *self.connected.lock().await = Some(ConnectedWatch::new(device.clone()));
        self.spawn_connect(device);
        Ok(())
    }

    async fn reconnect(&self) -> Result<(), TransportError> {
        let device = {
            let mut guard = self.connected.lock().await;
            let watch = guard.as_mut().ok_or(TransportError::NotConnected)?;
            watch.cancel_pump();
            // Characteristic handles do not survive the link drop.
            watch.command_char = None;
            watch.notify_char = None;
            watch.device.clone()
        };
        info!("Reconnecting to {}", device.id());
        let _ = self.adapter.disconnect_device(&device).await;
        self.spawn_connect(device);
        Ok(())
    }

    async fn discover_services(&self) -> Result<(), TransportError> {
        let device = self.connected_device().await?;
        let events = self.events.clone();
        let connected = self.connected.clone();
        tokio::spawn(async move {
            let services = match device.services().await {
                Ok(services) => services,
                Err(e) => {
                    error!("Service discovery failed: {}", e);
                    let _ = events
                        .send(LinkEvent::Disconnected { status: STATUS_OUT_OF_RANGE })
                        .await;
                    return;
                }
            };
            info!("{} services on {}", services.len(), device.id());

            let Some(watch_service) =
                services.iter().find(|s| s.uuid() == UUID_WATCH_SERVICE).cloned()
            else {
                for service in &services {
                    info!("Available service: {}", service.uuid());
                }
                let _ = events
                    .send(LinkEvent::ServicesDiscovered { service_found: false })
                    .await;
                return;
            };

            let mut command_char = None;
            let mut notify_char = None;
            match watch_service.characteristics().await {
                Ok(characteristics) => {
                    for characteristic in characteristics {
                        let uuid = characteristic.uuid();
                        if uuid == UUID_COMMAND_CHARACTERISTIC {
                            command_char = Some(characteristic);
                        } else if uuid == UUID_NOTIFY_CHARACTERISTIC {
                            notify_char = Some(characteristic);
                        }
                    }
                }
                Err(e) => {
                    error!("Characteristic discovery failed: {}", e);
                }
            }

            let service_found = command_char.is_some() && notify_char.is_some();
            if service_found {
                let mut guard = connected.lock().await;
                if let Some(watch) = guard.as_mut() {
                    watch.command_char = command_char;
                    watch.notify_char = notify_char;
                }
            } else {
                warn!("Watch service present but characteristics incomplete");
            }
            let _ = events.send(LinkEvent::ServicesDiscovered { service_found }).await;
        });
        Ok(())
    }

    async fn subscribe_notifications(&self, ccc_value: &[u8]) -> Result<(), TransportError> {
        let (notify_char, pump_token) = {
            let mut guard = self.connected.lock().await;
            let watch = guard.as_mut().ok_or(TransportError::NotConnected)?;
            let notify_char =
                watch.notify_char.clone().ok_or(TransportError::NotDiscovered)?;
            watch.cancel_pump();
            let token = CancellationToken::new();
            watch.pump_cancel = Some(token.clone());
            (notify_char, token)
        };

        // The watch only pushes notifications once its client-configuration
        // descriptor holds the enable value.
        for descriptor in notify_char.descriptors().await? {
            descriptor.write(ccc_value).await?;
        }

        let events = self.events.clone();
        tokio::spawn(pump_notifications(notify_char, events.clone(), pump_token));
        let _ = events.send(LinkEvent::SubscribeAcknowledged).await;
        Ok(())
    }

    async fn write_command(&self, payload: &[u8]) -> Result<(), TransportError> {
        let command_char = {
            let guard = self.connected.lock().await;
            let watch = guard.as_ref().ok_or(TransportError::NotConnected)?;
            watch.command_char.clone().ok_or(TransportError::NotDiscovered)?
        };
        command_char.write(payload).await?;
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), TransportError> {
        let device = {
            let mut guard = self.connected.lock().await;
            match guard.as_mut() {
                Some(watch) => {
                    watch.cancel_pump();
                    watch.device.clone()
                }
                None => return Ok(()),
            }
        };
        if device.is_connected().await {
            info!("Disconnecting from device {}", device.id());
            self.adapter.disconnect_device(&device).await?;
        }
        Ok(())
    }

    async fn close(&self) -> Result<(), TransportError> {
        let watch = self.connected.lock().await.take();
        if let Some(mut watch) = watch {
            watch.cancel_pump();
            let _ = self.adapter.disconnect_device(&watch.device).await;
            info!("Connection handle released.");
        }
        Ok(())
    }
}
