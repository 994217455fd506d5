//! BLE scan worker.
//! Forwards every advertisement to the supervisor; matching against the
//! paired target happens there, not here.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use bluest::{Adapter, Device};
use futures_util::StreamExt;
use log::{debug, error, info};
use regex::Regex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::core::bluetooth::transport::TransportError;
use crate::core::bluetooth::types::{LinkEvent, ScanResult};

pub struct BluetoothScanner {
    adapter: Adapter,
    devices: Arc<Mutex<HashMap<String, Device>>>,
    cancel_token: CancellationToken,
    scan_task_handle: Option<JoinHandle<()>>,
}

impl BluetoothScanner {
    pub fn new(adapter: Adapter, devices: Arc<Mutex<HashMap<String, Device>>>) -> Self {
        Self {
            adapter,
            devices,
            cancel_token: CancellationToken::new(),
            scan_task_handle: None,
        }
    }

    /// Starts the scan worker. At most one scan runs at a time; a second
    /// start supersedes the first.
    pub async fn start(&mut self, events: mpsc::Sender<LinkEvent>) -> Result<(), TransportError> {
        if self.scan_task_handle.is_some() {
            self.stop().await;
        }
        self.devices.lock().expect("device map poisoned").clear();

        self.cancel_token = CancellationToken::new();
        let cancel_token = self.cancel_token.clone();
        let adapter = self.adapter.clone();
        let devices = self.devices.clone();

        let handle = tokio::spawn(async move {
            Self::scan_task(adapter, devices, events, cancel_token).await;
        });
        self.scan_task_handle = Some(handle);
        info!("Device scan task started.");
        Ok(())
    }

    async fn scan_task(
        adapter: Adapter,
        devices: Arc<Mutex<HashMap<String, Device>>>,
        events: mpsc::Sender<LinkEvent>,
        cancel_token: CancellationToken,
    ) {
        let mut scan_stream = match adapter.scan(&[]).await {
            Ok(stream) => stream,
            Err(e) => {
                error!("Failed to start scan: {}", e);
                let _ = events.send(LinkEvent::ScanFailed).await;
                return;
            }
        };
        info!("Scanning for advertisements");

        loop {
            tokio::select! {
                result = scan_stream.next() => {
                    match result {
                        Some(discovered) => {
                            let device = discovered.device;
                            let rssi = discovered.rssi;
                            let id = device.id().to_string();
                            // Platforms that hide the MAC get the opaque id
                            // as the address key instead.
                            let address = Self::extract_mac_address(&id).unwrap_or(id);
                            let name = device.name().ok();
                            debug!(
                                "Advertisement from {} ({:?}, rssi {:?})",
                                address, name, rssi
                            );

                            devices
                                .lock()
                                .expect("device map poisoned")
                                .insert(address.clone(), device);

                            let sighting = ScanResult { address, name, rssi };
                            if events.send(LinkEvent::DeviceSighted(sighting)).await.is_err() {
                                break;
                            }
                        }
                        None => {
                            info!("Bluetooth scan stream has ended.");
                            break;
                        }
                    }
                }
                _ = cancel_token.cancelled() => {
                    break;
                }
            }
        }
    }

    /// Cancels the worker and waits for it to wind down.
    pub async fn stop(&mut self) {
        info!("Stopping Bluetooth scan.");
        self.cancel_token.cancel();

        if let Some(handle) = self.scan_task_handle.take() {
            match handle.await {
                Ok(()) => info!("Scan task finished after cancellation."),
                Err(e) if e.is_cancelled() => info!("Scan task was cancelled."),
                Err(e) => error!("Scan task finished with a join error: {:?}", e),
            }
        }
    }

    fn extract_mac_address(device_id_str: &str) -> Option<String> {
        let re = Regex::new(r"([0-9A-Fa-f]{2}[:-]){5}([0-9A-Fa-f]{2})").unwrap();
        re.find_iter(device_id_str)
            .last()
            .map(|m| m.as_str().to_uppercase())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mac_extraction_finds_trailing_address() {
        assert_eq!(
            BluetoothScanner::extract_mac_address("dev/hci0/aa:bb:cc:dd:ee:ff"),
            Some("AA:BB:CC:DD:EE:FF".to_string())
        );
        assert_eq!(
            BluetoothScanner::extract_mac_address("0E7A3E12-9F8B-4C11"),
            None
        );
    }
}
