//! Paired device identity and its on-disk persistence.

use std::path::PathBuf;

use anyhow::Result;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use tokio::fs;

use crate::utils::ensure_directory_exists;

/// Identity of the paired watch. Written by the pairing flow; the link
/// supervisor only reads it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceTarget {
    /// Advertised display name, if the pairing flow captured one
    pub name: Option<String>,
    /// Stable link address of the peripheral
    pub address: String,
}

impl DeviceTarget {
    pub fn new(name: Option<String>, address: impl Into<String>) -> Self {
        Self { name, address: address.into() }
    }
}

/// JSON-file store for the last-paired device.
pub struct DeviceStore {
    path: PathBuf,
}

impl DeviceStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Loads the saved target, or None when nothing was paired yet.
    pub async fn load(&self) -> Option<DeviceTarget> {
        if !self.path.exists() {
            warn!("No paired device file at {:?}", self.path);
            return None;
        }
        let json = match fs::read_to_string(&self.path).await {
            Ok(json) => json,
            Err(e) => {
                warn!("Failed to read {:?}: {}", self.path, e);
                return None;
            }
        };
        match serde_json::from_str(&json) {
            Ok(target) => {
                info!("Paired device loaded from {:?}", self.path);
                Some(target)
            }
            Err(e) => {
                warn!("Paired device file unreadable: {}", e);
                None
            }
        }
    }

    /// Saves the target for the next run.
    pub async fn save(&self, target: &DeviceTarget) -> Result<()> {
        if let Some(dir) = self.path.parent() {
            if !dir.as_os_str().is_empty() {
                ensure_directory_exists(dir).await?;
            }
        }
        let json = serde_json::to_string_pretty(target)?;
        fs::write(&self.path, json).await?;
        info!("Paired device saved to {:?}", self.path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("sg2-bridge-test-{}-{}.json", std::process::id(), name))
    }

    #[tokio::test]
    async fn save_then_load_round_trips() {
        let path = scratch_path("roundtrip");
        let store = DeviceStore::new(&path);
        let target = DeviceTarget::new(Some("SG2".to_string()), "C0:FF:EE:00:11:22");

        store.save(&target).await.unwrap();
        assert_eq!(store.load().await, Some(target));

        let _ = std::fs::remove_file(path);
    }

    #[tokio::test]
    async fn missing_file_loads_nothing() {
        let store = DeviceStore::new(scratch_path("missing"));
        assert_eq!(store.load().await, None);
    }
}
