use std::sync::Arc;

use anyhow::{Result, anyhow};
use clap::Parser;
use log::{info, warn};

use sg2_bridge::config::{DeviceStore, DeviceTarget, LinkConfig};
use sg2_bridge::dispatch::{Alerter, AudioController, CommandDispatcher, MediaKey};
use sg2_bridge::{LogStatusReporter, WatchBridge, logging};

/// Companion bridge for the SG2 smartwatch.
#[derive(Parser, Debug)]
#[command(name = "sg2-bridge", version, about)]
struct Args {
    /// Link address of the watch; defaults to the last paired device
    #[arg(long)]
    address: Option<String>,
    /// Display name to remember alongside the address
    #[arg(long)]
    name: Option<String>,
    /// Paired-device file
    #[arg(long, default_value = "sg2-device.json")]
    device_file: String,
}

/// Media-key and volume handling are host integrations; this build logs
/// the intent.
struct LoggingAudio;

impl AudioController for LoggingAudio {
    fn is_media_active(&self) -> bool {
        false
    }
    fn dispatch_media_key(&self, key: MediaKey) {
        info!("Media key: {:?}", key);
    }
    fn volume(&self) -> i32 {
        0
    }
    fn set_volume(&self, level: i32) {
        info!("Set volume to {}", level);
    }
}

struct LoggingAlerter;

impl Alerter for LoggingAlerter {
    fn play_notification_sound(&self) {
        info!("Notification sound");
    }
    fn post_error(&self, title: &str, body: &str) {
        warn!("{}: {}", title, body);
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    logging::init();
    let args = Args::parse();

    let store = DeviceStore::new(&args.device_file);
    let target = match args.address {
        Some(address) => {
            let target = DeviceTarget::new(args.name, address);
            store.save(&target).await?;
            target
        }
        None => store
            .load()
            .await
            .ok_or_else(|| anyhow!("no paired device on file; pass --address"))?,
    };

    let dispatcher = CommandDispatcher::new(Arc::new(LoggingAudio), Arc::new(LoggingAlerter));
    let mut bridge =
        WatchBridge::new(dispatcher, Arc::new(LogStatusReporter), LinkConfig::default()).await?;
    bridge.start(target).await?;

    tokio::signal::ctrl_c().await?;
    info!("Shutting down");
    bridge.stop().await?;
    Ok(())
}
