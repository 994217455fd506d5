//! Notification pump for the watch link.
//! Forwards notify-characteristic payloads to the supervisor and translates
//! the stream winding down into a link drop.

use bluest::Characteristic;
use futures_util::StreamExt;
use log::{debug, error, info};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::core::bluetooth::constants::{STATUS_OUT_OF_RANGE, STATUS_PEER_DISCONNECTED};
use crate::core::bluetooth::types::LinkEvent;

/// Runs until the stream ends, errors, or the token is cancelled.
///
/// The host stack does not report why a notify stream died, so the pump
/// synthesizes a status code: a clean end reads as the peer closing the
/// link, an error as the link being lost mid-air. Cancellation is the
/// bridge's own teardown and produces no event.
pub(crate) async fn pump_notifications(
    notify_char: Characteristic,
    events: mpsc::Sender<LinkEvent>,
    cancel_token: CancellationToken,
) {
    let mut stream = match notify_char.notify().await {
        Ok(stream) => stream,
        Err(e) => {
            error!("Failed to subscribe to notifications: {}", e);
            let _ = events
                .send(LinkEvent::Disconnected { status: STATUS_OUT_OF_RANGE })
                .await;
            return;
        }
    };
    info!("Listening for watch notifications...");

    loop {
        tokio::select! {
            result = stream.next() => {
                match result {
                    Some(Ok(payload)) => {
                        debug!("Watch notification: {:02x?}", payload);
                        if events.send(LinkEvent::WatchNotification(payload)).await.is_err() {
                            break;
                        }
                    }
                    Some(Err(e)) => {
                        error!("Error in notification stream: {}", e);
                        let _ = events
                            .send(LinkEvent::Disconnected { status: STATUS_OUT_OF_RANGE })
                            .await;
                        break;
                    }
                    None => {
                        info!("Notification stream ended");
                        let _ = events
                            .send(LinkEvent::Disconnected { status: STATUS_PEER_DISCONNECTED })
                            .await;
                        break;
                    }
                }
            }
            _ = cancel_token.cancelled() => {
                debug!("Notification pump cancelled");
                break;
            }
        }
    }
}
