use std::time::Duration;

use axum::extract::ws::{Message as WsMessage, WebSocket};
use futures_util::{SinkExt, StreamExt};
use tracing::{info, warn};
use uuid::Uuid;

use parley_types::events::{GatewayCommand, GatewayEvent};

use crate::broadcaster::{Broadcaster, SubscriptionHandle};

/// Heartbeat interval: server sends a Ping every 15 seconds.
/// If 2 consecutive Pongs are missed (~30s), the connection is dropped.
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(15);

/// Handle a single WebSocket connection.
///
/// The client drives its subscription with `Subscribe`/`Unsubscribe`
/// commands; the server pushes `MessageAdded` events for matching channels.
/// A connection starts with no subscription and receives nothing until it
/// subscribes.
pub async fn handle_connection(socket: WebSocket, broadcaster: Broadcaster) {
    let (mut sender, mut receiver) = socket.split();
    let conn_id = Uuid::new_v4();

    info!("gateway client {} connected", conn_id);

    let mut subscription: Option<SubscriptionHandle> = None;
    let mut heartbeat = tokio::time::interval(HEARTBEAT_INTERVAL);
    heartbeat.tick().await; // first tick fires immediately
    let mut missed_heartbeats: u8 = 0;
    let mut pong_received = true;

    loop {
        tokio::select! {
            delivery = next_delivery(&mut subscription) => {
                match delivery {
                    Some(message) => {
                        let event = GatewayEvent::MessageAdded { message };
                        let text = match serde_json::to_string(&event) {
                            Ok(text) => text,
                            Err(e) => {
                                warn!("gateway client {} event serialization failed: {}", conn_id, e);
                                continue;
                            }
                        };
                        if sender.send(WsMessage::Text(text.into())).await.is_err() {
                            break;
                        }
                    }
                    // Subscription was removed out from under us; wait for a
                    // new Subscribe command.
                    None => subscription = None,
                }
            }

            incoming = receiver.next() => {
                match incoming {
                    Some(Ok(WsMessage::Text(text))) => {
                        match serde_json::from_str::<GatewayCommand>(&text) {
                            Ok(GatewayCommand::Subscribe { channel_ids }) => {
                                info!(
                                    "gateway client {} subscribing to {} channels",
                                    conn_id,
                                    channel_ids.len()
                                );
                                // Replaces any previous filter set; the old
                                // handle unsubscribes on drop.
                                subscription = Some(broadcaster.subscribe(channel_ids));
                            }
                            Ok(GatewayCommand::Unsubscribe) => {
                                info!("gateway client {} unsubscribed", conn_id);
                                subscription = None;
                            }
                            Err(e) => {
                                warn!(
                                    "gateway client {} bad command: {} -- raw: {}",
                                    conn_id,
                                    e,
                                    log_preview(&text)
                                );
                            }
                        }
                    }
                    Some(Ok(WsMessage::Pong(_))) => {
                        pong_received = true;
                    }
                    Some(Ok(WsMessage::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(_)) => break,
                }
            }

            _ = heartbeat.tick() => {
                if pong_received {
                    missed_heartbeats = 0;
                } else {
                    missed_heartbeats += 1;
                    if missed_heartbeats >= 2 {
                        warn!(
                            "gateway client {} heartbeat timeout (missed {} pongs), dropping",
                            conn_id, missed_heartbeats
                        );
                        break;
                    }
                }
                pong_received = false;
                if sender.send(WsMessage::Ping(vec![].into())).await.is_err() {
                    break;
                }
            }
        }
    }

    // Dropping the handle unsubscribes from the broadcaster.
    drop(subscription);
    info!("gateway client {} disconnected", conn_id);
}

async fn next_delivery(subscription: &mut Option<SubscriptionHandle>) -> Option<parley_types::models::Message> {
    match subscription {
        Some(handle) => handle.recv().await,
        None => std::future::pending().await,
    }
}

const LOG_PREVIEW_BYTES: usize = 200;

/// Truncate a raw frame for logging without splitting a multibyte character.
fn log_preview(text: &str) -> &str {
    if text.len() <= LOG_PREVIEW_BYTES {
        return text;
    }
    let mut end = LOG_PREVIEW_BYTES;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}
