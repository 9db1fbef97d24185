use serde::{Deserialize, Serialize};

use crate::models::Message;

/// Events sent over the WebSocket gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum GatewayEvent {
    /// A new message was posted to a channel the client subscribed to
    MessageAdded { message: Message },
}

/// Commands sent FROM client TO server over WebSocket.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum GatewayCommand {
    /// Subscribe to new-message events for specific channels.
    /// Replaces the connection's current filter set; only messages whose
    /// channel id is in the set are forwarded.
    Subscribe { channel_ids: Vec<String> },

    /// Drop the current filter set; no further events are delivered.
    Unsubscribe,
}
