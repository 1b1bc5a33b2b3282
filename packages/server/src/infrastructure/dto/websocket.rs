//! WebSocket wire messages.
//!
//! Inbound and outbound frames share one JSON shape:
//!
//! ```json
//! {"type": "message", "client_id": "alice", "message": "hi", "timestamp": "2024-01-01T12:00:00.000Z", "seq": 2}
//! ```
//!
//! `seq` is only present on frames carrying a stored message. Relay-authored frames
//! (`session_end`) omit `client_id`.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    Message,
    System,
    SessionEnd,
    /// Sent by a participant once its socket is open
    Join,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireMessage {
    pub r#type: MessageType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    #[serde(default)]
    pub message: String,
    /// ISO-8601 / RFC 3339
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seq: Option<u64>,
}

impl WireMessage {
    /// Frame a participant sends to announce itself
    pub fn join(client_id: &str, timestamp: String) -> Self {
        Self {
            r#type: MessageType::Join,
            client_id: Some(client_id.to_string()),
            message: String::new(),
            timestamp: Some(timestamp),
            seq: None,
        }
    }

    /// Chat frame sent by a participant
    pub fn chat(client_id: &str, message: String, timestamp: String) -> Self {
        Self {
            r#type: MessageType::Message,
            client_id: Some(client_id.to_string()),
            message,
            timestamp: Some(timestamp),
            seq: None,
        }
    }
}
