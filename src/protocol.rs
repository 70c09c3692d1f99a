//! Wire envelopes exchanged over the live connection.
//!
//! Inbound frames carry a `source` tag naming the channel they arrived on;
//! outbound frames carry the user's message. The two shapes are not
//! symmetric: what the client sends as `message` comes back to other
//! subscribers as `data`.
//!
//! ```text
//! inbound:  {"source":"user","data":"hi","rid":"lobby"}
//! outbound: {"message":"hi","rid":"lobby","timestamp":1735689600000}
//! ```

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::event::SocketlinkEvent;

/// Channel an inbound frame was published on.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessageSource {
    /// A message published by another user in a room.
    User,
    /// A broadcast issued by the service itself.
    Server,
    /// A broadcast issued through the admin API.
    Admin,
    /// Any tag this client does not know about.
    #[serde(other)]
    Unknown,
}

/// A frame received from the service.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InboundEnvelope {
    pub source: MessageSource,
    #[serde(default)]
    pub data: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rid: Option<String>,
}

impl InboundEnvelope {
    /// Parse a text frame.
    pub fn parse(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }

    /// Convert into the event that listeners receive, or `None` when the
    /// source is unknown.
    pub fn into_event(self) -> Option<SocketlinkEvent> {
        match self.source {
            MessageSource::User => Some(SocketlinkEvent::Message {
                data: self.data,
                rid: self.rid,
            }),
            MessageSource::Server => Some(SocketlinkEvent::ServerBroadcast { data: self.data }),
            MessageSource::Admin => Some(SocketlinkEvent::AdminBroadcast {
                data: self.data,
                rid: self.rid,
            }),
            MessageSource::Unknown => None,
        }
    }
}

/// A frame sent by [`SocketlinkClient::send`](crate::SocketlinkClient::send).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OutboundEnvelope {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rid: Option<String>,
    /// Milliseconds since the Unix epoch at send time.
    pub timestamp: i64,
}

impl OutboundEnvelope {
    /// Build an envelope stamped with the current time.
    pub fn new(message: impl Into<String>, rid: Option<String>) -> Self {
        Self {
            message: message.into(),
            rid,
            timestamp: epoch_millis(),
        }
    }

    /// Serialize to the JSON text sent on the wire.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

fn epoch_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| i64::try_from(d.as_millis()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}
