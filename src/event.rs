//! Events emitted by the connection manager.

use std::sync::Arc;

use crate::error::SocketlinkError;

/// Something that happened on the live connection.
///
/// Listeners registered on [`SocketlinkClient`](crate::SocketlinkClient)
/// receive these on the connection task, in the order they occurred.
#[derive(Debug, Clone)]
pub enum SocketlinkEvent {
    /// The WebSocket handshake completed.
    Open,
    /// A user published a message to a room this client is subscribed to.
    Message {
        data: serde_json::Value,
        rid: Option<String>,
    },
    /// The service broadcast a message to every connected user.
    ServerBroadcast { data: serde_json::Value },
    /// An administrator broadcast a message, optionally scoped to a room.
    AdminBroadcast {
        data: serde_json::Value,
        rid: Option<String>,
    },
    /// The connection closed.
    Close,
    /// A transport or frame error occurred.
    Error(Arc<SocketlinkError>),
}

impl SocketlinkEvent {
    /// The listener category this event is dispatched to.
    pub fn kind(&self) -> EventKind {
        match self {
            Self::Open => EventKind::Open,
            Self::Message { .. } => EventKind::Message,
            Self::ServerBroadcast { .. } => EventKind::ServerBroadcast,
            Self::AdminBroadcast { .. } => EventKind::AdminBroadcast,
            Self::Close => EventKind::Close,
            Self::Error(_) => EventKind::Error,
        }
    }
}

impl From<SocketlinkError> for SocketlinkEvent {
    fn from(err: SocketlinkError) -> Self {
        Self::Error(Arc::new(err))
    }
}

/// Listener categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Open,
    Message,
    ServerBroadcast,
    AdminBroadcast,
    Close,
    Error,
}
