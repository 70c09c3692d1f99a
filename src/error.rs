//! Error types for the Socketlink client.

use thiserror::Error;

/// Errors that can occur when using the Socketlink client.
///
/// Variants fall into four groups:
///
/// - **Preconditions** ([`is_precondition`](Self::is_precondition)) are raised
///   before any network or transport activity and are never retried.
/// - **Transport** errors describe the live socket. They reach error listeners
///   rather than the caller of `connect()`.
/// - **Request** errors ([`Api`](Self::Api)) carry the best human-readable
///   message the backend or the HTTP stack produced.
/// - Everything else (serialization, I/O, a stopped client).
#[derive(Debug, Error)]
pub enum SocketlinkError {
    /// A client-scoped operation was attempted without a client API key.
    #[error("clientApiKey is required")]
    MissingClientApiKey,

    /// An admin-scoped operation was attempted without an admin API key.
    #[error("adminApiKey is required")]
    MissingAdminApiKey,

    /// The connection URL could not be parsed.
    #[error("invalid connection URL: {0}")]
    InvalidUrl(String),

    /// The connection URL does not use the `https` scheme.
    #[error("provided URL is not HTTPS: {0}")]
    InsecureUrl(String),

    /// An argument failed validation.
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),

    /// A messaging action other than `enable` or `disable` was supplied.
    #[error("invalid action \"{0}\", allowed actions are: enable, disable")]
    InvalidAction(String),

    /// Failed to establish the transport connection.
    #[error("transport connect error: {0}")]
    TransportConnect(String),

    /// Failed to send a message through the transport.
    #[error("transport send error: {0}")]
    TransportSend(String),

    /// Failed to receive a message from the transport.
    #[error("transport receive error: {0}")]
    TransportReceive(String),

    /// The transport connection was closed.
    #[error("transport connection closed")]
    TransportClosed,

    /// An HTTP request to the backend failed.
    #[error("API request error: {message}")]
    Api {
        /// HTTP status code, when a response was received at all.
        status: Option<u16>,
        /// Human-readable error message.
        message: String,
    },

    /// Failed to serialize or deserialize a message.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The connection manager is no longer running.
    #[error("not connected to server")]
    NotConnected,

    /// An operation timed out.
    #[error("operation timed out")]
    Timeout,

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl SocketlinkError {
    /// Returns `true` for errors raised by argument or configuration checks
    /// before any network activity took place.
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            Self::MissingClientApiKey
                | Self::MissingAdminApiKey
                | Self::InvalidUrl(_)
                | Self::InsecureUrl(_)
                | Self::InvalidArgument(_)
                | Self::InvalidAction(_)
        )
    }
}

/// A specialized [`Result`] type for Socketlink client operations.
pub type Result<T> = std::result::Result<T, SocketlinkError>;
