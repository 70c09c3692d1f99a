//! Transport abstraction for the live connection.
//!
//! The [`Transport`] trait is a bidirectional text message channel between
//! the client and the service. The [`Connector`] trait opens new transports;
//! the connection manager calls it on every connect and reconnect, so a
//! connector must be reusable.
//!
//! # Implementing a Custom Transport
//!
//! ```rust,no_run
//! use async_trait::async_trait;
//! use socketlink_client::error::SocketlinkError;
//! use socketlink_client::transport::Transport;
//!
//! struct MyTransport { /* ... */ }
//!
//! #[async_trait]
//! impl Transport for MyTransport {
//!     async fn send(&mut self, message: String) -> Result<(), SocketlinkError> {
//!         // Send the JSON text message over your transport
//!         todo!()
//!     }
//!
//!     async fn recv(&mut self) -> Option<Result<String, SocketlinkError>> {
//!         // Receive the next JSON text message
//!         // Return None when the connection is closed cleanly
//!         todo!()
//!     }
//!
//!     async fn close(&mut self) -> Result<(), SocketlinkError> {
//!         // Gracefully shut down the connection
//!         todo!()
//!     }
//! }
//! ```

use async_trait::async_trait;
use url::Url;

use crate::config::SocketlinkConfig;
use crate::error::Result;

/// A bidirectional text message transport.
///
/// Each call to [`send`](Transport::send) transmits one complete JSON message.
/// Each call to [`recv`](Transport::recv) returns one complete JSON message.
///
/// # Cancel Safety
///
/// The [`recv`](Transport::recv) method **MUST** be cancel-safe because it is used
/// inside `tokio::select!`. If `recv` is cancelled before completion, calling it
/// again must not lose data. Channel-based implementations (e.g., wrapping
/// `mpsc::Receiver`) are naturally cancel-safe.
#[async_trait]
pub trait Transport: Send + 'static {
    /// Send a JSON text message to the service.
    ///
    /// # Errors
    ///
    /// Returns [`SocketlinkError::TransportSend`](crate::SocketlinkError::TransportSend) if the message could not be
    /// sent, or [`SocketlinkError::TransportClosed`](crate::SocketlinkError::TransportClosed) after [`close`](Transport::close).
    async fn send(&mut self, message: String) -> Result<()>;

    /// Receive the next JSON text message.
    ///
    /// Returns:
    /// - `Some(Ok(text))`: a complete message was received
    /// - `Some(Err(e))`: a transport error occurred; the connection is unusable
    /// - `None`: the connection was closed cleanly
    async fn recv(&mut self) -> Option<Result<String>>;

    /// Close the transport connection gracefully.
    ///
    /// # Errors
    ///
    /// Returns an error if the graceful shutdown fails. Implementations should
    /// still release resources even if the close handshake fails.
    async fn close(&mut self) -> Result<()>;
}

/// Everything needed to open the live connection.
#[derive(Clone)]
pub struct ConnectRequest {
    /// The `wss://` endpoint.
    pub url: Url,
    /// Sent as the `api-key` handshake header.
    pub api_key: String,
    /// Sent as the `uid` handshake header.
    pub uid: String,
    /// Verify the server certificate.
    pub reject_unauthorized_certs: bool,
}

impl ConnectRequest {
    /// Validate the configuration and derive the socket endpoint.
    ///
    /// # Errors
    ///
    /// [`SocketlinkError::MissingClientApiKey`](crate::SocketlinkError::MissingClientApiKey) when no client key is set, and
    /// [`SocketlinkError::InsecureUrl`](crate::SocketlinkError::InsecureUrl) / [`SocketlinkError::InvalidUrl`](crate::SocketlinkError::InvalidUrl) when
    /// the connection URL is not a valid `https` URL.
    pub fn from_config(config: &SocketlinkConfig) -> Result<Self> {
        let api_key = config.require_client_api_key()?.to_owned();
        Ok(Self {
            url: config.socket_url()?,
            api_key,
            uid: config.uid.clone(),
            reject_unauthorized_certs: config.reject_unauthorized_certs,
        })
    }
}

impl std::fmt::Debug for ConnectRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectRequest")
            .field("url", &self.url.as_str())
            .field("uid", &self.uid)
            .field("reject_unauthorized_certs", &self.reject_unauthorized_certs)
            .finish_non_exhaustive()
    }
}

/// Opens transports for the connection manager.
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    /// Perform the handshake and return a connected transport.
    ///
    /// # Errors
    ///
    /// Any error is reported to error listeners and followed by the normal
    /// close and reconnect handling.
    async fn connect(&self, request: &ConnectRequest) -> Result<Box<dyn Transport>>;
}
