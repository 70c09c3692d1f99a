//! # Socketlink Client
//!
//! Async Rust client for socketlink, a managed real-time messaging service.
//!
//! The crate has two halves:
//!
//! - a **live connection** that keeps one WebSocket open to the service,
//!   dispatches inbound frames to registered listeners and reconnects on a
//!   fixed interval after it drops;
//! - an **admin API** ([`ApiClient`]) wrapping the REST endpoints for rooms,
//!   subscriptions, broadcasts, bans and messaging controls.
//!
//! ## Features
//!
//! - **Listener registry**: any number of listeners per event kind, each
//!   removable by [`ListenerId`]
//! - **Transport-agnostic**: implement [`Transport`] and [`Connector`] for
//!   any backend
//! - **WebSocket built-in**: the default `transport-websocket` feature provides
//!   [`WebSocketConnector`]
//! - **Pluggable HTTP**: implement [`RequestExecutor`] to observe or reroute
//!   admin calls
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use socketlink_client::{SocketlinkClient, SocketlinkConfig};
//!
//! # async fn run() -> socketlink_client::Result<()> {
//! let config = SocketlinkConfig::from_env()?;
//! let client = SocketlinkClient::start(config)?;
//!
//! client.on_open(|| println!("connected"));
//! client.on_server_broadcast(|data| println!("server: {data}"));
//! client.on_error(|e| eprintln!("error: {e}"));
//!
//! client.api().subscribe_to_room("lobby").await?;
//! client.send("hi all", Some("lobby"));
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod client;
pub mod config;
pub mod connection;
pub mod error;
pub mod event;
pub mod http;
pub mod listeners;
pub mod protocol;
pub mod routes;
pub mod transport;
pub mod transports;

// Re-export primary types for ergonomic imports.
pub use api::{ApiClient, GLOBAL_ROOM};
pub use client::SocketlinkClient;
pub use config::SocketlinkConfig;
pub use connection::ConnectionState;
pub use error::{Result, SocketlinkError};
pub use event::{EventKind, SocketlinkEvent};
pub use http::{ApiRequest, HttpExecutor, RequestExecutor};
pub use listeners::ListenerId;
pub use protocol::{InboundEnvelope, MessageSource, OutboundEnvelope};
pub use routes::MessagingAction;
pub use transport::{ConnectRequest, Connector, Transport};

#[cfg(feature = "transport-websocket")]
pub use transports::{WebSocketConnector, WebSocketTransport};
