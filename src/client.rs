//! Client handle for a socketlink deployment.
//!
//! [`SocketlinkClient`] owns the background connection task and the admin
//! API surface. Calls on the live connection queue a command to the task and
//! return immediately; listener callbacks run on the task.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, error, warn};

use crate::api::ApiClient;
use crate::config::SocketlinkConfig;
use crate::connection::{Command, ConnectionSettings, ConnectionState, ConnectionTask};
use crate::error::{Result, SocketlinkError};
use crate::event::{EventKind, SocketlinkEvent};
use crate::http::RequestExecutor;
use crate::listeners::{Listener, ListenerId, ListenerRegistry};
use crate::protocol::OutboundEnvelope;
use crate::transport::{ConnectRequest, Connector};

/// Async client for a socketlink deployment.
///
/// Created via [`SocketlinkClient::start`] (connects immediately) or
/// [`SocketlinkClient::new`] (connects on the first
/// [`connect`](Self::connect)). Both spawn the connection task, so they must
/// be called from within a tokio runtime.
///
/// ```rust,no_run
/// use socketlink_client::{SocketlinkClient, SocketlinkConfig};
///
/// # async fn run() -> socketlink_client::Result<()> {
/// let config = SocketlinkConfig::new("https://chat.example.com")
///     .with_client_api_key("sl_client_key")
///     .with_uid("alice");
/// let client = SocketlinkClient::start(config)?;
///
/// client.on_message(|data, rid| println!("[{rid:?}] {data}"));
/// client.api().subscribe_to_room("lobby").await?;
/// client.send("hello", Some("lobby"));
/// # Ok(())
/// # }
/// ```
pub struct SocketlinkClient {
    cmd_tx: mpsc::UnboundedSender<Command>,
    state_rx: watch::Receiver<ConnectionState>,
    listeners: Arc<ListenerRegistry>,
    api: ApiClient,
    /// Handle to the background connection task.
    task: Option<tokio::task::JoinHandle<()>>,
    /// Signals the connection task to close and exit.
    shutdown_tx: Option<oneshot::Sender<()>>,
    shutdown_timeout: Duration,
}

impl SocketlinkClient {
    /// Build a client over WebSocket and HTTP without connecting.
    ///
    /// # Errors
    ///
    /// Returns a precondition error if the client key is missing or the
    /// connection URL is not `https`.
    #[cfg(feature = "transport-websocket")]
    pub fn new(config: SocketlinkConfig) -> Result<Self> {
        let executor = crate::http::HttpExecutor::new(
            config.request_timeout,
            config.reject_unauthorized_certs,
        )?;
        Self::new_with(config, crate::transports::WebSocketConnector, executor)
    }

    /// Build a client over WebSocket and HTTP and start connecting.
    ///
    /// # Errors
    ///
    /// See [`new`](Self::new).
    #[cfg(feature = "transport-websocket")]
    pub fn start(config: SocketlinkConfig) -> Result<Self> {
        let client = Self::new(config)?;
        client.connect()?;
        Ok(client)
    }

    /// Build a client over a custom connector and request executor, without
    /// connecting.
    ///
    /// # Errors
    ///
    /// Returns a precondition error if the client key is missing or the
    /// connection URL is not `https`.
    pub fn new_with(
        config: SocketlinkConfig,
        connector: impl Connector,
        executor: impl RequestExecutor,
    ) -> Result<Self> {
        let request = ConnectRequest::from_config(&config)?;
        let api = ApiClient::with_executor(&config, executor)?;

        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel::<Command>();
        let (state_tx, state_rx) = watch::channel(ConnectionState::Disconnected);
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let listeners = Arc::new(ListenerRegistry::default());

        let settings = ConnectionSettings {
            request,
            auto_reconnect: config.auto_reconnect,
            reconnect_interval: config.reconnect_interval,
            connect_timeout: config.connect_timeout,
        };
        let task = ConnectionTask::new(
            Arc::new(connector),
            settings,
            Arc::clone(&listeners),
            state_tx,
            cmd_rx,
            shutdown_rx,
        );
        let task = tokio::spawn(task.run());

        debug!(uid = %api.uid(), "socketlink client created");
        Ok(Self {
            cmd_tx,
            state_rx,
            listeners,
            api,
            task: Some(task),
            shutdown_tx: Some(shutdown_tx),
            shutdown_timeout: config.shutdown_timeout,
        })
    }

    /// Like [`new_with`](Self::new_with), then start connecting.
    ///
    /// # Errors
    ///
    /// See [`new_with`](Self::new_with).
    pub fn start_with(
        config: SocketlinkConfig,
        connector: impl Connector,
        executor: impl RequestExecutor,
    ) -> Result<Self> {
        let client = Self::new_with(config, connector, executor)?;
        client.connect()?;
        Ok(client)
    }

    // ── Live connection ─────────────────────────────────────────────

    /// Open the live connection.
    ///
    /// Does nothing while a connection is open or opening. Any pending
    /// automatic reconnect is replaced by this attempt. Handshake failures
    /// are reported to error listeners, not returned here.
    ///
    /// # Errors
    ///
    /// Returns [`SocketlinkError::NotConnected`] if the connection task has
    /// stopped.
    pub fn connect(&self) -> Result<()> {
        self.cmd_tx
            .send(Command::Connect)
            .map_err(|_| SocketlinkError::NotConnected)
    }

    /// Send `message` to the service, optionally scoped to room `rid`.
    ///
    /// When the connection is not open the message is discarded with a
    /// warning. Nothing is queued for later delivery.
    pub fn send(&self, message: impl Into<String>, rid: Option<&str>) {
        if !self.is_open() {
            warn!("cannot send message, socket not open");
            return;
        }
        let envelope = OutboundEnvelope::new(message, rid.map(str::to_owned));
        let frame = match envelope.to_json() {
            Ok(frame) => frame,
            Err(e) => {
                error!("failed to serialize outbound message: {e}");
                return;
            }
        };
        if self.cmd_tx.send(Command::Send(frame)).is_err() {
            warn!("cannot send message, connection task stopped");
        }
    }

    /// Close the live connection and permanently disable automatic
    /// reconnection. [`connect`](Self::connect) still works afterwards.
    pub fn close(&self) {
        if self.cmd_tx.send(Command::Close).is_err() {
            debug!("close ignored, connection task stopped");
        }
    }

    /// Close the connection and stop the background task.
    ///
    /// Waits up to the configured shutdown timeout, then aborts the task.
    pub async fn shutdown(&mut self) {
        debug!("SocketlinkClient: shutdown requested");

        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }

        if let Some(mut task) = self.task.take() {
            match tokio::time::timeout(self.shutdown_timeout, &mut task).await {
                Ok(Ok(())) => {}
                Ok(Err(join_err)) => {
                    warn!("connection task terminated with join error: {join_err}");
                }
                Err(_) => {
                    warn!("connection task did not exit within timeout; aborting task");
                    task.abort();
                    if let Err(join_err) = task.await {
                        debug!("connection task aborted: {join_err}");
                    }
                }
            }
        }
    }

    // ── State accessors ─────────────────────────────────────────────

    /// Current connection state.
    pub fn state(&self) -> ConnectionState {
        *self.state_rx.borrow()
    }

    /// Returns `true` if the live connection is open.
    pub fn is_open(&self) -> bool {
        self.state() == ConnectionState::Open
    }

    /// A receiver that observes every state change.
    pub fn state_changes(&self) -> watch::Receiver<ConnectionState> {
        self.state_rx.clone()
    }

    /// The user ID sent on the handshake and on client-scoped API calls.
    pub fn uid(&self) -> &str {
        self.api.uid()
    }

    /// The admin API surface.
    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    // ── Listeners ───────────────────────────────────────────────────

    /// Called when the connection opens.
    pub fn on_open<F>(&self, f: F) -> ListenerId
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.listeners.register(Listener::Open(Arc::new(f)))
    }

    /// Called with `(data, rid)` for each user message.
    pub fn on_message<F>(&self, f: F) -> ListenerId
    where
        F: Fn(&Value, Option<&str>) + Send + Sync + 'static,
    {
        self.listeners.register(Listener::Message(Arc::new(f)))
    }

    /// Called with `data` for each server broadcast.
    pub fn on_server_broadcast<F>(&self, f: F) -> ListenerId
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        self.listeners.register(Listener::ServerBroadcast(Arc::new(f)))
    }

    /// Called with `(data, rid)` for each admin broadcast.
    pub fn on_admin_broadcast<F>(&self, f: F) -> ListenerId
    where
        F: Fn(&Value, Option<&str>) + Send + Sync + 'static,
    {
        self.listeners.register(Listener::AdminBroadcast(Arc::new(f)))
    }

    /// Called when the connection closes, for any reason.
    pub fn on_close<F>(&self, f: F) -> ListenerId
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.listeners.register(Listener::Close(Arc::new(f)))
    }

    /// Called for transport failures and malformed frames.
    pub fn on_error<F>(&self, f: F) -> ListenerId
    where
        F: Fn(&SocketlinkError) + Send + Sync + 'static,
    {
        self.listeners.register(Listener::Error(Arc::new(f)))
    }

    /// Called for every event.
    pub fn on_event<F>(&self, f: F) -> ListenerId
    where
        F: Fn(&SocketlinkEvent) + Send + Sync + 'static,
    {
        self.listeners.register(Listener::Any(Arc::new(f)))
    }

    /// Unregister one listener. Returns `false` if `id` was not registered.
    pub fn remove_listener(&self, id: ListenerId) -> bool {
        self.listeners.remove(id)
    }

    /// Unregister every listener of `kind`, or all listeners when `None`.
    /// Catch-all listeners are only removed by `None`.
    pub fn clear_listeners(&self, kind: Option<EventKind>) {
        self.listeners.clear(kind);
    }

    /// Number of registered listeners.
    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }
}

impl std::fmt::Debug for SocketlinkClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SocketlinkClient")
            .field("uid", &self.uid())
            .field("state", &self.state())
            .field("listeners", &self.listener_count())
            .field("has_task", &self.task.is_some())
            .finish()
    }
}

impl Drop for SocketlinkClient {
    fn drop(&mut self) {
        // Drop cannot await a graceful close, so abort the task outright.
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}
