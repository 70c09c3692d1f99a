#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::indexing_slicing,
    dead_code
)]
//! Shared test utilities for Socketlink Client integration tests.
//!
//! Provides a scripted [`MockConnector`] whose transports are driven through
//! [`MockServer`] handles, and a [`RecordingExecutor`] that captures API
//! requests instead of performing them.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use socketlink_client::{
    ApiRequest, ConnectRequest, ConnectionState, Connector, RequestExecutor, SocketlinkClient,
    SocketlinkConfig, SocketlinkError, Transport,
};
use tokio::sync::mpsc;

type Feed = Option<Result<String, SocketlinkError>>;

// ── MockTransport ───────────────────────────────────────────────────

/// A channel-fed transport handed out by [`MockConnector`].
///
/// `recv()` yields whatever the paired [`MockServer`] pushes and is
/// cancel-safe. Sent frames are recorded on the server handle.
pub struct MockTransport {
    incoming: mpsc::UnboundedReceiver<Feed>,
    sent: Arc<StdMutex<Vec<String>>>,
    closed: Arc<AtomicBool>,
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&mut self, message: String) -> Result<(), SocketlinkError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(SocketlinkError::TransportClosed);
        }
        self.sent.lock().unwrap().push(message);
        Ok(())
    }

    async fn recv(&mut self) -> Option<Result<String, SocketlinkError>> {
        self.incoming.recv().await.flatten()
    }

    async fn close(&mut self) -> Result<(), SocketlinkError> {
        self.closed.store(true, Ordering::Release);
        Ok(())
    }
}

// ── MockServer ──────────────────────────────────────────────────────

/// The server side of one [`MockTransport`].
#[derive(Clone)]
pub struct MockServer {
    tx: mpsc::UnboundedSender<Feed>,
    sent: Arc<StdMutex<Vec<String>>>,
    closed: Arc<AtomicBool>,
}

impl MockServer {
    /// Deliver one raw text frame to the client.
    pub fn push(&self, frame: impl Into<String>) {
        let _ = self.tx.send(Some(Ok(frame.into())));
    }

    /// Deliver one JSON frame to the client.
    pub fn push_json(&self, frame: Value) {
        self.push(frame.to_string());
    }

    /// Close the connection from the server side.
    pub fn hang_up(&self) {
        let _ = self.tx.send(None);
    }

    /// Fail the connection with a receive error.
    pub fn fail(&self, reason: &str) {
        let _ = self
            .tx
            .send(Some(Err(SocketlinkError::TransportReceive(reason.into()))));
    }

    /// Frames the client has written, in order.
    pub fn sent(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }

    /// Whether the client closed this transport.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

// ── MockConnector ───────────────────────────────────────────────────

#[derive(Default)]
struct ConnectorState {
    attempts: AtomicUsize,
    refuse: AtomicBool,
    requests: StdMutex<Vec<ConnectRequest>>,
    servers: StdMutex<Vec<MockServer>>,
}

/// A [`Connector`] that opens in-memory transports.
///
/// Clones share state, so keep one clone for inspection after handing the
/// other to the client.
#[derive(Clone, Default)]
pub struct MockConnector {
    state: Arc<ConnectorState>,
}

impl MockConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent connect attempt fail (or succeed again).
    pub fn refuse_connections(&self, refuse: bool) {
        self.state.refuse.store(refuse, Ordering::Release);
    }

    /// Number of connect attempts, successful or not.
    pub fn attempts(&self) -> usize {
        self.state.attempts.load(Ordering::Acquire)
    }

    /// Number of transports opened.
    pub fn opened(&self) -> usize {
        self.state.servers.lock().unwrap().len()
    }

    /// The request passed to every connect attempt.
    pub fn requests(&self) -> Vec<ConnectRequest> {
        self.state.requests.lock().unwrap().clone()
    }

    /// Server handle for the `n`th opened transport.
    pub fn server(&self, n: usize) -> MockServer {
        self.state.servers.lock().unwrap()[n].clone()
    }

    /// Server handle for the most recently opened transport.
    pub fn latest_server(&self) -> MockServer {
        self.state
            .servers
            .lock()
            .unwrap()
            .last()
            .cloned()
            .expect("no transport opened yet")
    }
}

#[async_trait]
impl Connector for MockConnector {
    async fn connect(&self, request: &ConnectRequest) -> Result<Box<dyn Transport>, SocketlinkError> {
        self.state.attempts.fetch_add(1, Ordering::AcqRel);
        self.state.requests.lock().unwrap().push(request.clone());
        if self.state.refuse.load(Ordering::Acquire) {
            return Err(SocketlinkError::TransportConnect("connection refused".into()));
        }

        let (tx, incoming) = mpsc::unbounded_channel();
        let sent = Arc::new(StdMutex::new(Vec::new()));
        let closed = Arc::new(AtomicBool::new(false));
        self.state.servers.lock().unwrap().push(MockServer {
            tx,
            sent: Arc::clone(&sent),
            closed: Arc::clone(&closed),
        });
        Ok(Box::new(MockTransport {
            incoming,
            sent,
            closed,
        }))
    }
}

// ── RecordingExecutor ───────────────────────────────────────────────

#[derive(Default)]
struct ExecutorState {
    requests: StdMutex<Vec<ApiRequest>>,
    responses: StdMutex<VecDeque<Result<Value, SocketlinkError>>>,
}

/// A [`RequestExecutor`] spy that records every request.
///
/// Responds with queued responses in order, then `{"ok": true}`.
#[derive(Clone, Default)]
pub struct RecordingExecutor {
    state: Arc<ExecutorState>,
}

impl RecordingExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the result of the next unanswered request.
    pub fn respond_with(&self, response: Result<Value, SocketlinkError>) {
        self.state.responses.lock().unwrap().push_back(response);
    }

    pub fn requests(&self) -> Vec<ApiRequest> {
        self.state.requests.lock().unwrap().clone()
    }

    /// The only request made so far.
    pub fn single_request(&self) -> ApiRequest {
        let requests = self.requests();
        assert_eq!(requests.len(), 1, "expected exactly one request, got {requests:?}");
        requests[0].clone()
    }
}

#[async_trait]
impl RequestExecutor for RecordingExecutor {
    async fn execute(&self, request: ApiRequest) -> Result<Value, SocketlinkError> {
        self.state.requests.lock().unwrap().push(request);
        self.state
            .responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(json!({ "ok": true })))
    }
}

// ── Helpers ─────────────────────────────────────────────────────────

pub const TEST_URL: &str = "https://socketlink.test";
pub const CLIENT_KEY: &str = "sl_client_key";
pub const ADMIN_KEY: &str = "sl_admin_key";
pub const UID: &str = "alice";

/// A config with both keys, a fixed uid and default reconnect settings.
pub fn test_config() -> SocketlinkConfig {
    SocketlinkConfig::new(TEST_URL)
        .with_client_api_key(CLIENT_KEY)
        .with_admin_api_key(ADMIN_KEY)
        .with_uid(UID)
}

/// Build a started client over a fresh mock connector.
pub fn start_client(config: SocketlinkConfig) -> (SocketlinkClient, MockConnector, RecordingExecutor) {
    let connector = MockConnector::new();
    let executor = RecordingExecutor::new();
    let client = SocketlinkClient::start_with(config, connector.clone(), executor.clone())
        .expect("client should start");
    (client, connector, executor)
}

/// Wait until the client reports `want`, failing after five seconds.
pub async fn wait_for_state(client: &SocketlinkClient, want: ConnectionState) {
    let mut rx = client.state_changes();
    tokio::time::timeout(Duration::from_secs(5), rx.wait_for(|s| *s == want))
        .await
        .unwrap_or_else(|_| panic!("timed out waiting for {want:?}"))
        .expect("connection task stopped");
}

/// Let the connection task drain its queue.
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(20)).await;
}
