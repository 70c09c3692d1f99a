//! Connection lifecycle manager.
//!
//! One background task owns the live transport, the in-flight handshake and
//! the reconnect timer. The client handle talks to it over an unbounded
//! command channel, and every state transition and listener dispatch happens
//! on this task, in order.
//!
//! ```text
//! Disconnected ──connect──▶ Connecting ──handshake ok──▶ Open
//!      ▲                        │                          │
//!      │                  handshake error            transport closed
//!      │                        ▼                          │
//!      └──── reconnect timer ◀─ Disconnected ◀─────────────┘
//!
//! any state ──close──▶ Closed   (connect still allowed, no auto-reconnect)
//! ```
//!
//! At most one of {handshake, transport, reconnect timer} is active at a time.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::Sleep;
use tracing::{debug, error, info, warn};

use crate::error::{Result, SocketlinkError};
use crate::event::SocketlinkEvent;
use crate::listeners::ListenerRegistry;
use crate::protocol::InboundEnvelope;
use crate::transport::{ConnectRequest, Connector, Transport};

/// Lifecycle state of the live connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No transport. A reconnect may be pending.
    Disconnected,
    /// Handshake in flight.
    Connecting,
    /// Transport open; `send` writes frames.
    Open,
    /// Closed on request. Auto-reconnect is permanently off.
    Closed,
}

/// Requests from the client handle.
#[derive(Debug)]
pub(crate) enum Command {
    Connect,
    /// A serialized outbound envelope.
    Send(String),
    Close,
}

type Handshake = Pin<Box<dyn Future<Output = Result<Box<dyn Transport>>> + Send>>;

/// Settings the task needs from the client configuration.
pub(crate) struct ConnectionSettings {
    pub request: ConnectRequest,
    pub auto_reconnect: bool,
    pub reconnect_interval: Duration,
    pub connect_timeout: Duration,
}

pub(crate) struct ConnectionTask {
    connector: Arc<dyn Connector>,
    settings: ConnectionSettings,
    listeners: Arc<ListenerRegistry>,
    state_tx: watch::Sender<ConnectionState>,
    cmd_rx: mpsc::UnboundedReceiver<Command>,
    shutdown_rx: oneshot::Receiver<()>,
    transport: Option<Box<dyn Transport>>,
    handshake: Option<Handshake>,
    reconnect_timer: Option<Pin<Box<Sleep>>>,
}

impl ConnectionTask {
    pub(crate) fn new(
        connector: Arc<dyn Connector>,
        settings: ConnectionSettings,
        listeners: Arc<ListenerRegistry>,
        state_tx: watch::Sender<ConnectionState>,
        cmd_rx: mpsc::UnboundedReceiver<Command>,
        shutdown_rx: oneshot::Receiver<()>,
    ) -> Self {
        Self {
            connector,
            settings,
            listeners,
            state_tx,
            cmd_rx,
            shutdown_rx,
            transport: None,
            handshake: None,
            reconnect_timer: None,
        }
    }

    /// Drive the connection until shutdown or until the client handle is
    /// dropped.
    pub(crate) async fn run(mut self) {
        debug!("connection task started");

        loop {
            tokio::select! {
                cmd = self.cmd_rx.recv() => {
                    match cmd {
                        Some(Command::Connect) => self.connect(),
                        Some(Command::Send(frame)) => self.send(frame).await,
                        Some(Command::Close) => self.close().await,
                        None => {
                            debug!("command channel closed, stopping connection task");
                            self.close().await;
                            break;
                        }
                    }
                }

                _ = &mut self.shutdown_rx => {
                    debug!("shutdown signal received");
                    self.close().await;
                    break;
                }

                result = next_handshake(&mut self.handshake) => {
                    self.handshake = None;
                    match result {
                        Ok(transport) => self.on_open(transport),
                        Err(e) => {
                            error!("connection attempt failed: {e}");
                            self.dispatch(SocketlinkEvent::from(e));
                            self.on_closed();
                        }
                    }
                }

                incoming = next_frame(&mut self.transport) => {
                    match incoming {
                        Some(Ok(text)) => self.on_frame(&text),
                        Some(Err(e)) => {
                            error!("transport receive error: {e}");
                            self.dispatch(SocketlinkEvent::from(e));
                            self.drop_transport().await;
                            self.on_closed();
                        }
                        None => {
                            debug!("transport closed by server");
                            self.transport = None;
                            self.on_closed();
                        }
                    }
                }

                () = next_tick(&mut self.reconnect_timer) => {
                    self.reconnect_timer = None;
                    debug!("reconnect timer fired");
                    self.connect();
                }
            }
        }

        debug!("connection task exited");
    }

    fn state(&self) -> ConnectionState {
        *self.state_tx.borrow()
    }

    fn set_state(&self, state: ConnectionState) {
        self.state_tx.send_replace(state);
        debug!(?state, "connection state changed");
    }

    fn dispatch(&self, event: SocketlinkEvent) {
        let delivered = self.listeners.dispatch(&event);
        if delivered == 0 {
            debug!(kind = ?event.kind(), "no listener registered, event dropped");
        }
    }

    fn connect(&mut self) {
        if self.transport.is_some() || self.handshake.is_some() {
            debug!("connect ignored, connection already open or opening");
            return;
        }
        // A manual connect supersedes a pending automatic one.
        self.reconnect_timer = None;

        let connector = Arc::clone(&self.connector);
        let request = self.settings.request.clone();
        let timeout = self.settings.connect_timeout;
        info!(url = %request.url, "connecting");

        self.handshake = Some(Box::pin(async move {
            match tokio::time::timeout(timeout, connector.connect(&request)).await {
                Ok(result) => result,
                Err(_) => Err(SocketlinkError::Timeout),
            }
        }));
        self.set_state(ConnectionState::Connecting);
    }

    fn on_open(&mut self, transport: Box<dyn Transport>) {
        info!("connection open");
        self.transport = Some(transport);
        self.set_state(ConnectionState::Open);
        self.dispatch(SocketlinkEvent::Open);
    }

    fn on_frame(&self, text: &str) {
        match InboundEnvelope::parse(text) {
            Ok(envelope) => match envelope.into_event() {
                Some(event) => self.dispatch(event),
                None => debug!("ignoring frame with unknown source: {text}"),
            },
            Err(e) => {
                warn!("failed to parse inbound frame: {e}, raw: {text}");
                self.dispatch(SocketlinkEvent::from(SocketlinkError::Serialization(e)));
            }
        }
    }

    /// The transport or handshake has ended without a close request.
    fn on_closed(&mut self) {
        self.set_state(ConnectionState::Disconnected);
        self.dispatch(SocketlinkEvent::Close);

        if self.settings.auto_reconnect {
            info!(
                "reconnecting in {} ms",
                self.settings.reconnect_interval.as_millis()
            );
            self.reconnect_timer = Some(Box::pin(tokio::time::sleep(
                self.settings.reconnect_interval,
            )));
        }
    }

    async fn send(&mut self, frame: String) {
        let Some(transport) = self.transport.as_mut() else {
            warn!("cannot send message, socket not open");
            return;
        };
        if let Err(e) = transport.send(frame).await {
            error!("transport send error: {e}");
            self.dispatch(SocketlinkEvent::from(e));
            self.drop_transport().await;
            self.on_closed();
        }
    }

    async fn close(&mut self) {
        self.settings.auto_reconnect = false;
        self.reconnect_timer = None;

        let had_handshake = self.handshake.take().is_some();
        let was_active = had_handshake || self.transport.is_some();
        self.drop_transport().await;
        if self.state() != ConnectionState::Closed {
            self.set_state(ConnectionState::Closed);
        }
        if was_active {
            info!("connection closed");
            self.dispatch(SocketlinkEvent::Close);
        }
    }

    async fn drop_transport(&mut self) {
        if let Some(mut transport) = self.transport.take() {
            if let Err(e) = transport.close().await {
                debug!("error while closing transport: {e}");
            }
        }
    }
}

async fn next_handshake(handshake: &mut Option<Handshake>) -> Result<Box<dyn Transport>> {
    match handshake {
        Some(fut) => fut.await,
        None => std::future::pending().await,
    }
}

async fn next_frame(transport: &mut Option<Box<dyn Transport>>) -> Option<Result<String>> {
    match transport {
        Some(t) => t.recv().await,
        None => std::future::pending().await,
    }
}

async fn next_tick(timer: &mut Option<Pin<Box<Sleep>>>) {
    match timer {
        Some(sleep) => sleep.as_mut().await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::indexing_slicing
)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex as StdMutex;

    /// Transport fed by a channel; `None` items close it.
    struct ChannelTransport {
        incoming: mpsc::UnboundedReceiver<Option<Result<String>>>,
        sent: Arc<StdMutex<Vec<String>>>,
    }

    #[async_trait]
    impl Transport for ChannelTransport {
        async fn send(&mut self, message: String) -> Result<()> {
            self.sent.lock().unwrap().push(message);
            Ok(())
        }

        async fn recv(&mut self) -> Option<Result<String>> {
            self.incoming.recv().await.flatten()
        }

        async fn close(&mut self) -> Result<()> {
            Ok(())
        }
    }

    /// Hands out one channel transport per connect, counting attempts.
    struct TestConnector {
        attempts: Arc<AtomicUsize>,
        feeds: StdMutex<Vec<mpsc::UnboundedReceiver<Option<Result<String>>>>>,
        sent: Arc<StdMutex<Vec<String>>>,
    }

    #[async_trait]
    impl Connector for TestConnector {
        async fn connect(&self, _request: &ConnectRequest) -> Result<Box<dyn Transport>> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            let feed = self.feeds.lock().unwrap().pop();
            match feed {
                Some(incoming) => Ok(Box::new(ChannelTransport {
                    incoming,
                    sent: Arc::clone(&self.sent),
                })),
                None => Err(SocketlinkError::TransportConnect("refused".into())),
            }
        }
    }

    struct Harness {
        cmd_tx: mpsc::UnboundedSender<Command>,
        state_rx: watch::Receiver<ConnectionState>,
        attempts: Arc<AtomicUsize>,
        sent: Arc<StdMutex<Vec<String>>>,
        events: Arc<StdMutex<Vec<crate::event::EventKind>>>,
        _shutdown_tx: oneshot::Sender<()>,
    }

    fn harness(
        feeds: Vec<mpsc::UnboundedReceiver<Option<Result<String>>>>,
        auto_reconnect: bool,
    ) -> Harness {
        let attempts = Arc::new(AtomicUsize::new(0));
        let sent = Arc::new(StdMutex::new(Vec::new()));
        let connector = Arc::new(TestConnector {
            attempts: Arc::clone(&attempts),
            // Popped from the back, so reverse to hand them out in order.
            feeds: StdMutex::new(feeds.into_iter().rev().collect()),
            sent: Arc::clone(&sent),
        });

        let listeners = Arc::new(ListenerRegistry::default());
        let events = Arc::new(StdMutex::new(Vec::new()));
        let ev = Arc::clone(&events);
        listeners.register(crate::listeners::Listener::Any(Arc::new(
            move |event: &SocketlinkEvent| ev.lock().unwrap().push(event.kind()),
        )));

        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(ConnectionState::Disconnected);
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let settings = ConnectionSettings {
            request: ConnectRequest {
                url: url::Url::parse("wss://example.com/").unwrap(),
                api_key: "k".into(),
                uid: "u".into(),
                reject_unauthorized_certs: true,
            },
            auto_reconnect,
            reconnect_interval: Duration::from_millis(3000),
            connect_timeout: Duration::from_secs(10),
        };
        let task = ConnectionTask::new(connector, settings, listeners, state_tx, cmd_rx, shutdown_rx);
        tokio::spawn(task.run());

        Harness {
            cmd_tx,
            state_rx,
            attempts,
            sent,
            events,
            _shutdown_tx: shutdown_tx,
        }
    }

    async fn wait_for(state_rx: &mut watch::Receiver<ConnectionState>, want: ConnectionState) {
        state_rx.wait_for(|s| *s == want).await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn open_then_close_schedules_one_reconnect() {
        let (feed_tx, feed_rx) = mpsc::unbounded_channel();
        let (_feed2_tx, feed2_rx) = mpsc::unbounded_channel();
        let mut h = harness(vec![feed_rx, feed2_rx], true);

        h.cmd_tx.send(Command::Connect).unwrap();
        wait_for(&mut h.state_rx, ConnectionState::Open).await;

        feed_tx.send(None).unwrap();
        wait_for(&mut h.state_rx, ConnectionState::Disconnected).await;
        assert_eq!(h.attempts.load(Ordering::SeqCst), 1);

        tokio::time::sleep(Duration::from_millis(2999)).await;
        assert_eq!(h.attempts.load(Ordering::SeqCst), 1);

        wait_for(&mut h.state_rx, ConnectionState::Open).await;
        assert_eq!(h.attempts.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn connect_while_open_is_ignored() {
        let (_feed_tx, feed_rx) = mpsc::unbounded_channel();
        let mut h = harness(vec![feed_rx], true);

        h.cmd_tx.send(Command::Connect).unwrap();
        wait_for(&mut h.state_rx, ConnectionState::Open).await;
        h.cmd_tx.send(Command::Connect).unwrap();
        h.cmd_tx.send(Command::Connect).unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert_eq!(h.attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_handshake_reports_error_then_close() {
        let mut h = harness(vec![], false);

        h.cmd_tx.send(Command::Connect).unwrap();
        wait_for(&mut h.state_rx, ConnectionState::Disconnected).await;
        tokio::time::sleep(Duration::from_millis(10)).await;

        use crate::event::EventKind;
        assert_eq!(*h.events.lock().unwrap(), vec![EventKind::Error, EventKind::Close]);
    }

    #[tokio::test(start_paused = true)]
    async fn send_writes_frame_only_when_open() {
        let (_feed_tx, feed_rx) = mpsc::unbounded_channel();
        let mut h = harness(vec![feed_rx], false);

        h.cmd_tx.send(Command::Send("early".into())).unwrap();
        h.cmd_tx.send(Command::Connect).unwrap();
        wait_for(&mut h.state_rx, ConnectionState::Open).await;
        h.cmd_tx.send(Command::Send("late".into())).unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert_eq!(*h.sent.lock().unwrap(), vec!["late".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn close_cancels_pending_reconnect() {
        let (feed_tx, feed_rx) = mpsc::unbounded_channel();
        let (_feed2_tx, feed2_rx) = mpsc::unbounded_channel();
        let mut h = harness(vec![feed_rx, feed2_rx], true);

        h.cmd_tx.send(Command::Connect).unwrap();
        wait_for(&mut h.state_rx, ConnectionState::Open).await;
        feed_tx.send(None).unwrap();
        wait_for(&mut h.state_rx, ConnectionState::Disconnected).await;

        h.cmd_tx.send(Command::Close).unwrap();
        wait_for(&mut h.state_rx, ConnectionState::Closed).await;
        tokio::time::sleep(Duration::from_secs(60)).await;

        assert_eq!(h.attempts.load(Ordering::SeqCst), 1);
        assert_eq!(*h.state_rx.borrow(), ConnectionState::Closed);
    }
}
