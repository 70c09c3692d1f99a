//! WebSocket transport implementation using `tokio-tungstenite`.
//!
//! This module provides [`WebSocketTransport`], a [`Transport`] over a
//! WebSocket stream, and [`WebSocketConnector`], the default [`Connector`]
//! used by [`SocketlinkClient::start`](crate::SocketlinkClient::start). TLS is
//! handled by `native-tls`; certificate verification can be switched off with
//! [`SocketlinkConfig::with_reject_unauthorized_certs`](crate::SocketlinkConfig::with_reject_unauthorized_certs).
//!
//! # Feature gate
//!
//! This module is only available when the `transport-websocket` feature is enabled
//! (it is enabled by default).

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::protocol::Message;

use crate::error::{Result, SocketlinkError};
use crate::transport::{ConnectRequest, Connector, Transport};

/// Type alias for the underlying WebSocket stream.
pub type WsStream =
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

/// A [`Transport`] implementation backed by a WebSocket connection.
///
/// # Cancel Safety
///
/// The [`recv`](Transport::recv) method is cancel-safe. Dropping the future
/// returned by `recv` before it completes will not consume or lose any messages.
#[derive(Debug)]
pub struct WebSocketTransport {
    stream: WsStream,
    closed: bool,
}

impl WebSocketTransport {
    /// Open the live connection described by `request`, sending the `api-key`
    /// and `uid` headers with the upgrade.
    ///
    /// # Errors
    ///
    /// Returns [`SocketlinkError::Io`] for socket-level failures and
    /// [`SocketlinkError::TransportConnect`] for anything else, including a
    /// header value that is not valid or a TLS connector that cannot be built.
    pub async fn connect(request: &ConnectRequest) -> Result<Self> {
        let mut upgrade = request
            .url
            .as_str()
            .into_client_request()
            .map_err(map_handshake_error)?;
        let headers = upgrade.headers_mut();
        headers.insert("api-key", header_value(&request.api_key)?);
        headers.insert("uid", header_value(&request.uid)?);

        let tls = if request.reject_unauthorized_certs {
            None
        } else {
            tracing::warn!("TLS certificate verification is disabled");
            let connector = native_tls::TlsConnector::builder()
                .danger_accept_invalid_certs(true)
                .danger_accept_invalid_hostnames(true)
                .build()
                .map_err(|e| SocketlinkError::TransportConnect(e.to_string()))?;
            Some(tokio_tungstenite::Connector::NativeTls(connector))
        };

        tracing::debug!(url = %request.url, uid = %request.uid, "connecting to WebSocket server");
        let (stream, _response) =
            tokio_tungstenite::connect_async_tls_with_config(upgrade, None, false, tls)
                .await
                .map_err(map_handshake_error)?;
        tracing::info!(url = %request.url, "WebSocket connection established");

        Ok(Self::from_stream(stream))
    }

    /// Create a [`WebSocketTransport`] from an already-established WebSocket stream.
    pub fn from_stream(stream: WsStream) -> Self {
        Self {
            stream,
            closed: false,
        }
    }
}

fn header_value(value: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(value)
        .map_err(|e| SocketlinkError::TransportConnect(format!("invalid header value: {e}")))
}

fn map_handshake_error(e: tokio_tungstenite::tungstenite::Error) -> SocketlinkError {
    match e {
        tokio_tungstenite::tungstenite::Error::Io(io) => SocketlinkError::Io(io),
        other => SocketlinkError::TransportConnect(other.to_string()),
    }
}

#[async_trait]
impl Transport for WebSocketTransport {
    async fn send(&mut self, message: String) -> Result<()> {
        if self.closed {
            return Err(SocketlinkError::TransportClosed);
        }
        self.stream
            .send(Message::Text(message.into()))
            .await
            .map_err(|e| SocketlinkError::TransportSend(e.to_string()))
    }

    async fn recv(&mut self) -> Option<Result<String>> {
        loop {
            let msg = match self.stream.next().await {
                Some(Ok(msg)) => msg,
                Some(Err(e)) => {
                    return Some(Err(SocketlinkError::TransportReceive(e.to_string())));
                }
                None => return None,
            };

            match msg {
                Message::Text(text) => return Some(Ok(text.to_string())),
                // The service sends JSON, occasionally as binary frames.
                Message::Binary(bytes) => match String::from_utf8(bytes.to_vec()) {
                    Ok(text) => return Some(Ok(text)),
                    Err(_) => tracing::warn!("received non-UTF-8 binary frame, skipping"),
                },
                Message::Close(frame) => {
                    tracing::debug!(?frame, "received WebSocket close frame");
                    return None;
                }
                Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => {
                    // tungstenite answers pings itself.
                }
            }
        }
    }

    async fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.stream
            .close(None)
            .await
            .map_err(|e| SocketlinkError::TransportSend(e.to_string()))
    }
}

/// The default [`Connector`]: opens a [`WebSocketTransport`] per attempt.
#[derive(Debug, Clone, Copy, Default)]
pub struct WebSocketConnector;

#[async_trait]
impl Connector for WebSocketConnector {
    async fn connect(&self, request: &ConnectRequest) -> Result<Box<dyn Transport>> {
        let transport = WebSocketTransport::connect(request).await?;
        Ok(Box::new(transport))
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::indexing_slicing
)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex as StdMutex};
    use tokio::net::TcpListener;
    use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};

    #[test]
    fn websocket_transport_is_send() {
        fn assert_send<T: Send>() {}
        assert_send::<WebSocketTransport>();
    }

    fn request_for(url: &str) -> ConnectRequest {
        ConnectRequest {
            url: url::Url::parse(url).unwrap(),
            api_key: "sl_client".into(),
            uid: "alice".into(),
            reject_unauthorized_certs: true,
        }
    }

    #[tokio::test]
    async fn connect_fails_with_unsupported_scheme() {
        let err = WebSocketTransport::connect(&request_for("ftp://127.0.0.1/"))
            .await
            .unwrap_err();
        assert!(matches!(err, SocketlinkError::TransportConnect(_)));
    }

    #[tokio::test]
    async fn connect_fails_with_unreachable_host() {
        let err = WebSocketTransport::connect(&request_for("ws://127.0.0.1:1/"))
            .await
            .unwrap_err();
        assert!(matches!(err, SocketlinkError::Io(_)));
    }

    // ── Mock-stream helpers ──────────────────────────────────────────────

    /// Start a local WebSocket server that runs `handler` on the accepted
    /// connection and returns a request for it.
    async fn start_mock_server<F, Fut>(handler: F) -> ConnectRequest
    where
        F: FnOnce(tokio_tungstenite::WebSocketStream<tokio::net::TcpStream>) -> Fut
            + Send
            + 'static,
        Fut: std::future::Future<Output = ()> + Send,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (tcp, _) = listener.accept().await.unwrap();
            let ws = tokio_tungstenite::accept_async(tcp).await.unwrap();
            handler(ws).await;
        });

        request_for(&format!("ws://{addr}/"))
    }

    // ── Mock-stream tests ────────────────────────────────────────────────

    #[tokio::test]
    async fn recv_receives_text_messages() {
        let request = start_mock_server(|mut ws| async move {
            ws.send(Message::Text(r#"{"source":"server","data":1}"#.into()))
                .await
                .unwrap();
            ws.close(None).await.unwrap();
        })
        .await;

        let mut transport = WebSocketTransport::connect(&request).await.unwrap();
        let msg = transport.recv().await.unwrap().unwrap();
        assert_eq!(msg, r#"{"source":"server","data":1}"#);
        assert!(transport.recv().await.is_none());
    }

    #[tokio::test]
    async fn recv_skips_non_utf8_binary_frames() {
        let request = start_mock_server(|mut ws| async move {
            ws.send(Message::Binary(vec![0xFF, 0xFE].into()))
                .await
                .unwrap();
            ws.send(Message::Binary(b"{\"source\":\"admin\"}".to_vec().into()))
                .await
                .unwrap();
            ws.close(None).await.unwrap();
        })
        .await;

        let mut transport = WebSocketTransport::connect(&request).await.unwrap();

        // 0xFF never appears in UTF-8, so the first frame is skipped.
        let msg = transport.recv().await.unwrap().unwrap();
        assert_eq!(msg, r#"{"source":"admin"}"#);
        assert!(transport.recv().await.is_none());
    }

    #[tokio::test]
    async fn recv_decodes_utf8_binary_frames() {
        let request = start_mock_server(|mut ws| async move {
            ws.send(Message::Binary("héllo".as_bytes().to_vec().into()))
                .await
                .unwrap();
            ws.close(None).await.unwrap();
        })
        .await;

        let mut transport = WebSocketTransport::connect(&request).await.unwrap();
        assert_eq!(transport.recv().await.unwrap().unwrap(), "héllo");
    }

    #[tokio::test]
    async fn send_after_close_returns_transport_closed() {
        let request = start_mock_server(|mut ws| async move {
            while let Some(Ok(_)) = ws.next().await {}
        })
        .await;

        let mut transport = WebSocketTransport::connect(&request).await.unwrap();
        transport.close().await.unwrap();
        // Second close is a no-op.
        transport.close().await.unwrap();

        let err = transport.send("oops".to_string()).await.unwrap_err();
        assert!(matches!(err, SocketlinkError::TransportClosed));
    }

    #[tokio::test]
    async fn send_round_trip() {
        let request = start_mock_server(|mut ws| async move {
            if let Some(Ok(Message::Text(text))) = ws.next().await {
                ws.send(Message::Text(text)).await.unwrap();
            }
            ws.close(None).await.unwrap();
        })
        .await;

        let mut transport = WebSocketTransport::connect(&request).await.unwrap();
        transport.send("ping_echo".to_string()).await.unwrap();

        let msg = transport.recv().await.unwrap().unwrap();
        assert_eq!(msg, "ping_echo");
    }

    #[tokio::test]
    async fn connector_sends_identity_headers() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let seen: Arc<StdMutex<Vec<(String, String)>>> = Arc::new(StdMutex::new(Vec::new()));
        let seen_server = Arc::clone(&seen);

        tokio::spawn(async move {
            let (tcp, _) = listener.accept().await.unwrap();
            let capture = move |req: &Request, resp: Response| {
                let mut seen = seen_server.lock().unwrap();
                for name in ["api-key", "uid"] {
                    if let Some(value) = req.headers().get(name) {
                        seen.push((name.to_string(), value.to_str().unwrap().to_string()));
                    }
                }
                Ok::<Response, ErrorResponse>(resp)
            };
            let mut ws = tokio_tungstenite::accept_hdr_async(tcp, capture)
                .await
                .unwrap();
            ws.close(None).await.unwrap();
        });

        let request = request_for(&format!("ws://{addr}/"));
        let mut transport = WebSocketConnector.connect(&request).await.unwrap();
        assert!(transport.recv().await.is_none());

        let seen = seen.lock().unwrap();
        assert!(seen.contains(&("api-key".into(), "sl_client".into())));
        assert!(seen.contains(&("uid".into(), "alice".into())));
    }

    #[tokio::test]
    async fn connector_rejects_invalid_header_value() {
        let mut request = request_for("ws://127.0.0.1:1/");
        request.api_key = "bad\nkey".into();
        let err = WebSocketTransport::connect(&request).await.unwrap_err();
        assert!(matches!(err, SocketlinkError::TransportConnect(_)));
    }
}
