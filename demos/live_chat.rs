//! # Live Chat Example
//!
//! Demonstrates the live connection:
//!
//! 1. Build a client from `SOCKETLINK_*` environment variables
//! 2. Register listeners for messages, broadcasts and connection changes
//! 3. Subscribe to a room through the API
//! 4. Send every line typed on stdin to that room
//! 5. Shut down gracefully on Ctrl+C or end of input
//!
//! ## Running
//!
//! ```sh
//! SOCKETLINK_URL=https://your-app.socketlink.io \
//! SOCKETLINK_CLIENT_API_KEY=sl_client_... \
//! cargo run --example live_chat -- lobby
//! ```

use socketlink_client::{SocketlinkClient, SocketlinkConfig, SocketlinkError};
use tokio::io::{AsyncBufReadExt, BufReader};

/// Room joined when none is given on the command line.
const DEFAULT_ROOM: &str = "lobby";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // ── Logging ─────────────────────────────────────────────────────
    // Set `RUST_LOG=debug` for connection state changes.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    // ── Configuration ───────────────────────────────────────────────
    let room = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_ROOM.to_string());
    let config = SocketlinkConfig::from_env()?;
    tracing::info!("Connecting to {} as {}", config.connection_url, config.uid);

    // ── Listeners ───────────────────────────────────────────────────
    // Register before connecting so the first `open` is not missed.
    let mut client = SocketlinkClient::new(config)?;

    client.on_open(|| tracing::info!("Connected"));
    client.on_close(|| tracing::warn!("Connection closed"));
    client.on_message(|data, rid| {
        tracing::info!("[{}] {data}", rid.unwrap_or("?"));
    });
    client.on_server_broadcast(|data| tracing::info!("[server] {data}"));
    client.on_admin_broadcast(|data, rid| match rid {
        Some(rid) => tracing::info!("[admin → {rid}] {data}"),
        None => tracing::info!("[admin] {data}"),
    });
    client.on_error(|e: &SocketlinkError| tracing::error!("Connection error: {e}"));

    client.connect()?;

    // ── Subscribe ───────────────────────────────────────────────────
    match client.api().subscribe_to_room(&room).await {
        Ok(_) => tracing::info!("Subscribed to {room}"),
        Err(e) => tracing::error!("Subscribe failed: {e}"),
    }

    // ── Input loop ──────────────────────────────────────────────────
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                match line? {
                    Some(text) if !text.trim().is_empty() => client.send(text, Some(&room)),
                    Some(_) => {}
                    None => {
                        tracing::info!("End of input, exiting");
                        break;
                    }
                }
            }

            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Ctrl+C received, shutting down…");
                break;
            }
        }
    }

    // ── Cleanup ─────────────────────────────────────────────────────
    if let Err(e) = client.api().unsubscribe_from_room(&room).await {
        tracing::warn!("Unsubscribe failed: {e}");
    }
    client.shutdown().await;
    tracing::info!("Client shut down. Goodbye!");
    Ok(())
}
