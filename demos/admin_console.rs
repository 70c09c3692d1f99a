//! # Admin Console Example
//!
//! Runs one admin API operation and prints the JSON response. Only an admin
//! key is needed; no live connection is opened.
//!
//! ## Running
//!
//! ```sh
//! export SOCKETLINK_URL=https://your-app.socketlink.io
//! export SOCKETLINK_ADMIN_API_KEY=sl_admin_...
//!
//! cargo run --example admin_console -- rooms
//! cargo run --example admin_console -- broadcast "maintenance at 22:00"
//! cargo run --example admin_console -- ban room1 alice bob
//! cargo run --example admin_console -- messaging disable
//! ```

use socketlink_client::{ApiClient, MessagingAction, SocketlinkConfig};

const USAGE: &str = "usage: admin_console <ping|metrics|rooms|orphans|subscriptions|banned|muted|\
broadcast MESSAGE|ban RID UID..|unban RID UID..|messaging enable|disable>";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some((command, rest)) = args.split_first() else {
        eprintln!("{USAGE}");
        std::process::exit(2);
    };

    let config = SocketlinkConfig::from_env()?;
    let api = ApiClient::new(&config)?;

    let response = match (command.as_str(), rest) {
        ("ping", []) => api.ping_server().await?,
        ("metrics", []) => api.get_usage_metrics().await?,
        ("rooms", []) => api.fetch_all_rooms().await?,
        ("orphans", []) => api.get_orphan_users().await?,
        ("subscriptions", []) => api.get_subscriptions_for_all_users().await?,
        ("banned", []) => api.get_banned_users().await?,
        ("muted", []) => api.get_users_with_messaging_disabled().await?,
        ("broadcast", [message]) => api.broadcast_message_to_everyone(message).await?,
        ("ban", [rid, uids @ ..]) => api.ban_users_in_given_rooms(rid, uids).await?,
        ("unban", [rid, uids @ ..]) => api.unban_users_from_given_rooms(rid, uids).await?,
        ("messaging", [action]) => {
            let action: MessagingAction = action.parse()?;
            api.enable_disable_messaging_in_server(action).await?
        }
        _ => {
            eprintln!("{USAGE}");
            std::process::exit(2);
        }
    };

    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}
