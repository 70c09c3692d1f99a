//! REST operations: metrics, rooms, subscriptions, broadcasts, bans and
//! messaging controls.
//!
//! [`ApiClient`] works without a live connection. Use it on its own for
//! admin-only tooling, or reach it through
//! [`SocketlinkClient::api`](crate::SocketlinkClient::api).
//!
//! Every method validates its credential and arguments first; a validation
//! failure is returned before any request is made.
//!
//! ```rust,no_run
//! # async fn example() -> socketlink_client::Result<()> {
//! use socketlink_client::{ApiClient, SocketlinkConfig};
//!
//! let config = SocketlinkConfig::new("https://example.socketlink.io")
//!     .with_admin_api_key("sl_admin");
//! let api = ApiClient::new(&config)?;
//!
//! api.broadcast_message_to_everyone("maintenance at 22:00").await?;
//! let banned = api.get_banned_users().await?;
//! println!("{banned}");
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use serde_json::{json, Value};
use url::Url;

use crate::config::{require_key, SocketlinkConfig};
use crate::error::{Result, SocketlinkError};
use crate::http::{ApiRequest, HttpExecutor, RequestExecutor};
use crate::routes::{MessagingAction, Route, Scope};

/// Room ID used by the service for server-wide bans and messaging controls.
pub const GLOBAL_ROOM: &str = "global";

/// Client for the Socketlink REST API.
#[derive(Clone)]
pub struct ApiClient {
    executor: Arc<dyn RequestExecutor>,
    base_url: Url,
    client_api_key: Option<String>,
    admin_api_key: Option<String>,
    uid: String,
}

impl ApiClient {
    /// Build a client that issues requests with [`HttpExecutor`].
    ///
    /// # Errors
    ///
    /// Fails when the connection URL is not a valid `https` URL or the HTTP
    /// client cannot be built.
    pub fn new(config: &SocketlinkConfig) -> Result<Self> {
        let executor =
            HttpExecutor::new(config.request_timeout, config.reject_unauthorized_certs)?;
        Self::with_executor(config, executor)
    }

    /// Build a client that issues requests through `executor`.
    ///
    /// # Errors
    ///
    /// Fails when the connection URL is not a valid `https` URL.
    pub fn with_executor(
        config: &SocketlinkConfig,
        executor: impl RequestExecutor,
    ) -> Result<Self> {
        Ok(Self {
            executor: Arc::new(executor),
            base_url: config.base_url()?,
            client_api_key: config.client_api_key.clone(),
            admin_api_key: config.admin_api_key.clone(),
            uid: config.uid.clone(),
        })
    }

    /// The user ID sent with client-scoped calls.
    pub fn uid(&self) -> &str {
        &self.uid
    }

    // ── Metrics and maintenance ─────────────────────────────────────

    /// Fetch usage metrics for the account.
    pub async fn get_usage_metrics(&self) -> Result<Value> {
        self.call(Route::Metrics, None).await
    }

    /// Ask the service to synchronize its MySQL store.
    pub async fn sync_mysql(&self) -> Result<Value> {
        self.call(Route::MysqlSync, None).await
    }

    /// Delete the service's local data.
    pub async fn delete_local_database(&self) -> Result<Value> {
        self.call(Route::DeleteLocalDatabase, None).await
    }

    /// Check that the service is reachable. Needs no credential.
    pub async fn ping_server(&self) -> Result<Value> {
        self.call(Route::Ping, None).await
    }

    // ── Rooms and users ─────────────────────────────────────────────

    /// List every room with its members.
    pub async fn fetch_all_rooms(&self) -> Result<Value> {
        self.call(Route::AllRooms, None).await
    }

    /// List users not subscribed to any room.
    pub async fn get_orphan_users(&self) -> Result<Value> {
        self.call(Route::OrphanUsers, None).await
    }

    /// List the members of the given rooms.
    pub async fn get_all_users_in_given_rooms<S: AsRef<str>>(&self, rids: &[S]) -> Result<Value> {
        self.require_admin()?;
        let rids = non_empty_list(rids, "rids array cannot be empty")?;
        self.call(Route::UsersInRooms, Some(json!({ "rid": rids })))
            .await
    }

    // ── Subscriptions ───────────────────────────────────────────────

    /// Subscribe this client's user to a room.
    pub async fn subscribe_to_room(&self, rid: &str) -> Result<Value> {
        self.require_client()?;
        non_empty(rid, "rid must be a non-empty string")?;
        self.call(Route::SubscribeToRoom { rid: rid.to_owned() }, None)
            .await
    }

    /// Unsubscribe this client's user from a room.
    pub async fn unsubscribe_from_room(&self, rid: &str) -> Result<Value> {
        self.require_client()?;
        non_empty(rid, "rid must be a non-empty string")?;
        self.call(Route::UnsubscribeFromRoom { rid: rid.to_owned() }, None)
            .await
    }

    /// List the subscriptions of every user.
    pub async fn get_subscriptions_for_all_users(&self) -> Result<Value> {
        self.call(Route::AllSubscriptions, None).await
    }

    /// List the subscriptions of the given users.
    pub async fn get_subscriptions_for_given_users<S: AsRef<str>>(
        &self,
        uids: &[S],
    ) -> Result<Value> {
        self.require_admin()?;
        let uids = non_empty_list(uids, "uids array cannot be empty")?;
        self.call(Route::SubscriptionsForUsers, Some(json!({ "uid": uids })))
            .await
    }

    // ── Broadcasts ──────────────────────────────────────────────────

    /// Deliver a message to every connected user.
    pub async fn broadcast_message_to_everyone(&self, message: &str) -> Result<Value> {
        self.require_admin()?;
        non_empty(message, "message must be a non-empty string")?;
        self.call(Route::BroadcastToEveryone, Some(json!({ "message": message })))
            .await
    }

    /// Deliver a message to every member of the given rooms.
    pub async fn broadcast_message_to_given_rooms<S: AsRef<str>>(
        &self,
        message: &str,
        rids: &[S],
    ) -> Result<Value> {
        self.require_admin()?;
        non_empty(message, "message must be a non-empty string")?;
        let rids = non_empty_list(rids, "rids array cannot be empty")?;
        self.call(
            Route::BroadcastInRooms,
            Some(json!({ "message": message, "rid": rids })),
        )
        .await
    }

    /// Deliver a message to the given users.
    pub async fn broadcast_message_to_given_users<S: AsRef<str>>(
        &self,
        message: &str,
        uids: &[S],
    ) -> Result<Value> {
        self.require_admin()?;
        non_empty(message, "message must be a non-empty string")?;
        let uids = non_empty_list(uids, "uids array cannot be empty")?;
        self.call(
            Route::BroadcastToUsers,
            Some(json!({ "message": message, "uid": uids })),
        )
        .await
    }

    // ── Bans ────────────────────────────────────────────────────────

    /// Ban users from one room.
    pub async fn ban_users_in_given_rooms<S: AsRef<str>>(
        &self,
        rid: &str,
        uids: &[S],
    ) -> Result<Value> {
        self.require_admin()?;
        non_empty(rid, "rid must be a non-empty string")?;
        self.room_users(Route::BanUsers, rid, uids).await
    }

    /// Ban users from the whole service.
    pub async fn ban_users_from_the_server<S: AsRef<str>>(&self, uids: &[S]) -> Result<Value> {
        self.require_admin()?;
        self.room_users(Route::BanUsers, GLOBAL_ROOM, uids).await
    }

    /// Lift a room ban.
    pub async fn unban_users_from_given_rooms<S: AsRef<str>>(
        &self,
        rid: &str,
        uids: &[S],
    ) -> Result<Value> {
        self.require_admin()?;
        non_empty(rid, "rid must be a non-empty string")?;
        self.room_users(Route::UnbanUsers, rid, uids).await
    }

    /// Lift a server-wide ban.
    pub async fn unban_users_from_the_server<S: AsRef<str>>(&self, uids: &[S]) -> Result<Value> {
        self.require_admin()?;
        self.room_users(Route::UnbanUsers, GLOBAL_ROOM, uids).await
    }

    /// List banned users.
    pub async fn get_banned_users(&self) -> Result<Value> {
        self.call(Route::BannedUsers, None).await
    }

    // ── Messaging controls ──────────────────────────────────────────

    /// Turn messaging on or off for the whole service.
    pub async fn enable_disable_messaging_in_server(
        &self,
        action: MessagingAction,
    ) -> Result<Value> {
        self.call(Route::ServerMessaging(action), None).await
    }

    /// Turn messaging on or off for the given users in every room.
    pub async fn enable_disable_messaging_globally_for_given_users<S: AsRef<str>>(
        &self,
        action: MessagingAction,
        uids: &[S],
    ) -> Result<Value> {
        self.messaging_for_users(action, None, uids).await
    }

    /// Turn messaging on or off for the given users in one room.
    pub async fn enable_disable_messaging_in_rooms_for_given_users<S: AsRef<str>>(
        &self,
        action: MessagingAction,
        rid: &str,
        uids: &[S],
    ) -> Result<Value> {
        self.messaging_for_users(action, Some(rid), uids).await
    }

    /// `rid` of `None` targets the global room.
    async fn messaging_for_users<S: AsRef<str>>(
        &self,
        action: MessagingAction,
        rid: Option<&str>,
        uids: &[S],
    ) -> Result<Value> {
        self.require_admin()?;
        let rid = match rid {
            Some(rid) => non_empty(rid, "rid must be a non-empty string")?,
            None => GLOBAL_ROOM,
        };
        self.room_users(Route::RoomMessaging(action), rid, uids)
            .await
    }

    /// List users whose messaging is disabled.
    pub async fn get_users_with_messaging_disabled(&self) -> Result<Value> {
        self.call(Route::MessagingDisabledUsers, None).await
    }

    // ── Message history ─────────────────────────────────────────────

    /// Fetch the cached messages of a room.
    ///
    /// `uid` must be non-empty; the request itself is authenticated with
    /// this client's own user ID.
    pub async fn get_messages_for_room(&self, rid: &str, uid: &str) -> Result<Value> {
        self.require_client()?;
        non_empty(rid, "rid is required and must be a string")?;
        non_empty(uid, "uid is required and must be a string")?;
        self.call(Route::RoomMessages { rid: rid.to_owned() }, None)
            .await
    }

    // ── Internal helpers ────────────────────────────────────────────

    fn require_client(&self) -> Result<&str> {
        require_key(
            self.client_api_key.as_deref(),
            SocketlinkError::MissingClientApiKey,
        )
    }

    fn require_admin(&self) -> Result<&str> {
        require_key(
            self.admin_api_key.as_deref(),
            SocketlinkError::MissingAdminApiKey,
        )
    }

    /// `[{ "rid": rid, "uid": [..] }]`, the body shape of the ban and
    /// messaging endpoints.
    async fn room_users<S: AsRef<str>>(&self, route: Route, rid: &str, uids: &[S]) -> Result<Value> {
        let uids = non_empty_list(uids, "uids array cannot be empty")?;
        self.call(route, Some(json!([{ "rid": rid, "uid": uids }])))
            .await
    }

    /// Attach credentials for the route's scope and hand the request to the
    /// executor.
    async fn call(&self, route: Route, body: Option<Value>) -> Result<Value> {
        let url = self
            .base_url
            .join(&route.path())
            .map_err(|e| SocketlinkError::InvalidUrl(e.to_string()))?;
        let mut request = ApiRequest::new(route.method(), url);
        match route.scope() {
            Scope::Admin => {
                request = request.with_header("api-key", self.require_admin()?);
            }
            Scope::Client => {
                request = request
                    .with_header("api-key", self.require_client()?)
                    .with_header("uid", self.uid.as_str());
            }
            Scope::Public => {}
        }
        if let Some(body) = body {
            request = request.with_body(body);
        }
        self.executor.execute(request).await
    }
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url.as_str())
            .field("uid", &self.uid)
            .field("has_client_api_key", &self.client_api_key.is_some())
            .field("has_admin_api_key", &self.admin_api_key.is_some())
            .finish()
    }
}

fn non_empty<'a>(value: &'a str, reason: &'static str) -> Result<&'a str> {
    if value.is_empty() {
        Err(SocketlinkError::InvalidArgument(reason))
    } else {
        Ok(value)
    }
}

fn non_empty_list<'a, S: AsRef<str>>(
    values: &'a [S],
    reason: &'static str,
) -> Result<Vec<&'a str>> {
    if values.is_empty() {
        return Err(SocketlinkError::InvalidArgument(reason));
    }
    Ok(values.iter().map(AsRef::as_ref).collect())
}
