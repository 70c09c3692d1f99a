//! Client configuration.
//!
//! [`SocketlinkConfig`] holds the client identity (API keys and user ID) and
//! the connection settings. Only the connection URL is required; everything
//! else has a default.
//!
//! # Example
//!
//! ```
//! use socketlink_client::SocketlinkConfig;
//! use std::time::Duration;
//!
//! let config = SocketlinkConfig::new("https://example.socketlink.io")
//!     .with_client_api_key("sl_client")
//!     .with_uid("alice")
//!     .with_reconnect_interval(Duration::from_secs(5));
//!
//! assert_eq!(config.uid, "alice");
//! assert!(config.auto_reconnect);
//! ```

use std::time::Duration;

use url::Url;

use crate::error::{Result, SocketlinkError};

/// Default delay before an automatic reconnect attempt.
pub const DEFAULT_RECONNECT_INTERVAL: Duration = Duration::from_millis(3000);

/// Default bound on the WebSocket handshake.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default timeout applied to every HTTP request.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Default timeout for the graceful shutdown.
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(1);

/// Configuration for a Socketlink client.
#[derive(Clone)]
pub struct SocketlinkConfig {
    /// Key authorizing the live connection and room-scoped calls.
    pub client_api_key: Option<String>,
    /// Key authorizing server-wide administrative calls.
    pub admin_api_key: Option<String>,
    /// Base URL of the service. Must use the `https` scheme.
    pub connection_url: String,
    /// User identity sent with the handshake and client-scoped calls.
    /// Defaults to a random UUID.
    pub uid: String,
    /// Reconnect automatically after the connection closes.
    ///
    /// Defaults to **true**. Calling `close()` disables it for good.
    pub auto_reconnect: bool,
    /// Delay before an automatic reconnect. Defaults to **3 seconds**.
    pub reconnect_interval: Duration,
    /// Verify the server's TLS certificate. Defaults to **true**.
    pub reject_unauthorized_certs: bool,
    /// Upper bound on the WebSocket handshake. Defaults to **10 seconds**.
    pub connect_timeout: Duration,
    /// Timeout for each HTTP request. Defaults to **30 seconds**.
    pub request_timeout: Duration,
    /// Time given to the connection task to close cleanly during
    /// `shutdown()` before it is aborted. Defaults to **1 second**.
    pub shutdown_timeout: Duration,
}

impl SocketlinkConfig {
    /// Create a configuration for the given service URL with default values
    /// and a freshly generated user ID.
    pub fn new(connection_url: impl Into<String>) -> Self {
        Self {
            client_api_key: None,
            admin_api_key: None,
            connection_url: connection_url.into(),
            uid: uuid::Uuid::new_v4().to_string(),
            auto_reconnect: true,
            reconnect_interval: DEFAULT_RECONNECT_INTERVAL,
            reject_unauthorized_certs: true,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
        }
    }

    /// Build a configuration from `SOCKETLINK_*` environment variables.
    ///
    /// | Variable | Field |
    /// |---|---|
    /// | `SOCKETLINK_URL` (required) | `connection_url` |
    /// | `SOCKETLINK_CLIENT_API_KEY` | `client_api_key` |
    /// | `SOCKETLINK_ADMIN_API_KEY` | `admin_api_key` |
    /// | `SOCKETLINK_UID` | `uid` |
    ///
    /// # Errors
    ///
    /// Returns [`SocketlinkError::InvalidUrl`] when `SOCKETLINK_URL` is unset.
    pub fn from_env() -> Result<Self> {
        let url = std::env::var("SOCKETLINK_URL")
            .map_err(|_| SocketlinkError::InvalidUrl("SOCKETLINK_URL is not set".into()))?;

        let mut config = Self::new(url);
        if let Ok(key) = std::env::var("SOCKETLINK_CLIENT_API_KEY") {
            config = config.with_client_api_key(key);
        }
        if let Ok(key) = std::env::var("SOCKETLINK_ADMIN_API_KEY") {
            config = config.with_admin_api_key(key);
        }
        if let Ok(uid) = std::env::var("SOCKETLINK_UID") {
            config = config.with_uid(uid);
        }
        Ok(config)
    }

    /// Set the client API key.
    #[must_use]
    pub fn with_client_api_key(mut self, key: impl Into<String>) -> Self {
        self.client_api_key = Some(key.into());
        self
    }

    /// Set the admin API key.
    #[must_use]
    pub fn with_admin_api_key(mut self, key: impl Into<String>) -> Self {
        self.admin_api_key = Some(key.into());
        self
    }

    /// Set an explicit user ID instead of the random default.
    #[must_use]
    pub fn with_uid(mut self, uid: impl Into<String>) -> Self {
        self.uid = uid.into();
        self
    }

    /// Enable or disable automatic reconnection.
    #[must_use]
    pub fn with_auto_reconnect(mut self, enabled: bool) -> Self {
        self.auto_reconnect = enabled;
        self
    }

    /// Set the delay before an automatic reconnect.
    #[must_use]
    pub fn with_reconnect_interval(mut self, interval: Duration) -> Self {
        self.reconnect_interval = interval;
        self
    }

    /// Accept invalid or self-signed TLS certificates when `false`.
    #[must_use]
    pub fn with_reject_unauthorized_certs(mut self, reject: bool) -> Self {
        self.reject_unauthorized_certs = reject;
        self
    }

    /// Set the WebSocket handshake timeout.
    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set the per-request HTTP timeout.
    #[must_use]
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Set the graceful shutdown timeout.
    #[must_use]
    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    /// Returns the client API key, or [`SocketlinkError::MissingClientApiKey`]
    /// when it is absent or empty.
    pub fn require_client_api_key(&self) -> Result<&str> {
        require_key(
            self.client_api_key.as_deref(),
            SocketlinkError::MissingClientApiKey,
        )
    }

    /// Returns the admin API key, or [`SocketlinkError::MissingAdminApiKey`]
    /// when it is absent or empty.
    pub fn require_admin_api_key(&self) -> Result<&str> {
        require_key(
            self.admin_api_key.as_deref(),
            SocketlinkError::MissingAdminApiKey,
        )
    }

    /// Parse [`connection_url`](Self::connection_url), requiring `https`.
    pub fn base_url(&self) -> Result<Url> {
        let url = Url::parse(&self.connection_url)
            .map_err(|e| SocketlinkError::InvalidUrl(format!("{}: {e}", self.connection_url)))?;
        if url.scheme() != "https" {
            return Err(SocketlinkError::InsecureUrl(self.connection_url.clone()));
        }
        Ok(url)
    }

    /// Derive the WebSocket endpoint by rewriting `https` to `wss`.
    ///
    /// ```
    /// use socketlink_client::SocketlinkConfig;
    ///
    /// let config = SocketlinkConfig::new("https://example.com");
    /// assert_eq!(config.socket_url().unwrap().as_str(), "wss://example.com/");
    /// ```
    pub fn socket_url(&self) -> Result<Url> {
        let mut url = self.base_url()?;
        // https -> wss is a special-to-special scheme change, which `Url` allows.
        url.set_scheme("wss")
            .map_err(|()| SocketlinkError::InvalidUrl(self.connection_url.clone()))?;
        Ok(url)
    }
}

impl std::fmt::Debug for SocketlinkConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SocketlinkConfig")
            .field("client_api_key", &self.client_api_key.as_ref().map(|_| "<redacted>"))
            .field("admin_api_key", &self.admin_api_key.as_ref().map(|_| "<redacted>"))
            .field("connection_url", &self.connection_url)
            .field("uid", &self.uid)
            .field("auto_reconnect", &self.auto_reconnect)
            .field("reconnect_interval", &self.reconnect_interval)
            .field("reject_unauthorized_certs", &self.reject_unauthorized_certs)
            .field("connect_timeout", &self.connect_timeout)
            .field("request_timeout", &self.request_timeout)
            .field("shutdown_timeout", &self.shutdown_timeout)
            .finish()
    }
}

/// `key` if present and non-empty, else `missing`.
pub(crate) fn require_key(key: Option<&str>, missing: SocketlinkError) -> Result<&str> {
    match key {
        Some(key) if !key.is_empty() => Ok(key),
        _ => Err(missing),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn config_defaults() {
        let config = SocketlinkConfig::new("https://example.com");
        assert!(config.client_api_key.is_none());
        assert!(config.admin_api_key.is_none());
        assert!(config.auto_reconnect);
        assert!(config.reject_unauthorized_certs);
        assert_eq!(config.reconnect_interval, Duration::from_millis(3000));
        assert_eq!(config.request_timeout, Duration::from_secs(30));
        assert_eq!(config.connect_timeout, Duration::from_secs(10));
        assert_eq!(config.shutdown_timeout, Duration::from_secs(1));
    }

    #[test]
    fn default_uid_is_random_uuid() {
        let a = SocketlinkConfig::new("https://example.com");
        let b = SocketlinkConfig::new("https://example.com");
        assert_ne!(a.uid, b.uid);
        assert!(uuid::Uuid::parse_str(&a.uid).is_ok());
    }

    #[test]
    fn socket_url_rewrites_scheme() {
        let config = SocketlinkConfig::new("https://example.com");
        assert_eq!(config.socket_url().unwrap().as_str(), "wss://example.com/");

        let config = SocketlinkConfig::new("https://example.com:8443/live?x=1");
        assert_eq!(
            config.socket_url().unwrap().as_str(),
            "wss://example.com:8443/live?x=1"
        );
    }

    #[test]
    fn insecure_scheme_is_rejected() {
        let config = SocketlinkConfig::new("http://example.com");
        let err = config.socket_url().unwrap_err();
        assert!(matches!(err, SocketlinkError::InsecureUrl(_)));
        assert!(err.is_precondition());
    }

    #[test]
    fn unparseable_url_is_rejected() {
        let config = SocketlinkConfig::new("not a url");
        assert!(matches!(
            config.base_url().unwrap_err(),
            SocketlinkError::InvalidUrl(_)
        ));
    }

    #[test]
    fn empty_keys_count_as_missing() {
        let config = SocketlinkConfig::new("https://example.com")
            .with_client_api_key("")
            .with_admin_api_key("");
        assert!(matches!(
            config.require_client_api_key(),
            Err(SocketlinkError::MissingClientApiKey)
        ));
        assert!(matches!(
            config.require_admin_api_key(),
            Err(SocketlinkError::MissingAdminApiKey)
        ));

        let config = config.with_admin_api_key("sl_admin");
        assert_eq!(config.require_admin_api_key().unwrap(), "sl_admin");
    }

    #[test]
    fn debug_redacts_keys() {
        let config = SocketlinkConfig::new("https://example.com").with_client_api_key("secret");
        let debug = format!("{config:?}");
        assert!(!debug.contains("secret"));
        assert!(debug.contains("<redacted>"));
    }
}
