//! HTTP request execution for the REST API.
//!
//! Every administrative call is a single best-effort attempt: no retries, no
//! backoff. Failures are normalized into [`SocketlinkError::Api`] with the
//! most useful message available, in this order:
//!
//! 1. `error.message` from the JSON response body
//! 2. `message` from the JSON response body
//! 3. the transport error text (or a generic status line)

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, Response};
use serde_json::Value;
use tracing::{debug, warn};
use url::Url;

use crate::error::{Result, SocketlinkError};

/// One fully resolved HTTP call.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    pub url: Url,
    pub query: Vec<(String, String)>,
    pub headers: Vec<(&'static str, String)>,
    pub body: Option<Value>,
}

impl ApiRequest {
    /// A request with no query, headers or body.
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            query: Vec::new(),
            headers: Vec::new(),
            body: None,
        }
    }

    /// Add a header.
    #[must_use]
    pub fn with_header(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.headers.push((name, value.into()));
        self
    }

    /// Set the JSON body.
    #[must_use]
    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Look up a header value by name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Performs API requests.
///
/// The default implementation is [`HttpExecutor`]. Supply your own to route
/// calls through a proxy layer or to observe them in tests.
#[async_trait]
pub trait RequestExecutor: Send + Sync + 'static {
    /// Perform `request` and return the decoded response body.
    ///
    /// # Errors
    ///
    /// Returns [`SocketlinkError::Api`] for non-2xx responses and network
    /// failures.
    async fn execute(&self, request: ApiRequest) -> Result<Value>;
}

/// [`RequestExecutor`] backed by a shared `reqwest` client.
#[derive(Debug, Clone)]
pub struct HttpExecutor {
    inner: Client,
}

impl HttpExecutor {
    /// Build an executor with the given per-request timeout.
    ///
    /// When `reject_unauthorized_certs` is `false`, invalid and self-signed
    /// certificates are accepted.
    pub fn new(timeout: Duration, reject_unauthorized_certs: bool) -> Result<Self> {
        let mut builder = Client::builder().timeout(timeout);
        if !reject_unauthorized_certs {
            builder = builder.danger_accept_invalid_certs(true);
        }
        let inner = builder.build().map_err(|e| SocketlinkError::Api {
            status: None,
            message: format!("failed to build HTTP client: {e}"),
        })?;
        Ok(Self { inner })
    }

    /// Wrap an existing `reqwest` client.
    pub fn from_client(inner: Client) -> Self {
        Self { inner }
    }

    async fn decode_body(response: Response) -> Result<Value> {
        let status = response.status();
        let text = response.text().await.map_err(|e| SocketlinkError::Api {
            status: Some(status.as_u16()),
            message: e.to_string(),
        })?;
        Ok(parse_body(&text))
    }
}

#[async_trait]
impl RequestExecutor for HttpExecutor {
    async fn execute(&self, request: ApiRequest) -> Result<Value> {
        debug!("{} {}", request.method, request.url.path());

        let mut builder = self.inner.request(request.method.clone(), request.url.clone());
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        for (name, value) in &request.headers {
            builder = builder.header(*name, value.as_str());
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(|e| {
            warn!("{} {} failed: {e}", request.method, request.url.path());
            SocketlinkError::Api {
                status: e.status().map(|s| s.as_u16()),
                message: e.to_string(),
            }
        })?;

        let status = response.status();
        let body = Self::decode_body(response).await?;
        if status.is_success() {
            return Ok(body);
        }

        let message = error_message(&body)
            .unwrap_or_else(|| format!("Request failed with status code {}", status.as_u16()));
        warn!(
            "{} {} returned {}: {message}",
            request.method,
            request.url.path(),
            status.as_u16()
        );
        Err(SocketlinkError::Api {
            status: Some(status.as_u16()),
            message,
        })
    }
}

/// Decode a response body: empty is `null`, non-JSON is kept as a string.
pub(crate) fn parse_body(text: &str) -> Value {
    if text.trim().is_empty() {
        return Value::Null;
    }
    serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_owned()))
}

/// Extract the service-reported message from an error body.
pub(crate) fn error_message(body: &Value) -> Option<String> {
    let structured = body
        .get("error")
        .and_then(|e| e.get("message"))
        .and_then(Value::as_str);
    let generic = body.get("message").and_then(Value::as_str);
    structured
        .or(generic)
        .filter(|m| !m.is_empty())
        .map(str::to_owned)
}
