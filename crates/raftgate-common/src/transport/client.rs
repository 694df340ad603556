//! Outbound HTTP client
//!
//! A thin wrapper over the hyper-util legacy client. It never follows
//! redirects on its own: a 3xx reply is handed back to the caller together with
//! its `Location` header, because deciding whether to follow is part of the
//! gateway protocol.

use std::time::Duration;

use http_body_util::{BodyExt, Full};
use hyper::body::Bytes;
use hyper::header::{CONTENT_TYPE, LOCATION};
use hyper::{Method, Request, StatusCode};
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::protocol::error::{GatewayError, Result};

/// A complete response from a backend.
#[derive(Debug, Clone)]
pub struct BackendReply {
    pub status: StatusCode,
    /// `Location` header, when present and valid UTF-8
    pub location: Option<String>,
    pub body: Bytes,
}

impl BackendReply {
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// A redirect the caller could follow: 3xx with a `Location`.
    pub fn redirect_location(&self) -> Option<&str> {
        if self.status.is_redirection() {
            self.location.as_deref()
        } else {
            None
        }
    }

    /// Decode the body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_slice(&self.body)?)
    }
}

/// Outbound HTTP/1.1 client with a per-call timeout.
///
/// Cloning is cheap; clones share the underlying connection machinery.
#[derive(Clone)]
pub struct HttpClient {
    client: Client<HttpConnector, Full<Bytes>>,
    timeout: Duration,
}

impl HttpClient {
    /// Creates a client whose calls (request and body read) are bounded by `timeout`.
    pub fn new(timeout: Duration) -> Self {
        let client = Client::builder(TokioExecutor::new()).build_http();
        Self { client, timeout }
    }

    /// Sends one request and reads the whole reply.
    ///
    /// # Errors
    /// - `Timeout` if the exchange does not finish within the configured timeout
    /// - `Transport` for connection failures, invalid URLs and body read errors
    pub async fn send(&self, method: Method, url: &str, body: Option<Bytes>) -> Result<BackendReply> {
        let mut builder = Request::builder().method(method).uri(url);
        if body.is_some() {
            builder = builder.header(CONTENT_TYPE, "application/json");
        }
        let request = builder.body(Full::new(body.unwrap_or_default()))?;

        let exchange = async {
            let response = self
                .client
                .request(request)
                .await
                .map_err(|e| GatewayError::Transport(format!("HTTP request to {} failed: {}", url, e)))?;

            let status = response.status();
            debug!("{} answered {}", url, status);
            let location = response
                .headers()
                .get(LOCATION)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);

            let body = response
                .into_body()
                .collect()
                .await
                .map_err(|e| GatewayError::Transport(format!("Failed to read response: {}", e)))?
                .to_bytes();

            Ok::<_, GatewayError>(BackendReply { status, location, body })
        };

        tokio::time::timeout(self.timeout, exchange)
            .await
            .map_err(|_| GatewayError::Timeout(self.timeout.as_millis() as u64))?
    }

    pub async fn get(&self, url: &str) -> Result<BackendReply> {
        self.send(Method::GET, url, None).await
    }

    pub async fn post_json(&self, url: &str, body: Bytes) -> Result<BackendReply> {
        self.send(Method::POST, url, Some(body)).await
    }

    pub async fn delete(&self, url: &str) -> Result<BackendReply> {
        self.send(Method::DELETE, url, None).await
    }
}

impl Default for HttpClient {
    fn default() -> Self {
        Self::new(Duration::from_secs(5))
    }
}
