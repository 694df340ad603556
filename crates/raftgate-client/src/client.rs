use std::collections::HashMap;
use std::time::Duration;

use hyper::body::Bytes;
use hyper::{Method, StatusCode};
use raftgate_common::protocol::error::{GatewayError, Result};
use raftgate_common::protocol::{ConsistencyLevel, KeyValues};
use raftgate_common::transport::{BackendReply, HttpClient, HttpTransport};
use tracing::debug;

/// Key-value client for a client gateway or a single node gateway.
///
/// A `307`/`308` reply is followed once, with the same method and body. A
/// second redirect is returned as [`GatewayError::Redirect`].
#[derive(Clone)]
pub struct KvClient {
    base_url: String,
    client: HttpClient,
}

impl KvClient {
    /// Create a client for `addr` (`host:port` or an `http://` URL)
    pub fn new(addr: impl AsRef<str>) -> Result<Self> {
        Self::with_timeout(addr, Duration::from_secs(5))
    }

    pub fn with_timeout(addr: impl AsRef<str>, timeout: Duration) -> Result<Self> {
        Ok(Self {
            base_url: HttpTransport::base_url(addr.as_ref())?,
            client: HttpClient::new(timeout),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Read `key`. An unset key reads as the empty string.
    pub async fn get(&self, key: &str, level: ConsistencyLevel) -> Result<String> {
        let url = format!("{}?level={}", self.key_url(key), level);
        let reply = self.send(Method::GET, &url, None).await?;
        let mut values: HashMap<String, String> = reply.json()?;
        Ok(values.remove(key).unwrap_or_default())
    }

    pub async fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut pairs = KeyValues::new();
        pairs.insert(key.to_string(), value.to_string());
        self.set_many(&pairs).await
    }

    /// Write every pair in one request.
    pub async fn set_many(&self, pairs: &KeyValues) -> Result<()> {
        let body = Bytes::from(serde_json::to_vec(pairs)?);
        let url = format!("{}/key", self.base_url);
        self.send(Method::POST, &url, Some(body)).await?;
        Ok(())
    }

    pub async fn delete(&self, key: &str) -> Result<()> {
        let url = self.key_url(key);
        self.send(Method::DELETE, &url, None).await?;
        Ok(())
    }

    fn key_url(&self, key: &str) -> String {
        format!("{}/key/{}", self.base_url, urlencoding::encode(key))
    }

    async fn send(&self, method: Method, url: &str, body: Option<Bytes>) -> Result<BackendReply> {
        let mut reply = self.client.send(method.clone(), url, body.clone()).await?;

        if let Some(location) = follow_target(&reply) {
            debug!("{} {} redirected to {}", method, url, location);
            reply = self.client.send(method, &location, body).await?;
            if reply.status.is_redirection() {
                return Err(GatewayError::Redirect(reply.location.unwrap_or_default()));
            }
        }

        check_status(reply)
    }
}

/// Only method-preserving redirects are followed.
fn follow_target(reply: &BackendReply) -> Option<String> {
    match reply.status {
        StatusCode::TEMPORARY_REDIRECT | StatusCode::PERMANENT_REDIRECT => {
            reply.redirect_location().map(str::to_string)
        }
        _ => None,
    }
}

fn check_status(reply: BackendReply) -> Result<BackendReply> {
    if reply.is_success() {
        return Ok(reply);
    }
    let detail = String::from_utf8_lossy(&reply.body).into_owned();
    Err(match reply.status {
        StatusCode::BAD_REQUEST => GatewayError::Malformed(detail),
        StatusCode::SERVICE_UNAVAILABLE => GatewayError::Unavailable(detail),
        status if status.is_redirection() => GatewayError::Redirect(reply.location.unwrap_or_default()),
        status => GatewayError::Internal(format!("{}: {}", status, detail)),
    })
}
