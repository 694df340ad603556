//! HTTP Transport Utilities
//!
//! Conversions between HTTP messages and the raftgate wire shapes.
//!
//! # Example
//!
//! ```
//! use raftgate_common::transport::HttpTransport;
//! use raftgate_common::KeyValues;
//!
//! let pairs: KeyValues = HttpTransport::parse_body(br#"{"a":"1"}"#).unwrap();
//! assert_eq!(pairs["a"], "1");
//!
//! assert_eq!(HttpTransport::key_url("localhost:51000", "a b"), "http://localhost:51000/key/a%20b");
//! ```

use serde::de::DeserializeOwned;

use crate::protocol::error::{GatewayError, Result};
use crate::protocol::ConsistencyLevel;

/// HTTP transport utility functions
pub struct HttpTransport;

impl HttpTransport {
    /// Parse a JSON request body.
    ///
    /// Any decoding problem is reported as [`GatewayError::Malformed`] so the
    /// caller can reject the request with a client error before doing any work.
    pub fn parse_body<T: DeserializeOwned>(body: &[u8]) -> Result<T> {
        serde_json::from_slice(body)
            .map_err(|e| GatewayError::Malformed(format!("Invalid JSON body: {}", e)))
    }

    /// Build the redirect target for a request that must be served by the leader.
    ///
    /// The path is kept as received and the raw query is re-attached verbatim,
    /// prefixed with `?` only when it is non-empty.
    pub fn redirect_target(scheme: &str, leader: &str, path: &str, query: Option<&str>) -> String {
        match query {
            Some(q) if !q.is_empty() => format!("{}://{}{}?{}", scheme, leader, path, q),
            _ => format!("{}://{}{}", scheme, leader, path),
        }
    }

    /// `http://{addr}/key/{key}` with the key percent-encoded as one path segment.
    pub fn key_url(addr: &str, key: &str) -> String {
        format!("http://{}/key/{}", addr, urlencoding::encode(key))
    }

    /// Like [`HttpTransport::key_url`] with a `level` query parameter.
    pub fn key_url_with_level(addr: &str, key: &str, level: ConsistencyLevel) -> String {
        format!("{}?level={}", Self::key_url(addr, key), level)
    }

    /// `http://{addr}/key`, the bulk write endpoint.
    pub fn keys_url(addr: &str) -> String {
        format!("http://{}/key", addr)
    }

    /// Prefix a bare `host:port` with `http://`; `http://` URLs are kept as is.
    ///
    /// Outbound calls are plain HTTP/1.1, so an `https://` address is rejected.
    pub fn base_url(addr: &str) -> Result<String> {
        let addr = addr.trim().trim_end_matches('/');
        if addr.starts_with("https://") {
            return Err(GatewayError::Malformed(format!("https is not supported: {}", addr)));
        }
        if addr.starts_with("http://") {
            Ok(addr.to_string())
        } else {
            Ok(format!("http://{}", addr))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::KeyValues;

    #[test]
    fn test_parse_body_valid() {
        let kv: KeyValues = HttpTransport::parse_body(br#"{"x":"v","y":""}"#).unwrap();
        assert_eq!(kv.len(), 2);
        assert_eq!(kv["x"], "v");
        assert_eq!(kv["y"], "");
    }

    #[test]
    fn test_parse_body_invalid_json_is_malformed() {
        let result: Result<KeyValues> = HttpTransport::parse_body(br#"{"x":"#);
        assert!(matches!(result, Err(GatewayError::Malformed(_))));
    }

    #[test]
    fn test_parse_body_wrong_shape_is_malformed() {
        let result: Result<KeyValues> = HttpTransport::parse_body(br#"{"x": 1}"#);
        assert!(matches!(result, Err(GatewayError::Malformed(_))));
    }

    #[test]
    fn test_redirect_target_with_query() {
        let target = HttpTransport::redirect_target(
            "http",
            "localhost:51002",
            "/key/foo",
            Some("level=consistent"),
        );
        assert_eq!(target, "http://localhost:51002/key/foo?level=consistent");
    }

    #[test]
    fn test_redirect_target_without_query() {
        assert_eq!(
            HttpTransport::redirect_target("http", "localhost:51002", "/key", None),
            "http://localhost:51002/key"
        );
        // empty query does not produce a dangling '?'
        assert_eq!(
            HttpTransport::redirect_target("http", "localhost:51002", "/join", Some("")),
            "http://localhost:51002/join"
        );
    }

    #[test]
    fn test_redirect_target_keeps_query_verbatim() {
        let target = HttpTransport::redirect_target(
            "https",
            "10.0.0.1:443",
            "/key/a%2Fb",
            Some("level=STALE&x=%20"),
        );
        assert_eq!(target, "https://10.0.0.1:443/key/a%2Fb?level=STALE&x=%20");
    }

    #[test]
    fn test_key_urls() {
        assert_eq!(HttpTransport::key_url("n1:1", "k"), "http://n1:1/key/k");
        assert_eq!(HttpTransport::key_url("n1:1", "a/b"), "http://n1:1/key/a%2Fb");
        assert_eq!(
            HttpTransport::key_url_with_level("n1:1", "k", ConsistencyLevel::Stale),
            "http://n1:1/key/k?level=stale"
        );
        assert_eq!(HttpTransport::keys_url("n1:1"), "http://n1:1/key");
    }

    #[test]
    fn test_base_url() {
        assert_eq!(HttpTransport::base_url("127.0.0.1:50000").unwrap(), "http://127.0.0.1:50000");
        assert_eq!(HttpTransport::base_url("http://127.0.0.1:50000/").unwrap(), "http://127.0.0.1:50000");
    }

    #[test]
    fn test_base_url_rejects_https() {
        assert!(matches!(
            HttpTransport::base_url("https://gw.example"),
            Err(GatewayError::Malformed(_))
        ));
    }
}
