use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Key-value pairs carried by `POST /key`.
///
/// A `BTreeMap` so that backends apply pairs in a stable (ascending key) order.
pub type KeyValues = BTreeMap<String, String>;

/// Per-read consistency hint forwarded to the store collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConsistencyLevel {
    #[default]
    Default,
    Stale,
    Consistent,
}

impl ConsistencyLevel {
    /// Parses the `level` query value. Unknown or absent values map to `Default`.
    pub fn from_query(value: Option<&str>) -> Self {
        let value = value.map(|v| v.trim().to_ascii_lowercase());
        match value.as_deref() {
            Some("stale") => ConsistencyLevel::Stale,
            Some("consistent") => ConsistencyLevel::Consistent,
            _ => ConsistencyLevel::Default,
        }
    }

    /// Parses the `level` parameter out of a raw query string.
    ///
    /// When `level` is repeated only the first occurrence counts; other
    /// parameters are ignored.
    pub fn from_raw_query(query: Option<&str>) -> Self {
        let value = query.and_then(|q| {
            q.split('&')
                .map(|pair| pair.split_once('=').unwrap_or((pair, "")))
                .find(|(name, _)| *name == "level")
                .map(|(_, value)| {
                    urlencoding::decode(value)
                        .map(|v| v.into_owned())
                        .unwrap_or_default()
                })
        });
        Self::from_query(value.as_deref())
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ConsistencyLevel::Default => "default",
            ConsistencyLevel::Stale => "stale",
            ConsistencyLevel::Consistent => "consistent",
        }
    }
}

impl fmt::Display for ConsistencyLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Body of `POST /join` on a node gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinRequest {
    #[serde(rename = "httpAddr")]
    pub http_addr: String,
    #[serde(rename = "raftAddr")]
    pub raft_addr: String,
    pub id: String,
}

/// Body of `POST /service_join` (and `/service_leave`) on the client gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceJoinRequest {
    #[serde(rename = "serviceAddr")]
    pub service_addr: String,
}

impl ServiceJoinRequest {
    pub fn new(service_addr: impl Into<String>) -> Self {
        Self {
            service_addr: service_addr.into(),
        }
    }
}
