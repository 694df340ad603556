//! Store collaborator
//!
//! The node gateway does not replicate anything itself. Every key-value
//! operation is delegated to a [`StoreApi`] implementation, normally backed by
//! a consensus engine, which is the single linearization point for writes and
//! reports [`StoreError::NotLeader`] when a request must go to the leader.

use std::collections::HashMap;

use async_trait::async_trait;
use raftgate_common::protocol::{ConsistencyLevel, JoinRequest};
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::info;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("not leader")]
    NotLeader,

    #[error("store failure: {0}")]
    Failed(String),
}

/// Operations the node gateway needs from the replicated store.
#[async_trait]
pub trait StoreApi: Send + Sync {
    /// Value of `key`, or the empty string if it is not set.
    async fn get(&self, key: &str, level: ConsistencyLevel) -> Result<String, StoreError>;

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;

    async fn delete(&self, key: &str) -> Result<(), StoreError>;

    /// Adds a node to the cluster. Only the leader accepts joins.
    async fn join(&self, node_id: &str, http_addr: &str, raft_addr: &str) -> Result<(), StoreError>;

    /// HTTP address of the current leader, empty if none is known.
    async fn leader_api_addr(&self) -> String;
}

/// Single-process store.
///
/// Stands in for the consensus engine when running a node on its own and in
/// tests. It holds its data in memory and does not replicate. Leadership is
/// whatever it is told: when the configured leader is not this node, only
/// stale reads are served from the local map. Writes, joins and default or
/// consistent reads fail with `NotLeader`.
pub struct MemoryStore {
    http_addr: String,
    data: RwLock<HashMap<String, String>>,
    leader: RwLock<Option<String>>,
    members: RwLock<Vec<JoinRequest>>,
}

impl MemoryStore {
    /// A store that considers itself the leader.
    pub fn leader(http_addr: impl Into<String>) -> Self {
        let http_addr = http_addr.into();
        Self::new(http_addr.clone(), Some(http_addr))
    }

    /// A store that follows `leader` (or no one, when `None`).
    pub fn follower(http_addr: impl Into<String>, leader: Option<String>) -> Self {
        Self::new(http_addr.into(), leader)
    }

    fn new(http_addr: String, leader: Option<String>) -> Self {
        Self {
            http_addr,
            data: RwLock::new(HashMap::new()),
            leader: RwLock::new(leader),
            members: RwLock::new(Vec::new()),
        }
    }

    pub fn http_addr(&self) -> &str {
        &self.http_addr
    }

    /// Change who this store believes the leader is.
    pub async fn set_leader(&self, leader: Option<String>) {
        info!("leader changed to {:?}", leader);
        *self.leader.write().await = leader;
    }

    pub async fn is_leader(&self) -> bool {
        self.leader.read().await.as_deref() == Some(self.http_addr.as_str())
    }

    /// Nodes accepted through [`StoreApi::join`]
    pub async fn members(&self) -> Vec<JoinRequest> {
        self.members.read().await.clone()
    }

    async fn require_leader(&self) -> Result<(), StoreError> {
        if self.is_leader().await {
            Ok(())
        } else {
            Err(StoreError::NotLeader)
        }
    }
}

#[async_trait]
impl StoreApi for MemoryStore {
    async fn get(&self, key: &str, level: ConsistencyLevel) -> Result<String, StoreError> {
        if level != ConsistencyLevel::Stale {
            self.require_leader().await?;
        }
        Ok(self.data.read().await.get(key).cloned().unwrap_or_default())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.require_leader().await?;
        self.data.write().await.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.require_leader().await?;
        self.data.write().await.remove(key);
        Ok(())
    }

    async fn join(&self, node_id: &str, http_addr: &str, raft_addr: &str) -> Result<(), StoreError> {
        self.require_leader().await?;
        let mut members = self.members.write().await;
        members.retain(|m| m.id != node_id);
        members.push(JoinRequest {
            http_addr: http_addr.to_string(),
            raft_addr: raft_addr.to_string(),
            id: node_id.to_string(),
        });
        info!("node {} at {} joined", node_id, raft_addr);
        Ok(())
    }

    async fn leader_api_addr(&self) -> String {
        self.leader.read().await.clone().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_leader_roundtrip() {
        let store = MemoryStore::leader("localhost:51000");
        assert!(store.is_leader().await);

        store.set("a", "1").await.unwrap();
        assert_eq!(store.get("a", ConsistencyLevel::Consistent).await.unwrap(), "1");

        store.delete("a").await.unwrap();
        assert_eq!(store.get("a", ConsistencyLevel::Default).await.unwrap(), "");
    }

    #[tokio::test]
    async fn test_missing_key_is_empty() {
        let store = MemoryStore::leader("localhost:51000");
        assert_eq!(store.get("nope", ConsistencyLevel::Stale).await.unwrap(), "");
    }

    #[tokio::test]
    async fn test_follower_rejects_writes() {
        let store = MemoryStore::follower("localhost:51001", Some("localhost:51000".to_string()));
        assert!(!store.is_leader().await);
        assert_eq!(store.set("a", "1").await, Err(StoreError::NotLeader));
        assert_eq!(store.delete("a").await, Err(StoreError::NotLeader));
        assert_eq!(
            store.join("n3", "localhost:51002", "localhost:52002").await,
            Err(StoreError::NotLeader)
        );
        assert_eq!(store.leader_api_addr().await, "localhost:51000");
    }

    #[tokio::test]
    async fn test_follower_reads_by_level() {
        let store = MemoryStore::follower("localhost:51001", Some("localhost:51000".to_string()));
        assert_eq!(store.get("a", ConsistencyLevel::Stale).await.unwrap(), "");
        assert_eq!(
            store.get("a", ConsistencyLevel::Default).await,
            Err(StoreError::NotLeader)
        );
        assert_eq!(
            store.get("a", ConsistencyLevel::Consistent).await,
            Err(StoreError::NotLeader)
        );
    }

    #[tokio::test]
    async fn test_no_leader_known() {
        let store = MemoryStore::follower("localhost:51001", None);
        assert_eq!(store.leader_api_addr().await, "");
    }

    #[tokio::test]
    async fn test_leadership_change() {
        let store = MemoryStore::follower("localhost:51001", None);
        store.set_leader(Some("localhost:51001".to_string())).await;
        assert!(store.is_leader().await);
        assert!(store.set("a", "1").await.is_ok());
    }

    #[tokio::test]
    async fn test_join_replaces_existing_member() {
        let store = MemoryStore::leader("localhost:51000");
        store.join("n2", "localhost:51001", "localhost:52001").await.unwrap();
        store.join("n2", "localhost:51005", "localhost:52005").await.unwrap();

        let members = store.members().await;
        assert_eq!(members.len(), 1);
        assert_eq!(members[0].http_addr, "localhost:51005");
    }
}
