//! Node gateway over a store that fails
//!
//! Failures other than `NotLeader` must end the request with a 500 and no
//! redirect, and a multi-pair write stops at the first refused pair.

use async_trait::async_trait;
use raftgate_common::ConsistencyLevel;
use raftgate_node::{NodeConfig, NodeGateway, StoreApi, StoreError};
use reqwest::StatusCode;
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::Mutex;

/// Accepts writes except for `refused_key`; every other operation fails.
struct FailingStore {
    refused_key: String,
    applied: Mutex<Vec<String>>,
}

impl FailingStore {
    fn new(refused_key: &str) -> Self {
        Self {
            refused_key: refused_key.to_string(),
            applied: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl StoreApi for FailingStore {
    async fn get(&self, _key: &str, _level: ConsistencyLevel) -> Result<String, StoreError> {
        Err(StoreError::Failed("disk error".to_string()))
    }

    async fn set(&self, key: &str, _value: &str) -> Result<(), StoreError> {
        if key == self.refused_key {
            return Err(StoreError::Failed(format!("cannot apply {}", key)));
        }
        self.applied.lock().await.push(key.to_string());
        Ok(())
    }

    async fn delete(&self, _key: &str) -> Result<(), StoreError> {
        Err(StoreError::Failed("disk error".to_string()))
    }

    async fn join(&self, _node_id: &str, _http_addr: &str, _raft_addr: &str) -> Result<(), StoreError> {
        Err(StoreError::Failed("configuration change failed".to_string()))
    }

    async fn leader_api_addr(&self) -> String {
        // a known leader must not turn a failure into a redirect
        "127.0.0.1:51000".to_string()
    }
}

async fn start_failing_node(refused_key: &str) -> (SocketAddr, Arc<FailingStore>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let store = Arc::new(FailingStore::new(refused_key));

    let gateway = NodeGateway::new(store.clone(), NodeConfig::default());
    tokio::spawn(async move {
        let _ = gateway.serve(listener).await;
    });
    (addr, store)
}

fn no_redirects() -> reqwest::Client {
    reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap()
}

#[tokio::test]
async fn test_store_failure_is_internal_error() {
    let (addr, _store) = start_failing_node("b").await;
    let client = no_redirects();

    let response = client.get(format!("http://{}/key/a", addr)).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(response.headers().get("location").is_none());

    let response = client.delete(format!("http://{}/key/a", addr)).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(response.headers().get("location").is_none());

    let response = client
        .post(format!("http://{}/join", addr))
        .json(&json!({"httpAddr": "127.0.0.1:51003", "raftAddr": "127.0.0.1:52003", "id": "n3"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(response.headers().get("location").is_none());
}

#[tokio::test]
async fn test_multi_pair_write_stops_at_first_failure() {
    let (addr, store) = start_failing_node("b").await;

    let response = no_redirects()
        .post(format!("http://{}/key", addr))
        .json(&json!({"c": "3", "b": "2", "a": "1"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    // pairs are applied in key order; "a" stays, "c" is never attempted
    assert_eq!(*store.applied.lock().await, vec!["a".to_string()]);
}

#[tokio::test]
async fn test_multi_pair_write_without_failures() {
    let (addr, store) = start_failing_node("zzz").await;

    let response = no_redirects()
        .post(format!("http://{}/key", addr))
        .json(&json!({"b": "2", "a": "1"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(*store.applied.lock().await, vec!["a".to_string(), "b".to_string()]);
}
