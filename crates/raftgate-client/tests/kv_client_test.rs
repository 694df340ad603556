//! KvClient against real node gateways.

use axum::http::{header::LOCATION, HeaderMap, StatusCode};
use axum::routing::get;
use raftgate_client::KvClient;
use raftgate_common::{ConsistencyLevel, GatewayError, KeyValues};
use raftgate_node::{MemoryStore, NodeConfig, NodeGateway, StoreApi};
use std::sync::Arc;
use tokio::net::TcpListener;

async fn start_node(leader: Option<String>) -> (String, Arc<MemoryStore>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap().to_string();
    let store = Arc::new(match leader {
        Some(leader) => MemoryStore::follower(addr.clone(), Some(leader)),
        None => MemoryStore::leader(addr.clone()),
    });

    let gateway = NodeGateway::new(store.clone(), NodeConfig::default());
    tokio::spawn(async move {
        let _ = gateway.serve(listener).await;
    });
    (addr, store)
}

#[tokio::test]
async fn test_roundtrip_against_leader() {
    let (leader, _store) = start_node(None).await;
    let client = KvClient::new(&leader).unwrap();

    client.set("a", "1").await.unwrap();
    assert_eq!(client.get("a", ConsistencyLevel::Default).await.unwrap(), "1");

    client.delete("a").await.unwrap();
    assert_eq!(client.get("a", ConsistencyLevel::Consistent).await.unwrap(), "");
}

#[tokio::test]
async fn test_follows_redirect_from_follower() {
    let (leader, leader_store) = start_node(None).await;
    let (follower, _store) = start_node(Some(leader)).await;
    let client = KvClient::new(&follower).unwrap();

    let mut pairs = KeyValues::new();
    pairs.insert("a".to_string(), "1".to_string());
    pairs.insert("b".to_string(), "2".to_string());
    client.set_many(&pairs).await.unwrap();

    assert_eq!(leader_store.get("b", ConsistencyLevel::Default).await.unwrap(), "2");
    assert_eq!(client.get("a", ConsistencyLevel::Consistent).await.unwrap(), "1");
}

#[tokio::test]
async fn test_no_leader_is_unavailable() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap().to_string();
    let store = Arc::new(MemoryStore::follower(addr.clone(), None));
    let gateway = NodeGateway::new(store, NodeConfig::default());
    tokio::spawn(async move {
        let _ = gateway.serve(listener).await;
    });

    let result = KvClient::new(&addr).unwrap().set("a", "1").await;
    assert!(matches!(result, Err(GatewayError::Unavailable(_))));
}

#[tokio::test]
async fn test_second_redirect_is_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap().to_string();
    let target = format!("http://{}/key/a", addr);

    // Always redirects to itself
    let app = axum::Router::new().route(
        "/key/a",
        get(move || {
            let target = target.clone();
            async move {
                let mut headers = HeaderMap::new();
                headers.insert(LOCATION, target.parse().unwrap());
                (StatusCode::TEMPORARY_REDIRECT, headers)
            }
        }),
    );
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    let result = KvClient::new(&addr).unwrap().get("a", ConsistencyLevel::Default).await;
    assert!(matches!(result, Err(GatewayError::Redirect(_))));
}

#[tokio::test]
async fn test_unreachable_is_transport_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap().to_string();
    drop(listener);

    let result = KvClient::new(&addr).unwrap().delete("a").await;
    assert!(matches!(result, Err(GatewayError::Transport(_))));
}
