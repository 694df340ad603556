//! HTTP Server for a cluster node
//!
//! Serves the key-value API in front of a [`StoreApi`] and turns "not the
//! leader" into an HTTP redirect towards the node that is.
//!
//! # Endpoints
//!
//! - `GET /key/{key}?level=default|stale|consistent` - `{key: value}`
//! - `POST /key` - JSON object of pairs, applied in ascending key order
//! - `DELETE /key/{key}`
//! - `POST /join` - `{"httpAddr", "raftAddr", "id"}` adds a node to the cluster
//! - `GET /__health` - liveness
//!
//! When the store answers `NotLeader` the reply is `307 Temporary Redirect`
//! with `Location` pointing at the same path and query on the leader, or
//! `503` when no leader is known. Any other store failure is a `500`.

use axum::{
    extract::{Path, RawQuery, State},
    http::{header::LOCATION, HeaderValue, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json,
};
use hyper::body::Bytes;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tracing::{debug, info, warn};

use crate::store::{StoreApi, StoreError};
use raftgate_common::protocol::error::{GatewayError, Result};
use raftgate_common::protocol::{ConsistencyLevel, JoinRequest, KeyValues};
use raftgate_common::transport::HttpTransport;

/// Node gateway configuration.
#[derive(Debug, Clone)]
pub struct NodeConfig {
    /// Scheme used to build redirect targets
    ///
    /// Default: "http"
    pub redirect_scheme: String,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            redirect_scheme: "http".to_string(),
        }
    }
}

struct NodeState {
    store: Arc<dyn StoreApi>,
    config: NodeConfig,
}

/// Leader-redirecting HTTP gateway for one node.
pub struct NodeGateway {
    state: Arc<NodeState>,
}

impl NodeGateway {
    pub fn new(store: Arc<dyn StoreApi>, config: NodeConfig) -> Self {
        Self {
            state: Arc::new(NodeState { store, config }),
        }
    }

    /// Builds the axum application.
    pub fn app(&self) -> axum::Router {
        axum::Router::new()
            .route("/key", post(set_keys).get(missing_key).delete(missing_key))
            .route("/key/:key", get(get_key).delete(delete_key))
            .route("/join", post(join))
            .route("/__health", get(health_check))
            .fallback(fallback)
            .layer(CorsLayer::permissive())
            .with_state(self.state.clone())
    }

    /// Binds `addr` and serves until the process exits.
    pub async fn run(self, addr: SocketAddr) -> Result<()> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| GatewayError::Transport(format!("Failed to bind to {}: {}", addr, e)))?;
        self.serve(listener).await
    }

    /// Serves on an already bound listener.
    pub async fn serve(self, listener: TcpListener) -> Result<()> {
        info!(
            "Node gateway listening on {}",
            listener
                .local_addr()
                .map_err(|e| GatewayError::Transport(format!("Failed to get local addr: {}", e)))?
        );

        axum::serve(listener, self.app())
            .await
            .map_err(|e| GatewayError::Transport(format!("Server error: {}", e)))
    }
}

async fn get_key(
    State(state): State<Arc<NodeState>>,
    Path(key): Path<String>,
    RawQuery(query): RawQuery,
    uri: Uri,
) -> Response {
    let level = ConsistencyLevel::from_raw_query(query.as_deref());
    match state.store.get(&key, level).await {
        Ok(value) => {
            let mut body = HashMap::new();
            body.insert(key, value);
            Json(body).into_response()
        }
        Err(e) => store_error_response(&state, e, &uri).await,
    }
}

/// `POST /key`. Stops at the first pair the store refuses; earlier pairs stay applied.
async fn set_keys(State(state): State<Arc<NodeState>>, uri: Uri, body: Bytes) -> Response {
    let pairs: KeyValues = match HttpTransport::parse_body(&body) {
        Ok(pairs) => pairs,
        Err(e) => return error_response(e),
    };

    for (key, value) in &pairs {
        if let Err(e) = state.store.set(key, value).await {
            return store_error_response(&state, e, &uri).await;
        }
    }
    debug!("stored {} pair(s)", pairs.len());
    StatusCode::OK.into_response()
}

async fn delete_key(State(state): State<Arc<NodeState>>, Path(key): Path<String>, uri: Uri) -> Response {
    match state.store.delete(&key).await {
        Ok(()) => StatusCode::OK.into_response(),
        Err(e) => store_error_response(&state, e, &uri).await,
    }
}

async fn join(State(state): State<Arc<NodeState>>, uri: Uri, body: Bytes) -> Response {
    let req: JoinRequest = match HttpTransport::parse_body(&body) {
        Ok(req) => req,
        Err(e) => return error_response(e),
    };

    match state.store.join(&req.id, &req.http_addr, &req.raft_addr).await {
        Ok(()) => {
            info!("accepted join from {} ({})", req.id, req.http_addr);
            StatusCode::OK.into_response()
        }
        Err(e) => store_error_response(&state, e, &uri).await,
    }
}

async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

async fn missing_key() -> Response {
    error_response(GatewayError::Malformed("key missing from path".to_string()))
}

async fn fallback(uri: Uri) -> Response {
    let path = uri.path();
    if path == "/key" || path.starts_with("/key/") {
        error_response(GatewayError::Malformed(format!("invalid key path {}", path)))
    } else {
        StatusCode::NOT_FOUND.into_response()
    }
}

async fn store_error_response(state: &NodeState, err: StoreError, uri: &Uri) -> Response {
    match err {
        StoreError::NotLeader => {
            let leader = state.store.leader_api_addr().await;
            not_leader_response(&state.config, &leader, uri)
        }
        StoreError::Failed(msg) => {
            warn!("{} failed: {}", uri.path(), msg);
            error_response(GatewayError::Internal(msg))
        }
    }
}

/// Redirect to `leader` for the same path and query, or 503 when it is unknown.
fn not_leader_response(config: &NodeConfig, leader: &str, uri: &Uri) -> Response {
    if leader.is_empty() {
        warn!("{} needs the leader but none is known", uri.path());
        return error_response(GatewayError::Unavailable("no leader".to_string()));
    }

    let target = HttpTransport::redirect_target(&config.redirect_scheme, leader, uri.path(), uri.query());
    match HeaderValue::try_from(target.as_str()) {
        Ok(location) => {
            debug!("redirecting {} to {}", uri, target);
            (StatusCode::TEMPORARY_REDIRECT, [(LOCATION, location)]).into_response()
        }
        Err(_) => {
            warn!("leader address {:?} does not form a valid Location", leader);
            error_response(GatewayError::Internal(format!("invalid leader address {:?}", leader)))
        }
    }
}

fn error_response(err: GatewayError) -> Response {
    (err.status_code(), err.to_string()).into_response()
}
