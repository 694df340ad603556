//! HTTP Server for the Client Gateway
//!
//! This module provides the client-facing HTTP surface using axum. Key-value
//! requests are translated into [`RequestRouter`] calls and join announcements
//! from backend nodes into registry updates.
//!
//! # Endpoints
//!
//! - `GET /key/{key}` - read through the router, `{key: value}`
//! - `POST /key` - write a JSON object of pairs through the router
//! - `DELETE /key/{key}` - broadcast delete, always succeeds
//! - `POST /service_join` - `{"serviceAddr": "host:port"}` registers a backend
//! - `POST /service_leave` - unregisters a backend
//! - `GET /services` - registered backends and their failure counts
//! - `GET /__health` - liveness
//!
//! Malformed paths and bodies are rejected with `400` before the router is
//! touched.

use axum::{
    extract::{Path, RawQuery, State},
    http::{StatusCode, Uri},
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
use tracing::{info, warn};

use crate::router::RequestRouter;
use raftgate_common::protocol::error::{GatewayError, Result};
use raftgate_common::protocol::{ConsistencyLevel, KeyValues, ServiceJoinRequest};
use raftgate_common::transport::HttpTransport;

/// HTTP server for the client gateway.
pub struct ClientGateway {
    router: Arc<RequestRouter>,
}

impl ClientGateway {
    /// Creates a new gateway over a router.
    pub fn new(router: Arc<RequestRouter>) -> Self {
        Self { router }
    }

    /// Builds the axum application.
    pub fn app(&self) -> axum::Router {
        axum::Router::new()
            .route("/key", post(set_keys).get(missing_key).delete(missing_key))
            .route("/key/:key", get(get_key).delete(delete_key))
            .route("/service_join", post(service_join))
            .route("/service_leave", post(service_leave))
            .route("/services", get(list_services))
            .route("/__health", get(health_check))
            .fallback(fallback)
            .layer(CorsLayer::permissive())
            .with_state(self.router.clone())
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
            "Client gateway listening on {}",
            listener
                .local_addr()
                .map_err(|e| GatewayError::Transport(format!("Failed to get local addr: {}", e)))?
        );

        axum::serve(listener, self.app())
            .await
            .map_err(|e| GatewayError::Transport(format!("Server error: {}", e)))
    }
}

/// `GET /key/{key}`. A read that no backend could satisfy yields an empty value.
async fn get_key(
    State(router): State<Arc<RequestRouter>>,
    Path(key): Path<String>,
    RawQuery(query): RawQuery,
) -> Json<HashMap<String, String>> {
    let level = ConsistencyLevel::from_raw_query(query.as_deref());
    let value = match router.get(&key, level).await {
        Ok(value) => value,
        Err(e) => {
            warn!("read of {} failed: {}", key, e);
            String::new()
        }
    };

    let mut body = HashMap::new();
    body.insert(key, value);
    Json(body)
}

/// `POST /key`. All pairs travel in one write; partial application is possible.
async fn set_keys(State(router): State<Arc<RequestRouter>>, body: Bytes) -> Response {
    let pairs: KeyValues = match HttpTransport::parse_body(&body) {
        Ok(pairs) => pairs,
        Err(e) => return error_response(e),
    };

    match router.set_many(&pairs).await {
        Ok(()) => StatusCode::OK.into_response(),
        Err(e) => {
            warn!("write of {} pair(s) failed: {}", pairs.len(), e);
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}

/// `DELETE /key/{key}`. Fire and forget.
async fn delete_key(State(router): State<Arc<RequestRouter>>, Path(key): Path<String>) -> StatusCode {
    router.delete(&key).await;
    StatusCode::OK
}

async fn service_join(State(router): State<Arc<RequestRouter>>, body: Bytes) -> Response {
    match parse_service_addr(&body) {
        Ok(addr) => {
            router.register(addr).await;
            StatusCode::OK.into_response()
        }
        Err(e) => error_response(e),
    }
}

async fn service_leave(State(router): State<Arc<RequestRouter>>, body: Bytes) -> Response {
    match parse_service_addr(&body) {
        Ok(addr) => {
            router.unregister(&addr).await;
            StatusCode::OK.into_response()
        }
        Err(e) => error_response(e),
    }
}

async fn list_services(State(router): State<Arc<RequestRouter>>) -> impl IntoResponse {
    Json(router.services().await)
}

async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

async fn missing_key() -> Response {
    error_response(GatewayError::Malformed("key missing from path".to_string()))
}

/// Anything under `/key` that did not match a route has a missing or nested key.
async fn fallback(uri: Uri) -> Response {
    let path = uri.path();
    if path == "/key" || path.starts_with("/key/") {
        error_response(GatewayError::Malformed(format!("invalid key path {}", path)))
    } else {
        StatusCode::NOT_FOUND.into_response()
    }
}

fn parse_service_addr(body: &[u8]) -> Result<String> {
    let req: ServiceJoinRequest = HttpTransport::parse_body(body)?;
    let addr = req.service_addr.trim();
    if addr.is_empty() {
        return Err(GatewayError::Malformed("serviceAddr is empty".to_string()));
    }
    Ok(addr.to_string())
}

fn error_response(err: GatewayError) -> Response {
    (err.status_code(), err.to_string()).into_response()
}
