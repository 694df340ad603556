use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use hyper::body::Bytes;
use hyper::Method;
use raftgate_common::protocol::error::{GatewayError, Result};
use raftgate_common::protocol::{ConsistencyLevel, KeyValues};
use raftgate_common::transport::{BackendReply, HttpClient, HttpTransport};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::registry::{RegistryConfig, ServiceEntry, ServiceRegistry};

/// Configuration for the request router.
#[derive(Debug, Clone)]
pub struct RouterConfig {
    /// Timeout for each outbound call to a single backend
    ///
    /// Default: 5s
    pub request_timeout: Duration,
    /// Deadline for one logical get/set across every address it tries
    ///
    /// When it expires the in-flight call is dropped and the operation fails
    /// with `Timeout`.
    /// Default: 30s
    pub operation_deadline: Duration,
    /// Follow a backend's redirect once instead of skipping that backend
    ///
    /// Default: false
    pub follow_redirects: bool,
    /// Health bookkeeping for the registry
    pub registry: RegistryConfig,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(5),
            operation_deadline: Duration::from_secs(30),
            follow_redirects: false,
            registry: RegistryConfig::default(),
        }
    }
}

/// Routes key-value operations to the registered backends.
///
/// # Routing strategy
///
/// - **get / set**: try addresses in registration order, first usable reply
///   wins. A backend that cannot be reached gets a failure recorded and the
///   next address is tried.
/// - **delete**: broadcast to every address concurrently, best effort, never
///   fails.
///
/// A redirect from a backend (the backend is not the leader) is a normal
/// protocol outcome, not a failure. By default the router does not re-issue
/// the call to the redirect target; it moves on to the next address, one of
/// which is expected to be the leader.
pub struct RequestRouter {
    /// Thread-safe registry of backends
    registry: Arc<RwLock<ServiceRegistry>>,
    client: HttpClient,
    config: RouterConfig,
}

impl RequestRouter {
    /// Creates a router with an empty registry.
    pub fn new(config: RouterConfig) -> Self {
        Self::with_services(vec![], config)
    }

    /// Creates a router whose registry starts with `addresses`.
    pub fn with_services(addresses: Vec<String>, config: RouterConfig) -> Self {
        let registry = ServiceRegistry::with_services(addresses, config.registry.clone());
        Self::with_registry(Arc::new(RwLock::new(registry)), config)
    }

    /// Creates a router over an existing, possibly shared, registry.
    pub fn with_registry(registry: Arc<RwLock<ServiceRegistry>>, config: RouterConfig) -> Self {
        let client = HttpClient::new(config.request_timeout);
        info!(
            "Request router initialized (request timeout {:?}, deadline {:?})",
            config.request_timeout, config.operation_deadline
        );
        Self {
            registry,
            client,
            config,
        }
    }

    pub fn registry(&self) -> Arc<RwLock<ServiceRegistry>> {
        self.registry.clone()
    }

    /// Registers a backend (or resets its failure count).
    ///
    /// Returns `true` if it was not registered before.
    pub async fn register(&self, address: String) -> bool {
        let mut registry = self.registry.write().await;
        let is_new = registry.register(address.clone());
        info!("service join addr: {} (new: {})", address, is_new);
        is_new
    }

    /// Removes a backend. Returns `false` if it was not registered.
    pub async fn unregister(&self, address: &str) -> bool {
        let mut registry = self.registry.write().await;
        let removed = registry.unregister(address);
        if removed {
            info!("service leave addr: {}", address);
        }
        removed
    }

    /// Snapshot of the registered addresses
    pub async fn addresses(&self) -> Vec<String> {
        self.registry.read().await.addresses()
    }

    /// Snapshot of every registered backend with its failure count
    pub async fn services(&self) -> Vec<ServiceEntry> {
        self.registry.read().await.entries()
    }

    /// Reads `key` from the first backend that answers usably.
    ///
    /// Returns the empty string when the backend does not know the key.
    ///
    /// # Errors
    /// - `NoAvailableService` when every registered address was tried
    /// - `Timeout` when the operation deadline expired first
    pub async fn get(&self, key: &str, level: ConsistencyLevel) -> Result<String> {
        self.within_deadline("get", async {
            for addr in self.addresses().await {
                let url = HttpTransport::key_url_with_level(&addr, key, level);
                let Some(reply) = self.exchange(&addr, Method::GET, &url, None).await else {
                    continue;
                };

                if !reply.is_success() {
                    debug!("GET {} from {} answered {}, trying next service", key, addr, reply.status);
                    continue;
                }

                match reply.json::<HashMap<String, String>>() {
                    Ok(mut values) => {
                        self.record_success(&addr).await;
                        return Ok(values.remove(key).unwrap_or_default());
                    }
                    Err(e) => {
                        warn!("failed to decode response from {}: {}", addr, e);
                        self.record_failure(&addr).await;
                    }
                }
            }
            Err(GatewayError::NoAvailableService)
        })
        .await
    }

    /// Writes one pair. See [`set_many`](Self::set_many).
    pub async fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut pairs = KeyValues::new();
        pairs.insert(key.to_string(), value.to_string());
        self.set_many(&pairs).await
    }

    /// Writes every pair with a single POST to the first backend that accepts it.
    ///
    /// Writes do not fan out; a non-leader backend answers with a redirect and
    /// the next address is tried. An empty map succeeds without any call.
    ///
    /// # Errors
    /// - `NoAvailableService` when no backend accepted the write
    /// - `Timeout` when the operation deadline expired first
    pub async fn set_many(&self, pairs: &KeyValues) -> Result<()> {
        if pairs.is_empty() {
            return Ok(());
        }
        let body = Bytes::from(serde_json::to_vec(pairs)?);

        self.within_deadline("set", async {
            for addr in self.addresses().await {
                let url = HttpTransport::keys_url(&addr);
                let Some(reply) = self
                    .exchange(&addr, Method::POST, &url, Some(body.clone()))
                    .await
                else {
                    continue;
                };

                if reply.is_success() {
                    self.record_success(&addr).await;
                    debug!("stored {} pair(s) via {}", pairs.len(), addr);
                    return Ok(());
                }
                debug!("POST to {} answered {}, trying next service", addr, reply.status);
            }
            Err(GatewayError::NoAvailableService)
        })
        .await
    }

    /// Deletes `key` on every registered backend.
    ///
    /// All addresses are contacted concurrently. A backend that could not be
    /// reached gets a failure recorded; any HTTP reply counts as a success.
    /// Nothing is reported to the caller.
    pub async fn delete(&self, key: &str) {
        let addresses = self.addresses().await;
        let deletes = addresses.iter().map(|addr| async move {
            let url = HttpTransport::key_url(addr, key);
            if let Some(reply) = self.exchange(addr, Method::DELETE, &url, None).await {
                if !reply.is_success() {
                    debug!("DELETE {} on {} answered {}", key, addr, reply.status);
                }
                self.record_success(addr).await;
            }
        });

        let broadcast = join_all(deletes);
        if tokio::time::timeout(self.config.operation_deadline, broadcast)
            .await
            .is_err()
        {
            warn!("delete of {} did not finish within {:?}", key, self.config.operation_deadline);
        }
    }

    /// Re-issues a request to a redirect target, exactly once.
    ///
    /// This is the explicit follow step for callers that received a redirect;
    /// the reply is returned as is, even if it is another redirect.
    pub async fn follow(&self, method: Method, location: &str, body: Option<Bytes>) -> Result<BackendReply> {
        debug!("following redirect to {}", location);
        self.client.send(method, location, body).await
    }

    /// One call to one backend with health bookkeeping for transport failures.
    ///
    /// Returns `None` if the backend could not be reached.
    async fn exchange(
        &self,
        addr: &str,
        method: Method,
        url: &str,
        body: Option<Bytes>,
    ) -> Option<BackendReply> {
        let reply = match self.client.send(method.clone(), url, body.clone()).await {
            Ok(reply) => reply,
            Err(e) => {
                warn!("{} {} failed: {}", method, url, e);
                self.record_failure(addr).await;
                return None;
            }
        };

        if !self.config.follow_redirects {
            return Some(reply);
        }
        let Some(location) = reply.redirect_location().map(str::to_string) else {
            return Some(reply);
        };
        match self.follow(method, &location, body).await {
            Ok(followed) => Some(followed),
            Err(e) => {
                // health of the redirecting backend is left untouched
                warn!("following redirect from {} to {} failed: {}", addr, location, e);
                Some(reply)
            }
        }
    }

    async fn record_failure(&self, addr: &str) {
        let mut registry = self.registry.write().await;
        if registry.record_failure(addr) {
            warn!(
                "service {} exceeded {} consecutive failures, removed",
                addr,
                registry.failure_threshold()
            );
        }
    }

    async fn record_success(&self, addr: &str) {
        self.registry.write().await.record_success(addr);
    }

    async fn within_deadline<T>(&self, op: &str, fut: impl Future<Output = Result<T>>) -> Result<T> {
        let deadline = self.config.operation_deadline;
        tokio::time::timeout(deadline, fut).await.map_err(|_| {
            warn!("{} did not finish within {:?}", op, deadline);
            GatewayError::Timeout(deadline.as_millis() as u64)
        })?
    }
}
