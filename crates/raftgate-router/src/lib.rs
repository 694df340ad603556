//! raftgate Router
//!
//! The client side of raftgate: a registry of backend node gateways, a router
//! that satisfies key-value operations against them with failure bookkeeping,
//! and the HTTP gateway external callers talk to.

pub mod registry;
pub mod router;
pub mod http_server;

pub use registry::{RegistryConfig, ServiceEntry, ServiceRegistry, DEFAULT_FAILURE_THRESHOLD};
pub use router::{RequestRouter, RouterConfig};
pub use http_server::ClientGateway;
