//! raftgate node
//!
//! The HTTP gateway that runs beside each member of the replicated store.
//! Reads, writes and joins are delegated to a [`StoreApi`]; requests that
//! reached a follower are redirected to the leader.
//!
//! [`MemoryStore`] is a non-replicating store for running a node on its own.

pub mod http_server;
pub mod membership;
pub mod store;

pub use http_server::{NodeConfig, NodeGateway};
pub use membership::{announce_to_gateway, join_cluster};
pub use store::{MemoryStore, StoreApi, StoreError};
