//! raftgate Common Types and Transport
//!
//! This crate provides the protocol definitions, error taxonomy and HTTP
//! transport helpers shared by every raftgate component.
//!
//! # Overview
//!
//! raftgate fronts a cluster of consensus-replicated key-value nodes with two
//! cooperating gateways:
//!
//! - **Client gateway**: keeps a registry of backend nodes and routes each
//!   key-value operation to them, tracking per-node failures
//! - **Node gateway**: runs next to every cluster node and redirects writes and
//!   consistent reads to the current leader
//!
//! # Components
//!
//! - [`protocol`] - Wire shapes (`KeyValues`, `JoinRequest`, ...), the
//!   [`ConsistencyLevel`] hint and the [`GatewayError`] taxonomy
//! - [`transport`] - Outbound HTTP client with per-call timeouts and helpers
//!   for parsing bodies and forming redirect targets
//!
//! # Example
//!
//! ```
//! use raftgate_common::{ConsistencyLevel, transport::HttpTransport};
//!
//! let level = ConsistencyLevel::from_query(Some(" Consistent "));
//! assert_eq!(level, ConsistencyLevel::Consistent);
//!
//! let target = HttpTransport::redirect_target("http", "10.0.0.2:51000", "/key/a", Some("level=consistent"));
//! assert_eq!(target, "http://10.0.0.2:51000/key/a?level=consistent");
//! ```

pub mod protocol;
pub mod transport;

pub use protocol::*;
