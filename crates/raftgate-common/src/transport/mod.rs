//! raftgate Transport Layer
//!
//! This module provides the HTTP plumbing shared by the gateways and the client.
//!
//! # Components
//!
//! - **[`HttpClient`]**: Outbound HTTP/1.1 client that never follows redirects
//!   and bounds every call with a timeout
//! - **[`BackendReply`]**: Status, `Location` and body of a backend response
//! - **[`HttpTransport`]**: Helpers for parsing request bodies, building URLs
//!   and forming leader redirect targets

pub mod client;
pub mod http;

pub use client::{BackendReply, HttpClient};
pub use http::HttpTransport;
