pub mod client;

pub use client::KvClient;
