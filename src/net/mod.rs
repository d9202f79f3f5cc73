//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! discovery / rpc
//!     → client.rs (pooled hyper-util client, connect timeout)
//!     → backend endpoint or registry host
//! ```
//!
//! # Design Decisions
//! - One pooled client per RPC binding; clones share the pool
//! - Response bodies are read with an explicit size limit
//! - Startup reachability is a bare TCP dial, outside the pool

pub mod client;

pub use client::{accepts_connections, build_client, read_body, HttpClient};
