//! Remote client binding subsystem.
//!
//! # Data Flow
//! ```text
//! logic layer
//!     → order.rs (OrderRpc::create, typed messages)
//!     → client.rs (RpcClient::call: pick endpoint, JSON over HTTP/1.1)
//!         ↳ bounded by context.rs (cancellation + deadline)
//!     → backend order service
//!     ← reply or error.rs (RpcError, canonical Code, ErrorCategory)
//! ```
//!
//! # Design Decisions
//! - The context is an explicit parameter on every call
//! - Errors carry a category so the HTTP layer can keep them apart

pub mod client;
pub mod context;
pub mod error;
pub mod order;

pub use client::{ConnectError, RpcClient};
pub use context::{Identity, RequestContext};
pub use error::{Code, ErrorCategory, RpcError, StatusBody};
pub use order::{OrderClient, OrderRpc};
