//! Load balancing subsystem.
//!
//! # Data Flow
//! ```text
//! discovery resolves service key → addresses
//!     → pool.rs (EndpointSet swaps in the new endpoints)
//!
//! RPC call:
//!     → pool.rs (filter ejected endpoints)
//!     → Apply load balancing algorithm:
//!         - round_robin.rs (rotate through endpoints)
//!         - least_conn.rs (pick endpoint with fewest in-flight calls)
//!         - p2c.rs (best of two random endpoints)
//!     → endpoint.rs (in-flight guard held for the call)
//! ```
//!
//! # Design Decisions
//! - Selectors are stateless apart from a rotation counter; endpoints carry their own counters
//! - Ejected endpoints are excluded from selection while any healthy one exists

use std::sync::Arc;

pub mod endpoint;
pub mod least_conn;
pub mod p2c;
pub mod pool;
pub mod round_robin;

pub use endpoint::{Endpoint, HealthState, InFlightGuard};
pub use pool::{balancer_for, EndpointSet};

/// Endpoint selection strategy.
pub trait LoadBalancer: Send + Sync + std::fmt::Debug {
    /// Pick one endpoint out of `endpoints`, or `None` if the slice is empty.
    fn select(&self, endpoints: &[Arc<Endpoint>]) -> Option<Arc<Endpoint>>;
}
