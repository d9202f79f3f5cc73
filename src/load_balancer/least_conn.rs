//! Least Connections load balancing strategy.

use std::sync::Arc;

use crate::load_balancer::{endpoint::Endpoint, LoadBalancer};

/// Least connections selector.
/// Selects the endpoint with the fewest in-flight calls.
#[derive(Debug, Default)]
pub struct LeastConnections;

impl LeastConnections {
    pub fn new() -> Self {
        Self
    }
}

impl LoadBalancer for LeastConnections {
    fn select(&self, endpoints: &[Arc<Endpoint>]) -> Option<Arc<Endpoint>> {
        // Ties resolve to the first endpoint.
        endpoints.iter().min_by_key(|e| e.in_flight()).cloned()
    }
}
