//! Endpoint set management.
//!
//! # Responsibilities
//! - Hold the current endpoints of one backend service
//! - Swap in freshly resolved endpoints without blocking callers
//! - Apply the load balancing algorithm to the selectable endpoints
//! - Provide in-flight guards for tracking

use std::collections::HashMap;
use std::sync::Arc;

use arc_swap::ArcSwap;

use crate::config::BalancerKind;
use crate::load_balancer::{
    endpoint::{Endpoint, InFlightGuard},
    least_conn::LeastConnections,
    p2c::PowerOfTwoChoices,
    round_robin::RoundRobin,
    LoadBalancer,
};

/// Build the selector for a configured policy.
pub fn balancer_for(kind: BalancerKind) -> Box<dyn LoadBalancer> {
    match kind {
        BalancerKind::RoundRobin => Box::new(RoundRobin::new()),
        BalancerKind::LeastConn => Box::new(LeastConnections::new()),
        BalancerKind::P2c => Box::new(PowerOfTwoChoices::new()),
    }
}

/// The endpoints of one service plus the policy used to pick among them.
#[derive(Debug)]
pub struct EndpointSet {
    endpoints: ArcSwap<Vec<Arc<Endpoint>>>,
    balancer: Box<dyn LoadBalancer>,
}

impl EndpointSet {
    pub fn new(balancer: Box<dyn LoadBalancer>) -> Self {
        Self {
            endpoints: ArcSwap::from_pointee(Vec::new()),
            balancer,
        }
    }

    /// Replace the endpoint list with `addresses`.
    ///
    /// Endpoints that survive the update keep their in-flight counters and are
    /// re-admitted if they had been ejected. Unparseable addresses are skipped.
    /// Returns the number of endpoints now in the set.
    pub fn replace(&self, addresses: &[String]) -> usize {
        let current = self.endpoints.load();
        let existing: HashMap<&str, &Arc<Endpoint>> = current
            .iter()
            .map(|e| (e.authority.as_str(), e))
            .collect();

        let mut next = Vec::with_capacity(addresses.len());
        for address in addresses {
            if next.iter().any(|e: &Arc<Endpoint>| &e.authority == address) {
                continue;
            }
            if let Some(endpoint) = existing.get(address.as_str()) {
                if endpoint.readmit() {
                    tracing::info!(address = %address, "Ejected endpoint re-admitted");
                }
                next.push(Arc::clone(endpoint));
                continue;
            }
            match Endpoint::new(address) {
                Ok(endpoint) => next.push(Arc::new(endpoint)),
                Err(e) => tracing::warn!(address = %address, error = %e, "Ignoring invalid endpoint"),
            }
        }

        let len = next.len();
        self.endpoints.store(Arc::new(next));
        len
    }

    /// Select an endpoint and register an in-flight call on it.
    ///
    /// Ejected endpoints are skipped unless every endpoint is ejected, in which
    /// case the whole set is eligible again.
    pub fn pick(&self) -> Option<InFlightGuard> {
        let endpoints = self.endpoints.load();
        let healthy: Vec<Arc<Endpoint>> = endpoints
            .iter()
            .filter(|e| e.is_healthy())
            .cloned()
            .collect();

        let selected = if healthy.is_empty() {
            if !endpoints.is_empty() {
                tracing::debug!(count = endpoints.len(), "All endpoints ejected, selecting from full set");
            }
            self.balancer.select(&endpoints)
        } else {
            self.balancer.select(&healthy)
        };

        selected.map(|e| e.acquire())
    }

    /// Point-in-time view of the endpoints.
    pub fn snapshot(&self) -> Arc<Vec<Arc<Endpoint>>> {
        self.endpoints.load_full()
    }

    /// Authorities currently in the set.
    pub fn addresses(&self) -> Vec<String> {
        self.endpoints
            .load()
            .iter()
            .map(|e| e.authority.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.endpoints.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
