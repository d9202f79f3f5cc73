//! Endpoint abstraction.
//!
//! # Responsibilities
//! - Represent a single backend endpoint (`host:port`)
//! - Track in-flight calls (for least-conn and p2c selection)
//! - Track passive health (consecutive failures eject the endpoint)
//! - Publish ejection and re-admission on the `gateway_endpoint_healthy` gauge

use std::ops::Deref;
use std::sync::atomic::{AtomicU8, AtomicUsize, Ordering};
use std::sync::Arc;
use url::Url;

use crate::observability::metrics;

/// Health State enum.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthState {
    Unknown = 0,
    Healthy = 1,
    Unhealthy = 2,
}

impl From<u8> for HealthState {
    fn from(val: u8) -> Self {
        match val {
            1 => HealthState::Healthy,
            2 => HealthState::Unhealthy,
            _ => HealthState::Unknown,
        }
    }
}

/// A single backend endpoint.
#[derive(Debug)]
pub struct Endpoint {
    /// The `host:port` this endpoint was resolved to.
    pub authority: String,
    /// Pre-calculated base URL for building call URIs.
    pub base_url: Url,
    in_flight: AtomicUsize,
    state: AtomicU8,
    consecutive_failures: AtomicUsize,
}

impl Endpoint {
    /// Create a new endpoint from a `host:port` authority.
    pub fn new(authority: &str) -> Result<Self, url::ParseError> {
        let base_url = Url::parse(&format!("http://{}", authority))?;
        Ok(Self {
            authority: authority.to_string(),
            base_url,
            in_flight: AtomicUsize::new(0),
            state: AtomicU8::new(HealthState::Unknown as u8),
            consecutive_failures: AtomicUsize::new(0),
        })
    }

    /// Number of calls currently outstanding on this endpoint.
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::Relaxed)
    }

    /// Register an outstanding call; the count drops with the guard.
    pub fn acquire(self: &Arc<Self>) -> InFlightGuard {
        self.in_flight.fetch_add(1, Ordering::Relaxed);
        InFlightGuard {
            endpoint: self.clone(),
        }
    }

    /// Build the absolute URL for an RPC path such as `/order.Order/Create`.
    pub fn url_for(&self, path: &str) -> Result<Url, url::ParseError> {
        self.base_url.join(path)
    }

    // --- Health Logic ---

    pub fn health(&self) -> HealthState {
        self.state.load(Ordering::Relaxed).into()
    }

    /// Return true if endpoint is eligible for selection (Healthy or Unknown).
    pub fn is_healthy(&self) -> bool {
        self.health() != HealthState::Unhealthy
    }

    /// Report a successful call. Returns true when this brought an ejected
    /// endpoint back.
    pub fn mark_success(&self) -> bool {
        self.consecutive_failures.store(0, Ordering::Relaxed);
        let previous = self.state.swap(HealthState::Healthy as u8, Ordering::Relaxed);
        let recovered = HealthState::from(previous) == HealthState::Unhealthy;
        if recovered {
            metrics::record_endpoint_health(&self.authority, true);
        }
        recovered
    }

    /// Report a failed call. Returns true when this failure ejected the endpoint.
    pub fn mark_failure(&self, unhealthy_threshold: usize) -> bool {
        if self.health() == HealthState::Unhealthy {
            return false;
        }

        let failures = self.consecutive_failures.fetch_add(1, Ordering::Relaxed) + 1;
        if failures < unhealthy_threshold {
            return false;
        }
        let previous = self.state.swap(HealthState::Unhealthy as u8, Ordering::Relaxed);
        let ejected = HealthState::from(previous) != HealthState::Unhealthy;
        if ejected {
            metrics::record_endpoint_health(&self.authority, false);
        }
        ejected
    }

    /// Forget past failures and make the endpoint selectable again. Returns
    /// true when the endpoint had been ejected.
    pub fn readmit(&self) -> bool {
        self.consecutive_failures.store(0, Ordering::Relaxed);
        let readmitted = self
            .state
            .compare_exchange(
                HealthState::Unhealthy as u8,
                HealthState::Unknown as u8,
                Ordering::Relaxed,
                Ordering::Relaxed,
            )
            .is_ok();
        if readmitted {
            metrics::record_endpoint_health(&self.authority, true);
        }
        readmitted
    }
}

/// A RAII guard that holds one in-flight slot on an endpoint.
#[derive(Debug)]
pub struct InFlightGuard {
    pub endpoint: Arc<Endpoint>,
}

impl Deref for InFlightGuard {
    type Target = Endpoint;
    fn deref(&self) -> &Self::Target {
        &self.endpoint
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.endpoint.in_flight.fetch_sub(1, Ordering::Relaxed);
    }
}
