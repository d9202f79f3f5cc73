//! Power-of-two-choices load balancing strategy.
//!
//! Samples two distinct endpoints at random and keeps the one with fewer
//! in-flight calls.

use std::sync::Arc;

use crate::load_balancer::{endpoint::Endpoint, LoadBalancer};

#[derive(Debug, Default)]
pub struct PowerOfTwoChoices;

impl PowerOfTwoChoices {
    pub fn new() -> Self {
        Self
    }
}

impl LoadBalancer for PowerOfTwoChoices {
    fn select(&self, endpoints: &[Arc<Endpoint>]) -> Option<Arc<Endpoint>> {
        match endpoints.len() {
            0 => None,
            1 => Some(endpoints[0].clone()),
            len => {
                let a = fastrand::usize(..len);
                // Second pick is drawn from the remaining len - 1 slots.
                let mut b = fastrand::usize(..len - 1);
                if b >= a {
                    b += 1;
                }
                let (first, second) = (&endpoints[a], &endpoints[b]);
                if second.in_flight() < first.in_flight() {
                    Some(second.clone())
                } else {
                    Some(first.clone())
                }
            }
        }
    }
}
