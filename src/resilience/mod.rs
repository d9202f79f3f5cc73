//! Resilience helpers for outbound calls.
//!
//! Order creation is not idempotent, so RPC calls are never retried. Only
//! registry lookups at startup back off and try again.

pub mod backoff;

pub use backoff::Backoff;
