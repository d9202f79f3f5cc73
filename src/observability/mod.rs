//! Observability subsystem.
//!
//! ```text
//! handlers, rpc client, discovery
//!     → logging.rs (tracing events with request_id / endpoint fields)
//!     → metrics.rs (counters, gauges, histograms; Prometheus scrape)
//! ```

pub mod logging;
pub mod metrics;
