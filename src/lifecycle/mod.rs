//! Lifecycle management subsystem.
//!
//! ```text
//! signals.rs:  SIGINT / SIGTERM → Shutdown::trigger
//! shutdown.rs: broadcast → HttpServer stops accepting, drains in-flight
//! ```

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
pub use signals::wait_for_signal;
