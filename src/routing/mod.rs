//! Routing subsystem.
//!
//! Routes are a plain `(method, path) → handler` table compiled into an axum
//! router once at startup.

pub mod routes;

pub use routes::{router, routes, Route, CREATE_ORDER_PATH, HEALTH_PATH};
