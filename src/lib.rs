//! Order gateway library.
//!
//! An HTTP front door for order creation: decodes `POST /api/order/create`,
//! forwards it to the order service over RPC, and maps the reply back.

pub mod config;
pub mod discovery;
pub mod http;
pub mod lifecycle;
pub mod load_balancer;
pub mod logic;
pub mod net;
pub mod observability;
pub mod resilience;
pub mod routing;
pub mod rpc;
pub mod svc;
pub mod types;

pub use config::schema::GatewayConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use svc::ServiceContext;
