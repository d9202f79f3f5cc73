//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (axum router, request id, tracing, body limit)
//!     → middleware/auth.rs (bearer token → Identity, when configured)
//!     → request.rs (RequestContext: request id, deadline, identity)
//!     → handler.rs (decode → logic → encode)
//!     → response.rs (ApiError → status + {"code","message"})
//! ```

pub mod handler;
pub mod middleware;
pub mod request;
pub mod response;
pub mod server;

pub use request::{MakeRequestUuidV4, X_REQUEST_ID};
pub use response::ApiError;
pub use server::HttpServer;
