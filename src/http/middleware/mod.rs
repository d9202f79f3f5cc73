//! Request middleware applied ahead of the handlers.

pub mod auth;

pub use auth::{require_bearer, BearerAuth};
