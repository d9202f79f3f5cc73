//! Per-endpoint business logic. One module per operation.

pub mod create;

pub use create::CreateLogic;
