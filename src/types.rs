//! Request and response types of the public HTTP API.

use serde::{Deserialize, Serialize};

/// Body of `POST /api/order/create`. Every field is required.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateRequest {
    pub uid: i64,
    pub pid: i64,
    pub amount: f64,
    pub status: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateResponse {
    pub id: i64,
}
