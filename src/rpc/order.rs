//! Typed client for the backend order service.
//!
//! These message types are the backend's own contract. The gateway's outward
//! request/response types live in `crate::types` and are mapped by the logic
//! layer.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::rpc::client::RpcClient;
use crate::rpc::context::RequestContext;
use crate::rpc::error::RpcError;

/// Wire path of the `Create` operation.
pub const CREATE_METHOD: &str = "/order.Order/Create";

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

/// Remote operations of the order service.
#[async_trait]
pub trait OrderRpc: Send + Sync {
    async fn create(
        &self,
        ctx: &RequestContext,
        request: CreateRequest,
    ) -> Result<CreateResponse, RpcError>;
}

/// [`OrderRpc`] over the JSON RPC transport.
#[derive(Debug, Clone)]
pub struct OrderClient {
    client: RpcClient,
}

impl OrderClient {
    pub fn new(client: RpcClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl OrderRpc for OrderClient {
    async fn create(
        &self,
        ctx: &RequestContext,
        request: CreateRequest,
    ) -> Result<CreateResponse, RpcError> {
        self.client.call(ctx, CREATE_METHOD, &request).await
    }
}
