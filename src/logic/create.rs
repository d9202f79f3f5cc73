//! Order creation: maps the public request onto the order service's `Create`.

use crate::rpc::{order, RequestContext, RpcError};
use crate::svc::ServiceContext;
use crate::types::{CreateRequest, CreateResponse};

/// One order creation. Built fresh for every request.
pub struct CreateLogic<'a> {
    ctx: RequestContext,
    svc: &'a ServiceContext,
}

impl<'a> CreateLogic<'a> {
    pub fn new(ctx: RequestContext, svc: &'a ServiceContext) -> Self {
        Self { ctx, svc }
    }

    /// Forward the order to the order service and hand back its id.
    ///
    /// Remote errors are returned as they came.
    pub async fn create(&self, req: &CreateRequest) -> Result<CreateResponse, RpcError> {
        let remote = self
            .svc
            .order_rpc
            .create(
                &self.ctx,
                order::CreateRequest {
                    uid: req.uid,
                    pid: req.pid,
                    amount: req.amount,
                    status: req.status,
                },
            )
            .await?;

        tracing::debug!(request_id = %self.ctx.request_id(), id = remote.id, "Order created");

        Ok(CreateResponse { id: remote.id })
    }
}
