//! HTTP handlers: decode, run the logic, encode.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;

use crate::http::response::ApiError;
use crate::logic::CreateLogic;
use crate::rpc::RequestContext;
use crate::svc::ServiceContext;
use crate::types::{CreateRequest, CreateResponse};

/// `POST /api/order/create`
///
/// A body that fails to decode is answered with 400 before any logic runs.
/// If the client goes away, dropping this future cancels the in-flight call.
pub async fn create_handler(
    State(svc): State<Arc<ServiceContext>>,
    ctx: RequestContext,
    payload: Result<Json<CreateRequest>, JsonRejection>,
) -> Result<Json<CreateResponse>, ApiError> {
    let _cancel_on_drop = ctx.cancellation_token().clone().drop_guard();

    let Json(req) = payload.inspect_err(|rejection| {
        tracing::debug!(
            request_id = %ctx.request_id(),
            error = %rejection.body_text(),
            "Rejected malformed request"
        );
    })?;

    let resp = CreateLogic::new(ctx, &svc).create(&req).await?;
    Ok(Json(resp))
}

/// `GET /health`
pub async fn health_handler() -> &'static str {
    "OK"
}
