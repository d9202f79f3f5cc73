//! Per-request plumbing: request ids and the `RequestContext` extractor.

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::{HeaderName, HeaderValue, Request};
use tower_http::request_id::{MakeRequestId, RequestId};
use uuid::Uuid;

use crate::rpc::{Identity, RequestContext};
use crate::svc::ServiceContext;

pub static X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// Assigns a UUID v4 to requests that arrive without an `x-request-id`.
#[derive(Debug, Clone, Copy, Default)]
pub struct MakeRequestUuidV4;

impl MakeRequestId for MakeRequestUuidV4 {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        let id = Uuid::new_v4().to_string();
        HeaderValue::from_str(&id).ok().map(RequestId::new)
    }
}

/// Builds the context handed down to the logic layer.
///
/// The deadline starts counting when the extractor runs. Cancellation on
/// client disconnect is wired by the handler, which owns the drop guard.
impl FromRequestParts<Arc<ServiceContext>> for RequestContext {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        svc: &Arc<ServiceContext>,
    ) -> Result<Self, Self::Rejection> {
        let request_id = parts
            .headers
            .get(&X_REQUEST_ID)
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        let mut ctx = RequestContext::new(request_id);

        let request_secs = svc.config.timeouts.request_secs;
        if request_secs > 0 {
            ctx = ctx.with_timeout(Duration::from_secs(request_secs));
        }

        if let Some(identity) = parts.extensions.get::<Identity>() {
            ctx = ctx.with_identity(identity.clone());
        }

        Ok(ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GatewayConfig;
    use crate::rpc::{order, OrderRpc, RpcError};
    use async_trait::async_trait;
    use serde_json::{json, Map};

    struct Unused;

    #[async_trait]
    impl OrderRpc for Unused {
        async fn create(
            &self,
            _ctx: &RequestContext,
            _request: order::CreateRequest,
        ) -> Result<order::CreateResponse, RpcError> {
            unreachable!("extractor tests never call the backend")
        }
    }

    fn svc() -> Arc<ServiceContext> {
        Arc::new(ServiceContext::new(GatewayConfig::default(), Arc::new(Unused)))
    }

    #[tokio::test]
    async fn test_extracts_request_id_identity_and_deadline() {
        let mut claims = Map::new();
        claims.insert("uid".into(), json!(7));

        let (mut parts, _) = Request::builder()
            .header("x-request-id", "abc-123")
            .extension(Identity::new(claims))
            .body(())
            .unwrap()
            .into_parts();

        let ctx = RequestContext::from_request_parts(&mut parts, &svc())
            .await
            .unwrap();

        assert_eq!(ctx.request_id(), "abc-123");
        assert_eq!(ctx.identity().and_then(|i| i.claim("uid")), Some(&json!(7)));
        let remaining = ctx.remaining().unwrap();
        assert!(remaining <= Duration::from_secs(30));
        assert!(remaining > Duration::from_secs(29));
        assert!(!ctx.is_cancelled());
    }

    #[tokio::test]
    async fn test_missing_request_id_gets_generated() {
        let (mut parts, _) = Request::builder().body(()).unwrap().into_parts();

        let ctx = RequestContext::from_request_parts(&mut parts, &svc())
            .await
            .unwrap();

        assert!(Uuid::parse_str(ctx.request_id()).is_ok());
        assert!(ctx.identity().is_none());
    }

    #[test]
    fn test_make_request_id_is_uuid() {
        let request = Request::builder().body(()).unwrap();
        let id = MakeRequestUuidV4.make_request_id(&request).unwrap();
        assert!(Uuid::parse_str(id.header_value().to_str().unwrap()).is_ok());
    }
}
