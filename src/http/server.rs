//! HTTP server setup.
//!
//! # Responsibilities
//! - Build the axum router from the route table
//! - Wire up middleware (request id, tracing, body limit, auth, metrics)
//! - Serve until the shutdown signal, draining in-flight requests

use std::sync::Arc;
use std::time::Instant;

use axum::{
    body::Body,
    extract::{DefaultBodyLimit, MatchedPath},
    http::Request,
    middleware::{self, Next},
    response::Response,
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::{
    limit::RequestBodyLimitLayer,
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::http::middleware::BearerAuth;
use crate::http::request::{MakeRequestUuidV4, X_REQUEST_ID};
use crate::observability::metrics;
use crate::routing;
use crate::svc::ServiceContext;

/// HTTP server for the order gateway.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    pub fn new(svc: Arc<ServiceContext>) -> Self {
        Self {
            router: Self::build_router(svc),
        }
    }

    /// Build the axum router with all middleware layers.
    pub fn build_router(svc: Arc<ServiceContext>) -> Router {
        let auth = BearerAuth::from_config(&svc.config.auth).map(Arc::new);
        if auth.is_none() {
            tracing::warn!("auth.access_secret is empty; bearer tokens are not verified");
        }

        let max_body_bytes = svc.config.listener.max_body_bytes;

        routing::router(auth)
            .route_layer(middleware::from_fn(track_metrics))
            .with_state(svc)
            .layer(DefaultBodyLimit::disable())
            .layer(
                ServiceBuilder::new()
                    .layer(SetRequestIdLayer::new(X_REQUEST_ID.clone(), MakeRequestUuidV4))
                    .layer(TraceLayer::new_for_http().make_span_with(|req: &Request<Body>| {
                        let request_id = req
                            .headers()
                            .get(&X_REQUEST_ID)
                            .and_then(|v| v.to_str().ok())
                            .unwrap_or("-");
                        tracing::info_span!(
                            "request",
                            method = %req.method(),
                            uri = %req.uri(),
                            request_id = %request_id,
                        )
                    }))
                    .layer(PropagateRequestIdLayer::new(X_REQUEST_ID.clone()))
                    .layer(RequestBodyLimitLayer::new(max_body_bytes)),
            )
    }

    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server until a message arrives on `shutdown`.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Draining in-flight requests");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

async fn track_metrics(request: Request<Body>, next: Next) -> Response {
    let start = Instant::now();
    let route = request
        .extensions()
        .get::<MatchedPath>()
        .map(MatchedPath::as_str)
        .unwrap_or("unmatched")
        .to_string();

    let response = next.run(request).await;
    metrics::record_request(&route, response.status().as_u16(), start);
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GatewayConfig;
    use crate::rpc::{order, Code, OrderRpc, RequestContext, RpcError};
    use async_trait::async_trait;
    use axum::http::{header, StatusCode};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tower::ServiceExt;

    /// Replies with a fixed result and counts calls.
    struct FixedOrderRpc {
        reply: Result<order::CreateResponse, RpcError>,
        calls: AtomicUsize,
    }

    impl FixedOrderRpc {
        fn new(reply: Result<order::CreateResponse, RpcError>) -> Arc<Self> {
            Arc::new(Self {
                reply,
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl OrderRpc for FixedOrderRpc {
        async fn create(
            &self,
            _ctx: &RequestContext,
            _request: order::CreateRequest,
        ) -> Result<order::CreateResponse, RpcError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.reply.clone()
        }
    }

    fn app(config: GatewayConfig, rpc: Arc<FixedOrderRpc>) -> Router {
        HttpServer::new(Arc::new(ServiceContext::new(config, rpc))).router()
    }

    fn create_request(body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/api/order/create")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_create_returns_id() {
        let rpc = FixedOrderRpc::new(Ok(order::CreateResponse { id: 777 }));
        let response = app(GatewayConfig::default(), rpc.clone())
            .oneshot(create_request(
                r#"{"uid":1,"pid":42,"amount":9.99,"status":0}"#,
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("x-request-id"));
        assert_eq!(body_json(response).await, serde_json::json!({"id": 777}));
        assert_eq!(rpc.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_malformed_bodies_never_reach_backend() {
        let rpc = FixedOrderRpc::new(Ok(order::CreateResponse { id: 1 }));
        let app = app(GatewayConfig::default(), rpc.clone());

        for body in [
            "{not json",
            r#"{"uid":1,"pid":42,"amount":9.99}"#,
            r#"{"uid":"one","pid":42,"amount":9.99,"status":0}"#,
        ] {
            let response = app.clone().oneshot(create_request(body)).await.unwrap();
            assert_eq!(response.status(), StatusCode::BAD_REQUEST, "body: {body}");
            assert_eq!(body_json(response).await["code"], "INVALID_REQUEST");
        }

        let no_content_type = Request::builder()
            .method("POST")
            .uri("/api/order/create")
            .body(Body::from(r#"{"uid":1,"pid":42,"amount":9.99,"status":0}"#))
            .unwrap();
        let response = app.clone().oneshot(no_content_type).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        assert_eq!(rpc.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_remote_errors_keep_their_category() {
        let cases = [
            (RpcError::status(Code::InvalidArgument, "bad pid"), 400),
            (RpcError::NoEndpoints("order.rpc".into()), 503),
            (RpcError::DeadlineExceeded, 504),
            (RpcError::status(Code::Internal, "boom"), 500),
        ];

        for (err, status) in cases {
            let code = err.code().as_str();
            let rpc = FixedOrderRpc::new(Err(err));
            let response = app(GatewayConfig::default(), rpc)
                .oneshot(create_request(r#"{"uid":1,"pid":2,"amount":3.0,"status":0}"#))
                .await
                .unwrap();
            assert_eq!(response.status().as_u16(), status);
            assert_eq!(body_json(response).await["code"], code);
        }
    }

    #[tokio::test]
    async fn test_health_and_unknown_routes() {
        let rpc = FixedOrderRpc::new(Ok(order::CreateResponse { id: 1 }));
        let app = app(GatewayConfig::default(), rpc);

        let health = Request::builder().uri("/health").body(Body::empty()).unwrap();
        let response = app.clone().oneshot(health).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let get_create = Request::builder()
            .uri("/api/order/create")
            .body(Body::empty())
            .unwrap();
        let response = app.clone().oneshot(get_create).await.unwrap();
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);

        let missing = Request::builder().uri("/nope").body(Body::empty()).unwrap();
        let response = app.oneshot(missing).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_auth_guards_create_but_not_health() {
        let mut config = GatewayConfig::default();
        config.auth.access_secret = "s3cret".into();
        let rpc = FixedOrderRpc::new(Ok(order::CreateResponse { id: 1 }));
        let app = app(config, rpc.clone());

        let response = app
            .clone()
            .oneshot(create_request(r#"{"uid":1,"pid":2,"amount":3.0,"status":0}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_json(response).await["code"], "UNAUTHENTICATED");
        assert_eq!(rpc.calls.load(Ordering::SeqCst), 0);

        let health = Request::builder().uri("/health").body(Body::empty()).unwrap();
        assert_eq!(app.oneshot(health).await.unwrap().status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_oversized_body_is_413_with_or_without_length() {
        let mut config = GatewayConfig::default();
        config.listener.max_body_bytes = 16;
        let rpc = FixedOrderRpc::new(Ok(order::CreateResponse { id: 1 }));
        let app = app(config, rpc.clone());
        let body = r#"{"uid":1,"pid":42,"amount":9.99,"status":0}"#;

        let streamed = app.clone().oneshot(create_request(body)).await.unwrap();
        assert_eq!(streamed.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(body_json(streamed).await["code"], "PAYLOAD_TOO_LARGE");

        let mut sized = create_request(body);
        sized
            .headers_mut()
            .insert(header::CONTENT_LENGTH, body.len().into());
        let sized = app.oneshot(sized).await.unwrap();
        assert_eq!(sized.status(), StatusCode::PAYLOAD_TOO_LARGE);

        assert_eq!(rpc.calls.load(Ordering::SeqCst), 0);
    }
}
