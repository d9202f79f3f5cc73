//! The order RPC binding against a live mock order service.

use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Map};

use order_gateway::config::RpcClientConfig;
use order_gateway::rpc::{order, Identity, OrderClient, OrderRpc, RequestContext, RpcClient, RpcError};

mod common;
use common::Reply;

async fn order_client(endpoints: &[std::net::SocketAddr]) -> OrderClient {
    let mut config = RpcClientConfig::with_endpoints(endpoints.iter().map(|a| a.to_string()));
    config.refresh_secs = 0;
    OrderClient::new(RpcClient::connect(&config).await.unwrap())
}

fn request() -> order::CreateRequest {
    order::CreateRequest {
        uid: 3,
        pid: 4,
        amount: 12.5,
        status: 1,
    }
}

#[tokio::test]
async fn test_cancel_mid_flight_returns_promptly() {
    let (backend, mock) = common::start_order_service(Reply::Slow {
        delay: Duration::from_secs(10),
        id: 1,
    })
    .await;
    let client = order_client(&[backend]).await;

    let ctx = RequestContext::new("cancel-me");
    let canceller = ctx.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        canceller.cancel();
    });

    let result = tokio::time::timeout(Duration::from_secs(2), client.create(&ctx, request()))
        .await
        .expect("call did not return after cancellation");

    assert_eq!(result, Err(RpcError::Cancelled));
    assert_eq!(mock.calls(), 1);
}

#[tokio::test]
async fn test_context_deadline_is_enforced_and_forwarded() {
    let (backend, mock) = common::start_order_service(Reply::Slow {
        delay: Duration::from_secs(10),
        id: 1,
    })
    .await;
    let client = order_client(&[backend]).await;

    let ctx = RequestContext::new("deadline").with_timeout(Duration::from_millis(150));
    let result = client.create(&ctx, request()).await;

    assert_eq!(result, Err(RpcError::DeadlineExceeded));
    let budget: u64 = mock
        .last_header("x-rpc-timeout-ms")
        .and_then(|v| v.parse().ok())
        .unwrap();
    assert!(budget <= 150);
}

#[tokio::test]
async fn test_identity_claims_become_headers() {
    let (backend, mock) = common::start_order_service(Reply::Created(8)).await;
    let client = order_client(&[backend]).await;

    let mut claims = Map::new();
    claims.insert("userId".into(), json!(42));
    claims.insert("tenant".into(), json!("acme"));
    claims.insert("roles".into(), json!(["admin"]));
    let ctx = RequestContext::new("claims").with_identity(Identity::new(claims));

    let resp = client.create(&ctx, request()).await.unwrap();

    assert_eq!(resp.id, 8);
    assert_eq!(mock.last_header("x-claim-userid").as_deref(), Some("42"));
    assert_eq!(mock.last_header("x-claim-tenant").as_deref(), Some("acme"));
    assert_eq!(mock.last_header("x-claim-roles"), None);
    assert_eq!(
        mock.last_body(),
        Some(json!({ "uid": 3, "pid": 4, "amount": 12.5, "status": 1 }))
    );
}

#[tokio::test]
async fn test_concurrent_calls_share_one_client() {
    let (backend, mock) = common::start_order_service(Reply::Created(11)).await;
    let client = Arc::new(order_client(&[backend]).await);

    let mut tasks = tokio::task::JoinSet::new();
    for i in 0..32 {
        let client = client.clone();
        tasks.spawn(async move {
            let ctx = RequestContext::new(format!("req-{i}"));
            client.create(&ctx, request()).await
        });
    }

    while let Some(joined) = tasks.join_next().await {
        assert_eq!(joined.unwrap().unwrap().id, 11);
    }
    assert_eq!(mock.calls(), 32);
}
