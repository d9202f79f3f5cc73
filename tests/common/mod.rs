//! Shared utilities for integration tests: mock backends on ephemeral ports
//! and a helper to run the gateway in-process.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde_json::{json, Value};
use tokio::net::TcpListener;

use order_gateway::config::{GatewayConfig, RpcClientConfig};
use order_gateway::{HttpServer, ServiceContext, Shutdown};

/// How the mock order service answers `/order.Order/Create`.
#[derive(Debug, Clone)]
pub enum Reply {
    Created(i64),
    Fail { status: u16, code: &'static str, message: &'static str },
    Slow { delay: Duration, id: i64 },
}

/// Observations made by the mock order service.
#[derive(Debug)]
pub struct MockOrderService {
    reply: Reply,
    calls: AtomicUsize,
    last_body: Mutex<Option<Value>>,
    last_headers: Mutex<Option<HeaderMap>>,
}

impl MockOrderService {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_body(&self) -> Option<Value> {
        self.last_body.lock().unwrap().clone()
    }

    pub fn last_header(&self, name: &str) -> Option<String> {
        self.last_headers
            .lock()
            .unwrap()
            .as_ref()
            .and_then(|h| h.get(name))
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    }
}

async fn create_order(
    State(mock): State<Arc<MockOrderService>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    mock.calls.fetch_add(1, Ordering::SeqCst);
    *mock.last_body.lock().unwrap() = Some(body);
    *mock.last_headers.lock().unwrap() = Some(headers);

    match mock.reply.clone() {
        Reply::Created(id) => Json(json!({ "id": id })).into_response(),
        Reply::Fail { status, code, message } => (
            StatusCode::from_u16(status).unwrap(),
            Json(json!({ "code": code, "message": message })),
        )
            .into_response(),
        Reply::Slow { delay, id } => {
            tokio::time::sleep(delay).await;
            Json(json!({ "id": id })).into_response()
        }
    }
}

async fn serve(router: Router) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, router).await;
    });
    addr
}

/// Start a mock order service speaking the JSON RPC wire format.
pub async fn start_order_service(reply: Reply) -> (SocketAddr, Arc<MockOrderService>) {
    let mock = Arc::new(MockOrderService {
        reply,
        calls: AtomicUsize::new(0),
        last_body: Mutex::new(None),
        last_headers: Mutex::new(None),
    });
    let router = Router::new()
        .route("/order.Order/Create", post(create_order))
        .with_state(mock.clone());
    (serve(router).await, mock)
}

/// Start a stub of the etcd v3 JSON gateway that lists `endpoints` under any
/// requested prefix.
pub async fn start_etcd(endpoints: Vec<String>) -> SocketAddr {
    let endpoints = Arc::new(endpoints);
    let router = Router::new().route(
        "/v3/kv/range",
        post(move |Json(req): Json<Value>| {
            let endpoints = endpoints.clone();
            async move {
                let prefix = req["key"]
                    .as_str()
                    .and_then(|k| STANDARD.decode(k).ok())
                    .map(|k| String::from_utf8_lossy(&k).into_owned())
                    .unwrap_or_default();
                let kvs: Vec<Value> = endpoints
                    .iter()
                    .enumerate()
                    .map(|(i, ep)| {
                        json!({
                            "key": STANDARD.encode(format!("{prefix}{i}")),
                            "value": STANDARD.encode(ep),
                        })
                    })
                    .collect();
                Json(json!({ "count": kvs.len().to_string(), "kvs": kvs }))
            }
        }),
    );
    serve(router).await
}

/// An address on which nothing is listening.
pub fn closed_address() -> SocketAddr {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap()
}

/// Gateway config pointing at fixed order service endpoints.
pub fn config_with_endpoints(endpoints: &[SocketAddr]) -> GatewayConfig {
    let mut config = GatewayConfig::default();
    config.listener.bind_address = "127.0.0.1:0".into();
    config.order_rpc = RpcClientConfig::with_endpoints(endpoints.iter().map(|a| a.to_string()));
    config.order_rpc.refresh_secs = 0;
    config
}

/// A running gateway. Dropping it leaves the server task running until
/// `shutdown` is triggered.
pub struct Gateway {
    pub addr: SocketAddr,
    pub shutdown: Shutdown,
}

impl Gateway {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

/// Initialize the service context from `config` and serve it on an ephemeral
/// port.
pub async fn start_gateway(config: GatewayConfig) -> Gateway {
    let svc = ServiceContext::initialize(config)
        .await
        .expect("service context failed to initialize");

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let server = HttpServer::new(Arc::new(svc));
    let rx = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, rx).await;
    });

    Gateway { addr, shutdown }
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .no_proxy()
        .timeout(Duration::from_secs(10))
        .build()
        .unwrap()
}
