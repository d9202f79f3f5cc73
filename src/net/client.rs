//! Outbound HTTP client shared by discovery and RPC calls.

use std::time::Duration;

use axum::body::{Body, Bytes};
use hyper::body::Incoming;
use hyper::Response;
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use tokio::net::TcpStream;

/// Pooled HTTP/1.1 client. Cloning shares the connection pool.
pub type HttpClient = Client<HttpConnector, Body>;

/// Build a pooled client with the given connect timeout.
pub fn build_client(connect_timeout: Duration) -> HttpClient {
    let mut connector = HttpConnector::new();
    connector.set_connect_timeout(Some(connect_timeout));
    connector.set_nodelay(true);

    Client::builder(TokioExecutor::new())
        .pool_idle_timeout(Duration::from_secs(90))
        .build(connector)
}

/// Read a response body into memory, refusing bodies above `limit` bytes.
pub async fn read_body(response: Response<Incoming>, limit: usize) -> Result<Bytes, axum::Error> {
    axum::body::to_bytes(Body::new(response.into_body()), limit).await
}

/// Whether `authority` accepts a TCP connection within `timeout`.
pub async fn accepts_connections(authority: &str, timeout: Duration) -> bool {
    matches!(
        tokio::time::timeout(timeout, TcpStream::connect(authority)).await,
        Ok(Ok(_))
    )
}
