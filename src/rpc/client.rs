//! RPC client binding for one backend service.
//!
//! # Responsibilities
//! - Resolve the service through discovery at construction and require one
//!   endpoint to accept a connection (fail fast)
//! - Keep the endpoint set fresh in the background
//! - Pick an endpoint per call and send the call over the pooled connection layer
//! - Bound every call by the caller's context and the configured call timeout
//!
//! # Design Decisions
//! - No retries: every failure goes back to the caller
//! - Startup resolution retries with backoff, a bounded number of times
//! - Refresh failures keep the last known endpoints
//! - The refresh task holds a weak reference and stops with the client

use std::sync::{Arc, Weak};
use std::time::Duration;

use axum::body::Body;
use axum::http::{header, HeaderName, HeaderValue, Method, Request};
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;
use tokio::time::{Instant, MissedTickBehavior};

use crate::config::RpcClientConfig;
use crate::discovery::{resolver_for, DiscoveryError, Resolver};
use crate::load_balancer::{balancer_for, EndpointSet, InFlightGuard};
use crate::net::{accepts_connections, build_client, read_body, HttpClient};
use crate::observability::metrics;
use crate::resilience::Backoff;
use crate::rpc::context::RequestContext;
use crate::rpc::error::{Code, RpcError};

/// Header carrying the remaining call budget in milliseconds.
pub const TIMEOUT_HEADER: &str = "x-rpc-timeout-ms";
/// Prefix of headers forwarding identity claims.
pub const CLAIM_HEADER_PREFIX: &str = "x-claim-";

const MAX_REPLY_BYTES: usize = 4 * 1024 * 1024;

/// Errors raised while building a client.
#[derive(Debug, Error)]
pub enum ConnectError {
    #[error("discovery of '{key}' failed after {attempts} attempt(s): {source}")]
    Discovery {
        key: String,
        attempts: u32,
        #[source]
        source: DiscoveryError,
    },

    #[error("no endpoints registered under '{0}'")]
    NoEndpoints(String),

    #[error("no endpoint of '{key}' accepted a connection after {attempts} attempt(s): {endpoints:?}")]
    Unreachable {
        key: String,
        attempts: u32,
        endpoints: Vec<String>,
    },
}

/// Long-lived handle to a backend service. Cloning is cheap and shares the
/// endpoint cache and the connection pool.
#[derive(Clone)]
pub struct RpcClient {
    inner: Arc<Inner>,
}

struct Inner {
    service: String,
    resolver: Arc<dyn Resolver>,
    endpoints: EndpointSet,
    http: HttpClient,
    call_timeout: Option<Duration>,
    unhealthy_threshold: usize,
}

impl RpcClient {
    /// Build a client from a configured descriptor.
    pub async fn connect(config: &RpcClientConfig) -> Result<Self, ConnectError> {
        let (resolver, key) = resolver_for(config);
        Self::with_resolver(key, resolver, config).await
    }

    /// Build a client on top of any resolver.
    pub async fn with_resolver(
        key: impl Into<String>,
        resolver: Arc<dyn Resolver>,
        config: &RpcClientConfig,
    ) -> Result<Self, ConnectError> {
        let key = key.into();
        let connect_timeout = Duration::from_millis(config.connect_timeout_ms.max(1));
        let addresses = resolve_at_startup(
            resolver.as_ref(),
            &key,
            config.resolve_attempts.max(1),
            config.resolve_backoff_ms,
            connect_timeout,
        )
        .await?;

        let endpoints = EndpointSet::new(balancer_for(config.balancer));
        if endpoints.replace(&addresses) == 0 {
            return Err(ConnectError::NoEndpoints(key));
        }

        let inner = Arc::new(Inner {
            service: key,
            resolver,
            endpoints,
            http: build_client(connect_timeout),
            call_timeout: (config.timeout_ms > 0).then(|| Duration::from_millis(config.timeout_ms)),
            unhealthy_threshold: config.unhealthy_threshold.max(1) as usize,
        });

        tracing::info!(
            service = %inner.service,
            endpoints = ?inner.endpoints.addresses(),
            balancer = ?config.balancer,
            "RPC client ready"
        );

        if config.refresh_secs > 0 {
            spawn_refresh(Arc::downgrade(&inner), Duration::from_secs(config.refresh_secs));
        }

        Ok(Self { inner })
    }

    /// Invoke `method` (e.g. `/order.Order/Create`) with a JSON request.
    pub async fn call<Req, Resp>(
        &self,
        ctx: &RequestContext,
        method: &str,
        request: &Req,
    ) -> Result<Resp, RpcError>
    where
        Req: Serialize + ?Sized + Sync,
        Resp: DeserializeOwned,
    {
        let start = Instant::now();
        let deadline = ctx.deadline_within(self.inner.call_timeout);

        let result = ctx
            .run_until(deadline, self.inner.invoke(ctx, method, request, deadline))
            .await;

        match &result {
            Ok(_) => metrics::record_rpc(method, "ok", start.into_std()),
            Err(e) => {
                tracing::debug!(
                    request_id = %ctx.request_id(),
                    method = %method,
                    error = %e,
                    "RPC call failed"
                );
                metrics::record_rpc(method, e.code().as_str(), start.into_std());
            }
        }
        result
    }

    /// Current endpoint addresses.
    pub fn endpoints(&self) -> Vec<String> {
        self.inner.endpoints.addresses()
    }

    /// Re-resolve the service now instead of waiting for the next tick.
    pub async fn refresh(&self) {
        self.inner.refresh().await;
    }
}

impl std::fmt::Debug for RpcClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RpcClient")
            .field("service", &self.inner.service)
            .field("resolver", &self.inner.resolver)
            .field("endpoints", &self.inner.endpoints.addresses())
            .field("call_timeout", &self.inner.call_timeout)
            .finish()
    }
}

impl Inner {
    async fn invoke<Req, Resp>(
        &self,
        ctx: &RequestContext,
        method: &str,
        request: &Req,
        deadline: Option<Instant>,
    ) -> Result<Resp, RpcError>
    where
        Req: Serialize + ?Sized + Sync,
        Resp: DeserializeOwned,
    {
        let payload =
            serde_json::to_vec(request).map_err(|e| RpcError::Protocol(e.to_string()))?;

        let endpoint = self
            .endpoints
            .pick()
            .ok_or_else(|| RpcError::NoEndpoints(self.service.clone()))?;

        let http_request = build_request(&endpoint, ctx, method, payload, deadline)?;

        tracing::trace!(
            request_id = %ctx.request_id(),
            endpoint = %endpoint.authority,
            method = %method,
            "Sending RPC"
        );

        let response = match self.http.request(http_request).await {
            Ok(response) => response,
            Err(e) => {
                if e.is_connect() {
                    self.record_failure(&endpoint);
                }
                return Err(RpcError::Transport(format!("{}: {}", endpoint.authority, e)));
            }
        };

        let status = response.status();
        let body = read_body(response, MAX_REPLY_BYTES)
            .await
            .map_err(|e| RpcError::Transport(format!("{}: {}", endpoint.authority, e)))?;

        if status.is_success() {
            self.record_success(&endpoint);
            return serde_json::from_slice(&body).map_err(|e| {
                RpcError::Protocol(format!("cannot decode {} reply: {}", method, e))
            });
        }

        let error = RpcError::from_reply(status, &body);
        if error.code() == Code::Unavailable {
            self.record_failure(&endpoint);
        } else {
            self.record_success(&endpoint);
        }
        Err(error)
    }

    fn record_success(&self, endpoint: &InFlightGuard) {
        if endpoint.mark_success() {
            tracing::info!(
                service = %self.service,
                endpoint = %endpoint.authority,
                "Endpoint recovered"
            );
        }
    }

    fn record_failure(&self, endpoint: &InFlightGuard) {
        if endpoint.mark_failure(self.unhealthy_threshold) {
            tracing::warn!(
                service = %self.service,
                endpoint = %endpoint.authority,
                "Endpoint ejected after consecutive failures"
            );
        }
    }

    async fn refresh(&self) {
        match self.resolver.resolve(&self.service).await {
            Ok(addresses) if !addresses.is_empty() => {
                let count = self.endpoints.replace(&addresses);
                tracing::debug!(service = %self.service, count, "Endpoints refreshed");
            }
            Ok(_) => {
                tracing::warn!(
                    service = %self.service,
                    kept = self.endpoints.len(),
                    "Discovery returned no endpoints, keeping last known set"
                );
            }
            Err(e) => {
                tracing::warn!(
                    service = %self.service,
                    error = %e,
                    kept = self.endpoints.len(),
                    "Endpoint refresh failed, keeping last known set"
                );
            }
        }
    }
}

fn build_request(
    endpoint: &InFlightGuard,
    ctx: &RequestContext,
    method: &str,
    payload: Vec<u8>,
    deadline: Option<Instant>,
) -> Result<Request<Body>, RpcError> {
    let url = endpoint
        .url_for(method)
        .map_err(|e| RpcError::Protocol(format!("bad method path '{}': {}", method, e)))?;

    let mut builder = Request::builder()
        .method(Method::POST)
        .uri(url.as_str())
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::ACCEPT, "application/json");

    if let Ok(value) = HeaderValue::from_str(ctx.request_id()) {
        builder = builder.header("x-request-id", value);
    }

    if let Some(deadline) = deadline {
        let remaining = deadline.saturating_duration_since(Instant::now());
        builder = builder.header(TIMEOUT_HEADER, remaining.as_millis().max(1).to_string());
    }

    if let Some(identity) = ctx.identity() {
        for (name, value) in identity.scalar_claims() {
            let header_name = format!("{}{}", CLAIM_HEADER_PREFIX, name.to_ascii_lowercase());
            match (
                HeaderName::try_from(header_name),
                HeaderValue::from_str(&value),
            ) {
                (Ok(name), Ok(value)) => builder = builder.header(name, value),
                _ => tracing::debug!(claim = %name, "Claim not representable as a header, skipped"),
            }
        }
    }

    builder
        .body(Body::from(payload))
        .map_err(|e| RpcError::Protocol(e.to_string()))
}

/// Why a startup attempt came back without a usable endpoint.
enum StartupMiss {
    Empty,
    Discovery(DiscoveryError),
    Unreachable(Vec<String>),
}

async fn resolve_at_startup(
    resolver: &dyn Resolver,
    key: &str,
    attempts: u32,
    backoff_ms: u64,
    connect_timeout: Duration,
) -> Result<Vec<String>, ConnectError> {
    let backoff = Backoff::new(
        Duration::from_millis(backoff_ms),
        Duration::from_millis(backoff_ms.saturating_mul(8)),
    );
    let mut last_miss = StartupMiss::Empty;

    for attempt in 1..=attempts {
        match resolver.resolve(key).await {
            Ok(addresses) if addresses.is_empty() => {
                tracing::warn!(key = %key, attempt, "No endpoints registered yet");
                last_miss = StartupMiss::Empty;
            }
            Ok(addresses) => {
                if any_reachable(&addresses, connect_timeout).await {
                    return Ok(addresses);
                }
                tracing::warn!(
                    key = %key,
                    attempt,
                    endpoints = ?addresses,
                    "No resolved endpoint accepted a connection"
                );
                last_miss = StartupMiss::Unreachable(addresses);
            }
            Err(e) => {
                tracing::warn!(key = %key, attempt, error = %e, "Discovery attempt failed");
                last_miss = StartupMiss::Discovery(e);
            }
        }

        if attempt < attempts {
            tokio::time::sleep(backoff.delay(attempt)).await;
        }
    }

    let key = key.to_string();
    Err(match last_miss {
        StartupMiss::Empty => ConnectError::NoEndpoints(key),
        StartupMiss::Discovery(source) => ConnectError::Discovery {
            key,
            attempts,
            source,
        },
        StartupMiss::Unreachable(endpoints) => ConnectError::Unreachable {
            key,
            attempts,
            endpoints,
        },
    })
}

async fn any_reachable(addresses: &[String], timeout: Duration) -> bool {
    for address in addresses {
        if accepts_connections(address, timeout).await {
            return true;
        }
    }
    false
}

fn spawn_refresh(inner: Weak<Inner>, every: Duration) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately; startup already resolved.
        ticker.tick().await;

        loop {
            ticker.tick().await;
            let Some(inner) = inner.upgrade() else {
                break;
            };
            inner.refresh().await;
        }
        tracing::debug!("Endpoint refresh task stopped");
    });
}
