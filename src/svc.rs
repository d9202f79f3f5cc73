//! Service context: configuration plus the initialized remote clients.
//!
//! Built once at startup, then shared read-only by every request through
//! `Arc<ServiceContext>`. Nothing in here is mutated after construction; the
//! RPC clients synchronize their own internal state.

use std::sync::Arc;

use thiserror::Error;

use crate::config::loader::join_errors;
use crate::config::validation::validate_config;
use crate::config::{GatewayConfig, ValidationError};
use crate::rpc::{ConnectError, OrderClient, OrderRpc, RpcClient};

/// Startup failure. Any of these stops the process before it serves traffic.
#[derive(Debug, Error)]
pub enum InitError {
    #[error("invalid configuration: {}", join_errors(.0))]
    Config(Vec<ValidationError>),

    #[error("order rpc: {0}")]
    OrderRpc(#[from] ConnectError),
}

pub struct ServiceContext {
    pub config: GatewayConfig,
    pub order_rpc: Arc<dyn OrderRpc>,
}

impl ServiceContext {
    /// Validate `config` and connect every remote client it describes.
    pub async fn initialize(config: GatewayConfig) -> Result<Self, InitError> {
        validate_config(&config).map_err(InitError::Config)?;

        let order_rpc = RpcClient::connect(&config.order_rpc).await?;

        Ok(Self::new(config, Arc::new(OrderClient::new(order_rpc))))
    }

    /// Assemble a context from already-built clients.
    pub fn new(config: GatewayConfig, order_rpc: Arc<dyn OrderRpc>) -> Self {
        Self { config, order_rpc }
    }
}

impl std::fmt::Debug for ServiceContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceContext")
            .field("name", &self.config.name)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RpcClientConfig;

    #[tokio::test]
    async fn test_initialize_rejects_missing_backend() {
        let err = ServiceContext::initialize(GatewayConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(err, InitError::Config(_)));
        assert!(err.to_string().contains("neither etcd, endpoints nor target"));
    }

    #[tokio::test]
    async fn test_initialize_fails_fast_on_unreachable_registry() {
        let mut config = GatewayConfig::default();
        config.order_rpc = RpcClientConfig::with_etcd(vec!["127.0.0.1:9".into()], "order.rpc");
        config.order_rpc.resolve_attempts = 2;
        config.order_rpc.resolve_backoff_ms = 1;
        config.order_rpc.connect_timeout_ms = 200;

        let err = ServiceContext::initialize(config).await.unwrap_err();
        assert!(matches!(
            err,
            InitError::OrderRpc(ConnectError::Discovery { attempts: 2, .. })
        ));
    }

    #[tokio::test]
    async fn test_initialize_fails_when_no_endpoint_answers() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let dead = listener.local_addr().unwrap().to_string();
        drop(listener);

        let mut config = GatewayConfig::default();
        config.order_rpc = RpcClientConfig::with_endpoints([dead.as_str()]);
        config.order_rpc.refresh_secs = 0;
        config.order_rpc.resolve_attempts = 2;
        config.order_rpc.resolve_backoff_ms = 1;
        config.order_rpc.connect_timeout_ms = 200;

        let err = ServiceContext::initialize(config).await.unwrap_err();
        assert!(
            matches!(
                err,
                InitError::OrderRpc(ConnectError::Unreachable { attempts: 2, .. })
            ),
            "got {err:?}"
        );
    }
}
