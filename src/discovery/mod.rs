//! Service discovery subsystem.
//!
//! # Data Flow
//! ```text
//! RpcClientConfig
//!     → resolver_for() picks a strategy:
//!         - etcd.rs (prefix range lookup in an etcd registry)
//!         - static_list.rs (endpoints / target from config)
//!     → resolve(key) → Vec<"host:port">
//!     → load_balancer::EndpointSet
//! ```
//!
//! # Design Decisions
//! - The RPC binding depends only on the `Resolver` trait
//! - Resolvers never cache; the binding owns the endpoint cache
//! - An empty answer is not an error here; the caller decides what it means

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::config::RpcClientConfig;
use crate::net::build_client;

pub mod etcd;
pub mod static_list;

pub use etcd::EtcdResolver;
pub use static_list::StaticResolver;

/// Errors raised while looking up endpoints.
#[derive(Debug, Clone, Error)]
pub enum DiscoveryError {
    /// No registry host answered.
    #[error("registry unreachable: {0}")]
    Unreachable(String),

    /// A registry answered with something that could not be decoded.
    #[error("malformed registry response: {0}")]
    Malformed(String),
}

/// Looks up the live endpoints of a named service.
#[async_trait]
pub trait Resolver: Send + Sync + fmt::Debug {
    /// Return the `host:port` addresses currently registered under `key`.
    async fn resolve(&self, key: &str) -> Result<Vec<String>, DiscoveryError>;
}

/// Build the resolver described by a client config, with the key to look up.
///
/// Precedence: etcd, then `endpoints`, then `target`.
pub fn resolver_for(config: &RpcClientConfig) -> (Arc<dyn Resolver>, String) {
    if let Some(etcd) = &config.etcd {
        let connect_timeout = Duration::from_millis(config.connect_timeout_ms.max(1));
        let resolver = EtcdResolver::new(
            etcd.hosts.clone(),
            build_client(connect_timeout),
            connect_timeout * 3,
        );
        return (Arc::new(resolver), etcd.key.clone());
    }

    let endpoints = if config.endpoints.is_empty() {
        config.target.iter().cloned().collect()
    } else {
        config.endpoints.clone()
    };
    (Arc::new(StaticResolver::new(endpoints)), "static".to_string())
}
