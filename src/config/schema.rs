//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the order gateway.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Service name, used in logs.
    pub name: String,

    /// Listener configuration (bind address, body limits).
    pub listener: ListenerConfig,

    /// Bearer token verification settings.
    pub auth: AuthConfig,

    /// Connection descriptor for the backend order service.
    pub order_rpc: RpcClientConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            name: "order-api".to_string(),
            listener: ListenerConfig::default(),
            auth: AuthConfig::default(),
            order_rpc: RpcClientConfig::default(),
            timeouts: TimeoutConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8888").
    pub bind_address: String,

    /// Maximum accepted request body size in bytes.
    pub max_body_bytes: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8888".to_string(),
            max_body_bytes: 64 * 1024,
        }
    }
}

/// JWT settings shared with the token issuer.
#[derive(Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AuthConfig {
    /// HMAC secret used to verify bearer tokens. Empty disables verification.
    pub access_secret: String,

    /// Token lifetime in seconds.
    pub access_expire: i64,
}

impl AuthConfig {
    /// Whether bearer verification is switched on.
    pub fn enabled(&self) -> bool {
        !self.access_secret.is_empty()
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            access_secret: String::new(),
            access_expire: 86_400,
        }
    }
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("access_secret", &if self.enabled() { "<redacted>" } else { "" })
            .field("access_expire", &self.access_expire)
            .finish()
    }
}

/// Load-balancing policy used to pick an endpoint per call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BalancerKind {
    RoundRobin,
    LeastConn,
    /// Power of two choices on in-flight calls.
    #[default]
    P2c,
}

/// etcd discovery settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EtcdConfig {
    /// Registry addresses (`host:port` of the etcd JSON gateway).
    pub hosts: Vec<String>,

    /// Key the backend registers itself under.
    pub key: String,
}

/// RPC client descriptor for one backend service.
///
/// Exactly one addressing form is used, in this order of precedence:
/// `etcd`, `endpoints`, `target`.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RpcClientConfig {
    /// Discovery through an etcd registry.
    pub etcd: Option<EtcdConfig>,

    /// Static endpoint list (`host:port`).
    pub endpoints: Vec<String>,

    /// Single static endpoint.
    pub target: Option<String>,

    /// Per-call timeout in milliseconds (0 = bounded by the request only).
    pub timeout_ms: u64,

    /// Connection establishment timeout in milliseconds.
    pub connect_timeout_ms: u64,

    /// Endpoint selection policy.
    pub balancer: BalancerKind,

    /// Resolution attempts at startup before giving up.
    pub resolve_attempts: u32,

    /// Base delay between startup resolution attempts.
    pub resolve_backoff_ms: u64,

    /// Endpoint refresh interval in seconds (0 disables refresh).
    pub refresh_secs: u64,

    /// Consecutive failures before an endpoint is ejected from selection.
    pub unhealthy_threshold: u32,
}

impl RpcClientConfig {
    /// Descriptor pointing at a fixed list of endpoints.
    pub fn with_endpoints<I, S>(endpoints: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            endpoints: endpoints.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Descriptor pointing at an etcd registry.
    pub fn with_etcd(hosts: Vec<String>, key: impl Into<String>) -> Self {
        Self {
            etcd: Some(EtcdConfig {
                hosts,
                key: key.into(),
            }),
            ..Self::default()
        }
    }

    /// True if some addressing form is present.
    pub fn has_target(&self) -> bool {
        self.etcd.is_some() || !self.endpoints.is_empty() || self.target.is_some()
    }
}

impl Default for RpcClientConfig {
    fn default() -> Self {
        Self {
            etcd: None,
            endpoints: Vec::new(),
            target: None,
            timeout_ms: 2000,
            connect_timeout_ms: 1000,
            balancer: BalancerKind::default(),
            resolve_attempts: 3,
            resolve_backoff_ms: 200,
            refresh_secs: 10,
            unhealthy_threshold: 3,
        }
    }
}

/// Timeout configuration for inbound requests.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Total time budget for one inbound request in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Emit logs as JSON lines instead of the human format.
    pub json_logs: bool,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
