//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check that the backend descriptor names something to call
//! - Validate value ranges (timeouts > 0, addresses parse)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GatewayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::{GatewayConfig, RpcClientConfig};

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("listener.bind_address '{0}' is not a socket address")]
    InvalidBindAddress(String),

    #[error("{0}: neither etcd, endpoints nor target is configured")]
    MissingTarget(&'static str),

    #[error("{0}.etcd.hosts must not be empty")]
    EmptyEtcdHosts(&'static str),

    #[error("{0}.etcd.key must not be empty")]
    EmptyEtcdKey(&'static str),

    #[error("{section}: '{address}' is not a host:port address")]
    InvalidEndpoint {
        section: &'static str,
        address: String,
    },

    #[error("{section}.{field} must be greater than zero")]
    NotPositive {
        section: &'static str,
        field: &'static str,
    },
}

/// Validate a full gateway configuration.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidBindAddress(
            config.listener.bind_address.clone(),
        ));
    }

    if config.listener.max_body_bytes == 0 {
        errors.push(ValidationError::NotPositive {
            section: "listener",
            field: "max_body_bytes",
        });
    }

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::NotPositive {
            section: "timeouts",
            field: "request_secs",
        });
    }

    if config.auth.enabled() && config.auth.access_expire <= 0 {
        errors.push(ValidationError::NotPositive {
            section: "auth",
            field: "access_expire",
        });
    }

    validate_rpc_client("order_rpc", &config.order_rpc, &mut errors);

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Validate one RPC client descriptor, appending problems to `errors`.
pub fn validate_rpc_client(
    section: &'static str,
    config: &RpcClientConfig,
    errors: &mut Vec<ValidationError>,
) {
    if !config.has_target() {
        errors.push(ValidationError::MissingTarget(section));
    }

    if let Some(etcd) = &config.etcd {
        if etcd.hosts.is_empty() {
            errors.push(ValidationError::EmptyEtcdHosts(section));
        }
        if etcd.key.trim().is_empty() {
            errors.push(ValidationError::EmptyEtcdKey(section));
        }
        for host in &etcd.hosts {
            check_authority(section, host, errors);
        }
    }

    for endpoint in config.endpoints.iter().chain(config.target.iter()) {
        check_authority(section, endpoint, errors);
    }

    if config.resolve_attempts == 0 {
        errors.push(ValidationError::NotPositive {
            section,
            field: "resolve_attempts",
        });
    }

    if config.unhealthy_threshold == 0 {
        errors.push(ValidationError::NotPositive {
            section,
            field: "unhealthy_threshold",
        });
    }
}

/// Accepts `host:port` with a non-empty host and an explicit port.
pub fn is_authority(address: &str) -> bool {
    if address.contains('/') {
        return false;
    }
    let Some((_, port)) = address.rsplit_once(':') else {
        return false;
    };
    if port.parse::<u16>().is_err() {
        return false;
    }
    url::Url::parse(&format!("http://{}", address))
        .map(|url| url.host_str().is_some_and(|h| !h.is_empty()))
        .unwrap_or(false)
}

fn check_authority(section: &'static str, address: &str, errors: &mut Vec<ValidationError>) {
    if !is_authority(address) {
        errors.push(ValidationError::InvalidEndpoint {
            section,
            address: address.to_string(),
        });
    }
}
