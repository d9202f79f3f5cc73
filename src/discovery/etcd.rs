//! etcd registry lookup through the v3 JSON gateway.
//!
//! # Responsibilities
//! - Range-read every key under `<service key>/` from the registry
//! - Decode the base64 values into endpoint addresses
//! - Fail over across registry hosts in configured order
//!
//! Services register one key per instance (`order.rpc/<lease id>`), with the
//! instance address as the value.

use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Method, Request};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use tokio::time::timeout;

use crate::discovery::{DiscoveryError, Resolver};
use crate::net::{read_body, HttpClient};

const RANGE_PATH: &str = "/v3/kv/range";
const MAX_RESPONSE_BYTES: usize = 1024 * 1024;

#[derive(Debug, Serialize)]
struct RangeRequest {
    key: String,
    range_end: String,
}

#[derive(Debug, Deserialize)]
struct RangeResponse {
    #[serde(default)]
    kvs: Vec<KeyValue>,
}

#[derive(Debug, Deserialize)]
struct KeyValue {
    #[serde(default)]
    value: String,
}

/// Resolver backed by an etcd cluster.
#[derive(Clone)]
pub struct EtcdResolver {
    hosts: Vec<String>,
    client: HttpClient,
    request_timeout: Duration,
}

impl EtcdResolver {
    pub fn new(hosts: Vec<String>, client: HttpClient, request_timeout: Duration) -> Self {
        Self {
            hosts,
            client,
            request_timeout,
        }
    }

    async fn range(&self, host: &str, body: &[u8]) -> Result<Vec<String>, DiscoveryError> {
        let request = Request::builder()
            .method(Method::POST)
            .uri(format!("http://{}{}", host, RANGE_PATH))
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_vec()))
            .map_err(|e| DiscoveryError::Unreachable(e.to_string()))?;

        let response = self
            .client
            .request(request)
            .await
            .map_err(|e| DiscoveryError::Unreachable(e.to_string()))?;

        let status = response.status();
        let bytes = read_body(response, MAX_RESPONSE_BYTES)
            .await
            .map_err(|e| DiscoveryError::Unreachable(e.to_string()))?;

        if !status.is_success() {
            return Err(DiscoveryError::Unreachable(format!(
                "{} answered {}",
                host, status
            )));
        }

        let parsed: RangeResponse = serde_json::from_slice(&bytes)
            .map_err(|e| DiscoveryError::Malformed(e.to_string()))?;

        decode_values(parsed.kvs)
    }
}

#[async_trait]
impl Resolver for EtcdResolver {
    async fn resolve(&self, key: &str) -> Result<Vec<String>, DiscoveryError> {
        let prefix = format!("{}/", key);
        let body = serde_json::to_vec(&RangeRequest {
            key: STANDARD.encode(prefix.as_bytes()),
            range_end: STANDARD.encode(prefix_end(prefix.as_bytes())),
        })
        .map_err(|e| DiscoveryError::Malformed(e.to_string()))?;

        let mut last_error = DiscoveryError::Unreachable("no registry hosts configured".into());
        for (i, host) in self.hosts.iter().enumerate() {
            match timeout(self.request_timeout, self.range(host, &body)).await {
                Ok(Ok(endpoints)) => {
                    tracing::debug!(host = %host, key = %key, count = endpoints.len(), "Resolved endpoints");
                    return Ok(endpoints);
                }
                Ok(Err(e)) => {
                    tracing::warn!(host_idx = i, host = %host, error = %e, "Registry error, trying next host");
                    last_error = e;
                }
                Err(_) => {
                    tracing::warn!(host_idx = i, host = %host, "Registry timeout, trying next host");
                    last_error = DiscoveryError::Unreachable(format!("{} timed out", host));
                }
            }
        }
        Err(last_error)
    }
}

impl std::fmt::Debug for EtcdResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EtcdResolver")
            .field("hosts", &self.hosts)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

/// Smallest key greater than every key starting with `prefix`.
pub fn prefix_end(prefix: &[u8]) -> Vec<u8> {
    let mut end = prefix.to_vec();
    while let Some(last) = end.pop() {
        if last < 0xff {
            end.push(last + 1);
            return end;
        }
    }
    // Every byte was 0xff: range to the end of the keyspace.
    vec![0]
}

fn decode_values(kvs: Vec<KeyValue>) -> Result<Vec<String>, DiscoveryError> {
    let mut endpoints = Vec::with_capacity(kvs.len());
    for kv in kvs {
        let raw = STANDARD
            .decode(kv.value.as_bytes())
            .map_err(|e| DiscoveryError::Malformed(format!("value is not base64: {}", e)))?;
        let address = String::from_utf8(raw)
            .map_err(|e| DiscoveryError::Malformed(format!("value is not utf-8: {}", e)))?;
        let address = address.trim().to_string();
        if !address.is_empty() && !endpoints.contains(&address) {
            endpoints.push(address);
        }
    }
    endpoints.sort();
    Ok(endpoints)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefix_end() {
        assert_eq!(prefix_end(b"order.rpc/"), b"order.rpc0".to_vec());
        assert_eq!(prefix_end(&[b'a', 0xff]), b"b".to_vec());
        assert_eq!(prefix_end(&[0xff, 0xff]), vec![0]);
    }

    #[test]
    fn test_decode_values() {
        let kvs = vec![
            KeyValue { value: STANDARD.encode("127.0.0.1:8081") },
            KeyValue { value: STANDARD.encode("127.0.0.1:8080") },
            KeyValue { value: STANDARD.encode("127.0.0.1:8080") },
        ];
        assert_eq!(
            decode_values(kvs).unwrap(),
            vec!["127.0.0.1:8080".to_string(), "127.0.0.1:8081".to_string()]
        );
    }

    #[test]
    fn test_decode_rejects_garbage() {
        let kvs = vec![KeyValue { value: "%%%".into() }];
        assert!(matches!(decode_values(kvs), Err(DiscoveryError::Malformed(_))));
    }

    #[test]
    fn test_empty_range_response() {
        let parsed: RangeResponse = serde_json::from_str(r#"{"header":{"revision":"7"}}"#).unwrap();
        assert!(parsed.kvs.is_empty());
    }
}
