//! Bearer token verification.
//!
//! Tokens are HS256 JWTs signed with `auth.access_secret` and must carry
//! `exp`. The decoded claim set is attached to the request as an
//! [`Identity`] for the `RequestContext` extractor to pick up.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{header, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde_json::{Map, Value};

use crate::config::AuthConfig;
use crate::http::response::ApiError;
use crate::rpc::Identity;

/// Verifier shared by every request.
#[derive(Clone)]
pub struct BearerAuth {
    key: DecodingKey,
    validation: Validation,
}

impl BearerAuth {
    /// `None` when no secret is configured.
    pub fn from_config(config: &AuthConfig) -> Option<Self> {
        config.enabled().then(|| Self {
            key: DecodingKey::from_secret(config.access_secret.as_bytes()),
            validation: Validation::new(Algorithm::HS256),
        })
    }

    pub fn verify(&self, token: &str) -> Result<Identity, ApiError> {
        decode::<Map<String, Value>>(token, &self.key, &self.validation)
            .map(|data| Identity::new(data.claims))
            .map_err(|e| ApiError::Unauthorized(format!("invalid token: {e}")))
    }
}

impl std::fmt::Debug for BearerAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BearerAuth").finish_non_exhaustive()
    }
}

fn bearer_token(request: &Request<Body>) -> Option<&str> {
    request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer ").or_else(|| v.strip_prefix("bearer ")))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

pub async fn require_bearer(
    State(auth): State<Arc<BearerAuth>>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let Some(token) = bearer_token(&request) else {
        return ApiError::Unauthorized("missing bearer token".into()).into_response();
    };

    match auth.verify(token) {
        Ok(identity) => {
            request.extensions_mut().insert(identity);
            next.run(request).await
        }
        Err(e) => {
            tracing::debug!(error = %e, "Rejected bearer token");
            e.into_response()
        }
    }
}
