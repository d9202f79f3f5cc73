//! Per-request context threaded through handler, logic and RPC binding.
//!
//! Carries the request id, an optional deadline, a cancellation token and the
//! caller identity. Clones share the same cancellation signal.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde_json::{Map, Value};
use tokio::time::{sleep_until, Instant};
use tokio_util::sync::CancellationToken;

use crate::rpc::error::RpcError;

/// Claims of an authenticated caller.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Identity {
    claims: Map<String, Value>,
}

impl Identity {
    pub fn new(claims: Map<String, Value>) -> Self {
        Self { claims }
    }

    pub fn claim(&self, name: &str) -> Option<&Value> {
        self.claims.get(name)
    }

    pub fn claims(&self) -> &Map<String, Value> {
        &self.claims
    }

    /// String, number and bool claims rendered as text. Objects, arrays and
    /// nulls are skipped.
    pub fn scalar_claims(&self) -> impl Iterator<Item = (&str, String)> + '_ {
        self.claims.iter().filter_map(|(name, value)| {
            let text = match value {
                Value::String(s) => s.clone(),
                Value::Number(n) => n.to_string(),
                Value::Bool(b) => b.to_string(),
                _ => return None,
            };
            Some((name.as_str(), text))
        })
    }
}

#[derive(Debug, Clone)]
pub struct RequestContext {
    request_id: Arc<str>,
    deadline: Option<Instant>,
    cancel: CancellationToken,
    identity: Option<Arc<Identity>>,
}

impl RequestContext {
    /// A context with no deadline, no identity and a fresh cancellation token.
    pub fn new(request_id: impl Into<String>) -> Self {
        Self {
            request_id: Arc::from(request_id.into()),
            deadline: None,
            cancel: CancellationToken::new(),
            identity: None,
        }
    }

    /// Bound the context by `timeout` from now. An earlier deadline is kept.
    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Bound the context by `deadline`. An earlier deadline is kept.
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = earliest(self.deadline, Some(deadline));
        self
    }

    pub fn with_identity(mut self, identity: Identity) -> Self {
        self.identity = Some(Arc::new(identity));
        self
    }

    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Time left before the deadline, zero once it has passed.
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|d| d.saturating_duration_since(Instant::now()))
    }

    pub fn identity(&self) -> Option<&Identity> {
        self.identity.as_deref()
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// The context deadline, tightened by `bound` from now if given.
    pub fn deadline_within(&self, bound: Option<Duration>) -> Option<Instant> {
        earliest(self.deadline, bound.map(|b| Instant::now() + b))
    }

    /// Drive `fut` until it finishes, the context is cancelled, or the context
    /// deadline passes.
    pub async fn run<T, F>(&self, fut: F) -> Result<T, RpcError>
    where
        F: Future<Output = Result<T, RpcError>>,
    {
        self.run_until(self.deadline, fut).await
    }

    /// Like [`run`](Self::run) with an explicit deadline.
    pub async fn run_until<T, F>(&self, deadline: Option<Instant>, fut: F) -> Result<T, RpcError>
    where
        F: Future<Output = Result<T, RpcError>>,
    {
        if self.cancel.is_cancelled() {
            return Err(RpcError::Cancelled);
        }
        if deadline.is_some_and(|d| d <= Instant::now()) {
            return Err(RpcError::DeadlineExceeded);
        }

        let expiry = async move {
            match deadline {
                Some(d) => sleep_until(d).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(RpcError::Cancelled),
            _ = expiry => Err(RpcError::DeadlineExceeded),
            result = fut => result,
        }
    }
}

fn earliest(a: Option<Instant>, b: Option<Instant>) -> Option<Instant> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (a, b) => a.or(b),
    }
}
