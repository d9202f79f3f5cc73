//! RPC error taxonomy.
//!
//! Every failure of a remote call is an [`RpcError`]. Each error maps to a
//! canonical [`Code`] and to an [`ErrorCategory`], which is what the HTTP layer
//! uses to pick a status so that timeouts, client mistakes and server faults
//! stay distinguishable end to end.

use std::fmt;

use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Canonical RPC status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Code {
    Cancelled,
    Unknown,
    InvalidArgument,
    DeadlineExceeded,
    NotFound,
    AlreadyExists,
    PermissionDenied,
    ResourceExhausted,
    FailedPrecondition,
    Aborted,
    OutOfRange,
    Unimplemented,
    Internal,
    Unavailable,
    DataLoss,
    Unauthenticated,
}

/// Coarse classification of a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// The request itself was rejected; retrying it unchanged will not help.
    Client,
    /// The backend or the path to it failed.
    Server,
    /// The deadline elapsed.
    Timeout,
    /// The caller gave up.
    Cancelled,
    /// No backend could take the call.
    Unavailable,
}

impl Code {
    pub const ALL: [Code; 16] = [
        Code::Cancelled,
        Code::Unknown,
        Code::InvalidArgument,
        Code::DeadlineExceeded,
        Code::NotFound,
        Code::AlreadyExists,
        Code::PermissionDenied,
        Code::ResourceExhausted,
        Code::FailedPrecondition,
        Code::Aborted,
        Code::OutOfRange,
        Code::Unimplemented,
        Code::Internal,
        Code::Unavailable,
        Code::DataLoss,
        Code::Unauthenticated,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Code::Cancelled => "CANCELLED",
            Code::Unknown => "UNKNOWN",
            Code::InvalidArgument => "INVALID_ARGUMENT",
            Code::DeadlineExceeded => "DEADLINE_EXCEEDED",
            Code::NotFound => "NOT_FOUND",
            Code::AlreadyExists => "ALREADY_EXISTS",
            Code::PermissionDenied => "PERMISSION_DENIED",
            Code::ResourceExhausted => "RESOURCE_EXHAUSTED",
            Code::FailedPrecondition => "FAILED_PRECONDITION",
            Code::Aborted => "ABORTED",
            Code::OutOfRange => "OUT_OF_RANGE",
            Code::Unimplemented => "UNIMPLEMENTED",
            Code::Internal => "INTERNAL",
            Code::Unavailable => "UNAVAILABLE",
            Code::DataLoss => "DATA_LOSS",
            Code::Unauthenticated => "UNAUTHENTICATED",
        }
    }

    /// Parse a canonical name, case-insensitively.
    pub fn parse(name: &str) -> Option<Code> {
        Code::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(name.trim()))
    }

    /// Best-effort code for a backend reply that carried no usable error body.
    pub fn from_http_status(status: StatusCode) -> Code {
        match status {
            StatusCode::BAD_REQUEST => Code::InvalidArgument,
            StatusCode::UNAUTHORIZED => Code::Unauthenticated,
            StatusCode::FORBIDDEN => Code::PermissionDenied,
            StatusCode::NOT_FOUND => Code::NotFound,
            StatusCode::CONFLICT => Code::AlreadyExists,
            StatusCode::PRECONDITION_FAILED => Code::FailedPrecondition,
            StatusCode::TOO_MANY_REQUESTS => Code::ResourceExhausted,
            StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => Code::DeadlineExceeded,
            StatusCode::NOT_IMPLEMENTED => Code::Unimplemented,
            StatusCode::BAD_GATEWAY | StatusCode::SERVICE_UNAVAILABLE => Code::Unavailable,
            s if s.as_u16() == 499 => Code::Cancelled,
            s if s.is_client_error() => Code::InvalidArgument,
            s if s.is_server_error() => Code::Internal,
            _ => Code::Unknown,
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Code::InvalidArgument
            | Code::NotFound
            | Code::AlreadyExists
            | Code::PermissionDenied
            | Code::ResourceExhausted
            | Code::FailedPrecondition
            | Code::Aborted
            | Code::OutOfRange
            | Code::Unauthenticated => ErrorCategory::Client,
            Code::Cancelled => ErrorCategory::Cancelled,
            Code::DeadlineExceeded => ErrorCategory::Timeout,
            Code::Unavailable => ErrorCategory::Unavailable,
            Code::Unknown | Code::Unimplemented | Code::Internal | Code::DataLoss => {
                ErrorCategory::Server
            }
        }
    }
}

impl fmt::Display for Code {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error body exchanged on the wire: `{"code": "...", "message": "..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusBody {
    pub code: String,
    #[serde(default)]
    pub message: String,
}

/// Failure of a remote call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RpcError {
    /// The request context was cancelled while the call was outstanding.
    #[error("call cancelled")]
    Cancelled,

    /// The request or call deadline elapsed.
    #[error("deadline exceeded")]
    DeadlineExceeded,

    /// Discovery has no endpoint to send the call to.
    #[error("no endpoints available for '{0}'")]
    NoEndpoints(String),

    /// Connecting to or talking with the endpoint failed.
    #[error("transport error: {0}")]
    Transport(String),

    /// The exchange did not follow the wire contract.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// The backend answered with an error status.
    #[error("{code}: {message}")]
    Status { code: Code, message: String },
}

impl RpcError {
    pub fn status(code: Code, message: impl Into<String>) -> Self {
        RpcError::Status {
            code,
            message: message.into(),
        }
    }

    /// Build the error for a non-success backend reply.
    pub fn from_reply(status: StatusCode, body: &[u8]) -> Self {
        match serde_json::from_slice::<StatusBody>(body) {
            Ok(parsed) => RpcError::Status {
                code: Code::parse(&parsed.code).unwrap_or_else(|| Code::from_http_status(status)),
                message: parsed.message,
            },
            Err(_) => RpcError::Status {
                code: Code::from_http_status(status),
                message: String::from_utf8_lossy(body).trim().to_string(),
            },
        }
    }

    pub fn code(&self) -> Code {
        match self {
            RpcError::Cancelled => Code::Cancelled,
            RpcError::DeadlineExceeded => Code::DeadlineExceeded,
            RpcError::NoEndpoints(_) | RpcError::Transport(_) => Code::Unavailable,
            RpcError::Protocol(_) => Code::Internal,
            RpcError::Status { code, .. } => *code,
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            RpcError::Transport(_) | RpcError::Protocol(_) => ErrorCategory::Server,
            other => other.code().category(),
        }
    }
}
