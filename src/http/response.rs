//! Error responses of the public API.
//!
//! Every failure leaves the gateway as `{"code": "...", "message": "..."}` so
//! clients can tell a bad request from an unavailable backend from a timeout.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

use crate::rpc::{Code, RpcError, StatusBody};

/// Code reported for bodies the gateway could not decode.
pub const INVALID_REQUEST: &str = "INVALID_REQUEST";
/// Code reported for bodies above `listener.max_body_bytes`.
pub const PAYLOAD_TOO_LARGE: &str = "PAYLOAD_TOO_LARGE";

/// Non-standard status for requests the client abandoned.
const CLIENT_CLOSED_REQUEST: u16 = 499;

#[derive(Debug, Error)]
pub enum ApiError {
    /// Body was not a well-formed `CreateRequest`.
    #[error("{0}")]
    Decode(String),

    #[error("{0}")]
    TooLarge(String),

    /// Missing or invalid bearer token.
    #[error("{0}")]
    Unauthorized(String),

    #[error(transparent)]
    Rpc(#[from] RpcError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Decode(_) => StatusCode::BAD_REQUEST,
            ApiError::TooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Rpc(RpcError::Transport(_) | RpcError::Protocol(_)) => StatusCode::BAD_GATEWAY,
            ApiError::Rpc(err) => status_for_code(err.code()),
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ApiError::Decode(_) => INVALID_REQUEST,
            ApiError::TooLarge(_) => PAYLOAD_TOO_LARGE,
            ApiError::Unauthorized(_) => Code::Unauthenticated.as_str(),
            ApiError::Rpc(err) => err.code().as_str(),
        }
    }

    fn message(&self) -> String {
        match self {
            ApiError::Rpc(RpcError::Status { message, .. }) => message.clone(),
            other => other.to_string(),
        }
    }
}

fn status_for_code(code: Code) -> StatusCode {
    match code {
        Code::InvalidArgument | Code::FailedPrecondition | Code::OutOfRange => {
            StatusCode::BAD_REQUEST
        }
        Code::Unauthenticated => StatusCode::UNAUTHORIZED,
        Code::PermissionDenied => StatusCode::FORBIDDEN,
        Code::NotFound => StatusCode::NOT_FOUND,
        Code::AlreadyExists | Code::Aborted => StatusCode::CONFLICT,
        Code::ResourceExhausted => StatusCode::TOO_MANY_REQUESTS,
        Code::Cancelled => {
            StatusCode::from_u16(CLIENT_CLOSED_REQUEST).unwrap_or(StatusCode::REQUEST_TIMEOUT)
        }
        Code::Unimplemented => StatusCode::NOT_IMPLEMENTED,
        Code::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
        Code::DeadlineExceeded => StatusCode::GATEWAY_TIMEOUT,
        Code::Unknown | Code::Internal | Code::DataLoss => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        match rejection.status() {
            StatusCode::PAYLOAD_TOO_LARGE => ApiError::TooLarge(rejection.body_text()),
            _ => ApiError::Decode(rejection.body_text()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = StatusBody {
            code: self.code().to_string(),
            message: self.message(),
        };
        (self.status(), Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status_of(err: RpcError) -> u16 {
        ApiError::Rpc(err).status().as_u16()
    }

    #[test]
    fn test_categories_map_to_distinct_statuses() {
        assert_eq!(status_of(RpcError::status(Code::InvalidArgument, "bad")), 400);
        assert_eq!(status_of(RpcError::status(Code::NotFound, "no product")), 404);
        assert_eq!(status_of(RpcError::status(Code::AlreadyExists, "dup")), 409);
        assert_eq!(status_of(RpcError::status(Code::Internal, "boom")), 500);
        assert_eq!(status_of(RpcError::NoEndpoints("order.rpc".into())), 503);
        assert_eq!(status_of(RpcError::status(Code::Unavailable, "down")), 503);
        assert_eq!(status_of(RpcError::Transport("refused".into())), 502);
        assert_eq!(status_of(RpcError::Protocol("garbage".into())), 502);
        assert_eq!(status_of(RpcError::DeadlineExceeded), 504);
        assert_eq!(status_of(RpcError::Cancelled), 499);
        assert_eq!(status_of(RpcError::status(Code::Unimplemented, "")), 501);
    }

    #[test]
    fn test_body_keeps_remote_code_and_message() {
        let err = ApiError::Rpc(RpcError::status(Code::FailedPrecondition, "sold out"));
        assert_eq!(err.code(), "FAILED_PRECONDITION");
        assert_eq!(err.message(), "sold out");
    }

    #[test]
    fn test_decode_error_code() {
        let err = ApiError::Decode("missing field `pid`".into());
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.code(), INVALID_REQUEST);
    }
}
