//! Application-level error type returned by handlers.
//!
//! Every variant renders as a plain-text body with the matching HTTP status,
//! since the proxy's callers are browsers rather than API clients.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};

/// An error that a handler can return; converts directly to an HTTP response.
#[derive(Debug)]
pub enum AppError {
    /// The request itself was unusable (e.g. no `addr`).
    BadRequest(String),
    /// The WEB/1 server could not be reached or answered with an error status.
    BadGateway(String),
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::BadGateway(msg) => (StatusCode::BAD_GATEWAY, msg),
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };
        (status, message).into_response()
    }
}

impl From<tokio::task::JoinError> for AppError {
    fn from(e: tokio::task::JoinError) -> Self {
        AppError::Internal(format!("fetch task failed: {e}"))
    }
}
