//! Error types and handling for the gateway.
//!
//! This module provides a unified error type [`AppError`] for everything the
//! gateway itself answers with, and implements the HTTP response conversion
//! producing `{"error": {"type": ..., "message": ...}}` bodies.

use crate::core::error_types::{
    ERROR_TYPE_INVALID_REQUEST, ERROR_TYPE_UPSTREAM, ERROR_TYPE_UPSTREAM_CONNECTION,
    MESSAGE_UPSTREAM_TIMEOUT,
};
use axum::{
    body::Body,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Main error type for request handling.
#[derive(Error, Debug)]
pub enum AppError {
    /// Client provided a body that is not a JSON object
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Upstream could not be reached (DNS, TCP, TLS, broken connection).
    /// The message is already sanitized for callers.
    #[error("Upstream connection error: {0}")]
    UpstreamConnection(String),

    /// Non-streaming request exceeded the configured deadline
    #[error("Upstream request timed out")]
    UpstreamTimeout,

    /// Upstream answered with an error status and no body
    #[error("Upstream returned HTTP {0} with an empty body")]
    EmptyUpstreamError(StatusCode),

    /// Client disconnected before the request completed.
    /// Nobody reads the response, so it carries no body.
    #[error("Client closed request")]
    ClientDisconnect,
}

impl AppError {
    /// HTTP status the error is answered with.
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::UpstreamConnection(_) => StatusCode::BAD_GATEWAY,
            AppError::UpstreamTimeout => StatusCode::GATEWAY_TIMEOUT,
            AppError::EmptyUpstreamError(status) => *status,
            AppError::ClientDisconnect => StatusCode::REQUEST_TIMEOUT,
        }
    }

    /// Error `type` field, drawn from [`crate::core::error_types`].
    pub fn error_type(&self) -> &'static str {
        match self {
            AppError::BadRequest(_) | AppError::ClientDisconnect => ERROR_TYPE_INVALID_REQUEST,
            AppError::UpstreamConnection(_) | AppError::UpstreamTimeout => {
                ERROR_TYPE_UPSTREAM_CONNECTION
            }
            AppError::EmptyUpstreamError(_) => ERROR_TYPE_UPSTREAM,
        }
    }

    fn message(&self) -> String {
        match self {
            AppError::BadRequest(msg) => msg.clone(),
            AppError::UpstreamConnection(msg) => msg.clone(),
            AppError::UpstreamTimeout => MESSAGE_UPSTREAM_TIMEOUT.to_string(),
            AppError::EmptyUpstreamError(status) => {
                format!("Upstream returned HTTP {} with an empty body", status.as_u16())
            }
            AppError::ClientDisconnect => "Client closed request".to_string(),
        }
    }
}

/// Build the gateway's error body.
pub fn error_body(error_type: &str, message: &str) -> serde_json::Value {
    json!({
        "error": {
            "type": error_type,
            "message": message
        }
    })
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        if matches!(self, AppError::ClientDisconnect) {
            tracing::debug!("Client disconnected before request completed");
            let mut response = Response::new(Body::empty());
            *response.status_mut() = status;
            return response;
        }

        let body = error_body(self.error_type(), &self.message());
        (status, Json(body)).into_response()
    }
}

/// Convenience type alias for Results using [`AppError`].
pub type Result<T> = std::result::Result<T, AppError>;
