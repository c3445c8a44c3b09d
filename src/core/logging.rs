//! Logging utilities with request context support.
//!
//! The request-id middleware scopes [`REQUEST_ID`] around each request so
//! that log lines deep in the call stack can be correlated without passing
//! the id through every function.

use axum::http::HeaderMap;

use crate::core::error_types::REQUEST_ID_HEADER;

/// Maximum accepted length of a caller-supplied request id.
const MAX_REQUEST_ID_LEN: usize = 128;

tokio::task_local! {
    /// Task-local storage for the current request ID.
    pub static REQUEST_ID: String;
}

/// Get the current request ID from context, if set.
///
/// Returns an empty string if no request ID is set.
pub fn get_request_id() -> String {
    REQUEST_ID.try_with(|id| id.clone()).unwrap_or_default()
}

/// Generate a short random request ID (12 hex characters).
pub fn generate_request_id() -> String {
    let mut id = uuid::Uuid::new_v4().simple().to_string();
    id.truncate(12);
    id
}

/// Request ID supplied by the caller, if it is usable.
///
/// Values that are empty, too long, or contain non-visible characters are
/// ignored so they cannot be used to inject into log lines or headers.
pub fn inherited_request_id(headers: &HeaderMap) -> Option<String> {
    headers
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|id| !id.is_empty() && id.len() <= MAX_REQUEST_ID_LEN)
        .filter(|id| id.chars().all(|c| c.is_ascii_graphic()))
        .map(str::to_string)
}

/// Inherited request ID, or a freshly generated one.
pub fn resolve_request_id(headers: &HeaderMap) -> String {
    inherited_request_id(headers).unwrap_or_else(generate_request_id)
}
