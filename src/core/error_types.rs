//! Shared constants for structured API errors.
//!
//! The gateway only ever emits these three error types in its own error
//! bodies; upstream error bodies are relayed untouched.

pub const ERROR_TYPE_INVALID_REQUEST: &str = "invalid_request_error";
pub const ERROR_TYPE_UPSTREAM_CONNECTION: &str = "upstream_connection_error";
pub const ERROR_TYPE_UPSTREAM: &str = "upstream_error";

/// Header used to correlate a caller request with the upstream request.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Sanitized messages surfaced to callers for transport failures.
pub const MESSAGE_UPSTREAM_TIMEOUT: &str = "Upstream request timed out";
pub const MESSAGE_UPSTREAM_CONNECT: &str = "Failed to connect to upstream";
pub const MESSAGE_UPSTREAM_FAILED: &str = "Upstream request failed";
