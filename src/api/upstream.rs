//! Upstream request construction and response classification helpers.
//!
//! Everything that touches the bearer token lives here, so the masking rules
//! are applied in one place.

use crate::core::credential::{mask_secret, Credential};
use crate::core::error::AppError;
use crate::core::error_types::{
    MESSAGE_UPSTREAM_CONNECT, MESSAGE_UPSTREAM_FAILED, REQUEST_ID_HEADER,
};
use axum::{
    body::Body,
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use serde_json::{json, Map, Value};
use std::time::Duration;

pub const ACCEPT_EVENT_STREAM: &str = "text/event-stream";
pub const ACCEPT_JSON: &str = "application/json";

/// Create the shared upstream HTTP client.
///
/// No client-level timeout is configured: deadlines are enforced per request
/// by the forwarding engine, and streams may legitimately run for a long time.
pub fn build_http_client(verify_ssl: bool) -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder()
        .danger_accept_invalid_certs(!verify_ssl)
        .pool_max_idle_per_host(100)
        .pool_idle_timeout(Duration::from_secs(90))
        .tcp_keepalive(Duration::from_secs(60))
        .http2_keep_alive_interval(Duration::from_secs(30))
        .http2_keep_alive_timeout(Duration::from_secs(10))
        .build()
}

fn accept_for(streaming: bool) -> &'static str {
    if streaming {
        ACCEPT_EVENT_STREAM
    } else {
        ACCEPT_JSON
    }
}

/// Build the upstream request with bearer auth and correlation headers.
pub fn build_upstream_request(
    http_client: &reqwest::Client,
    url: &str,
    payload: &Map<String, Value>,
    credential: &Credential,
    request_id: &str,
    streaming: bool,
) -> reqwest::RequestBuilder {
    http_client
        .post(url)
        .bearer_auth(credential.token())
        .header(REQUEST_ID_HEADER, request_id)
        .header("Accept", accept_for(streaming))
        .json(payload)
}

/// Masked upstream request headers for debug logging.
pub fn build_debug_headers(
    url: &str,
    credential: &Credential,
    request_id: &str,
    streaming: bool,
) -> Value {
    json!({
        "url": url,
        "authorization": format!("Bearer {}", mask_secret(credential.token())),
        "credential_locator": credential.locator(),
        "x-request-id": request_id,
        "accept": accept_for(streaming),
        "content-type": ACCEPT_JSON,
    })
}

/// Map a transport failure to a sanitized gateway error.
///
/// The raw reqwest message never reaches the caller.
pub fn classify_transport_error(error: &reqwest::Error) -> AppError {
    if error.is_timeout() {
        AppError::UpstreamTimeout
    } else if error.is_connect() {
        AppError::UpstreamConnection(MESSAGE_UPSTREAM_CONNECT.to_string())
    } else {
        AppError::UpstreamConnection(MESSAGE_UPSTREAM_FAILED.to_string())
    }
}

/// Normalize reqwest status code into axum status code.
pub fn normalize_upstream_status(status: reqwest::StatusCode) -> StatusCode {
    StatusCode::from_u16(status.as_u16()).unwrap_or(StatusCode::BAD_GATEWAY)
}

/// Upstream content type converted to an axum header value.
pub fn upstream_content_type(headers: &reqwest::header::HeaderMap) -> Option<HeaderValue> {
    headers
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|value| HeaderValue::from_bytes(value.as_bytes()).ok())
}

/// Relay a fully buffered upstream response.
///
/// Error statuses with an empty body get a synthesized `upstream_error` body;
/// everything else is relayed exactly as received.
pub fn relay_buffered(
    status: StatusCode,
    content_type: Option<HeaderValue>,
    body: Bytes,
) -> Response {
    if (status.is_client_error() || status.is_server_error()) && body.is_empty() {
        return AppError::EmptyUpstreamError(status).into_response();
    }

    let mut response = Response::new(Body::from(body));
    *response.status_mut() = status;
    if let Some(content_type) = content_type {
        response
            .headers_mut()
            .insert(header::CONTENT_TYPE, content_type);
    }
    response
}
