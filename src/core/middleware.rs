//! HTTP middleware for request correlation.

use crate::core::error_types::REQUEST_ID_HEADER;
use crate::core::logging::{resolve_request_id, REQUEST_ID};
use axum::{extract::Request, http::HeaderValue, middleware::Next, response::Response};

/// Resolve the request ID (inherited or generated), expose it to handlers via
/// the [`REQUEST_ID`] task-local, and echo it on the response.
pub async fn request_id_middleware(request: Request, next: Next) -> Response {
    let request_id = resolve_request_id(request.headers());
    let mut response = REQUEST_ID.scope(request_id.clone(), next.run(request)).await;

    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response
}
