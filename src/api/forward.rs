//! The forwarding engine.
//!
//! Owns the upstream connection for one request: builds the outbound request,
//! applies the timeout/cancellation policy, sends it, and relays the response
//! either buffered once (non-streaming) or frame by frame (streaming).
//!
//! ```text
//! Building -> Sending -> HeadersReceived -> NonStreamingBuffering -> Done
//!                                        \-> StreamingRelay        -> Done
//! (any stage) -> Failed
//! ```

use crate::api::disconnect::DisconnectStream;
use crate::api::streaming::{relay_stream, sse_response};
use crate::api::upstream::{
    build_debug_headers, build_http_client, build_upstream_request, classify_transport_error,
    normalize_upstream_status, relay_buffered, upstream_content_type,
};
use crate::core::{
    generate_request_id, AppConfig, AppError, CallerCancel, CancelReason, Credential,
    DisconnectGuard, ForwardSignal,
};
use crate::transformer::is_streaming;
use axum::response::{IntoResponse, Response};
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Lifecycle stage of one forwarding operation, carried in log fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForwardStage {
    Building,
    Sending,
    HeadersReceived,
    NonStreamingBuffering,
    StreamingRelay,
    Done,
    Failed,
}

impl fmt::Display for ForwardStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ForwardStage::Building => "building",
            ForwardStage::Sending => "sending",
            ForwardStage::HeadersReceived => "headers_received",
            ForwardStage::NonStreamingBuffering => "non_streaming_buffering",
            ForwardStage::StreamingRelay => "streaming_relay",
            ForwardStage::Done => "done",
            ForwardStage::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Per-request forwarding state. Never shared across requests.
#[derive(Debug)]
pub struct ForwardContext {
    pub request_id: String,
    pub streaming: bool,
    pub caller: CallerCancel,
}

impl ForwardContext {
    /// Build the context for `payload`, generating a request id if none was inherited.
    pub fn new(
        request_id: Option<String>,
        payload: &Map<String, Value>,
        caller: CallerCancel,
    ) -> Self {
        Self {
            request_id: request_id
                .filter(|id| !id.is_empty())
                .unwrap_or_else(generate_request_id),
            streaming: is_streaming(payload),
            caller,
        }
    }
}

/// Forwards rewritten requests to the single upstream endpoint.
///
/// Constructed once at startup; cheap to share behind an `Arc`.
#[derive(Debug, Clone)]
pub struct ForwardEngine {
    client: reqwest::Client,
    upstream_url: String,
    credential: Arc<Credential>,
    request_timeout: Duration,
}

impl ForwardEngine {
    pub fn new(
        client: reqwest::Client,
        upstream_url: impl Into<String>,
        credential: Arc<Credential>,
        request_timeout: Duration,
    ) -> Self {
        Self {
            client,
            upstream_url: upstream_url.into(),
            credential,
            request_timeout,
        }
    }

    /// Build the engine and its pooled HTTP client from configuration.
    pub fn from_config(config: &AppConfig, credential: Arc<Credential>) -> anyhow::Result<Self> {
        let client = build_http_client(config.verify_ssl)?;
        Ok(Self::new(
            client,
            config.upstream_url(),
            credential,
            config.request_timeout(),
        ))
    }

    pub fn upstream_url(&self) -> &str {
        &self.upstream_url
    }

    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    /// Forward `payload` upstream and relay the answer.
    ///
    /// Never retries. Caller cancellation ends the operation silently; the
    /// returned response is then never read.
    pub async fn forward(&self, ctx: ForwardContext, payload: Map<String, Value>) -> Response {
        let ForwardContext {
            request_id,
            streaming,
            caller,
        } = ctx;
        let guard = DisconnectGuard::new(caller.clone(), request_id.clone());
        let started = Instant::now();

        let mut stage = ForwardStage::Building;
        let request = build_upstream_request(
            &self.client,
            &self.upstream_url,
            &payload,
            &self.credential,
            &request_id,
            streaming,
        );
        let headers =
            build_debug_headers(&self.upstream_url, &self.credential, &request_id, streaming);
        tracing::debug!(
            request_id = %request_id,
            stage = %stage,
            streaming,
            headers = %headers,
            "Built upstream request"
        );

        stage = ForwardStage::Sending;
        let timeout = (!streaming).then_some(self.request_timeout);
        let signal = ForwardSignal::new(&caller, timeout);

        let response = match signal.guard(request.send()).await {
            Ok(Ok(response)) => response,
            Ok(Err(error)) => return self.transport_failure(&request_id, stage, error, &guard),
            Err(reason) => return self.cancelled(&request_id, stage, reason, &guard),
        };

        stage = ForwardStage::HeadersReceived;
        let status = normalize_upstream_status(response.status());
        let content_type = upstream_content_type(response.headers());
        tracing::debug!(
            request_id = %request_id,
            stage = %stage,
            status = %status,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Upstream headers received"
        );

        // Error statuses are buffered even in streaming mode so the caller
        // gets the upstream's JSON error rather than an empty event stream.
        if streaming && status.is_success() {
            stage = ForwardStage::StreamingRelay;
            tracing::info!(
                request_id = %request_id,
                stage = %stage,
                status = %status,
                "Relaying upstream event stream"
            );
            let relay = relay_stream(
                response.bytes_stream(),
                signal,
                caller.clone(),
                request_id.clone(),
            );
            return sse_response(status, DisconnectStream::new(relay, guard));
        }

        stage = ForwardStage::NonStreamingBuffering;
        let body = match signal.guard(response.bytes()).await {
            Ok(Ok(body)) => body,
            Ok(Err(error)) => return self.transport_failure(&request_id, stage, error, &guard),
            Err(reason) => return self.cancelled(&request_id, stage, reason, &guard),
        };

        guard.complete();
        if status.is_client_error() || status.is_server_error() {
            tracing::warn!(
                request_id = %request_id,
                stage = %ForwardStage::Done,
                status = %status,
                body_bytes = body.len(),
                "Upstream returned error status"
            );
        } else {
            tracing::info!(
                request_id = %request_id,
                stage = %ForwardStage::Done,
                status = %status,
                body_bytes = body.len(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Upstream request completed"
            );
        }
        relay_buffered(status, content_type, body)
    }

    fn transport_failure(
        &self,
        request_id: &str,
        stage: ForwardStage,
        error: reqwest::Error,
        guard: &DisconnectGuard,
    ) -> Response {
        guard.complete();
        let app_error = classify_transport_error(&error);
        tracing::error!(
            request_id = %request_id,
            stage = %stage,
            next_stage = %ForwardStage::Failed,
            error = %error.without_url(),
            is_timeout = matches!(app_error, AppError::UpstreamTimeout),
            "Upstream request failed"
        );
        app_error.into_response()
    }

    fn cancelled(
        &self,
        request_id: &str,
        stage: ForwardStage,
        reason: CancelReason,
        guard: &DisconnectGuard,
    ) -> Response {
        match reason {
            CancelReason::CallerGone => {
                tracing::debug!(
                    request_id = %request_id,
                    stage = %stage,
                    "Caller went away; upstream request abandoned"
                );
                AppError::ClientDisconnect.into_response()
            }
            CancelReason::DeadlineElapsed => {
                guard.complete();
                tracing::warn!(
                    request_id = %request_id,
                    stage = %stage,
                    next_stage = %ForwardStage::Failed,
                    timeout_secs = self.request_timeout.as_secs(),
                    "Upstream request exceeded deadline"
                );
                AppError::UpstreamTimeout.into_response()
            }
        }
    }
}
