//! Server-Sent Events (SSE) relay.
//!
//! Upstream bytes are copied to the caller unmodified, re-chunked into frames
//! of at most [`RELAY_CHUNK_SIZE`] bytes. Each frame is written to the
//! connection as soon as it is yielded, so the caller sees partial output in
//! real time. The next upstream read only happens once the previous frame was
//! taken, which keeps memory bounded when the caller reads slowly.

use crate::api::disconnect::DisconnectStream;
use crate::core::{CallerCancel, ForwardSignal};
use axum::{
    body::Body,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use futures::stream::{Stream, StreamExt};
use std::fmt::Display;
use std::io;
use std::pin::Pin;

/// Maximum size of a relayed frame.
pub const RELAY_CHUNK_SIZE: usize = 8 * 1024;

/// Boxed relay body stream.
pub type RelayStream = Pin<Box<dyn Stream<Item = Result<Bytes, io::Error>> + Send>>;

/// Split `bytes` into pieces of at most `max` bytes without copying.
pub fn split_chunks(mut bytes: Bytes, max: usize) -> impl Iterator<Item = Bytes> {
    let max = max.max(1);
    std::iter::from_fn(move || {
        if bytes.is_empty() {
            None
        } else {
            let take = bytes.len().min(max);
            Some(bytes.split_to(take))
        }
    })
}

/// Copy an upstream byte stream until it ends, fails, or `signal` fires.
///
/// A normal end marks the caller handle completed so the body drop that
/// follows is not reported as a disconnect. An upstream failure mid-stream is
/// surfaced as a body error, which aborts the response instead of silently
/// truncating it.
pub fn relay_stream<S, E>(
    upstream: S,
    signal: ForwardSignal,
    handle: CallerCancel,
    request_id: String,
) -> RelayStream
where
    S: Stream<Item = Result<Bytes, E>> + Send + 'static,
    E: Display + Send + 'static,
{
    Box::pin(async_stream::stream! {
        tokio::pin!(upstream);
        let mut relayed_bytes: u64 = 0;
        let mut frames: u64 = 0;

        loop {
            let next = tokio::select! {
                biased;
                reason = signal.fired() => {
                    tracing::debug!(
                        request_id = %request_id,
                        reason = ?reason,
                        relayed_bytes,
                        frames,
                        "Streaming relay cancelled"
                    );
                    break;
                }
                next = upstream.next() => next,
            };

            match next {
                Some(Ok(bytes)) => {
                    relayed_bytes += bytes.len() as u64;
                    for frame in split_chunks(bytes, RELAY_CHUNK_SIZE) {
                        frames += 1;
                        yield Ok::<Bytes, io::Error>(frame);
                    }
                }
                Some(Err(error)) => {
                    handle.mark_completed();
                    tracing::warn!(
                        request_id = %request_id,
                        error = %error,
                        relayed_bytes,
                        "Upstream stream failed mid-relay"
                    );
                    yield Err(io::Error::other("upstream stream interrupted"));
                    break;
                }
                None => {
                    handle.mark_completed();
                    tracing::debug!(
                        request_id = %request_id,
                        relayed_bytes,
                        frames,
                        "Streaming relay finished"
                    );
                    break;
                }
            }
        }
    })
}

/// Build the event-stream response around a relay body.
pub fn sse_response(status: StatusCode, body: DisconnectStream<RelayStream>) -> Response {
    Response::builder()
        .status(status)
        .header(header::CONTENT_TYPE, "text/event-stream")
        .header(header::CACHE_CONTROL, "no-cache")
        .header("x-accel-buffering", "no")
        .body(Body::from_stream(body))
        .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
}
