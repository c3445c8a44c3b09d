use crate::core::DisconnectGuard;
use axum::body::Bytes;
use futures::stream::Stream;
use std::pin::Pin;
use std::task::{Context, Poll};

/// A response body stream that cancels the forwarding operation when dropped.
///
/// Hyper drops the body when the caller disconnects (stops consuming the
/// stream); the embedded [`DisconnectGuard`] turns that into a cancellation
/// unless the relay already finished.
pub struct DisconnectStream<S> {
    stream: S,
    guard: DisconnectGuard,
}

impl<S> DisconnectStream<S> {
    pub fn new(stream: S, guard: DisconnectGuard) -> Self {
        Self { stream, guard }
    }

    pub fn guard(&self) -> &DisconnectGuard {
        &self.guard
    }
}

impl<S, E> Stream for DisconnectStream<S>
where
    S: Stream<Item = Result<Bytes, E>> + Unpin,
{
    type Item = Result<Bytes, E>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.stream).poll_next(cx)
    }
}
