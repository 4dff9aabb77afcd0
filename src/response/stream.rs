//! Open response body handed to the caller in [`ResponseType::Stream`] mode.
//!
//! [`ResponseType::Stream`]: crate::ResponseType::Stream

use std::fmt;
use std::io::{self, Read};
use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use futures_util::{Stream, StreamExt};
use tokio::runtime::Handle;

use crate::engine::BodyStream;
use crate::error::WebClientError;

/// Unread response body. The caller owns it; dropping it closes the
/// connection.
///
/// Async code consumes it as a [`Stream`] of chunks. Synchronous code can use
/// the [`Read`] impl, which blocks on the client runtime and must not be
/// called from inside an async context.
pub struct ResponseStream {
    body: BodyStream,
    pending: Bytes,
    runtime: Option<Handle>,
}

impl ResponseStream {
    pub(crate) fn new(body: BodyStream, runtime: Option<Handle>) -> Self {
        Self {
            body,
            pending: Bytes::new(),
            runtime,
        }
    }

    /// Next chunk of the body, `None` at the end.
    pub async fn next_chunk(&mut self) -> Option<Result<Bytes, WebClientError>> {
        self.next().await
    }
}

impl Stream for ResponseStream {
    type Item = Result<Bytes, WebClientError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if !this.pending.is_empty() {
            return Poll::Ready(Some(Ok(std::mem::take(&mut this.pending))));
        }
        this.body.as_mut().poll_next(cx)
    }
}

impl Read for ResponseStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        while self.pending.is_empty() {
            let Some(runtime) = &self.runtime else {
                return Err(io::Error::other(
                    "no runtime available to drive the response stream",
                ));
            };
            match runtime.block_on(self.body.next()) {
                Some(Ok(chunk)) => self.pending = chunk,
                Some(Err(error)) => return Err(io::Error::other(error)),
                None => return Ok(0),
            }
        }
        let len = buf.len().min(self.pending.len());
        buf[..len].copy_from_slice(&self.pending.split_to(len));
        Ok(len)
    }
}

impl fmt::Debug for ResponseStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResponseStream")
            .field("pending", &self.pending.len())
            .finish_non_exhaustive()
    }
}
