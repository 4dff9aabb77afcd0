//! Chunked body download that reports progress.

use bytes::Bytes;
use futures_util::StreamExt;
use tracing::{debug, error, info};

use super::mapping::ResponseHead;
use crate::engine::BodyStream;
use crate::error::WebClientError;
use crate::parameters::RequestParameters;
use crate::response::WebClientResponse;

/// Reads the body in buffers of the configured size and hands each one to the
/// progress listener.
///
/// The listener first sees `(0, [])`. Every later event carries one full
/// buffer, except the last, which may be shorter. The cancellation token is
/// checked after each event. The body is dropped on every return path.
pub(crate) async fn download_with_progress(
    parameters: &RequestParameters,
    head: ResponseHead,
    body: BodyStream,
    content_length: Option<u64>,
) -> WebClientResponse {
    let total = content_length.unwrap_or(0);
    let buffer_size = parameters.effective_buffer_size();
    let mut reader = ChunkReader::new(body);
    let mut buffer = Vec::with_capacity(buffer_size);
    let mut downloaded: u64 = 0;

    publish_progress(parameters, &[], 0, total);

    loop {
        match reader.read_chunk(&mut buffer, buffer_size).await {
            Ok(0) => break,
            Ok(read) => {
                downloaded += read as u64;
                publish_progress(parameters, &buffer, downloaded, total);

                if parameters.is_cancelled() {
                    info!(url = %parameters.url, downloaded, "download cancelled");
                    return head.into_failure(WebClientError::cancelled(&parameters.url));
                }
            }
            Err(error) => {
                error!(url = %parameters.url, downloaded, error = %error, "could not download response body");
                return head.into_failure(error);
            }
        }
    }

    debug!(url = %parameters.url, downloaded, "download finished");
    head.into_response()
}

fn publish_progress(parameters: &RequestParameters, chunk: &[u8], downloaded: u64, total: u64) {
    if let Some(listener) = &parameters.download_progress_listener {
        listener(progress(downloaded, total), chunk);
    }
}

/// `downloaded / total`, or `NaN` when the total is unknown.
#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
fn progress(downloaded: u64, total: u64) -> f32 {
    if total == 0 {
        return f32::NAN;
    }
    (downloaded as f64 / total as f64) as f32
}

/// Regroups network chunks into fixed-size buffers.
///
/// A body error that arrives after part of a buffer was filled is held back
/// until that partial buffer has been returned.
struct ChunkReader {
    body: BodyStream,
    pending: Bytes,
    finished: bool,
    failure: Option<WebClientError>,
}

impl ChunkReader {
    fn new(body: BodyStream) -> Self {
        Self {
            body,
            pending: Bytes::new(),
            finished: false,
            failure: None,
        }
    }

    /// Fills `buffer` with up to `limit` bytes; returns how many, 0 at the end.
    async fn read_chunk(
        &mut self,
        buffer: &mut Vec<u8>,
        limit: usize,
    ) -> Result<usize, WebClientError> {
        buffer.clear();
        if let Some(error) = self.failure.take() {
            return Err(error);
        }
        while buffer.len() < limit {
            if self.pending.is_empty() {
                if self.finished {
                    break;
                }
                match self.body.next().await {
                    Some(Ok(chunk)) => self.pending = chunk,
                    Some(Err(error)) if buffer.is_empty() => return Err(error),
                    Some(Err(error)) => {
                        self.failure = Some(error);
                        self.finished = true;
                        break;
                    }
                    None => {
                        self.finished = true;
                        break;
                    }
                }
                continue;
            }
            let take = (limit - buffer.len()).min(self.pending.len());
            buffer.extend_from_slice(&self.pending.split_to(take));
        }
        Ok(buffer.len())
    }
}
