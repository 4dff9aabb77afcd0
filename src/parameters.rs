//! Per-request and per-client parameters.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::cancel::CancellationToken;
use crate::cookies::Cookie;
use crate::user_agent;

/// Default number of retries after the first attempt.
pub const DEFAULT_COUNT_CONNECTION_RETRIES: u32 = 2;

/// Default read size of the progress download loop (8 KiB).
pub const DEFAULT_DOWNLOAD_BUFFER_SIZE: usize = 8 * 1024;

/// Default connect timeout in milliseconds.
pub const DEFAULT_CONNECT_TIMEOUT_MILLIS: u64 = 2_000;

/// Default read timeout in milliseconds.
pub const DEFAULT_READ_TIMEOUT_MILLIS: u64 = 15_000;

/// Default write timeout in milliseconds.
pub const DEFAULT_WRITE_TIMEOUT_MILLIS: u64 = 30_000;

/// Receives download progress and the chunk just read.
///
/// Progress is `downloaded / total` in `[0, 1]`, or `NaN` when the total
/// length is unknown. The first call reports zero progress and an empty chunk.
pub type DownloadProgressListener = Arc<dyn Fn(f32, &[u8]) + Send + Sync>;

/// How the response body is handed back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResponseType {
    /// Buffer the body as text.
    #[default]
    String,
    /// Buffer the body as bytes.
    Bytes,
    /// Hand the open body stream to the caller.
    Stream,
    /// Read the body in chunks, reporting each one to the progress listener.
    StreamWithProgressListener,
}

/// Inputs of one logical request.
///
/// The retry budget is decremented in place while a call retries, so the
/// caller sees the remaining budget once the call returns.
#[derive(Clone)]
pub struct RequestParameters {
    pub url: String,
    pub body: Option<String>,
    pub content_type: Option<String>,
    /// `None` sends no explicit User-Agent header.
    pub user_agent: Option<String>,
    pub headers: HashMap<String, String>,
    pub cookies: Vec<Cookie>,
    pub count_connection_retries: u32,
    pub response_type: ResponseType,
    pub download_buffer_size: usize,
    pub download_progress_listener: Option<DownloadProgressListener>,
    pub cancellation: Option<CancellationToken>,
}

impl RequestParameters {
    pub const DEFAULT_USER_AGENT: &'static str = user_agent::DEFAULT_USER_AGENT;
    pub const DEFAULT_MOBILE_USER_AGENT: &'static str = user_agent::DEFAULT_MOBILE_USER_AGENT;

    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            body: None,
            content_type: None,
            user_agent: Some(user_agent::DEFAULT_USER_AGENT.to_string()),
            headers: HashMap::new(),
            cookies: Vec::new(),
            count_connection_retries: DEFAULT_COUNT_CONNECTION_RETRIES,
            response_type: ResponseType::default(),
            download_buffer_size: DEFAULT_DOWNLOAD_BUFFER_SIZE,
            download_progress_listener: None,
            cancellation: None,
        }
    }

    #[must_use]
    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    #[must_use]
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    #[must_use]
    pub fn with_user_agent(mut self, user_agent: Option<String>) -> Self {
        self.user_agent = user_agent;
        self
    }

    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    #[must_use]
    pub fn with_cookie(mut self, cookie: Cookie) -> Self {
        self.cookies.push(cookie);
        self
    }

    #[must_use]
    pub fn with_count_connection_retries(mut self, count: u32) -> Self {
        self.count_connection_retries = count;
        self
    }

    #[must_use]
    pub fn with_response_type(mut self, response_type: ResponseType) -> Self {
        self.response_type = response_type;
        self
    }

    #[must_use]
    pub fn with_download_buffer_size(mut self, size: usize) -> Self {
        self.download_buffer_size = size;
        self
    }

    /// Sets the progress listener and switches to
    /// [`ResponseType::StreamWithProgressListener`].
    #[must_use]
    pub fn with_download_progress_listener(
        mut self,
        listener: impl Fn(f32, &[u8]) + Send + Sync + 'static,
    ) -> Self {
        self.download_progress_listener = Some(Arc::new(listener));
        self.response_type = ResponseType::StreamWithProgressListener;
        self
    }

    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    /// Whether any retry budget is left.
    #[must_use]
    pub fn is_count_connection_retries_set(&self) -> bool {
        self.count_connection_retries > 0
    }

    /// Spends one retry. Never goes below zero.
    pub fn decrement_count_connection_retries(&mut self) {
        self.count_connection_retries = self.count_connection_retries.saturating_sub(1);
    }

    pub(crate) fn is_cancelled(&self) -> bool {
        self.cancellation
            .as_ref()
            .is_some_and(CancellationToken::is_cancelled)
    }

    /// Read size of the progress loop; a zero size is treated as one byte.
    pub(crate) fn effective_buffer_size(&self) -> usize {
        self.download_buffer_size.max(1)
    }
}

impl fmt::Debug for RequestParameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestParameters")
            .field("url", &self.url)
            .field("body", &self.body.as_ref().map(String::len))
            .field("content_type", &self.content_type)
            .field("user_agent", &self.user_agent)
            .field("headers", &self.headers)
            .field("cookies", &self.cookies.len())
            .field("count_connection_retries", &self.count_connection_retries)
            .field("response_type", &self.response_type)
            .field("download_buffer_size", &self.download_buffer_size)
            .field(
                "download_progress_listener",
                &self.download_progress_listener.is_some(),
            )
            .finish_non_exhaustive()
    }
}

/// Engine configuration, consumed once when the client is built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebClientParameters {
    pub follow_redirects: bool,
    pub retry_on_connection_failure: bool,
    pub connect_timeout_millis: u64,
    pub read_timeout_millis: u64,
    pub write_timeout_millis: u64,
}

impl Default for WebClientParameters {
    fn default() -> Self {
        Self {
            follow_redirects: true,
            retry_on_connection_failure: true,
            connect_timeout_millis: DEFAULT_CONNECT_TIMEOUT_MILLIS,
            read_timeout_millis: DEFAULT_READ_TIMEOUT_MILLIS,
            write_timeout_millis: DEFAULT_WRITE_TIMEOUT_MILLIS,
        }
    }
}

impl WebClientParameters {
    #[must_use]
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_millis)
    }

    #[must_use]
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_millis)
    }

    #[must_use]
    pub fn write_timeout(&self) -> Duration {
        Duration::from_millis(self.write_timeout_millis)
    }
}
