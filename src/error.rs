//! Error types for the web client.
//!
//! Errors never cross the request API: they are captured on the
//! [`WebClientResponse`](crate::WebClientResponse) of a failed call. The only
//! fallible public operations are client construction.

use thiserror::Error;

/// Errors captured while building, sending or reading a request.
#[derive(Debug, Error)]
pub enum WebClientError {
    /// The request URL could not be parsed.
    #[error("invalid URL: {url}")]
    InvalidUrl {
        /// The URL as supplied by the caller.
        url: String,
    },

    /// A caller supplied header name or value is not valid HTTP.
    #[error("invalid header '{name}' for {url}")]
    InvalidHeader {
        /// The request URL.
        url: String,
        /// The offending header name.
        name: String,
    },

    /// Connect, read or write timeout enforced by the engine.
    #[error("timeout requesting {url}: {detail}")]
    Timeout {
        /// The URL that timed out.
        url: String,
        /// Engine supplied detail.
        detail: String,
    },

    /// No connection could be established.
    #[error("failed to connect to {url}: {detail}")]
    Connect {
        /// The URL that could not be reached.
        url: String,
        /// Engine supplied detail.
        detail: String,
    },

    /// Any other transport level error reported by reqwest.
    #[error("network error requesting {url}: {source}")]
    Network {
        /// The request URL.
        url: String,
        /// The underlying reqwest error.
        #[source]
        source: reqwest::Error,
    },

    /// A non-2xx response that was turned into a failure so it can be retried.
    #[error("{status}: {message}")]
    HttpStatus {
        /// The request URL.
        url: String,
        /// The HTTP status code.
        status: u16,
        /// The reason phrase of the status.
        message: String,
    },

    /// The response body could not be read completely.
    #[error("failed to read response body from {url}: {source}")]
    Body {
        /// The request URL.
        url: String,
        /// The underlying read error.
        #[source]
        source: std::io::Error,
    },

    /// A streaming download was cancelled through its token.
    #[error("download of {url} cancelled")]
    Cancelled {
        /// The request URL.
        url: String,
    },

    /// The reqwest client could not be built.
    #[error("failed to build HTTP client: {source}")]
    ClientBuild {
        /// The underlying builder error.
        #[source]
        source: reqwest::Error,
    },

    /// The worker runtime could not be started.
    #[error("failed to start client runtime: {source}")]
    Runtime {
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },
}

impl WebClientError {
    /// Creates an invalid URL error.
    pub fn invalid_url(url: impl Into<String>) -> Self {
        Self::InvalidUrl { url: url.into() }
    }

    /// Creates an invalid header error.
    pub fn invalid_header(url: impl Into<String>, name: impl Into<String>) -> Self {
        Self::InvalidHeader {
            url: url.into(),
            name: name.into(),
        }
    }

    /// Creates a timeout error.
    pub fn timeout(url: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::Timeout {
            url: url.into(),
            detail: detail.into(),
        }
    }

    /// Creates a connect error.
    pub fn connect(url: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::Connect {
            url: url.into(),
            detail: detail.into(),
        }
    }

    /// Creates a network error from a reqwest error.
    pub fn network(url: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Network {
            url: url.into(),
            source,
        }
    }

    /// Creates the synthetic failure for a non-2xx response.
    pub fn http_status(url: impl Into<String>, status: u16, message: impl Into<String>) -> Self {
        Self::HttpStatus {
            url: url.into(),
            status,
            message: message.into(),
        }
    }

    /// Creates a body read error.
    pub fn body(url: impl Into<String>, source: std::io::Error) -> Self {
        Self::Body {
            url: url.into(),
            source,
        }
    }

    /// Creates a cancellation error.
    pub fn cancelled(url: impl Into<String>) -> Self {
        Self::Cancelled { url: url.into() }
    }

    /// The error text without the request URL.
    ///
    /// Retry classification reads this instead of `Display`, so a URL that
    /// contains "timeout" does not turn every failure into a connection failure.
    #[must_use]
    pub fn message(&self) -> String {
        match self {
            Self::InvalidUrl { .. } => "invalid URL".to_string(),
            Self::InvalidHeader { .. } => "invalid header".to_string(),
            Self::Timeout { url, detail } => format!("timeout: {}", without_url(detail, url, None)),
            Self::Connect { url, detail } => {
                format!("failed to connect: {}", without_url(detail, url, None))
            }
            Self::Network { url, source } => format!(
                "network error: {}",
                without_url(&source.to_string(), url, source.url())
            ),
            Self::HttpStatus {
                status, message, ..
            } => format!("{status}: {message}"),
            Self::Body { source, .. } => format!("failed to read response body: {source}"),
            Self::Cancelled { .. } => "download cancelled".to_string(),
            Self::ClientBuild { source } => format!("failed to build HTTP client: {source}"),
            Self::Runtime { source } => format!("failed to start client runtime: {source}"),
        }
    }

    /// Classifies a reqwest send error.
    ///
    /// Timeouts and connect failures get their own variants so their
    /// messages carry the connection-class markers the retry policy looks for.
    pub fn from_reqwest(url: impl Into<String>, source: reqwest::Error) -> Self {
        let url = url.into();
        if source.is_timeout() {
            Self::timeout(url, source.to_string())
        } else if source.is_connect() {
            Self::connect(url, source.to_string())
        } else {
            Self::network(url, source)
        }
    }
}

/// Removes the request URL, and the engine's view of it, from `text`.
fn without_url(text: &str, url: &str, engine_url: Option<&url::Url>) -> String {
    let mut stripped = if url.is_empty() {
        text.to_string()
    } else {
        text.replace(url, "")
    };
    if let Some(engine_url) = engine_url {
        stripped = stripped.replace(engine_url.as_str(), "");
    }
    stripped
}

// No `From<reqwest::Error>`: every variant needs the request URL as context,
// which the source error does not carry reliably.

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_display_contains_marker() {
        let error = WebClientError::timeout("https://example.test/slow", "operation timed out");
        let msg = error.to_string();
        assert!(msg.contains("timeout"), "Expected 'timeout' in: {msg}");
        assert!(msg.contains("https://example.test/slow"));
    }

    #[test]
    fn test_connect_display_contains_marker() {
        let error = WebClientError::connect("https://example.test/", "connection refused");
        assert!(error.to_string().contains("failed to connect"));
    }

    #[test]
    fn test_http_status_display_is_code_and_message() {
        let error = WebClientError::http_status("https://example.test/", 503, "Service Unavailable");
        assert_eq!(error.to_string(), "503: Service Unavailable");
    }

    #[test]
    fn test_body_error_keeps_source() {
        use std::error::Error as _;

        let io_error = std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "eof");
        let error = WebClientError::body("https://example.test/file", io_error);
        assert!(error.source().is_some());
        assert!(error.to_string().contains("https://example.test/file"));
    }

    #[test]
    fn test_message_leaves_out_url() {
        let url = "https://example.test/api/timeout";

        assert_eq!(
            WebClientError::invalid_header(url, "x-timeout").message(),
            "invalid header"
        );
        assert_eq!(WebClientError::invalid_url(url).message(), "invalid URL");
        assert_eq!(
            WebClientError::connect(url, format!("tcp connect error for {url}")).message(),
            "failed to connect: tcp connect error for "
        );
        assert!(!WebClientError::cancelled(url).message().contains("timeout"));
    }

    #[test]
    fn test_invalid_url_display() {
        let error = WebClientError::invalid_url("not a url");
        assert_eq!(error.to_string(), "invalid URL: not a url");
    }
}
