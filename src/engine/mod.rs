//! The HTTP engine the client drives.
//!
//! The engine owns sockets, TLS, pooling, redirects and timeouts. The client
//! only builds [`EngineRequest`]s and consumes [`EngineResponse`]s, which keeps
//! the retry and mapping logic independent of the transport. [`ReqwestEngine`]
//! is the production engine; tests plug in scripted ones.

mod reqwest_engine;

use std::fmt;
use std::pin::Pin;

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::Stream;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Method, StatusCode};
use url::Url;

use crate::error::WebClientError;

pub use reqwest_engine::{ReqwestEngine, apply_parameters};

/// Response body as a stream of chunks. Dropping it releases the connection.
pub type BodyStream = Pin<Box<dyn Stream<Item = Result<Bytes, WebClientError>> + Send>>;

/// Transport used by the client.
#[async_trait]
pub trait HttpEngine: Send + Sync {
    /// Sends one request and returns once the response head is available.
    ///
    /// # Errors
    ///
    /// Returns [`WebClientError`] when no response could be obtained.
    async fn execute(&self, request: EngineRequest) -> Result<EngineResponse, WebClientError>;
}

/// Body of a POST or PUT request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestBody {
    pub content: String,
    /// `None` sends the body untyped.
    pub content_type: Option<HeaderValue>,
}

/// A fully built request.
#[derive(Debug, Clone)]
pub struct EngineRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Option<RequestBody>,
}

/// Response head plus an unread body.
pub struct EngineResponse {
    pub status: StatusCode,
    /// Final URL after redirects.
    pub url: Url,
    pub headers: HeaderMap,
    /// Declared body length, if known.
    pub content_length: Option<u64>,
    pub body: BodyStream,
}

impl EngineResponse {
    /// Reason phrase for the status, empty when the code has none.
    #[must_use]
    pub fn message(&self) -> &'static str {
        self.status.canonical_reason().unwrap_or("")
    }
}

impl fmt::Debug for EngineResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineResponse")
            .field("status", &self.status)
            .field("url", &self.url.as_str())
            .field("headers", &self.headers)
            .field("content_length", &self.content_length)
            .finish_non_exhaustive()
    }
}
