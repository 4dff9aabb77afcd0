//! An [`HttpEngine`] that answers from a closure instead of the network.
//!
//! It drives a [`CookieInterceptor`] the way reqwest does: staged cookies are
//! read before each attempt and `Set-Cookie` headers of the scripted response
//! are reported back.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::{StreamExt, stream};
use reqwest::StatusCode;
use reqwest::header::{CONTENT_LENGTH, HeaderMap, HeaderValue, SET_COOKIE};

use crate::cookies::{CookieInterceptor, StoredCookie, cookie_header_value};
use crate::engine::{BodyStream, EngineRequest, EngineResponse, HttpEngine};
use crate::error::WebClientError;

type Responder =
    dyn Fn(usize, &EngineRequest) -> Result<EngineResponse, WebClientError> + Send + Sync;

pub struct ScriptedEngine {
    responder: Box<Responder>,
    interceptor: Option<Arc<dyn CookieInterceptor>>,
    attempts: AtomicUsize,
    requests: Mutex<Vec<EngineRequest>>,
    sent_cookies: Mutex<Vec<Option<String>>>,
}

impl ScriptedEngine {
    /// `responder` gets the zero-based attempt number and the request.
    pub fn new(
        responder: impl Fn(usize, &EngineRequest) -> Result<EngineResponse, WebClientError>
        + Send
        + Sync
        + 'static,
    ) -> Self {
        Self {
            responder: Box::new(responder),
            interceptor: None,
            attempts: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
            sent_cookies: Mutex::new(Vec::new()),
        }
    }

    pub fn with_interceptor(mut self, interceptor: Arc<dyn CookieInterceptor>) -> Self {
        self.interceptor = Some(interceptor);
        self
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    #[allow(clippy::unwrap_used)]
    pub fn requests(&self) -> Vec<EngineRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// `Cookie` header value the engine would have sent, per attempt.
    #[allow(clippy::unwrap_used)]
    pub fn sent_cookies(&self) -> Vec<Option<String>> {
        self.sent_cookies.lock().unwrap().clone()
    }
}

#[async_trait]
impl HttpEngine for ScriptedEngine {
    #[allow(clippy::unwrap_used)]
    async fn execute(&self, request: EngineRequest) -> Result<EngineResponse, WebClientError> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst);

        let sent = self
            .interceptor
            .as_ref()
            .and_then(|interceptor| cookie_header_value(&interceptor.on_before_send(&request.url)));
        self.sent_cookies.lock().unwrap().push(sent);
        self.requests.lock().unwrap().push(request.clone());

        let response = (self.responder)(attempt, &request)?;

        if let Some(interceptor) = &self.interceptor {
            let cookies: Vec<StoredCookie> = response
                .headers
                .get_all(SET_COOKIE)
                .iter()
                .filter_map(|value| value.to_str().ok())
                .filter_map(|raw| StoredCookie::parse(raw, &response.url))
                .collect();
            if !cookies.is_empty() {
                interceptor.on_after_receive(&response.url, cookies);
            }
        }
        Ok(response)
    }
}

/// Response with a complete body delivered in chunks of `chunk_size`.
pub fn chunked_response(
    request: &EngineRequest,
    status: u16,
    body: &[u8],
    chunk_size: usize,
) -> EngineResponse {
    let chunks: Vec<Result<Bytes, WebClientError>> = body
        .chunks(chunk_size.max(1))
        .map(|chunk| Ok(Bytes::copy_from_slice(chunk)))
        .collect();
    response_with_body(request, status, Some(body.len() as u64), Box::pin(stream::iter(chunks)))
}

pub fn text_response(request: &EngineRequest, status: u16, body: &str) -> EngineResponse {
    chunked_response(request, status, body.as_bytes(), 1024)
}

#[allow(clippy::unwrap_used)]
pub fn response_with_body(
    request: &EngineRequest,
    status: u16,
    content_length: Option<u64>,
    body: BodyStream,
) -> EngineResponse {
    let mut headers = HeaderMap::new();
    if let Some(length) = content_length {
        headers.insert(CONTENT_LENGTH, HeaderValue::from(length));
    }
    EngineResponse {
        status: StatusCode::from_u16(status).unwrap(),
        url: request.url.clone(),
        headers,
        content_length,
        body,
    }
}

/// Body that yields `chunks` and then fails.
pub fn failing_body(url: &str, chunks: Vec<&'static [u8]>) -> BodyStream {
    let mut items: Vec<Result<Bytes, WebClientError>> = chunks
        .into_iter()
        .map(|chunk| Ok(Bytes::from_static(chunk)))
        .collect();
    items.push(Err(WebClientError::body(
        url,
        std::io::Error::other("connection reset"),
    )));
    Box::pin(stream::iter(items))
}

/// Wraps `body` so the returned flag flips once the stream is dropped.
pub fn tracked_body(body: BodyStream) -> (BodyStream, Arc<AtomicBool>) {
    let closed = Arc::new(AtomicBool::new(false));
    let guard = DropFlag(closed.clone());
    let tracked = body.map(move |chunk| {
        let _guard = &guard;
        chunk
    });
    (Box::pin(tracked), closed)
}

struct DropFlag(Arc<AtomicBool>);

impl Drop for DropFlag {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}
