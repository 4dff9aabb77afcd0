//! reqwest backed engine.

use std::sync::Arc;

use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::cookie::CookieStore;
use reqwest::header::{CONTENT_TYPE, HeaderValue};
use reqwest::redirect::Policy;
use reqwest::{Client, ClientBuilder};
use tracing::debug;
use url::Url;

use super::{EngineRequest, EngineResponse, HttpEngine};
use crate::cookies::{CookieInterceptor, StoredCookie, cookie_header_value};
use crate::error::WebClientError;
use crate::parameters::WebClientParameters;

/// Redirect hops followed before giving up.
const MAX_REDIRECTS: usize = 20;

/// Engine backed by a shared [`reqwest::Client`].
///
/// Create it once and reuse it: the client pools connections.
#[derive(Debug, Clone)]
pub struct ReqwestEngine {
    client: Client,
}

impl ReqwestEngine {
    /// Builds a client configured from `parameters` whose cookie handling is
    /// delegated to `cookies`.
    ///
    /// # Errors
    ///
    /// Returns [`WebClientError::ClientBuild`] if reqwest rejects the configuration.
    pub fn new(
        parameters: &WebClientParameters,
        cookies: Arc<dyn CookieInterceptor>,
    ) -> Result<Self, WebClientError> {
        Self::with_builder(apply_parameters(Client::builder(), parameters, cookies))
    }

    /// Builds the engine from a caller prepared builder.
    ///
    /// # Errors
    ///
    /// Returns [`WebClientError::ClientBuild`] if the builder fails.
    pub fn with_builder(builder: ClientBuilder) -> Result<Self, WebClientError> {
        let client = builder
            .build()
            .map_err(|source| WebClientError::ClientBuild { source })?;
        Ok(Self { client })
    }

    /// Wraps a pre-built client. Its cookie handling is left as configured.
    #[must_use]
    pub fn from_client(client: Client) -> Self {
        Self { client }
    }

    /// Returns a reference to the underlying reqwest client.
    #[must_use]
    pub fn inner(&self) -> &Client {
        &self.client
    }
}

/// Applies client parameters and the cookie interceptor to a builder.
///
/// reqwest has no write-side timeout, so `write_timeout_millis` is only logged.
/// Without `retry_on_connection_failure` idle connections are not pooled, so a
/// request is never replayed on a stale connection.
#[must_use]
pub fn apply_parameters(
    builder: ClientBuilder,
    parameters: &WebClientParameters,
    cookies: Arc<dyn CookieInterceptor>,
) -> ClientBuilder {
    let redirect = if parameters.follow_redirects {
        Policy::limited(MAX_REDIRECTS)
    } else {
        Policy::none()
    };

    let mut builder = builder
        .redirect(redirect)
        .connect_timeout(parameters.connect_timeout())
        .read_timeout(parameters.read_timeout())
        .gzip(true)
        .cookie_provider(Arc::new(InterceptingCookieStore {
            interceptor: cookies,
        }));
    if !parameters.retry_on_connection_failure {
        builder = builder.pool_max_idle_per_host(0);
    }

    debug!(
        follow_redirects = parameters.follow_redirects,
        retry_on_connection_failure = parameters.retry_on_connection_failure,
        connect_timeout_ms = parameters.connect_timeout_millis,
        read_timeout_ms = parameters.read_timeout_millis,
        write_timeout_ms = parameters.write_timeout_millis,
        "configured HTTP engine"
    );
    builder
}

#[async_trait]
impl HttpEngine for ReqwestEngine {
    async fn execute(&self, request: EngineRequest) -> Result<EngineResponse, WebClientError> {
        let EngineRequest {
            method,
            url,
            mut headers,
            body,
        } = request;
        let request_url = url.to_string();

        let mut builder = self.client.request(method, url);
        if let Some(body) = body {
            if let Some(content_type) = body.content_type {
                headers.insert(CONTENT_TYPE, content_type);
            }
            builder = builder.body(body.content);
        }

        let response = builder
            .headers(headers)
            .send()
            .await
            .map_err(|e| WebClientError::from_reqwest(request_url.clone(), e))?;

        let status = response.status();
        let final_url = response.url().clone();
        let response_headers = response.headers().clone();
        let content_length = response.content_length();
        debug!(status = status.as_u16(), url = %final_url, "response head received");

        let body = response.bytes_stream().map(move |chunk| {
            chunk.map_err(|e| WebClientError::body(request_url.clone(), std::io::Error::other(e)))
        });

        Ok(EngineResponse {
            status,
            url: final_url,
            headers: response_headers,
            content_length,
            body: Box::pin(body),
        })
    }
}

/// Bridges reqwest's cookie provider hooks to a [`CookieInterceptor`].
struct InterceptingCookieStore {
    interceptor: Arc<dyn CookieInterceptor>,
}

impl CookieStore for InterceptingCookieStore {
    fn set_cookies(&self, cookie_headers: &mut dyn Iterator<Item = &HeaderValue>, url: &Url) {
        let cookies = cookie_headers
            .filter_map(|value| value.to_str().ok())
            .filter_map(|raw| StoredCookie::parse(raw, url))
            .collect();
        self.interceptor.on_after_receive(url, cookies);
    }

    fn cookies(&self, url: &Url) -> Option<HeaderValue> {
        let cookies = self.interceptor.on_before_send(url);
        cookie_header_value(&cookies).and_then(|value| HeaderValue::from_str(&value).ok())
    }
}
