//! The web client: retrying GET/POST/PUT/HEAD with per-request cookies.
//!
//! # Call flow
//!
//! ```text
//! parameters ──► build request ──► stage cookies ──► engine ──┐
//!      ▲                                                       │
//!      └──── decrement budget ◄── retry? ◄── status / error ◄──┘
//!                                   │ no
//!                                   ▼
//!                 map response (harvest cookies, clear staged, body)
//! ```
//!
//! Every call, synchronous or not, ends in exactly one [`WebClientResponse`].
//! Nothing is returned as `Err`: failures are reported through
//! [`WebClientResponse::error`].

mod mapping;
mod request;
mod retry;
mod streaming;

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use reqwest::{Client, ClientBuilder, Method};
use tokio::runtime::{Handle, Runtime};
use tokio::sync::Notify;
use tracing::{debug, error, info, instrument, warn};
use url::Url;

use crate::cookies::{CookieJar, StoredCookie};
use crate::engine::{EngineResponse, HttpEngine, ReqwestEngine, apply_parameters};
use crate::error::WebClientError;
use crate::parameters::{RequestParameters, WebClientParameters};
use crate::response::WebClientResponse;

pub use retry::{RetryDecision, is_connection_failure, should_retry_error, should_retry_status};

/// HTTP client with retries, per-request cookies and several body modes.
///
/// The client owns a small tokio runtime. Synchronous calls block on it and
/// must not be made from inside an async task. `*_async` calls run on it and
/// invoke the callback exactly once, on a blocking thread of the runtime, so
/// the callback may itself make synchronous calls.
///
/// Dropping the client does not abandon async calls: the runtime is kept
/// alive in the background until every pending callback has run.
pub struct WebClient {
    pipeline: RequestPipeline,
    handle: Handle,
    runtime: ClientRuntime,
}

impl WebClient {
    /// Client with default [`WebClientParameters`].
    ///
    /// # Panics
    ///
    /// Panics if the runtime or the TLS backend cannot be initialized. Use
    /// [`WebClient::with_parameters`] to handle that as an error.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn new() -> Self {
        Self::with_parameters(WebClientParameters::default())
            .expect("failed to initialize web client with default parameters")
    }

    /// # Errors
    ///
    /// Returns [`WebClientError::ClientBuild`] or [`WebClientError::Runtime`]
    /// when the engine or the runtime cannot be created.
    pub fn with_parameters(parameters: WebClientParameters) -> Result<Self, WebClientError> {
        let cookie_jar = Arc::new(CookieJar::new());
        let engine = ReqwestEngine::new(&parameters, cookie_jar.clone())?;
        Self::with_engine(Arc::new(engine), cookie_jar)
    }

    /// Client whose reqwest builder is customized by `configure` after the
    /// default parameters and the cookie hooks were applied.
    ///
    /// # Errors
    ///
    /// Same as [`WebClient::with_parameters`].
    pub fn with_client_builder(
        configure: impl FnOnce(ClientBuilder) -> ClientBuilder,
    ) -> Result<Self, WebClientError> {
        let cookie_jar = Arc::new(CookieJar::new());
        let builder = apply_parameters(
            Client::builder(),
            &WebClientParameters::default(),
            cookie_jar.clone(),
        );
        let engine = ReqwestEngine::with_builder(configure(builder))?;
        Self::with_engine(Arc::new(engine), cookie_jar)
    }

    /// Client over a pre-built reqwest client.
    ///
    /// The client's own cookie handling is used as is, so cookies staged from
    /// [`RequestParameters::cookies`] are only sent if it was built with this
    /// client's jar as cookie provider.
    ///
    /// # Errors
    ///
    /// Returns [`WebClientError::Runtime`] when the runtime cannot be created.
    pub fn from_reqwest_client(client: Client) -> Result<Self, WebClientError> {
        Self::with_engine(
            Arc::new(ReqwestEngine::from_client(client)),
            Arc::new(CookieJar::new()),
        )
    }

    /// Client over any engine. `cookie_jar` must be the interceptor the engine
    /// consults for cookies.
    ///
    /// # Errors
    ///
    /// Returns [`WebClientError::Runtime`] when the runtime cannot be created.
    pub fn with_engine(
        engine: Arc<dyn HttpEngine>,
        cookie_jar: Arc<CookieJar>,
    ) -> Result<Self, WebClientError> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .thread_name("webclient-worker")
            .enable_all()
            .build()
            .map_err(|source| WebClientError::Runtime { source })?;
        let handle = runtime.handle().clone();

        Ok(Self {
            pipeline: RequestPipeline {
                engine,
                cookie_jar,
                runtime: Some(handle.clone()),
            },
            handle,
            runtime: ClientRuntime {
                runtime: Some(runtime),
                in_flight: Arc::new(InFlightCalls::default()),
            },
        })
    }

    #[must_use]
    pub fn cookie_jar(&self) -> &Arc<CookieJar> {
        &self.pipeline.cookie_jar
    }

    /// Blocking GET. The retry budget in `parameters` is spent in place.
    pub fn get(&self, parameters: &mut RequestParameters) -> WebClientResponse {
        self.block_on(self.pipeline.execute(Method::GET, parameters))
    }

    /// Blocking POST; a missing body is sent as an empty string.
    pub fn post(&self, parameters: &mut RequestParameters) -> WebClientResponse {
        self.block_on(self.pipeline.execute(Method::POST, parameters))
    }

    /// Blocking PUT; a missing body is sent as an empty string.
    pub fn put(&self, parameters: &mut RequestParameters) -> WebClientResponse {
        self.block_on(self.pipeline.execute(Method::PUT, parameters))
    }

    pub fn head(&self, parameters: &mut RequestParameters) -> WebClientResponse {
        self.block_on(self.pipeline.execute(Method::HEAD, parameters))
    }

    /// Blocking GET with default parameters.
    pub fn get_url(&self, url: &str) -> WebClientResponse {
        self.get(&mut RequestParameters::new(url))
    }

    /// Blocking HEAD with default parameters.
    pub fn head_url(&self, url: &str) -> WebClientResponse {
        self.head(&mut RequestParameters::new(url))
    }

    pub fn get_async<F>(&self, parameters: RequestParameters, callback: F)
    where
        F: FnOnce(WebClientResponse) + Send + 'static,
    {
        self.spawn_call(Method::GET, parameters, callback);
    }

    pub fn post_async<F>(&self, parameters: RequestParameters, callback: F)
    where
        F: FnOnce(WebClientResponse) + Send + 'static,
    {
        self.spawn_call(Method::POST, parameters, callback);
    }

    pub fn put_async<F>(&self, parameters: RequestParameters, callback: F)
    where
        F: FnOnce(WebClientResponse) + Send + 'static,
    {
        self.spawn_call(Method::PUT, parameters, callback);
    }

    pub fn head_async<F>(&self, parameters: RequestParameters, callback: F)
    where
        F: FnOnce(WebClientResponse) + Send + 'static,
    {
        self.spawn_call(Method::HEAD, parameters, callback);
    }

    pub fn get_url_async<F>(&self, url: &str, callback: F)
    where
        F: FnOnce(WebClientResponse) + Send + 'static,
    {
        self.get_async(RequestParameters::new(url), callback);
    }

    pub fn head_url_async<F>(&self, url: &str, callback: F)
    where
        F: FnOnce(WebClientResponse) + Send + 'static,
    {
        self.head_async(RequestParameters::new(url), callback);
    }

    fn block_on<T>(&self, future: impl Future<Output = T>) -> T {
        self.handle.block_on(future)
    }

    fn spawn_call<F>(&self, method: Method, mut parameters: RequestParameters, callback: F)
    where
        F: FnOnce(WebClientResponse) + Send + 'static,
    {
        let pipeline = self.pipeline.clone();
        let in_flight = self.runtime.in_flight.enter();
        self.handle.spawn(async move {
            let _in_flight = in_flight;
            let url = parameters.url.clone();
            let response = pipeline.execute(method, &mut parameters).await;
            if let Err(error) = tokio::task::spawn_blocking(move || callback(response)).await {
                error!(url = %url, error = %error, "response callback panicked");
            }
        });
    }
}

impl Default for WebClient {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for WebClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebClient")
            .field("cookie_jar", &self.pipeline.cookie_jar)
            .finish_non_exhaustive()
    }
}

/// Owns the runtime and shuts it down without blocking, so a client can be
/// dropped from async code as well.
///
/// With async calls still pending, shutdown moves to a background thread that
/// waits for them first.
struct ClientRuntime {
    runtime: Option<Runtime>,
    in_flight: Arc<InFlightCalls>,
}

impl Drop for ClientRuntime {
    fn drop(&mut self) {
        let Some(runtime) = self.runtime.take() else {
            return;
        };
        if self.in_flight.is_idle() {
            runtime.shutdown_background();
            return;
        }

        debug!(
            pending = self.in_flight.pending(),
            "client dropped with async calls pending"
        );
        let in_flight = self.in_flight.clone();
        let spawned = std::thread::Builder::new()
            .name("webclient-shutdown".to_string())
            .spawn(move || {
                runtime.block_on(in_flight.wait_idle());
                runtime.shutdown_background();
            });
        if let Err(error) = spawned {
            warn!(error = %error, "could not spawn shutdown thread");
        }
    }
}

/// Count of async calls whose callback has not returned yet.
#[derive(Debug, Default)]
struct InFlightCalls {
    count: AtomicUsize,
    idle: Notify,
}

impl InFlightCalls {
    fn enter(self: &Arc<Self>) -> InFlightGuard {
        self.count.fetch_add(1, Ordering::SeqCst);
        InFlightGuard(self.clone())
    }

    fn pending(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }

    fn is_idle(&self) -> bool {
        self.pending() == 0
    }

    async fn wait_idle(&self) {
        loop {
            // Registered before the check so a wakeup in between is not lost.
            let idle = self.idle.notified();
            if self.is_idle() {
                return;
            }
            idle.await;
        }
    }
}

struct InFlightGuard(Arc<InFlightCalls>);

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        if self.0.count.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.0.idle.notify_waiters();
        }
    }
}

/// Executes one logical call: attempts, retries and response mapping.
#[derive(Clone)]
pub(crate) struct RequestPipeline {
    engine: Arc<dyn HttpEngine>,
    cookie_jar: Arc<CookieJar>,
    runtime: Option<Handle>,
}

impl RequestPipeline {
    /// Runs attempts until a response is accepted or the retry budget runs out.
    ///
    /// Each retry spends one unit of `parameters.count_connection_retries`, so
    /// the loop runs at most `budget + 1` times.
    #[instrument(level = "debug", skip(self, parameters), fields(url = %parameters.url))]
    pub(crate) async fn execute(
        &self,
        method: Method,
        parameters: &mut RequestParameters,
    ) -> WebClientResponse {
        let url = match request::parse_url(&parameters.url) {
            Ok(url) => url,
            Err(error) => return self.request_failed_finally(parameters, None, error),
        };

        loop {
            match self.attempt(&method, &url, parameters).await {
                Ok(response) => {
                    let status = response.status.as_u16();
                    if should_retry_status(status, parameters.count_connection_retries).is_retry()
                    {
                        let error =
                            WebClientError::http_status(&parameters.url, status, response.message());
                        self.discard_harvested(&url, Some(&response.url));
                        drop(response);
                        prepare_connection_retry(parameters, &error);
                        continue;
                    }
                    return mapping::map_response(
                        parameters,
                        &url,
                        response,
                        &self.cookie_jar,
                        self.runtime.as_ref(),
                    )
                    .await;
                }
                Err(error) => {
                    if should_retry_error(&error, parameters.count_connection_retries).is_retry() {
                        prepare_connection_retry(parameters, &error);
                        continue;
                    }
                    return self.request_failed_finally(parameters, Some(&url), error);
                }
            }
        }
    }

    async fn attempt(
        &self,
        method: &Method,
        url: &Url,
        parameters: &RequestParameters,
    ) -> Result<EngineResponse, WebClientError> {
        let request = request::build_request(method.clone(), url, parameters)?;
        self.cookie_jar.stage(
            url,
            parameters.cookies.iter().map(StoredCookie::from).collect(),
        );
        self.engine.execute(request).await
    }

    fn request_failed_finally(
        &self,
        parameters: &RequestParameters,
        url: Option<&Url>,
        error: WebClientError,
    ) -> WebClientResponse {
        error!(url = %parameters.url, error = %error, "could not request url");
        if let Some(url) = url {
            self.cookie_jar.clear_staged(url);
            self.discard_harvested(url, None);
        }
        WebClientResponse::failed(error)
    }

    /// Drops cookies harvested from a response the caller will never see.
    fn discard_harvested(&self, request_url: &Url, final_url: Option<&Url>) {
        let mut discarded = self.cookie_jar.take_received(request_url).len();
        if let Some(final_url) = final_url.filter(|final_url| *final_url != request_url) {
            discarded += self.cookie_jar.take_received(final_url).len();
        }
        if discarded > 0 {
            debug!(url = %request_url, discarded, "discarded cookies of unused response");
        }
    }
}

fn prepare_connection_retry(parameters: &mut RequestParameters, error: &WebClientError) {
    info!(
        url = %parameters.url,
        retries_left = parameters.count_connection_retries,
        error = %error,
        "request failed, retrying"
    );
    parameters.decrement_count_connection_retries();
}
