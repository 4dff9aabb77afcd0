//! Web Client Library
//!
//! A small HTTP client for GET, POST, PUT and HEAD calls with a per-request
//! retry budget, per-request cookies and a choice of how the body comes back.
//!
//! # Architecture
//!
//! - [`client`] - [`WebClient`], the retry loop and response mapping
//! - [`engine`] - the transport seam; [`ReqwestEngine`] in production
//! - [`cookies`] - cookie values and the per-URL staging jar
//! - [`parameters`] - per-request and per-client knobs
//! - [`response`] - the unified [`WebClientResponse`]
//!
//! ```no_run
//! use webclient::{RequestParameters, WebClient, content_type};
//!
//! let client = WebClient::new();
//! let mut parameters = RequestParameters::new("https://example.com/api")
//!     .with_body(r#"{"name":"value"}"#)
//!     .with_content_type(content_type::JSON);
//! let response = client.post(&mut parameters);
//! if response.is_successful() {
//!     println!("{}", response.body().unwrap_or_default());
//! }
//! ```

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod cancel;
pub mod client;
pub mod content_type;
pub mod cookies;
pub mod engine;
pub mod error;
pub mod parameters;
pub mod response;
#[cfg(test)]
pub mod test_support;
pub mod user_agent;

// Re-export commonly used types
pub use cancel::CancellationToken;
pub use client::{RetryDecision, WebClient, is_connection_failure};
pub use cookies::{Cookie, CookieInterceptor, CookieJar, NO_EXPIRY, StoredCookie};
pub use engine::{EngineRequest, EngineResponse, HttpEngine, ReqwestEngine};
pub use error::WebClientError;
pub use parameters::{
    DEFAULT_COUNT_CONNECTION_RETRIES, DEFAULT_DOWNLOAD_BUFFER_SIZE, DownloadProgressListener,
    RequestParameters, ResponseType, WebClientParameters,
};
pub use response::{NO_RESPONSE_CODE, ResponseBody, ResponseStream, WebClientResponse};
pub use user_agent::{DEFAULT_MOBILE_USER_AGENT, DEFAULT_USER_AGENT};
