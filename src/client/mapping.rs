//! Turns an accepted engine response into a [`WebClientResponse`].

use std::collections::HashMap;

use futures_util::StreamExt;
use reqwest::header::HeaderMap;
use tokio::runtime::Handle;
use tracing::error;
use url::Url;

use super::streaming;
use crate::cookies::{Cookie, CookieJar};
use crate::engine::{BodyStream, EngineResponse};
use crate::error::WebClientError;
use crate::parameters::{RequestParameters, ResponseType};
use crate::response::{ResponseBody, ResponseStream, WebClientResponse};

/// Status, headers and cookies of a response whose body is still unread.
#[derive(Debug)]
pub(crate) struct ResponseHead {
    successful: bool,
    response_code: i32,
    headers: HashMap<String, String>,
    cookies: Vec<Cookie>,
}

impl ResponseHead {
    pub(crate) fn into_response(self) -> WebClientResponse {
        WebClientResponse::new(
            self.successful,
            self.response_code,
            Some(self.headers),
            self.cookies,
        )
    }

    /// Keeps the metadata but reports the call as failed.
    pub(crate) fn into_failure(self, error: WebClientError) -> WebClientResponse {
        WebClientResponse::new(false, self.response_code, Some(self.headers), self.cookies)
            .with_error(error)
    }
}

/// Harvests cookies, clears staged ones and materializes the body according
/// to the requested [`ResponseType`].
pub(crate) async fn map_response(
    parameters: &RequestParameters,
    request_url: &Url,
    response: EngineResponse,
    cookie_jar: &CookieJar,
    runtime: Option<&Handle>,
) -> WebClientResponse {
    let EngineResponse {
        status,
        url: final_url,
        headers,
        content_length,
        body,
    } = response;

    let head = ResponseHead {
        successful: status.is_success(),
        response_code: i32::from(status.as_u16()),
        headers: copy_headers(&headers),
        cookies: harvest_cookies(cookie_jar, request_url, &final_url),
    };
    cookie_jar.clear_staged(request_url);
    if final_url != *request_url {
        cookie_jar.clear_staged(&final_url);
    }

    match parameters.response_type {
        ResponseType::String => match read_body(body).await {
            Ok(bytes) => head
                .into_response()
                .with_body(ResponseBody::Text(String::from_utf8_lossy(&bytes).into_owned())),
            Err(error) => body_read_failed(parameters, head, error),
        },
        ResponseType::Bytes => match read_body(body).await {
            Ok(bytes) => head.into_response().with_body(ResponseBody::Bytes(bytes)),
            Err(error) => body_read_failed(parameters, head, error),
        },
        ResponseType::Stream => head
            .into_response()
            .with_body(ResponseBody::Stream(ResponseStream::new(
                body,
                runtime.cloned(),
            ))),
        ResponseType::StreamWithProgressListener => {
            streaming::download_with_progress(parameters, head, body, content_length).await
        }
    }
}

/// Buffers the whole body. The stream is dropped on return, closing it.
async fn read_body(mut body: BodyStream) -> Result<Vec<u8>, WebClientError> {
    let mut buffer = Vec::new();
    while let Some(chunk) = body.next().await {
        buffer.extend_from_slice(&chunk?);
    }
    Ok(buffer)
}

fn body_read_failed(
    parameters: &RequestParameters,
    head: ResponseHead,
    error: WebClientError,
) -> WebClientResponse {
    error!(url = %parameters.url, error = %error, "could not read response body");
    head.into_failure(error)
}

/// Flattens headers to one value per name; a repeated header keeps its last value.
fn copy_headers(headers: &HeaderMap) -> HashMap<String, String> {
    headers
        .iter()
        .map(|(name, value)| {
            (
                name.as_str().to_string(),
                String::from_utf8_lossy(value.as_bytes()).into_owned(),
            )
        })
        .collect()
}

/// Cookies set on the final URL, followed by those set on the request URL
/// when a redirect moved the exchange elsewhere.
fn harvest_cookies(cookie_jar: &CookieJar, request_url: &Url, final_url: &Url) -> Vec<Cookie> {
    let mut harvested = cookie_jar.take_received(final_url);
    if final_url != request_url {
        harvested.extend(cookie_jar.take_received(request_url));
    }
    harvested.iter().map(Cookie::from).collect()
}
