//! Unified response returned by every call.

mod stream;

use std::collections::HashMap;

use crate::cookies::Cookie;
use crate::error::WebClientError;

pub use stream::ResponseStream;

/// Response code of a call that never obtained a response.
pub const NO_RESPONSE_CODE: i32 = -1;

/// Body payload, selected by the requested [`ResponseType`](crate::ResponseType).
#[derive(Debug)]
pub enum ResponseBody {
    Text(String),
    Bytes(Vec<u8>),
    Stream(ResponseStream),
}

/// Result of one logical call, successful or not.
///
/// At most one payload is present. A failed call carries the captured error
/// and whatever status, headers and cookies were obtained before it failed.
#[derive(Debug)]
pub struct WebClientResponse {
    successful: bool,
    response_code: i32,
    headers: Option<HashMap<String, String>>,
    cookies: Vec<Cookie>,
    error: Option<WebClientError>,
    body: Option<ResponseBody>,
}

impl WebClientResponse {
    #[must_use]
    pub fn new(
        successful: bool,
        response_code: i32,
        headers: Option<HashMap<String, String>>,
        cookies: Vec<Cookie>,
    ) -> Self {
        Self {
            successful,
            response_code,
            headers,
            cookies,
            error: None,
            body: None,
        }
    }

    /// A failure without any response data.
    #[must_use]
    pub fn failed(error: WebClientError) -> Self {
        Self::new(false, NO_RESPONSE_CODE, None, Vec::new()).with_error(error)
    }

    #[must_use]
    pub fn with_body(mut self, body: ResponseBody) -> Self {
        self.body = Some(body);
        self
    }

    #[must_use]
    pub fn with_error(mut self, error: WebClientError) -> Self {
        self.error = Some(error);
        self
    }

    #[must_use]
    pub fn is_successful(&self) -> bool {
        self.successful
    }

    /// HTTP status, or [`NO_RESPONSE_CODE`].
    #[must_use]
    pub fn response_code(&self) -> i32 {
        self.response_code
    }

    #[must_use]
    pub fn headers(&self) -> Option<&HashMap<String, String>> {
        self.headers.as_ref()
    }

    #[must_use]
    pub fn cookies(&self) -> &[Cookie] {
        &self.cookies
    }

    #[must_use]
    pub fn error(&self) -> Option<&WebClientError> {
        self.error.as_ref()
    }

    /// Text body, present in `String` mode.
    #[must_use]
    pub fn body(&self) -> Option<&str> {
        match &self.body {
            Some(ResponseBody::Text(text)) => Some(text),
            _ => None,
        }
    }

    /// Raw body, present in `Bytes` mode.
    #[must_use]
    pub fn received_data(&self) -> Option<&[u8]> {
        match &self.body {
            Some(ResponseBody::Bytes(bytes)) => Some(bytes),
            _ => None,
        }
    }

    #[must_use]
    pub fn has_response_stream(&self) -> bool {
        matches!(self.body, Some(ResponseBody::Stream(_)))
    }

    /// Takes the open body stream, present in `Stream` mode.
    #[must_use]
    pub fn into_response_stream(self) -> Option<ResponseStream> {
        match self.body {
            Some(ResponseBody::Stream(stream)) => Some(stream),
            _ => None,
        }
    }

    #[must_use]
    pub fn payload(&self) -> Option<&ResponseBody> {
        self.body.as_ref()
    }

    #[must_use]
    pub fn into_payload(self) -> Option<ResponseBody> {
        self.body
    }

    /// Looks up a header ignoring ASCII case.
    #[must_use]
    pub fn get_header_value(&self, header_name: &str) -> Option<&str> {
        self.headers
            .as_ref()?
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(header_name))
            .map(|(_, value)| value.as_str())
    }

    #[must_use]
    pub fn is_informational_response(&self) -> bool {
        (100..200).contains(&self.response_code)
    }

    #[must_use]
    pub fn is_success_response(&self) -> bool {
        (200..300).contains(&self.response_code)
    }

    #[must_use]
    pub fn is_redirection_response(&self) -> bool {
        (300..400).contains(&self.response_code)
    }

    #[must_use]
    pub fn is_client_error_response(&self) -> bool {
        (400..500).contains(&self.response_code)
    }

    #[must_use]
    pub fn is_server_error_response(&self) -> bool {
        (500..600).contains(&self.response_code)
    }

    #[must_use]
    pub fn contains_cookie(&self, cookie_name: &str) -> bool {
        self.get_cookie(cookie_name).is_some()
    }

    /// First cookie with the given name.
    #[must_use]
    pub fn get_cookie(&self, cookie_name: &str) -> Option<&Cookie> {
        self.cookies.iter().find(|cookie| cookie.name() == cookie_name)
    }
}
