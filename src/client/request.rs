//! Builds engine requests from [`RequestParameters`].

use reqwest::Method;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, USER_AGENT};
use tracing::warn;
use url::Url;

use crate::engine::{EngineRequest, RequestBody};
use crate::error::WebClientError;
use crate::parameters::RequestParameters;

/// Characters allowed in a media type token besides ASCII alphanumerics.
const TOKEN_SYMBOLS: &[u8] = b"!#$%&'*+-.^_`|~";

pub(crate) fn parse_url(raw: &str) -> Result<Url, WebClientError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(WebClientError::invalid_url(raw));
    }
    Url::parse(trimmed).map_err(|_| WebClientError::invalid_url(raw))
}

/// Method, URL, User-Agent and caller headers; POST and PUT also get a body.
pub(crate) fn build_request(
    method: Method,
    url: &Url,
    parameters: &RequestParameters,
) -> Result<EngineRequest, WebClientError> {
    let mut headers = HeaderMap::new();

    if let Some(user_agent) = &parameters.user_agent {
        let value = HeaderValue::from_str(user_agent)
            .map_err(|_| WebClientError::invalid_header(url.as_str(), USER_AGENT.as_str()))?;
        headers.insert(USER_AGENT, value);
    }

    for (name, value) in &parameters.headers {
        let header_name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|_| WebClientError::invalid_header(url.as_str(), name.as_str()))?;
        let header_value = HeaderValue::from_str(value)
            .map_err(|_| WebClientError::invalid_header(url.as_str(), name.as_str()))?;
        headers.insert(header_name, header_value);
    }

    let body = carries_body(&method).then(|| RequestBody {
        content: parameters.body.clone().unwrap_or_default(),
        content_type: parameters
            .content_type
            .as_deref()
            .and_then(parse_content_type),
    });

    Ok(EngineRequest {
        method,
        url: url.clone(),
        headers,
        body,
    })
}

fn carries_body(method: &Method) -> bool {
    *method == Method::POST || *method == Method::PUT
}

/// Validates `type/subtype[; params]`; anything else is logged and dropped.
fn parse_content_type(raw: &str) -> Option<HeaderValue> {
    let parsed = raw
        .split(';')
        .next()
        .and_then(|essence| essence.trim().split_once('/'))
        .filter(|(kind, subtype)| is_token(kind) && is_token(subtype))
        .and_then(|_| HeaderValue::from_str(raw.trim()).ok());

    if parsed.is_none() {
        warn!(content_type = %raw, "could not parse content type, sending body untyped");
    }
    parsed
}

fn is_token(value: &str) -> bool {
    !value.is_empty()
        && value
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || TOKEN_SYMBOLS.contains(&b))
}
