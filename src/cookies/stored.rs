//! Engine side cookie representation.
//!
//! A [`StoredCookie`] is what the cookie jar hands to and receives from the
//! HTTP engine. It is always fully resolved: domain and path are filled in
//! from the request URL when the `Set-Cookie` header omits them, and expiry is
//! an absolute epoch-millisecond value.

use time::OffsetDateTime;
use tracing::debug;
use url::Url;

use super::{Cookie, NO_EXPIRY};

/// A cookie as exchanged with the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredCookie {
    name: String,
    value: String,
    domain: String,
    path: String,
    expires_at: i64,
    secure: bool,
    http_only: bool,
    persistent: bool,
    host_only: bool,
}

impl StoredCookie {
    /// Parses a `Set-Cookie` header value received for `url`.
    ///
    /// Returns `None` when the header is malformed or the URL has no host.
    #[must_use]
    pub fn parse(set_cookie: &str, url: &Url) -> Option<Self> {
        Self::parse_at(set_cookie, url, OffsetDateTime::now_utc())
    }

    pub(crate) fn parse_at(set_cookie: &str, url: &Url, now: OffsetDateTime) -> Option<Self> {
        let parsed = match cookie::Cookie::parse(set_cookie) {
            Ok(parsed) => parsed,
            Err(error) => {
                debug!(error = %error, url = %url, "ignoring malformed Set-Cookie header");
                return None;
            }
        };
        let host = url.host_str()?.to_ascii_lowercase();

        let (domain, host_only) = match parsed.domain() {
            Some(domain) if !domain.trim_start_matches('.').is_empty() => {
                (domain.trim_start_matches('.').to_ascii_lowercase(), false)
            }
            _ => (host, true),
        };

        let path = parsed
            .path()
            .filter(|path| path.starts_with('/'))
            .map_or_else(|| default_path(url), str::to_string);

        // Max-Age wins over Expires.
        let expires_at = if let Some(max_age) = parsed.max_age() {
            if max_age.is_positive() {
                to_epoch_millis(now.saturating_add(max_age))
            } else {
                0
            }
        } else if let Some(expires) = parsed.expires_datetime() {
            to_epoch_millis(expires)
        } else {
            NO_EXPIRY
        };

        Some(Self {
            name: parsed.name().to_string(),
            value: parsed.value().to_string(),
            domain,
            path,
            expires_at,
            secure: parsed.secure().unwrap_or(false),
            http_only: parsed.http_only().unwrap_or(false),
            persistent: expires_at != NO_EXPIRY,
            host_only,
        })
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }

    #[must_use]
    pub fn domain(&self) -> &str {
        &self.domain
    }

    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    #[must_use]
    pub fn expires_at(&self) -> i64 {
        self.expires_at
    }

    #[must_use]
    pub fn secure(&self) -> bool {
        self.secure
    }

    #[must_use]
    pub fn http_only(&self) -> bool {
        self.http_only
    }

    #[must_use]
    pub fn persistent(&self) -> bool {
        self.persistent
    }

    #[must_use]
    pub fn host_only(&self) -> bool {
        self.host_only
    }
}

impl From<&StoredCookie> for Cookie {
    fn from(stored: &StoredCookie) -> Self {
        Cookie::new(
            stored.name.clone(),
            stored.value.clone(),
            stored.domain.clone(),
            stored.path.clone(),
        )
        .with_expires_at(stored.expires_at)
        .with_secure(stored.secure)
        .with_http_only(stored.http_only)
        .with_persistent(stored.persistent)
        .with_host_only(stored.host_only)
    }
}

/// The caller's `persistent` flag is not carried over: on the engine side it
/// is derived from whether the cookie has an expiry.
impl From<&Cookie> for StoredCookie {
    fn from(cookie: &Cookie) -> Self {
        Self {
            name: cookie.name().to_string(),
            value: cookie.value().to_string(),
            domain: cookie.domain().to_string(),
            path: cookie.path().to_string(),
            expires_at: cookie.expires_at(),
            secure: cookie.secure(),
            http_only: cookie.http_only(),
            persistent: cookie.expires_at() != NO_EXPIRY,
            host_only: cookie.host_only(),
        }
    }
}

/// Renders cookies as a `Cookie` request header value, `None` if empty.
pub(crate) fn cookie_header_value(cookies: &[StoredCookie]) -> Option<String> {
    if cookies.is_empty() {
        return None;
    }
    Some(
        cookies
            .iter()
            .map(|cookie| format!("{}={}", cookie.name, cookie.value))
            .collect::<Vec<_>>()
            .join("; "),
    )
}

/// RFC 6265 default-path: the request path up to, not including, its last `/`.
fn default_path(url: &Url) -> String {
    let path = url.path();
    match path.rfind('/') {
        Some(0) | None => "/".to_string(),
        Some(index) => path[..index].to_string(),
    }
}

fn to_epoch_millis(datetime: OffsetDateTime) -> i64 {
    let millis = datetime.unix_timestamp_nanos() / 1_000_000;
    i64::try_from(millis).unwrap_or(i64::MAX)
}
