//! Cookie model and the per-URL cookie staging used by the client.
//!
//! - [`Cookie`] is the caller facing value: what gets sent and what comes back.
//! - [`StoredCookie`] is the engine side representation parsed from `Set-Cookie`.
//! - [`CookieJar`] stages outgoing cookies and harvests incoming ones per URL.

mod jar;
mod stored;

use std::fmt;

use serde::Serialize;

pub use jar::{CookieInterceptor, CookieJar};
pub use stored::StoredCookie;
pub(crate) use stored::cookie_header_value;

/// Sentinel for [`Cookie::expires_at`] meaning "no expiry" (session cookie).
pub const NO_EXPIRY: i64 = i64::MIN;

/// An HTTP cookie. Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Cookie {
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

impl Cookie {
    /// Creates a session cookie with all flags cleared.
    pub fn new(
        name: impl Into<String>,
        value: impl Into<String>,
        domain: impl Into<String>,
        path: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            domain: domain.into(),
            path: path.into(),
            expires_at: NO_EXPIRY,
            secure: false,
            http_only: false,
            persistent: false,
            host_only: false,
        }
    }

    /// Sets the absolute expiry in epoch milliseconds.
    #[must_use]
    pub fn with_expires_at(mut self, expires_at: i64) -> Self {
        self.expires_at = expires_at;
        self
    }

    #[must_use]
    pub fn with_secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    #[must_use]
    pub fn with_http_only(mut self, http_only: bool) -> Self {
        self.http_only = http_only;
        self
    }

    #[must_use]
    pub fn with_persistent(mut self, persistent: bool) -> Self {
        self.persistent = persistent;
        self
    }

    #[must_use]
    pub fn with_host_only(mut self, host_only: bool) -> Self {
        self.host_only = host_only;
        self
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

    /// Absolute expiry in epoch milliseconds, or [`NO_EXPIRY`].
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

    /// Whether the cookie outlives the session.
    ///
    /// Reported for received cookies only; when a cookie is handed to the
    /// engine this flag is derived from [`expires_at`](Self::expires_at).
    #[must_use]
    pub fn persistent(&self) -> bool {
        self.persistent
    }

    #[must_use]
    pub fn host_only(&self) -> bool {
        self.host_only
    }
}

impl fmt::Display for Cookie {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.value)
    }
}
