//! Per-URL cookie staging and harvesting.
//!
//! The engine asks for cookies when it sends a request and reports cookies
//! when a response arrives, but it only tells us the URL. The jar therefore
//! keeps two maps keyed by URL:
//!
//! - *staged* cookies, written by the client right before a request and handed
//!   to the engine by [`CookieInterceptor::on_before_send`];
//! - *harvested* cookies, recorded by [`CookieInterceptor::on_after_receive`]
//!   and popped by the client when it maps the response.
//!
//! # Concurrency
//!
//! The maps are thread-safe, but the logical ownership of an entry is only
//! well defined while at most one request per URL is in flight on a client.
//! Two concurrent calls to the same URL may observe each other's staged or
//! harvested cookies. This is a documented limitation, not a supported
//! pattern.

use dashmap::DashMap;
use tracing::debug;
use url::Url;

use super::StoredCookie;

/// Hooks the engine calls around every exchange.
pub trait CookieInterceptor: Send + Sync {
    /// Cookies to attach to a request for `url`.
    fn on_before_send(&self, url: &Url) -> Vec<StoredCookie>;

    /// Cookies received in a response for `url`.
    fn on_after_receive(&self, url: &Url, cookies: Vec<StoredCookie>);
}

/// Staging and harvest maps shared by all calls of one client.
#[derive(Debug, Default)]
pub struct CookieJar {
    staged: DashMap<String, Vec<StoredCookie>>,
    received: DashMap<String, Vec<StoredCookie>>,
}

impl CookieJar {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the cookies to send with the next request to `url`.
    pub fn stage(&self, url: &Url, cookies: Vec<StoredCookie>) {
        self.staged.insert(url_key(url), cookies);
    }

    /// Removes staged cookies for `url`.
    pub fn clear_staged(&self, url: &Url) {
        self.staged.remove(&url_key(url));
    }

    /// Pops the cookies harvested for `url`.
    #[must_use]
    pub fn take_received(&self, url: &Url) -> Vec<StoredCookie> {
        self.received
            .remove(&url_key(url))
            .map(|(_, cookies)| cookies)
            .unwrap_or_default()
    }

    /// Whether cookies are currently staged for `url`.
    #[must_use]
    pub fn has_staged(&self, url: &Url) -> bool {
        self.staged.contains_key(&url_key(url))
    }

    /// Number of URLs with staged cookies.
    #[must_use]
    pub fn staged_len(&self) -> usize {
        self.staged.len()
    }
}

impl CookieInterceptor for CookieJar {
    fn on_before_send(&self, url: &Url) -> Vec<StoredCookie> {
        self.staged
            .get(&url_key(url))
            .map(|cookies| cookies.value().clone())
            .unwrap_or_default()
    }

    fn on_after_receive(&self, url: &Url, cookies: Vec<StoredCookie>) {
        debug!(url = %url, count = cookies.len(), "harvested response cookies");
        self.received.insert(url_key(url), cookies);
    }
}

/// Scheme, host, port, path and query; the fragment never reaches the server.
fn url_key(url: &Url) -> String {
    let mut key = url.clone();
    key.set_fragment(None);
    key.into()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::cookies::Cookie;

    fn url(raw: &str) -> Url {
        Url::parse(raw).unwrap()
    }

    fn stored(name: &str) -> StoredCookie {
        StoredCookie::from(&Cookie::new(name, "v", "example.test", "/"))
    }

    #[test]
    fn test_before_send_returns_exactly_staged_cookies() {
        let jar = CookieJar::new();
        let target = url("https://example.test/a?q=1");
        jar.stage(&target, vec![stored("a"), stored("b")]);

        let loaded = jar.on_before_send(&target);
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].name(), "a");
    }

    #[test]
    fn test_before_send_unknown_url_is_empty() {
        let jar = CookieJar::new();
        jar.stage(&url("https://example.test/a"), vec![stored("a")]);

        assert!(jar.on_before_send(&url("https://example.test/b")).is_empty());
        assert!(jar.on_before_send(&url("https://example.test/a?x=1")).is_empty());
    }

    #[test]
    fn test_fragment_is_not_part_of_key() {
        let jar = CookieJar::new();
        jar.stage(&url("https://example.test/a#top"), vec![stored("a")]);
        assert_eq!(jar.on_before_send(&url("https://example.test/a")).len(), 1);
    }

    #[test]
    fn test_take_received_pops_entry() {
        let jar = CookieJar::new();
        let target = url("https://example.test/login");
        jar.on_after_receive(&target, vec![stored("sid")]);

        assert_eq!(jar.take_received(&target).len(), 1);
        assert!(jar.take_received(&target).is_empty());
    }

    #[test]
    fn test_after_receive_overwrites_previous_harvest() {
        let jar = CookieJar::new();
        let target = url("https://example.test/");
        jar.on_after_receive(&target, vec![stored("old")]);
        jar.on_after_receive(&target, vec![stored("new")]);

        let cookies = jar.take_received(&target);
        assert_eq!(cookies.len(), 1);
        assert_eq!(cookies[0].name(), "new");
    }

    #[test]
    fn test_clear_staged() {
        let jar = CookieJar::new();
        let target = url("https://example.test/");
        jar.stage(&target, vec![stored("a")]);
        assert!(jar.has_staged(&target));

        jar.clear_staged(&target);
        assert!(!jar.has_staged(&target));
        assert_eq!(jar.staged_len(), 0);
    }
}
