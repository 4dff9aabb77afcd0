//! Default User-Agent strings.
//!
//! Requests identify as a desktop browser unless the caller overrides the
//! User-Agent on their [`RequestParameters`](crate::RequestParameters).

/// Desktop Chrome on Windows, sent by default.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
    AppleWebKit/537.36 (KHTML, like Gecko) Chrome/70.0.3538.77 Safari/537.36";

/// Android stock browser, for sites that serve lighter mobile pages.
pub const DEFAULT_MOBILE_USER_AGENT: &str = "Mozilla/5.0 (Linux; U; Android 4.0.3; ko-kr; \
    LG-L160L Build/IML74K) AppleWebkit/534.30 (KHTML, like Gecko) Version/4.0 Mobile \
    Safari/534.30";
