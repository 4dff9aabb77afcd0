//! MIME type constants for request bodies.
//!
//! Each constant carries the type its name says. The source mapping this set
//! is derived from rotated three of them (`JSON` held the form-urlencoded
//! type, `XML` the JSON type and `FORM_URL_ENCODED` the XML type); that
//! pairing is not reproduced here.

pub const JSON: &str = "application/json; charset=UTF-8";

pub const XML: &str = "application/xml; charset=UTF-8";

pub const FORM_URL_ENCODED: &str = "application/x-www-form-urlencoded; charset=UTF-8";

pub const MULTIPART: &str = "multipart/form-data; charset=UTF-8";

pub const PLAIN_TEXT: &str = "text/plain; charset=UTF-8";
