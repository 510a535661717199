//! Response model
//!
//! A plain value: status line, ordered headers, ordered cookies and body
//! bytes. Named constructors fix the status line; the caller supplies the rest.

use hyper::body::Bytes;
use indexmap::IndexMap;

pub const STATUS_OK: &str = "200 OK";
pub const STATUS_NOT_FOUND: &str = "404 Not Found";
pub const STATUS_SERVER_ERROR: &str = "500 Internal Server Error";

pub const CONTENT_TYPE: &str = "Content-Type";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: String,
    pub headers: IndexMap<String, String>,
    pub cookies: IndexMap<String, String>,
    pub body: Bytes,
}

impl Response {
    fn with_status(status: &str, body: impl Into<Bytes>) -> Self {
        Self {
            status: status.to_string(),
            headers: IndexMap::new(),
            cookies: IndexMap::new(),
            body: body.into(),
        }
    }

    /// `200 OK`
    pub fn ok(body: impl Into<Bytes>) -> Self {
        Self::with_status(STATUS_OK, body)
    }

    /// `404 Not Found`
    pub fn not_found(body: impl Into<Bytes>) -> Self {
        Self::with_status(STATUS_NOT_FOUND, body)
    }

    /// `500 Internal Server Error`
    pub fn server_error(body: impl Into<Bytes>) -> Self {
        Self::with_status(STATUS_SERVER_ERROR, body)
    }

    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    #[must_use]
    pub fn with_headers<I, K, V>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.headers
            .extend(headers.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    #[must_use]
    pub fn with_cookie(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.cookies.insert(name.into(), value.into());
        self
    }

    /// Look up a header ignoring ASCII case
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Set a header only when no header of that name (any case) exists
    pub fn set_header_if_absent(&mut self, name: &str, value: impl Into<String>) {
        if self.header(name).is_none() {
            self.headers.insert(name.to_string(), value.into());
        }
    }

    /// Numeric code from the status line, `None` when it does not start with one
    pub fn status_code(&self) -> Option<u16> {
        parse_status_code(&self.status)
    }
}

impl Default for Response {
    fn default() -> Self {
        Self::ok(Bytes::new())
    }
}

/// Parse the leading code of a `"<code> <reason>"` status line
pub fn parse_status_code(status: &str) -> Option<u16> {
    status.split_whitespace().next()?.parse().ok()
}
