//! HTTP response value.
//!
//! A [`Response`] is what every executor returns and what the cache stores.
//! Its body is an immutable [`Bytes`] buffer: cloning a response or reading
//! its body never drains it.

use bytes::buf::Reader;
use bytes::{Buf, Bytes};

use super::{Headers, StatusCode};

/// An HTTP response: status, ordered headers, and body.
///
/// # Examples
///
/// ```
/// use std::io::Read;
/// use pathcache::http::{Response, StatusCode};
///
/// let response = Response::new(StatusCode::OK)
///     .header("Content-Type", "application/json")
///     .with_body(r#"{"data":"ok"}"#);
///
/// let mut first = String::new();
/// response.body_reader().read_to_string(&mut first).unwrap();
/// let mut second = String::new();
/// response.body_reader().read_to_string(&mut second).unwrap();
/// assert_eq!(first, second);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    status: StatusCode,
    headers: Headers,
    body: Bytes,
}

impl Response {
    /// Creates a new response with the given status and an empty body.
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: Headers::new(),
            body: Bytes::new(),
        }
    }

    /// Assembles a response from already-parsed parts.
    pub fn from_parts(status: StatusCode, headers: Headers, body: Bytes) -> Self {
        Self {
            status,
            headers,
            body,
        }
    }

    /// Appends a response header. Multiple calls with the same name are additive.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Sets the response body.
    #[must_use]
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Returns the body bytes.
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Returns a fresh reader positioned at the start of the body.
    pub fn body_reader(&self) -> Reader<Bytes> {
        self.body.clone().reader()
    }

    /// Returns the body as UTF-8 text.
    pub fn text(&self) -> Result<&str, std::str::Utf8Error> {
        std::str::from_utf8(&self.body)
    }

    /// Deserializes the body as JSON into `T`.
    pub fn json<T>(&self) -> Result<T, serde_json::Error>
    where
        T: serde::de::DeserializeOwned,
    {
        serde_json::from_slice(&self.body)
    }

    /// Splits the response into status, headers, and body.
    pub fn into_parts(self) -> (StatusCode, Headers, Bytes) {
        (self.status, self.headers, self.body)
    }
}

impl Default for Response {
    fn default() -> Self {
        Self::new(StatusCode::OK)
    }
}
