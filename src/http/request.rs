//! Outgoing HTTP request builder.
//!
//! A [`Request`] names an absolute URL and carries everything an executor
//! needs to send it. [`Request::into_bytes`] produces the HTTP/1.0 wire form
//! used by [`HttpExecutor`](crate::executor::HttpExecutor).

use bytes::{BufMut, Bytes, BytesMut};
use thiserror::Error;
use url::Url;

use super::headers::{is_clean_value, is_token};
use super::{Headers, Method};

/// Errors produced while building or serializing a [`Request`].
#[derive(Debug, Error)]
pub enum RequestError {
    #[error("invalid request URL `{url}`: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("header name `{0}` is not a valid HTTP token")]
    InvalidHeaderName(String),

    #[error("value of header `{name}` contains control characters or surrounding whitespace")]
    InvalidHeaderValue { name: String },

    #[error("method `{0}` is not a valid HTTP token")]
    InvalidMethod(String),
}

/// An outgoing HTTP request.
///
/// # Examples
///
/// ```
/// use pathcache::http::{Method, Request};
///
/// let request = Request::get("http://example.com/api/v1/employee/1?verbose=true")
///     .unwrap()
///     .header("Accept", "application/json");
///
/// assert_eq!(request.method(), &Method::Get);
/// assert_eq!(request.path(), "/api/v1/employee/1");
/// assert_eq!(request.url().query(), Some("verbose=true"));
/// assert_eq!(request.headers().get("accept"), Some("application/json"));
/// ```
#[derive(Debug, Clone)]
pub struct Request {
    method: Method,
    url: Url,
    headers: Headers,
    body: Option<Bytes>,
}

impl Request {
    /// Creates a request with no headers and no body.
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            headers: Headers::new(),
            body: None,
        }
    }

    /// Parses `url` and creates a `GET` request for it.
    ///
    /// # Errors
    ///
    /// Returns [`RequestError::InvalidUrl`] if `url` is not an absolute URL.
    pub fn get(url: impl AsRef<str>) -> Result<Self, RequestError> {
        Self::parse(Method::Get, url)
    }

    /// Parses `url` and creates a request with the given method.
    ///
    /// # Errors
    ///
    /// Returns [`RequestError::InvalidUrl`] if `url` is not an absolute URL.
    pub fn parse(method: Method, url: impl AsRef<str>) -> Result<Self, RequestError> {
        let raw = url.as_ref();
        let url = Url::parse(raw).map_err(|source| RequestError::InvalidUrl {
            url: raw.to_owned(),
            source,
        })?;
        Ok(Self::new(method, url))
    }

    /// Appends a request header. Multiple calls with the same name are additive.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Sets the request body.
    #[must_use]
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Returns the URL path, without query string or fragment.
    pub fn path(&self) -> &str {
        self.url.path()
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    pub fn body_bytes(&self) -> Option<&Bytes> {
        self.body.as_ref()
    }

    /// Checks that the method and every header can be written without
    /// changing the request's framing.
    ///
    /// # Errors
    ///
    /// Returns [`RequestError::InvalidMethod`] for a custom method that is not
    /// an HTTP token, [`RequestError::InvalidHeaderName`] for a non-token
    /// header name, and [`RequestError::InvalidHeaderValue`] for a value with
    /// CR, LF or other control bytes.
    pub fn validate(&self) -> Result<(), RequestError> {
        if !is_token(self.method.as_str()) {
            return Err(RequestError::InvalidMethod(self.method.to_string()));
        }
        for (name, value) in self.headers.iter() {
            if !is_token(name) {
                return Err(RequestError::InvalidHeaderName(name.to_owned()));
            }
            if !is_clean_value(value) {
                return Err(RequestError::InvalidHeaderValue {
                    name: name.to_owned(),
                });
            }
        }
        Ok(())
    }

    /// Serializes the request into HTTP/1.0 wire format.
    ///
    /// The request is [validated](Self::validate) first, so nothing a caller
    /// supplies can end a line early or add a header.
    ///
    /// Writes, in order:
    /// - the request line with the path and query as the request target;
    /// - `Host` (with the port when it is not the scheme default), unless the
    ///   caller set one;
    /// - every caller header verbatim;
    /// - `Content-Length` when a body is present and the caller did not set it;
    /// - `Connection: close`.
    ///
    /// # Errors
    ///
    /// Returns the first error [`validate`](Self::validate) reports.
    pub fn into_bytes(self) -> Result<BytesMut, RequestError> {
        self.validate()?;

        let body = self.body.unwrap_or_default();
        let estimated_size = 128 + self.headers.len() * 64 + body.len();
        let mut buf = BytesMut::with_capacity(estimated_size);

        let target = match self.url.query() {
            Some(query) => format!("{}?{}", self.url.path(), query),
            None => self.url.path().to_owned(),
        };
        buf.put(format!("{} {} HTTP/1.0\r\n", self.method, target).as_bytes());

        if !self.headers.contains("host") {
            if let Some(host) = self.url.host_str() {
                let authority = match self.url.port() {
                    Some(port) => format!("{host}:{port}"),
                    None => host.to_owned(),
                };
                buf.put(format!("Host: {authority}\r\n").as_bytes());
            }
        }

        for (name, value) in self.headers.iter() {
            buf.put(format!("{name}: {value}\r\n").as_bytes());
        }

        if !body.is_empty() && !self.headers.contains("content-length") {
            buf.put(format!("Content-Length: {}\r\n", body.len()).as_bytes());
        }
        if !self.headers.contains("connection") {
            buf.put(&b"Connection: close\r\n"[..]);
        }

        buf.put(&b"\r\n"[..]);
        buf.put(body);
        Ok(buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn to_string(bytes: Result<BytesMut, RequestError>) -> String {
        String::from_utf8(bytes.unwrap().to_vec()).unwrap()
    }

    #[test]
    fn rejects_relative_url() {
        let err = Request::get("/only/a/path").unwrap_err();
        assert!(matches!(err, RequestError::InvalidUrl { .. }));
    }

    #[test]
    fn path_excludes_query() {
        let req = Request::get("http://example.com/search?q=rust").unwrap();
        assert_eq!(req.path(), "/search");
    }

    #[test]
    fn bare_host_has_root_path() {
        let req = Request::get("http://example.com").unwrap();
        assert_eq!(req.path(), "/");
    }

    #[test]
    fn wire_format_get() {
        let req = Request::get("http://example.com:8080/a?b=c")
            .unwrap()
            .header("Accept", "*/*");
        let s = to_string(req.into_bytes());
        assert!(s.starts_with("GET /a?b=c HTTP/1.0\r\n"));
        assert!(s.contains("Host: example.com:8080\r\n"));
        assert!(s.contains("Accept: */*\r\n"));
        assert!(s.contains("Connection: close\r\n"));
        assert!(!s.contains("Content-Length"));
        assert!(s.ends_with("\r\n\r\n"));
    }

    #[test]
    fn crlf_in_header_value_is_rejected() {
        let req = Request::get("http://example.com/a")
            .unwrap()
            .header("X-Note", "hi\r\nX-Injected: yes");
        let err = req.into_bytes().unwrap_err();
        assert!(matches!(err, RequestError::InvalidHeaderValue { ref name } if name == "X-Note"));
    }

    #[test]
    fn bad_header_name_is_rejected() {
        let req = Request::get("http://example.com/a")
            .unwrap()
            .header("X-Note: x\r\nX-Injected", "yes");
        assert!(matches!(
            req.validate(),
            Err(RequestError::InvalidHeaderName(_))
        ));
    }

    #[test]
    fn custom_method_must_be_a_token() {
        let method = Method::Custom("GET /admin HTTP/1.0\r\nX:".to_owned());
        let req = Request::parse(method, "http://example.com/a").unwrap();
        assert!(matches!(
            req.into_bytes(),
            Err(RequestError::InvalidMethod(_))
        ));

        let purge = Request::parse("PURGE".parse().unwrap(), "http://example.com/a").unwrap();
        assert!(to_string(purge.into_bytes()).starts_with("PURGE /a HTTP/1.0\r\n"));
    }

    #[test]
    fn wire_format_post_with_body() {
        let req = Request::parse(Method::Post, "http://example.com/items")
            .unwrap()
            .body("hello");
        let s = to_string(req.into_bytes());
        assert!(s.starts_with("POST /items HTTP/1.0\r\n"));
        assert!(s.contains("Host: example.com\r\n"));
        assert!(s.contains("Content-Length: 5\r\n"));
        assert!(s.ends_with("\r\n\r\nhello"));
    }

    #[test]
    fn caller_host_header_wins() {
        let req = Request::get("http://127.0.0.1/").unwrap().header("Host", "api.local");
        let s = to_string(req.into_bytes());
        assert!(s.contains("Host: api.local\r\n"));
        assert!(!s.contains("Host: 127.0.0.1"));
    }
}
