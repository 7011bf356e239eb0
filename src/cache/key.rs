//! Cache key derivation.

use std::borrow::Borrow;
use std::fmt;

use crate::http::Request;

/// Identifies a cache entry.
///
/// A key derived from a request is the URL path and nothing else. Scheme,
/// host, query string, method, headers, and body are ignored, so
/// `GET http://a/x?page=1` and `POST http://b/x` share one entry. This is a
/// deliberately coarse policy; callers that need finer keys must not route
/// such requests through the same cache.
///
/// # Examples
///
/// ```
/// use pathcache::cache::CacheKey;
/// use pathcache::http::Request;
///
/// let a = Request::get("http://one.example/users/1?fields=name").unwrap();
/// let b = Request::get("http://two.example/users/1").unwrap();
/// assert_eq!(CacheKey::from_request(&a), CacheKey::from_request(&b));
/// assert_eq!(CacheKey::from_request(&a).as_str(), "/users/1");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Derives the key for `request` from its URL path.
    pub fn from_request(request: &Request) -> Self {
        Self(request.path().to_owned())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for CacheKey {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for CacheKey {
    fn from(key: &str) -> Self {
        Self::new(key)
    }
}

impl From<String> for CacheKey {
    fn from(key: String) -> Self {
        Self(key)
    }
}

impl From<&Request> for CacheKey {
    fn from(request: &Request) -> Self {
        Self::from_request(request)
    }
}
