//! In-memory response cache.
//!
//! [`CacheStore`] maps a [`CacheKey`] to a serialized response. Entries are
//! written once through [`codec::encode`] and rebuilt on every read through
//! [`codec::decode`], so each hit hands the caller an independent
//! [`Response`] value.
//!
//! ## Locking
//!
//! The map sits behind a reader/writer lock. Any number of [`get`] calls run
//! together; [`set`] takes the lock exclusively, but only for the map insert.
//! Encoding happens before the write lock is taken and decoding happens under
//! the read lock, so no lock is ever held across I/O.
//!
//! [`get`]: CacheStore::get
//! [`set`]: CacheStore::set

use std::collections::HashMap;

use bytes::Bytes;
use parking_lot::RwLock;
use thiserror::Error;

use crate::http::Response;

pub mod codec;
pub mod key;

pub use codec::{DecodeError, EncodeError};
pub use key::CacheKey;

/// Failures reported by [`CacheStore`].
///
/// A missing entry is not an error: [`CacheStore::get`] returns `Ok(None)`.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache entry for `{key}` is corrupt: {source}")]
    Corrupt {
        key: CacheKey,
        #[source]
        source: DecodeError,
    },

    #[error("response for `{key}` cannot be cached: {source}")]
    Unencodable {
        key: CacheKey,
        #[source]
        source: EncodeError,
    },
}

/// Thread-safe map from cache key to serialized response.
///
/// Entries are never evicted or expired. A second [`set`](Self::set) for the
/// same key replaces the first.
///
/// # Examples
///
/// ```
/// use pathcache::cache::CacheStore;
/// use pathcache::http::{Response, StatusCode};
///
/// let store = CacheStore::new();
/// assert!(store.get("/a").unwrap().is_none());
///
/// let response = Response::new(StatusCode::OK).with_body("hello");
/// store.set("/a", &response).unwrap();
///
/// let cached = store.get("/a").unwrap().unwrap();
/// assert_eq!(cached, response);
/// assert_eq!(store.len(), 1);
/// ```
#[derive(Debug, Default)]
pub struct CacheStore {
    entries: RwLock<HashMap<CacheKey, Bytes>>,
}

impl CacheStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Looks up `key` and rebuilds the stored response.
    ///
    /// Returns `Ok(None)` when nothing is stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::Corrupt`] when an entry exists but cannot be
    /// decoded. The entry is left in place.
    pub fn get(&self, key: &str) -> Result<Option<Response>, CacheError> {
        let entries = self.entries.read();
        let Some(entry) = entries.get(key) else {
            return Ok(None);
        };
        codec::decode(entry)
            .map(Some)
            .map_err(|source| CacheError::Corrupt {
                key: CacheKey::from(key),
                source,
            })
    }

    /// Serializes `response` and stores it under `key`, replacing any
    /// previous entry.
    ///
    /// `response` is only borrowed; its body stays readable for the caller.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::Unencodable`] when the response has a header
    /// that could not be reproduced on decode. Nothing is stored.
    pub fn set(&self, key: impl Into<CacheKey>, response: &Response) -> Result<(), CacheError> {
        let key = key.into();
        let entry = match codec::encode(response) {
            Ok(entry) => entry,
            Err(source) => return Err(CacheError::Unencodable { key, source }),
        };
        self.entries.write().insert(key, entry);
        Ok(())
    }

    /// Returns `true` if an entry is stored under `key`.
    pub fn contains(&self, key: &str) -> bool {
        self.entries.read().contains_key(key)
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    // Stores raw bytes without encoding, for exercising the corrupt path.
    #[cfg(test)]
    pub(crate) fn insert_raw(&self, key: impl Into<CacheKey>, entry: impl Into<Bytes>) {
        self.entries.write().insert(key.into(), entry.into());
    }
}
