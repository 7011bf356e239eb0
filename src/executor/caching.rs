//! Path-keyed caching decorator.

use std::sync::atomic::{AtomicU64, Ordering};

use thiserror::Error;
use tracing::{debug, info, warn};

use super::{ExecuteFuture, Executor};
use crate::cache::{CacheError, CacheKey, CacheStore};
use crate::http::Request;

/// Errors returned by [`CachingExecutor`].
#[derive(Debug, Error)]
pub enum CachingError<E> {
    /// The wrapped executor failed. The value is exactly what it returned.
    #[error(transparent)]
    Upstream(E),

    /// A stored entry could not be read back.
    #[error(transparent)]
    Cache(#[from] CacheError),
}

impl<E> CachingError<E> {
    /// Returns the wrapped executor's error, if that is what this is.
    pub fn into_upstream(self) -> Option<E> {
        match self {
            Self::Upstream(e) => Some(e),
            Self::Cache(_) => None,
        }
    }
}

/// Point-in-time hit and miss counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
}

/// An [`Executor`] that remembers responses by request path.
///
/// On each call the request path is looked up in an owned [`CacheStore`]:
///
/// - **hit**: the stored response is rebuilt and returned; the inner
///   executor is not called.
/// - **miss**: the request goes to the inner executor. A successful response
///   is stored and returned; a failure is returned as
///   [`CachingError::Upstream`] and nothing is stored.
///
/// The store lock is never held while the inner executor runs. Two tasks that
/// miss on the same path at the same time both fetch, and the later write
/// wins.
///
/// See [`CacheKey`] for what does and does not distinguish two requests.
///
/// # Examples
///
/// ```
/// use pathcache::executor::{CachingExecutor, Executor, executor_fn};
/// use pathcache::http::{Request, Response, StatusCode};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let upstream = executor_fn(|_req: Request| async {
///     Ok::<_, std::io::Error>(Response::new(StatusCode::OK).with_body("fresh"))
/// });
/// let client = CachingExecutor::new(upstream);
///
/// let req = || Request::get("http://example.com/a").unwrap();
/// client.execute(req()).await.unwrap();
/// client.execute(req()).await.unwrap();
///
/// assert_eq!(client.stats().hits, 1);
/// assert_eq!(client.store().len(), 1);
/// # }
/// ```
pub struct CachingExecutor<E> {
    inner: E,
    store: CacheStore,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl<E> CachingExecutor<E>
where
    E: Executor,
{
    /// Wraps `inner` with an empty cache.
    pub fn new(inner: E) -> Self {
        Self {
            inner,
            store: CacheStore::new(),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Returns the wrapped executor.
    pub fn inner(&self) -> &E {
        &self.inner
    }

    /// Returns the backing store.
    pub fn store(&self) -> &CacheStore {
        &self.store
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}

impl<E> Executor for CachingExecutor<E>
where
    E: Executor,
{
    type Error = CachingError<E::Error>;

    fn execute(&self, request: Request) -> ExecuteFuture<'_, Self::Error> {
        Box::pin(async move {
            let key = CacheKey::from_request(&request);

            if let Some(response) = self.store.get(key.as_str())? {
                self.hits.fetch_add(1, Ordering::Relaxed);
                debug!(path = %key, "served from cache");
                return Ok(response);
            }

            self.misses.fetch_add(1, Ordering::Relaxed);
            info!(path = %key, method = %request.method(), "cache miss, fetching");

            let response = self
                .inner
                .execute(request)
                .await
                .map_err(CachingError::Upstream)?;

            if let Err(e) = self.store.set(key, &response) {
                warn!(error = %e, "response not cached");
            }

            Ok(response)
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::AtomicUsize;

    use super::*;
    use crate::executor::executor_fn;
    use crate::http::{Method, Response, StatusCode};

    #[derive(Debug, Error, PartialEq, Eq)]
    #[error("upstream refused: {0}")]
    struct Refused(&'static str);

    fn counting_upstream(calls: Arc<AtomicUsize>) -> impl Executor<Error = Refused> {
        executor_fn(move |request: Request| {
            let calls = Arc::clone(&calls);
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok::<_, Refused>(
                    Response::new(StatusCode::OK)
                        .header("X-Path", request.path().to_owned())
                        .with_body(format!("body of {}", request.path())),
                )
            }
        })
    }

    fn get(url: &str) -> Request {
        Request::get(url).unwrap()
    }

    #[tokio::test]
    async fn second_call_is_served_from_store() {
        let calls = Arc::new(AtomicUsize::new(0));
        let client = CachingExecutor::new(counting_upstream(Arc::clone(&calls)));

        let first = client.execute(get("http://example.com/a")).await.unwrap();
        let second = client.execute(get("http://example.com/a")).await.unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(first, second);
        assert_eq!(client.stats(), CacheStats { hits: 1, misses: 1 });
    }

    #[tokio::test]
    async fn upstream_failure_is_returned_and_not_cached() {
        let client = CachingExecutor::new(executor_fn(|_request: Request| async {
            Err::<Response, _>(Refused("maintenance"))
        }));

        let err = client
            .execute(get("http://example.com/a"))
            .await
            .unwrap_err();

        assert_eq!(err.into_upstream(), Some(Refused("maintenance")));
        assert!(client.store().is_empty());
    }

    #[tokio::test]
    async fn failed_fetch_is_retried_next_time() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let client = CachingExecutor::new(executor_fn(move |_request: Request| {
            let attempt = counter.fetch_add(1, Ordering::SeqCst);
            async move {
                if attempt == 0 {
                    Err(Refused("cold start"))
                } else {
                    Ok(Response::new(StatusCode::OK).with_body("warm"))
                }
            }
        }));

        assert!(client.execute(get("http://example.com/a")).await.is_err());
        let response = client.execute(get("http://example.com/a")).await.unwrap();

        assert_eq!(response.text().unwrap(), "warm");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(client.store().len(), 1);
    }

    #[tokio::test]
    async fn error_statuses_are_cached_too() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let client = CachingExecutor::new(executor_fn(move |_request: Request| {
            counter.fetch_add(1, Ordering::SeqCst);
            async { Ok::<_, Refused>(Response::new(StatusCode::NOT_FOUND)) }
        }));

        client.execute(get("http://example.com/gone")).await.unwrap();
        let again = client.execute(get("http://example.com/gone")).await.unwrap();

        assert_eq!(again.status(), StatusCode::NOT_FOUND);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn method_host_and_query_share_an_entry() {
        let calls = Arc::new(AtomicUsize::new(0));
        let client = CachingExecutor::new(counting_upstream(Arc::clone(&calls)));

        client.execute(get("http://one.example/items?page=1")).await.unwrap();
        client
            .execute(Request::parse(Method::Delete, "http://two.example/items").unwrap())
            .await
            .unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(client.store().len(), 1);
    }

    #[tokio::test]
    async fn corrupt_entry_surfaces_without_fetching() {
        let calls = Arc::new(AtomicUsize::new(0));
        let client = CachingExecutor::new(counting_upstream(Arc::clone(&calls)));
        client.store().insert_raw("/x", &b"invalid"[..]);

        let err = client
            .execute(get("http://example.com/x"))
            .await
            .unwrap_err();

        assert!(matches!(err, CachingError::Cache(CacheError::Corrupt { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn unencodable_response_is_still_returned() {
        let client = CachingExecutor::new(executor_fn(|_request: Request| async {
            Ok::<_, Refused>(Response::new(StatusCode::OK).header("X Bad", "v"))
        }));

        let response = client.execute(get("http://example.com/a")).await.unwrap();

        assert_eq!(response.headers().get("x bad"), Some("v"));
        assert!(client.store().is_empty());
    }
}
