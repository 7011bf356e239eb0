//! The request-execution capability and its implementations.
//!
//! Everything that can turn a [`Request`] into a [`Response`] implements
//! [`Executor`]. Executors compose by wrapping: [`CachingExecutor`] holds an
//! inner executor and exposes the same trait, so it can stand anywhere the
//! inner one could.
//!
//! ## Core types
//!
//! - [`Executor`]: trait implemented by all executors.
//! - [`ExecuteFuture`]: the pinned, boxed future every executor returns.
//! - [`CachingExecutor`]: path-keyed caching decorator.
//! - [`HttpExecutor`]: plain HTTP/1.x over a TCP connection.
//! - [`FnExecutor`] / [`executor_fn`]: adapts an async closure, mostly for tests.

use std::{future::Future, pin::Pin, sync::Arc};

use crate::http::{Request, Response};

pub mod caching;
pub mod http;

pub use caching::{CacheStats, CachingError, CachingExecutor};
pub use http::{HttpExecutor, TransportError};

/// Pinned, heap-allocated future returned by [`Executor::execute`].
pub type ExecuteFuture<'a, E> = Pin<Box<dyn Future<Output = Result<Response, E>> + Send + 'a>>;

/// Sends a request and yields its response.
///
/// # Contract
///
/// - Implementations **must** be `Send + Sync`; one executor is shared by
///   every task issuing requests through it.
/// - `execute` **must** return a `Send` future so it can be awaited on a
///   multi-threaded runtime.
/// - Timeouts, retries, and cancellation belong to the implementation; callers
///   and wrappers do not add any.
///
/// # Examples
///
/// ```rust,no_run
/// use pathcache::executor::{ExecuteFuture, Executor};
/// use pathcache::http::{Request, Response, StatusCode};
///
/// struct AlwaysOk;
///
/// impl Executor for AlwaysOk {
///     type Error = std::convert::Infallible;
///
///     fn execute(&self, _request: Request) -> ExecuteFuture<'_, Self::Error> {
///         Box::pin(async { Ok(Response::new(StatusCode::OK)) })
///     }
/// }
/// ```
pub trait Executor: Send + Sync {
    /// Error produced when the request cannot be completed.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Executes `request` and resolves to its response.
    fn execute(&self, request: Request) -> ExecuteFuture<'_, Self::Error>;
}

impl<E> Executor for Arc<E>
where
    E: Executor + ?Sized,
{
    type Error = E::Error;

    fn execute(&self, request: Request) -> ExecuteFuture<'_, Self::Error> {
        (**self).execute(request)
    }
}

/// An [`Executor`] backed by an async closure.
///
/// Built with [`executor_fn`].
pub struct FnExecutor<F> {
    func: F,
}

/// Wraps an async closure as an [`Executor`].
///
/// # Examples
///
/// ```rust,no_run
/// use pathcache::executor::{Executor, executor_fn};
/// use pathcache::http::{Request, Response, StatusCode};
///
/// let fake = executor_fn(|request: Request| async move {
///     Ok::<_, std::io::Error>(
///         Response::new(StatusCode::OK).with_body(request.path().to_owned()),
///     )
/// });
/// ```
pub fn executor_fn<F, Fut, E>(func: F) -> FnExecutor<F>
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Response, E>> + Send + 'static,
    E: std::error::Error + Send + Sync + 'static,
{
    FnExecutor { func }
}

impl<F, Fut, E> Executor for FnExecutor<F>
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Response, E>> + Send + 'static,
    E: std::error::Error + Send + Sync + 'static,
{
    type Error = E;

    fn execute(&self, request: Request) -> ExecuteFuture<'_, Self::Error> {
        Box::pin((self.func)(request))
    }
}
