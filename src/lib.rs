//! # pathcache
//!
//! A transparent response cache for async HTTP request executors.
//!
//! [`CachingExecutor`] wraps any [`Executor`] and answers repeated requests
//! for the same URL path from memory. Only the path is used as the cache key;
//! see [`cache::CacheKey`] for the consequences.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pathcache::executor::{CachingExecutor, Executor, HttpExecutor};
//! use pathcache::http::Request;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = CachingExecutor::new(HttpExecutor::new());
//!
//!     for _ in 0..2 {
//!         let request = Request::get("http://127.0.0.1:8080/api/v1/employee/1")?;
//!         let response = client.execute(request).await?;
//!         println!("{} {}", response.status(), response.text()?);
//!     }
//!
//!     assert_eq!(client.stats().hits, 1);
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod executor;
pub mod http;

// ── Convenience re-exports ────────────────────────────────────────────────────
pub use cache::{CacheError, CacheKey, CacheStore};
pub use executor::{CachingError, CachingExecutor, Executor, HttpExecutor, executor_fn};
pub use http::{Headers, Method, Request, Response, StatusCode};
