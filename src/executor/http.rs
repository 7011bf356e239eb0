//! Plain-text HTTP/1.x executor over Tokio TCP streams.
//!
//! Each request opens one connection, writes an HTTP/1.0 request with
//! `Connection: close`, reads until the peer closes, and parses the reply with
//! the same codec the cache uses. HTTP/1.0 keeps servers from answering with
//! chunked transfer encoding, so the body is simply the bytes after the head.
//! A server that sends `Transfer-Encoding` anyway is refused rather than
//! handed back with its framing left in the body.

use std::net::SocketAddr;
use std::time::Duration;

use bytes::BytesMut;
use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::debug;

use super::{ExecuteFuture, Executor};
use crate::cache::codec::{self, DecodeError};
use crate::http::request::RequestError;
use crate::http::{Request, Response};

/// Default limit for connect, write, and read combined.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default cap on the bytes buffered for one response (8 MiB).
pub const DEFAULT_MAX_RESPONSE_SIZE: usize = 8 * 1024 * 1024;

/// Initial read buffer capacity per connection.
const INITIAL_BUF_SIZE: usize = 4096;

/// Errors produced by [`HttpExecutor`].
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("unsupported URL scheme `{0}`: only http is supported")]
    UnsupportedScheme(String),

    #[error("request URL has no host")]
    MissingHost,

    #[error("request cannot be sent: {0}")]
    InvalidRequest(#[from] RequestError),

    #[error("failed to connect to {addr}: {source}")]
    Connect {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("response exceeds maximum allowed size of {max_bytes} bytes")]
    ResponseTooLarge { max_bytes: usize },

    #[error("malformed response: {0}")]
    Malformed(#[from] DecodeError),

    #[error("response uses transfer coding `{0}`, which HTTP/1.0 replies must not carry")]
    UnsupportedTransferEncoding(String),
}

/// Sends requests over plain HTTP.
///
/// # Examples
///
/// ```rust,no_run
/// use std::time::Duration;
/// use pathcache::executor::{CachingExecutor, Executor, HttpExecutor};
/// use pathcache::http::Request;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let http = HttpExecutor::new().timeout(Duration::from_secs(5));
///     let client = CachingExecutor::new(http);
///
///     let response = client
///         .execute(Request::get("http://127.0.0.1:8080/api/v1/employee/1")?)
///         .await?;
///     println!("{}", response.status());
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct HttpExecutor {
    timeout: Duration,
    max_response_size: usize,
}

impl HttpExecutor {
    /// Creates an executor with [`DEFAULT_TIMEOUT`] and
    /// [`DEFAULT_MAX_RESPONSE_SIZE`].
    pub fn new() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            max_response_size: DEFAULT_MAX_RESPONSE_SIZE,
        }
    }

    /// Sets the limit for one whole exchange.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the largest response, head and body together, that will be read.
    #[must_use]
    pub fn max_response_size(mut self, max_bytes: usize) -> Self {
        self.max_response_size = max_bytes;
        self
    }

    async fn send(&self, request: Request) -> Result<Response, TransportError> {
        let url = request.url();
        if url.scheme() != "http" {
            return Err(TransportError::UnsupportedScheme(url.scheme().to_owned()));
        }
        let host = url.host_str().ok_or(TransportError::MissingHost)?.to_owned();
        let port = url.port_or_known_default().unwrap_or(80);
        let addr = format!("{host}:{port}");
        let path = request.path().to_owned();
        let wire = request.into_bytes()?;

        let mut stream = TcpStream::connect(addr.as_str())
            .await
            .map_err(|source| TransportError::Connect {
                addr: addr.clone(),
                source,
            })?;
        let peer: Option<SocketAddr> = stream.peer_addr().ok();
        debug!(addr = %addr, peer = ?peer, path = %path, "connected");

        stream.write_all(&wire).await?;
        stream.flush().await?;

        let mut buf = BytesMut::with_capacity(INITIAL_BUF_SIZE);
        loop {
            let bytes_read = stream.read_buf(&mut buf).await?;
            if bytes_read == 0 {
                break;
            }
            if buf.len() > self.max_response_size {
                return Err(TransportError::ResponseTooLarge {
                    max_bytes: self.max_response_size,
                });
            }
        }
        debug!(addr = %addr, bytes = buf.len(), "response received");

        let response = codec::decode(&buf.freeze())?;
        if let Some(coding) = response.headers().get("transfer-encoding") {
            return Err(TransportError::UnsupportedTransferEncoding(coding.to_owned()));
        }
        Ok(trim_to_content_length(response))
    }
}

impl Default for HttpExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl Executor for HttpExecutor {
    type Error = TransportError;

    fn execute(&self, request: Request) -> ExecuteFuture<'_, Self::Error> {
        Box::pin(async move {
            match tokio::time::timeout(self.timeout, self.send(request)).await {
                Ok(result) => result,
                Err(_) => Err(TransportError::Timeout(self.timeout)),
            }
        })
    }
}

// Drops trailing bytes past a declared `Content-Length`. A shorter body is
// kept as-is: replies to HEAD declare a length but carry nothing.
fn trim_to_content_length(response: Response) -> Response {
    let declared = response
        .headers()
        .get("content-length")
        .and_then(|v| v.trim().parse::<usize>().ok());
    match declared {
        Some(len) if response.body().len() > len => {
            let (status, headers, body) = response.into_parts();
            Response::from_parts(status, headers, body.slice(..len))
        }
        _ => response,
    }
}
