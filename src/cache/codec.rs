//! Lossless response codec for cache entries.
//!
//! An entry is an HTTP/1.1 response in wire form: status line, every header
//! exactly as stored on the [`Response`], a blank line, then the body. The
//! entry is a complete buffer, so the body is simply everything after the
//! header terminator; no `Content-Length` is injected or trusted.
//!
//! [`encode`] refuses anything [`decode`] could not reproduce exactly.

use bytes::{BufMut, Bytes, BytesMut};
use thiserror::Error;

use crate::http::headers::{is_clean_value, is_token};
use crate::http::{Headers, InvalidStatusCode, Response, StatusCode};

/// Header slots tried on the first parse attempt.
const INITIAL_HEADER_SLOTS: usize = 64;

/// Upper bound on headers per entry; [`encode`] rejects responses above it.
pub const MAX_HEADERS: usize = 4096;

/// Reasons a response cannot be stored losslessly.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EncodeError {
    #[error("header name `{0}` is not a valid HTTP token")]
    InvalidHeaderName(String),

    #[error("value of header `{name}` contains control characters or surrounding whitespace")]
    InvalidHeaderValue { name: String },

    #[error("response has {count} headers, more than an entry can hold")]
    TooManyHeaders { count: usize },
}

/// Reasons stored bytes cannot be turned back into a response.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("entry ends before the header terminator")]
    Incomplete,

    #[error("malformed response head: {0}")]
    Parse(#[from] httparse::Error),

    #[error("response head has no status code")]
    MissingStatus,

    #[error(transparent)]
    InvalidStatus(#[from] InvalidStatusCode),

    #[error("value of header `{name}` is not valid UTF-8")]
    NonUtf8Header { name: String },
}

/// Serializes `response` into a self-contained entry.
///
/// # Errors
///
/// Returns an [`EncodeError`] when a header would not survive a parse:
/// names must be HTTP tokens, values must not contain control characters
/// (other than tab) or start/end with whitespace.
pub fn encode(response: &Response) -> Result<Bytes, EncodeError> {
    let headers = response.headers();
    if headers.len() > MAX_HEADERS {
        return Err(EncodeError::TooManyHeaders {
            count: headers.len(),
        });
    }

    let status = response.status();
    let body = response.body();
    let estimated_size = 64 + headers.len() * 64 + body.len();
    let mut buf = BytesMut::with_capacity(estimated_size);

    buf.put(
        format!(
            "HTTP/1.1 {} {}\r\n",
            status.as_u16(),
            status.canonical_reason().unwrap_or("")
        )
        .as_bytes(),
    );

    for (name, value) in headers.iter() {
        if !is_token(name) {
            return Err(EncodeError::InvalidHeaderName(name.to_owned()));
        }
        if !is_clean_value(value) {
            return Err(EncodeError::InvalidHeaderValue {
                name: name.to_owned(),
            });
        }
        buf.put(format!("{name}: {value}\r\n").as_bytes());
    }

    buf.put(&b"\r\n"[..]);
    buf.put(body.as_ref());

    Ok(buf.freeze())
}

/// Parses an entry produced by [`encode`] (or any complete HTTP/1.x response).
///
/// The returned body shares memory with `entry`.
///
/// # Errors
///
/// Returns a [`DecodeError`] if the head is truncated or malformed.
pub fn decode(entry: &Bytes) -> Result<Response, DecodeError> {
    let mut slots = INITIAL_HEADER_SLOTS;

    loop {
        let mut headers = vec![httparse::EMPTY_HEADER; slots];
        let mut parsed = httparse::Response::new(&mut headers);

        let body_offset = match parsed.parse(entry) {
            Ok(httparse::Status::Complete(offset)) => offset,
            Ok(httparse::Status::Partial) => return Err(DecodeError::Incomplete),
            Err(httparse::Error::TooManyHeaders) if slots < MAX_HEADERS => {
                slots = (slots * 4).min(MAX_HEADERS);
                continue;
            }
            Err(e) => return Err(e.into()),
        };

        let code = parsed.code.ok_or(DecodeError::MissingStatus)?;
        let status = StatusCode::from_u16(code)?;

        let mut header_list = Headers::with_capacity(parsed.headers.len());
        for header in parsed.headers.iter() {
            let value =
                std::str::from_utf8(header.value).map_err(|_| DecodeError::NonUtf8Header {
                    name: header.name.to_owned(),
                })?;
            header_list.insert(header.name, value);
        }

        return Ok(Response::from_parts(
            status,
            header_list,
            entry.slice(body_offset..),
        ));
    }
}
