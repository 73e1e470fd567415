//! Object body streams and byte ranges
//!
//! Object content crosses every boundary as a stream of `Bytes` chunks so
//! large bodies never have to sit in one buffer.

use std::ops::Range;
use std::pin::Pin;

use bytes::{Bytes, BytesMut};
use futures::{Stream, StreamExt, TryStreamExt, stream};

use crate::error::{Error, Result};

/// A chunked object body
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes>> + Send>>;

/// Build a body from a single buffer
pub fn from_bytes(data: impl Into<Bytes>) -> ByteStream {
    let data = data.into();
    if data.is_empty() {
        return empty();
    }
    Box::pin(stream::once(async move { Ok(data) }))
}

/// Build a body from already-split chunks
pub fn from_chunks(chunks: Vec<Bytes>) -> ByteStream {
    Box::pin(stream::iter(chunks.into_iter().map(Ok)))
}

/// An empty body
pub fn empty() -> ByteStream {
    Box::pin(stream::empty())
}

/// Read a whole body into memory
///
/// Only meant for small objects and tests; large bodies should be consumed
/// chunk by chunk.
pub async fn collect(mut body: ByteStream) -> Result<Bytes> {
    let mut buf = BytesMut::new();
    while let Some(chunk) = body.next().await {
        buf.extend_from_slice(&chunk?);
    }
    Ok(buf.freeze())
}

/// Restrict a body to the half-open byte window `range`
pub fn slice(body: ByteStream, range: Range<u64>) -> ByteStream {
    if range.start >= range.end {
        return empty();
    }
    let (want_start, want_end) = (range.start, range.end);
    let mut offset = 0u64;
    let sliced = body.try_filter_map(move |chunk| {
        let start = offset;
        let end = start + chunk.len() as u64;
        offset = end;
        let out = if end <= want_start || start >= want_end {
            None
        } else {
            let lo = want_start.saturating_sub(start) as usize;
            let hi = (want_end.min(end) - start) as usize;
            Some(chunk.slice(lo..hi))
        };
        futures::future::ready(Ok(out))
    });
    Box::pin(sliced)
}

/// A requested byte range, as in an HTTP `Range: bytes=...` header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteRange {
    /// `bytes=first-last`, both inclusive
    Span { first: u64, last: u64 },
    /// `bytes=first-`
    From(u64),
    /// `bytes=-n`, the final n bytes
    Suffix(u64),
}

impl ByteRange {
    /// Parse a `bytes=` range specifier
    pub fn parse(spec: &str) -> Result<Self> {
        let invalid = || Error::InvalidRange(spec.to_string());
        let spec_body = spec.trim().strip_prefix("bytes=").ok_or_else(invalid)?;
        let (first, last) = spec_body.split_once('-').ok_or_else(invalid)?;

        match (first.is_empty(), last.is_empty()) {
            (true, true) => Err(invalid()),
            (true, false) => {
                let n = last.parse().map_err(|_| invalid())?;
                Ok(ByteRange::Suffix(n))
            }
            (false, true) => {
                let first = first.parse().map_err(|_| invalid())?;
                Ok(ByteRange::From(first))
            }
            (false, false) => {
                let first: u64 = first.parse().map_err(|_| invalid())?;
                let last: u64 = last.parse().map_err(|_| invalid())?;
                if last < first {
                    return Err(invalid());
                }
                Ok(ByteRange::Span { first, last })
            }
        }
    }

    /// Resolve against an object of `len` bytes into a half-open window
    pub fn resolve(&self, len: u64) -> Result<Range<u64>> {
        let unsatisfiable = || Error::InvalidRange(format!("{self} of {len} bytes"));
        match *self {
            ByteRange::Span { first, last } => {
                if last < first || first >= len {
                    return Err(unsatisfiable());
                }
                Ok(first..last.min(len - 1) + 1)
            }
            ByteRange::From(first) => {
                if first >= len {
                    return Err(unsatisfiable());
                }
                Ok(first..len)
            }
            ByteRange::Suffix(n) => {
                if n == 0 || len == 0 {
                    return Err(unsatisfiable());
                }
                Ok(len.saturating_sub(n)..len)
            }
        }
    }
}

impl std::fmt::Display for ByteRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ByteRange::Span { first, last } => write!(f, "bytes={first}-{last}"),
            ByteRange::From(first) => write!(f, "bytes={first}-"),
            ByteRange::Suffix(n) => write!(f, "bytes=-{n}"),
        }
    }
}
