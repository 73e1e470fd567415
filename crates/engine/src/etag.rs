//! ETag computation
//!
//! The ETag is the lowercase hex MD5 of the object content, computed
//! incrementally while the body streams in.

use md5::{Digest, Md5};

/// Incremental content hasher
#[derive(Default)]
pub struct ETagHasher {
    hasher: Md5,
    size: u64,
}

impl ETagHasher {
    /// Create a new hasher
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one chunk
    pub fn update(&mut self, chunk: &[u8]) {
        self.hasher.update(chunk);
        self.size += chunk.len() as u64;
    }

    /// Bytes hashed so far
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Finish into the unquoted hex ETag
    pub fn finish(self) -> String {
        format!("{:x}", self.hasher.finalize())
    }
}

/// ETag of an in-memory buffer
pub fn etag_of(data: &[u8]) -> String {
    let mut hasher = ETagHasher::new();
    hasher.update(data);
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_digests() {
        assert_eq!(etag_of(b"content"), "9a0364b9e99bb480dd25e1f0284c8555");
        assert_eq!(etag_of(b""), "d41d8cd98f00b204e9800998ecf8427e");
    }

    #[test]
    fn test_chunking_does_not_change_etag() {
        let mut hasher = ETagHasher::new();
        hasher.update(b"hello");
        hasher.update(b" ");
        hasher.update(b"world");
        assert_eq!(hasher.size(), 11);
        assert_eq!(hasher.finish(), etag_of(b"hello world"));
    }
}
