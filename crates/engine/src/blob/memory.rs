//! In-memory blob store
//!
//! Blobs are lists of immutable `Bytes` chunks. Duplicating a blob shares
//! the chunks; since nothing ever mutates them, that is copy-on-write with
//! no write ever happening.

use std::ops::Range;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;

use fs3_core::body::{self, ByteStream};
use fs3_core::{Blob, BlobStore, BlobWriter, Result};

/// Blob store keeping all content in process memory
#[derive(Debug, Clone, Copy, Default)]
pub struct MemoryBlobStore;

#[async_trait]
impl BlobStore for MemoryBlobStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn create(&self) -> Result<Box<dyn BlobWriter>> {
        Ok(Box::new(MemoryBlobWriter::default()))
    }
}

#[derive(Default)]
struct MemoryBlobWriter {
    chunks: Vec<Bytes>,
    len: u64,
}

#[async_trait]
impl BlobWriter for MemoryBlobWriter {
    async fn append(&mut self, chunk: Bytes) -> Result<()> {
        if !chunk.is_empty() {
            self.len += chunk.len() as u64;
            self.chunks.push(chunk);
        }
        Ok(())
    }

    async fn finish(self: Box<Self>) -> Result<Arc<dyn Blob>> {
        Ok(Arc::new(MemoryBlob {
            chunks: self.chunks.into(),
            len: self.len,
        }))
    }

    async fn abort(self: Box<Self>) {}
}

/// Content held as shared immutable chunks
#[derive(Debug, Clone)]
pub struct MemoryBlob {
    chunks: Arc<[Bytes]>,
    len: u64,
}

impl MemoryBlob {
    /// Wrap a single buffer
    pub fn from_bytes(data: impl Into<Bytes>) -> Self {
        let data = data.into();
        let len = data.len() as u64;
        let chunks: Arc<[Bytes]> = if data.is_empty() {
            Arc::new([])
        } else {
            Arc::new([data])
        };
        Self { chunks, len }
    }
}

#[async_trait]
impl Blob for MemoryBlob {
    fn len(&self) -> u64 {
        self.len
    }

    async fn open(&self, range: Option<Range<u64>>) -> Result<ByteStream> {
        let stream = body::from_chunks(self.chunks.to_vec());
        Ok(match range {
            Some(range) => body::slice(stream, range),
            None => stream,
        })
    }

    async fn duplicate(&self) -> Result<Arc<dyn Blob>> {
        Ok(Arc::new(self.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn write(chunks: &[&'static [u8]]) -> Arc<dyn Blob> {
        let mut writer = MemoryBlobStore.create().await.unwrap();
        for chunk in chunks {
            writer.append(Bytes::from_static(chunk)).await.unwrap();
        }
        writer.finish().await.unwrap()
    }

    #[tokio::test]
    async fn test_write_and_read_back() {
        let blob = write(&[b"hello ", b"", b"world"]).await;
        assert_eq!(blob.len(), 11);
        let data = body::collect(blob.open(None).await.unwrap()).await.unwrap();
        assert_eq!(&data[..], b"hello world");
    }

    #[tokio::test]
    async fn test_ranged_open() {
        let blob = write(&[b"hello ", b"world"]).await;
        let data = body::collect(blob.open(Some(4..8)).await.unwrap())
            .await
            .unwrap();
        assert_eq!(&data[..], b"o wo");
    }

    #[tokio::test]
    async fn test_duplicate_outlives_original() {
        let blob = write(&[b"abc"]).await;
        let copy = blob.duplicate().await.unwrap();
        drop(blob);
        let data = body::collect(copy.open(None).await.unwrap()).await.unwrap();
        assert_eq!(&data[..], b"abc");
    }

    #[tokio::test]
    async fn test_empty_blob() {
        let blob = MemoryBlob::from_bytes(Bytes::new());
        assert!(blob.is_empty());
        let data = body::collect(blob.open(None).await.unwrap()).await.unwrap();
        assert!(data.is_empty());
    }
}
