//! Body storage backends
//!
//! The engine never holds a whole object body; it streams chunks into a
//! `BlobWriter` and keeps the finished `Blob` handle in the catalog.

mod fs;
mod memory;

use std::sync::Arc;

use futures::StreamExt;

use fs3_core::config::{BlobBackend, EngineConfig};
use fs3_core::{Blob, BlobStore, ByteStream, Error, Result};

use crate::etag::ETagHasher;

pub use fs::{FsBlob, FsBlobStore};
pub use memory::{MemoryBlob, MemoryBlobStore};

/// Build the blob store an engine config asks for
pub async fn from_config(config: &EngineConfig) -> Result<Arc<dyn BlobStore>> {
    match config.backend {
        BlobBackend::Memory => Ok(Arc::new(MemoryBlobStore)),
        BlobBackend::Filesystem => {
            let dir = config.data_dir.clone().ok_or_else(|| {
                Error::Config("engine.data_dir is required for the filesystem backend".into())
            })?;
            Ok(Arc::new(FsBlobStore::open(dir, config.chunk_size).await?))
        }
    }
}

/// A body written to a blob store
#[derive(Debug)]
pub struct Ingested {
    /// Stored content
    pub blob: Arc<dyn Blob>,
    /// Hex MD5 of the content
    pub etag: String,
}

/// Stream a body into a new blob, hashing it on the way
///
/// On any error the partial blob is discarded.
pub async fn ingest(store: &dyn BlobStore, mut body: ByteStream) -> Result<Ingested> {
    let mut writer = store.create().await?;
    let mut hasher = ETagHasher::new();

    while let Some(chunk) = body.next().await {
        let chunk = match chunk {
            Ok(chunk) => chunk,
            Err(e) => {
                writer.abort().await;
                return Err(e);
            }
        };
        hasher.update(&chunk);
        if let Err(e) = writer.append(chunk).await {
            writer.abort().await;
            return Err(e);
        }
    }

    let blob = writer.finish().await?;
    if blob.len() != hasher.size() {
        return Err(Error::Storage(format!(
            "{} store kept {} of {} bytes",
            store.name(),
            blob.len(),
            hasher.size()
        )));
    }

    Ok(Ingested {
        blob,
        etag: hasher.finish(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use fs3_core::body;

    #[tokio::test]
    async fn test_ingest_hashes_content() {
        let body = body::from_chunks(vec![Bytes::from_static(b"con"), Bytes::from_static(b"tent")]);
        let ingested = ingest(&MemoryBlobStore, body).await.unwrap();
        assert_eq!(ingested.etag, "9a0364b9e99bb480dd25e1f0284c8555");
        assert_eq!(ingested.blob.len(), 7);
    }

    #[tokio::test]
    async fn test_ingest_propagates_body_error() {
        let body: ByteStream = Box::pin(futures::stream::iter(vec![
            Ok(Bytes::from_static(b"abc")),
            Err(Error::Network("connection reset".into())),
        ]));
        let result = ingest(&MemoryBlobStore, body).await;
        assert!(matches!(result, Err(Error::Network(_))));
    }

    #[tokio::test]
    async fn test_ingest_error_leaves_no_files() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let store = FsBlobStore::open(temp_dir.path(), 1024).await.unwrap();
        let body: ByteStream = Box::pin(futures::stream::iter(vec![
            Ok(Bytes::from_static(b"abc")),
            Err(Error::Network("connection reset".into())),
        ]));
        assert!(ingest(&store, body).await.is_err());
        assert_eq!(std::fs::read_dir(temp_dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_filesystem_backend_needs_data_dir() {
        let config = EngineConfig {
            backend: BlobBackend::Filesystem,
            ..Default::default()
        };
        assert!(matches!(from_config(&config).await, Err(Error::Config(_))));
    }
}
