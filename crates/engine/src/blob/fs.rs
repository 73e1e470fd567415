//! Filesystem blob store
//!
//! Each blob is one file under the store root. Uploads go to a `.part`
//! file that is renamed to `.blob` once complete, so a crash never leaves
//! a half-written blob behind under its final name. A blob's file is
//! removed when the last handle to it drops.

use std::io::SeekFrom;
use std::ops::Range;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use futures::TryStreamExt;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt, BufWriter};
use tokio_util::io::ReaderStream;
use uuid::Uuid;

use fs3_core::body::ByteStream;
use fs3_core::{Blob, BlobStore, BlobWriter, Error, Result};

const BLOB_EXT: &str = "blob";
const PART_EXT: &str = "part";

/// Blob store writing one file per blob
#[derive(Debug)]
pub struct FsBlobStore {
    root: PathBuf,
    chunk_size: usize,
}

impl FsBlobStore {
    /// Open a store rooted at `root`, creating the directory if needed
    ///
    /// Blobs left over from a previous process are unreachable and get
    /// removed.
    pub async fn open(root: impl Into<PathBuf>, chunk_size: usize) -> Result<Self> {
        let root = root.into();
        tokio::fs::create_dir_all(&root).await?;

        let swept = sweep(&root).await?;
        if swept > 0 {
            tracing::info!(root = %root.display(), files = swept, "Removed stale blob files");
        }

        Ok(Self {
            root,
            chunk_size: chunk_size.max(1),
        })
    }

    /// Directory the blobs live in
    pub fn root(&self) -> &Path {
        &self.root
    }
}

async fn sweep(root: &Path) -> Result<usize> {
    let mut swept = 0;
    let mut entries = tokio::fs::read_dir(root).await?;
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        let ours = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext == BLOB_EXT || ext == PART_EXT);
        if ours && entry.file_type().await?.is_file() {
            tokio::fs::remove_file(&path).await?;
            swept += 1;
        }
    }
    Ok(swept)
}

fn new_blob_path(dir: &Path) -> PathBuf {
    dir.join(format!("{}.{BLOB_EXT}", Uuid::new_v4()))
}

#[async_trait]
impl BlobStore for FsBlobStore {
    fn name(&self) -> &'static str {
        "filesystem"
    }

    async fn create(&self) -> Result<Box<dyn BlobWriter>> {
        let path = new_blob_path(&self.root);
        let part = path.with_extension(PART_EXT);
        let file = File::create(&part).await?;

        Ok(Box::new(FsBlobWriter {
            file: Some(BufWriter::new(file)),
            part: Some(part),
            path,
            len: 0,
            chunk_size: self.chunk_size,
        }))
    }
}

struct FsBlobWriter {
    file: Option<BufWriter<File>>,
    // Cleared once the part file is renamed into place
    part: Option<PathBuf>,
    path: PathBuf,
    len: u64,
    chunk_size: usize,
}

#[async_trait]
impl BlobWriter for FsBlobWriter {
    async fn append(&mut self, chunk: Bytes) -> Result<()> {
        let file = self
            .file
            .as_mut()
            .ok_or_else(|| Error::Storage("blob writer already closed".into()))?;
        file.write_all(&chunk).await?;
        self.len += chunk.len() as u64;
        Ok(())
    }

    async fn finish(self: Box<Self>) -> Result<Arc<dyn Blob>> {
        let mut this = self;
        let mut file = this
            .file
            .take()
            .ok_or_else(|| Error::Storage("blob writer already closed".into()))?;
        file.flush().await?;
        drop(file);

        if let Some(part) = &this.part {
            tokio::fs::rename(part, &this.path).await?;
        }
        this.part = None;

        Ok(Arc::new(FsBlob {
            path: this.path.clone(),
            len: this.len,
            chunk_size: this.chunk_size,
        }))
    }

    async fn abort(self: Box<Self>) {
        // Drop removes the part file
    }
}

impl Drop for FsBlobWriter {
    fn drop(&mut self) {
        self.file = None;
        if let Some(part) = self.part.take()
            && let Err(e) = std::fs::remove_file(&part)
        {
            tracing::warn!(path = %part.display(), error = %e, "Failed to remove partial blob");
        }
    }
}

/// Content held in one file
#[derive(Debug)]
pub struct FsBlob {
    path: PathBuf,
    len: u64,
    chunk_size: usize,
}

#[async_trait]
impl Blob for FsBlob {
    fn len(&self) -> u64 {
        self.len
    }

    async fn open(&self, range: Option<Range<u64>>) -> Result<ByteStream> {
        let range = range.unwrap_or(0..self.len);
        let mut file = File::open(&self.path).await?;
        if range.start > 0 {
            file.seek(SeekFrom::Start(range.start)).await?;
        }

        let reader = file.take(range.end.saturating_sub(range.start));
        let stream = ReaderStream::with_capacity(reader, self.chunk_size).map_err(Error::from);
        Ok(Box::pin(stream))
    }

    async fn duplicate(&self) -> Result<Arc<dyn Blob>> {
        let dir = self
            .path
            .parent()
            .ok_or_else(|| Error::Storage(format!("{} has no parent", self.path.display())))?;
        let path = new_blob_path(dir);
        copy_into_place(&self.path, &path).await?;

        Ok(Arc::new(FsBlob {
            path,
            len: self.len,
            chunk_size: self.chunk_size,
        }))
    }
}

/// Copy `src` to `dest` through a part file, removing it on any failure
async fn copy_into_place(src: &Path, dest: &Path) -> Result<()> {
    let part = dest.with_extension(PART_EXT);
    let copied = match tokio::fs::copy(src, &part).await {
        Ok(_) => tokio::fs::rename(&part, dest).await,
        Err(e) => Err(e),
    };
    if let Err(e) = copied {
        let _ = tokio::fs::remove_file(&part).await;
        return Err(e.into());
    }
    Ok(())
}

impl Drop for FsBlob {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path)
            && e.kind() != std::io::ErrorKind::NotFound
        {
            tracing::warn!(path = %self.path.display(), error = %e, "Failed to remove blob file");
        }
    }
}
