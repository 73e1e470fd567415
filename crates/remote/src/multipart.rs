//! Multipart upload support
//!
//! Bodies arrive as a stream of unknown length. Chunks are gathered into
//! parts of a fixed size; once the first full part exists the upload
//! switches to multipart, so at most one part is ever held in memory.

use aws_sdk_s3::Client;
use aws_sdk_s3::types::{CompletedMultipartUpload, CompletedPart, ObjectCannedAcl};
use bytes::{Bytes, BytesMut};

use fs3_core::{Error, PutOptions, Result};

use crate::error::from_sdk;

/// Maximum number of parts: 10,000 (S3 limit)
pub const MAX_PARTS: usize = 10_000;

/// Gathers stream chunks into fixed-size parts
#[derive(Debug)]
pub struct PartBuffer {
    part_size: usize,
    buf: BytesMut,
}

impl PartBuffer {
    /// Create a buffer emitting parts of `part_size` bytes
    pub fn new(part_size: usize) -> Self {
        Self {
            part_size: part_size.max(1),
            buf: BytesMut::new(),
        }
    }

    /// Add a chunk, returning every part it completed
    pub fn push(&mut self, chunk: &[u8]) -> Vec<Bytes> {
        let mut parts = Vec::new();
        let mut rest = chunk;
        while !rest.is_empty() {
            let room = self.part_size - self.buf.len();
            let take = room.min(rest.len());
            self.buf.extend_from_slice(&rest[..take]);
            rest = &rest[take..];
            if self.buf.len() == self.part_size {
                parts.push(self.buf.split().freeze());
            }
        }
        parts
    }

    /// Bytes waiting for the next part
    pub fn pending(&self) -> usize {
        self.buf.len()
    }

    /// Take whatever is left as the final part
    pub fn finish(self) -> Bytes {
        self.buf.freeze()
    }
}

/// An in-progress multipart upload
pub(crate) struct MultipartUpload<'a> {
    client: &'a Client,
    bucket: String,
    key: String,
    upload_id: String,
    parts: Vec<CompletedPart>,
}

impl<'a> MultipartUpload<'a> {
    /// Start a new upload
    pub async fn start(
        client: &'a Client,
        bucket: &str,
        key: &str,
        options: &PutOptions,
    ) -> Result<Self> {
        let mut request = client.create_multipart_upload().bucket(bucket).key(key);
        if let Some(ct) = &options.content_type {
            request = request.content_type(ct);
        }
        if let Some(acl) = &options.acl {
            request = request.acl(ObjectCannedAcl::from(acl.as_str()));
        }

        let path = format!("{bucket}/{key}");
        let response = request
            .send()
            .await
            .map_err(|e| from_sdk(e, bucket, &path))?;
        let upload_id = response
            .upload_id()
            .ok_or_else(|| Error::General(format!("{path}: no upload id returned")))?
            .to_string();

        tracing::debug!(bucket = %bucket, key = %key, upload_id = %upload_id, "Started multipart upload");
        Ok(Self {
            client,
            bucket: bucket.to_string(),
            key: key.to_string(),
            upload_id,
            parts: Vec::new(),
        })
    }

    /// Upload the next part
    pub async fn upload_part(&mut self, data: Bytes) -> Result<()> {
        if self.parts.len() >= MAX_PARTS {
            return Err(Error::InvalidArgument(format!(
                "{}/{}: body needs more than {MAX_PARTS} parts, raise the part size",
                self.bucket, self.key
            )));
        }
        let part_number = self.parts.len() as i32 + 1;

        let response = self
            .client
            .upload_part()
            .bucket(&self.bucket)
            .key(&self.key)
            .upload_id(&self.upload_id)
            .part_number(part_number)
            .body(data.into())
            .send()
            .await
            .map_err(|e| from_sdk(e, &self.bucket, &self.key))?;

        self.parts.push(
            CompletedPart::builder()
                .part_number(part_number)
                .set_e_tag(response.e_tag().map(str::to_string))
                .build(),
        );
        Ok(())
    }

    /// Whether no part has been uploaded yet
    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    /// Complete the upload, returning the ETag
    pub async fn complete(self) -> Result<Option<String>> {
        let upload = CompletedMultipartUpload::builder()
            .set_parts(Some(self.parts.clone()))
            .build();

        let result = self
            .client
            .complete_multipart_upload()
            .bucket(&self.bucket)
            .key(&self.key)
            .upload_id(&self.upload_id)
            .multipart_upload(upload)
            .send()
            .await;

        match result {
            Ok(response) => {
                tracing::debug!(
                    bucket = %self.bucket,
                    key = %self.key,
                    parts = self.parts.len(),
                    "Completed multipart upload"
                );
                Ok(response.e_tag().map(|e| e.trim_matches('"').to_string()))
            }
            Err(e) => {
                let err = from_sdk(e, &self.bucket, &self.key);
                self.abort().await;
                Err(err)
            }
        }
    }

    /// Abort the upload, discarding uploaded parts
    pub async fn abort(self) {
        let result = self
            .client
            .abort_multipart_upload()
            .bucket(&self.bucket)
            .key(&self.key)
            .upload_id(&self.upload_id)
            .send()
            .await;
        if let Err(e) = result {
            tracing::warn!(
                bucket = %self.bucket,
                key = %self.key,
                upload_id = %self.upload_id,
                error = %e,
                "Failed to abort multipart upload"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_small_chunks_fill_parts() {
        let mut buffer = PartBuffer::new(4);
        assert!(buffer.push(b"ab").is_empty());
        assert_eq!(buffer.pending(), 2);

        let parts = buffer.push(b"cdef");
        assert_eq!(parts, vec![Bytes::from_static(b"abcd")]);
        assert_eq!(buffer.pending(), 2);
        assert_eq!(buffer.finish(), Bytes::from_static(b"ef"));
    }

    #[test]
    fn test_large_chunk_splits_into_parts() {
        let mut buffer = PartBuffer::new(3);
        let parts = buffer.push(b"0123456");
        assert_eq!(
            parts,
            vec![Bytes::from_static(b"012"), Bytes::from_static(b"345")]
        );
        assert_eq!(buffer.finish(), Bytes::from_static(b"6"));
    }

    #[test]
    fn test_exact_fit_leaves_nothing() {
        let mut buffer = PartBuffer::new(2);
        assert_eq!(buffer.push(b"ab").len(), 1);
        assert_eq!(buffer.pending(), 0);
        assert!(buffer.finish().is_empty());
    }

    #[test]
    fn test_empty_chunk() {
        let mut buffer = PartBuffer::new(2);
        assert!(buffer.push(b"").is_empty());
        assert!(buffer.finish().is_empty());
    }
}
