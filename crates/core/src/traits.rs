//! ObjectService and BlobStore trait definitions
//!
//! `ObjectService` is the storage-protocol boundary: the subset of the S3
//! object API the store implements, without any wire format. The engine
//! implements it in-process and the remote adapter implements it over an
//! S3 SDK, so the conformance suite runs unchanged against either.
//!
//! `BlobStore` is the body-storage collaborator the engine writes object
//! content into.

use std::fmt;
use std::ops::Range;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use jiff::Timestamp;
use serde::{Deserialize, Serialize};

use crate::body::{ByteRange, ByteStream};
use crate::error::Result;
use crate::path::CopySource;

/// Content type used when neither the caller nor the key says otherwise
pub const DEFAULT_CONTENT_TYPE: &str = "binary/octet-stream";

/// Canned ACL applied when the caller gives none
pub const DEFAULT_ACL: &str = "private";

/// Metadata for a bucket
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BucketInfo {
    /// Bucket name
    pub name: String,

    /// Creation timestamp
    pub created: Timestamp,

    /// ACL tag, stored but not enforced
    pub acl: String,

    /// Conceptual owner the bucket was created for
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
}

/// Metadata for an object
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectInfo {
    /// Object key
    pub key: String,

    /// Content length in bytes
    pub size: u64,

    /// Hex content hash, unquoted
    pub etag: String,

    /// Content type
    pub content_type: String,

    /// Last modified timestamp
    pub last_modified: Timestamp,

    /// ACL tag, stored but not enforced
    #[serde(skip_serializing_if = "Option::is_none")]
    pub acl: Option<String>,
}

impl ObjectInfo {
    /// Human-readable size
    pub fn size_human(&self) -> String {
        humansize::format_size(self.size, humansize::BINARY)
    }
}

/// Options for bucket creation
#[derive(Debug, Clone, Default)]
pub struct CreateBucketOptions {
    /// Canned ACL tag
    pub acl: Option<String>,

    /// Caller identity; re-creation by a different owner conflicts
    pub owner: Option<String>,
}

/// Options for object uploads
#[derive(Debug, Clone, Default)]
pub struct PutOptions {
    /// Content type; guessed from the key when absent
    pub content_type: Option<String>,

    /// Canned ACL tag
    pub acl: Option<String>,
}

impl PutOptions {
    /// Create PutOptions with a content type
    pub fn content_type(content_type: impl Into<String>) -> Self {
        Self {
            content_type: Some(content_type.into()),
            acl: None,
        }
    }

    /// Set the ACL tag
    pub fn with_acl(mut self, acl: impl Into<String>) -> Self {
        self.acl = Some(acl.into());
        self
    }
}

/// Options for object reads
#[derive(Debug, Clone, Default)]
pub struct GetOptions {
    /// Byte range to return
    pub range: Option<ByteRange>,

    /// Version qualifier; always rejected
    pub version_id: Option<String>,
}

impl GetOptions {
    /// Read only the given range
    pub fn range(range: ByteRange) -> Self {
        Self {
            range: Some(range),
            version_id: None,
        }
    }
}

/// Result of a read
pub struct GetObjectOutput {
    /// Metadata of the whole object
    pub info: ObjectInfo,

    /// Returned window when a range was requested
    pub content_range: Option<Range<u64>>,

    /// Object content
    pub body: ByteStream,
}

impl fmt::Debug for GetObjectOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GetObjectOutput")
            .field("info", &self.info)
            .field("content_range", &self.content_range)
            .finish_non_exhaustive()
    }
}

/// Options for object copies
#[derive(Debug, Clone, Default)]
pub struct CopyOptions {
    /// Canned ACL tag for the destination
    pub acl: Option<String>,
}

/// One entry of a batch delete
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteRequest {
    /// Object key
    pub key: String,

    /// Version qualifier, unsupported
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version_id: Option<String>,
}

impl DeleteRequest {
    /// Create an unqualified delete request
    pub fn key(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            version_id: None,
        }
    }

    /// Create a version-qualified delete request
    pub fn versioned(key: impl Into<String>, version_id: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            version_id: Some(version_id.into()),
        }
    }
}

/// Per-key error in a batch delete result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteError {
    /// S3 error code
    pub code: String,

    /// Human-readable message
    pub message: String,
}

/// Outcome of one entry of a batch delete
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteOutcome {
    /// Object key from the request
    pub key: String,

    /// Whether the key is reported deleted
    pub deleted: bool,

    /// Why the key was not deleted
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<DeleteError>,
}

impl DeleteOutcome {
    /// Successful outcome
    pub fn deleted(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            deleted: true,
            error: None,
        }
    }

    /// Failed outcome
    pub fn failed(key: impl Into<String>, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            deleted: false,
            error: Some(DeleteError {
                code: code.into(),
                message: message.into(),
            }),
        }
    }
}

/// Options for list operations
#[derive(Debug, Clone, Default)]
pub struct ListOptions {
    /// Prefix to filter by
    pub prefix: Option<String>,

    /// Delimiter for grouping (usually "/")
    pub delimiter: Option<String>,

    /// Maximum number of entries (keys plus common prefixes) per page
    pub max_keys: Option<usize>,

    /// Continuation token from a previous page
    pub continuation_token: Option<String>,

    /// Only list keys strictly after this one
    pub start_after: Option<String>,
}

impl ListOptions {
    /// List everything under a prefix
    pub fn prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: Some(prefix.into()),
            ..Default::default()
        }
    }

    /// Set the delimiter
    pub fn with_delimiter(mut self, delimiter: impl Into<String>) -> Self {
        self.delimiter = Some(delimiter.into());
        self
    }

    /// Set the page size
    pub fn with_max_keys(mut self, max_keys: usize) -> Self {
        self.max_keys = Some(max_keys);
        self
    }

    /// Resume from a continuation token
    pub fn with_continuation_token(mut self, token: impl Into<String>) -> Self {
        self.continuation_token = Some(token.into());
        self
    }
}

/// One page of a listing
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListPage {
    /// Literal keys, sorted
    pub objects: Vec<ObjectInfo>,

    /// Common prefixes, sorted
    pub common_prefixes: Vec<String>,

    /// Whether more entries remain
    pub is_truncated: bool,

    /// Token to resume after this page
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_continuation_token: Option<String>,

    /// Number of entries on this page
    pub key_count: usize,
}

impl ListPage {
    /// Keys of the literal entries
    pub fn keys(&self) -> Vec<&str> {
        self.objects.iter().map(|o| o.key.as_str()).collect()
    }
}

/// Trait for S3-compatible storage operations
///
/// Every object operation checks that the bucket exists first and fails
/// with `Error::NoSuchBucket` otherwise.
#[async_trait]
pub trait ObjectService: Send + Sync {
    /// Create a bucket; re-creation by the same owner is a no-op
    async fn create_bucket(&self, name: &str, options: CreateBucketOptions) -> Result<BucketInfo>;

    /// Check if a bucket exists
    async fn bucket_exists(&self, name: &str) -> Result<bool>;

    /// List buckets
    async fn list_buckets(&self) -> Result<Vec<BucketInfo>>;

    /// Store an object, replacing any previous one under the key
    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: ByteStream,
        options: PutOptions,
    ) -> Result<ObjectInfo>;

    /// Read an object; fails `NotFound` when absent
    async fn get_object(&self, bucket: &str, key: &str, options: GetOptions)
    -> Result<GetObjectOutput>;

    /// Get object metadata; fails `NotFound` when absent
    async fn head_object(&self, bucket: &str, key: &str) -> Result<ObjectInfo>;

    /// Delete an object; absent keys are not an error
    async fn delete_object(&self, bucket: &str, key: &str) -> Result<()>;

    /// Delete several objects, reporting one outcome per request
    async fn delete_objects(
        &self,
        bucket: &str,
        requests: Vec<DeleteRequest>,
    ) -> Result<Vec<DeleteOutcome>>;

    /// Copy an object; fails `NoSuchKey` when the source is absent
    async fn copy_object(
        &self,
        bucket: &str,
        key: &str,
        source: &CopySource,
        options: CopyOptions,
    ) -> Result<ObjectInfo>;

    /// List objects, grouped by an optional delimiter
    async fn list_objects_v2(&self, bucket: &str, options: ListOptions) -> Result<ListPage>;
}

/// Stored, immutable object content
///
/// Content is released when the last handle is dropped.
#[async_trait]
pub trait Blob: Send + Sync + fmt::Debug {
    /// Content length in bytes
    fn len(&self) -> u64;

    /// Whether the blob holds no bytes
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Stream the content, or the half-open window `range` of it
    async fn open(&self, range: Option<Range<u64>>) -> Result<ByteStream>;

    /// Make an independent copy that outlives this blob
    async fn duplicate(&self) -> Result<Arc<dyn Blob>>;
}

/// An in-progress blob upload
#[async_trait]
pub trait BlobWriter: Send {
    /// Append one chunk
    async fn append(&mut self, chunk: Bytes) -> Result<()>;

    /// Seal the written chunks into a blob
    async fn finish(self: Box<Self>) -> Result<Arc<dyn Blob>>;

    /// Discard everything written so far
    async fn abort(self: Box<Self>);
}

/// Body storage collaborator
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Short backend name for logs and reports
    fn name(&self) -> &'static str;

    /// Start writing a new blob
    async fn create(&self) -> Result<Box<dyn BlobWriter>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(key: &str, size: u64) -> ObjectInfo {
        ObjectInfo {
            key: key.to_string(),
            size,
            etag: "9a0364b9e99bb480dd25e1f0284c8555".to_string(),
            content_type: "text/plain".to_string(),
            last_modified: Timestamp::UNIX_EPOCH,
            acl: None,
        }
    }

    #[test]
    fn test_object_info_size_human() {
        assert_eq!(info("big-file", 2048).size_human(), "2 KiB");
    }

    #[test]
    fn test_delete_outcome_constructors() {
        let ok = DeleteOutcome::deleted("a.txt");
        assert!(ok.deleted);
        assert!(ok.error.is_none());

        let failed = DeleteOutcome::failed("a.txt", "NotImplemented", "versions");
        assert!(!failed.deleted);
        assert_eq!(failed.error.unwrap().code, "NotImplemented");
    }

    #[test]
    fn test_list_options_builder() {
        let options = ListOptions::prefix("list/")
            .with_delimiter("/")
            .with_max_keys(2)
            .with_continuation_token("list/f/");
        assert_eq!(options.prefix.as_deref(), Some("list/"));
        assert_eq!(options.delimiter.as_deref(), Some("/"));
        assert_eq!(options.max_keys, Some(2));
        assert_eq!(options.continuation_token.as_deref(), Some("list/f/"));
        assert!(options.start_after.is_none());
    }

    #[test]
    fn test_list_page_serializes_without_token() {
        let page = ListPage {
            objects: vec![info("list/a.txt", 1)],
            common_prefixes: vec!["list/one/".to_string()],
            key_count: 2,
            ..Default::default()
        };
        let json = serde_json::to_value(&page).unwrap();
        assert!(json.get("next_continuation_token").is_none());
        assert_eq!(json["common_prefixes"][0], "list/one/");
        assert_eq!(page.keys(), vec!["list/a.txt"]);
    }
}
