//! The in-process object service
//!
//! `Engine` ties the registry, catalogs and blob store together behind the
//! `ObjectService` boundary. Each engine is an independent instance; tests
//! build a fresh one per scenario.

use std::sync::Arc;

use async_trait::async_trait;
use futures::StreamExt;

use fs3_core::config::{DEFAULT_MAX_KEYS, EngineConfig};
use fs3_core::traits::{DEFAULT_ACL, DEFAULT_CONTENT_TYPE};
use fs3_core::{
    BlobStore, BucketInfo, ByteStream, CopyOptions, CopySource, CreateBucketOptions,
    DeleteOutcome, DeleteRequest, Error, GetObjectOutput, GetOptions, ListOptions, ListPage,
    ObjectInfo, ObjectService, PutOptions, Result,
};

use crate::blob::{self, MemoryBlobStore};
use crate::catalog::StoredObject;
use crate::registry::Registry;
use crate::{batch, copy, listing};

/// In-process S3-compatible object store
pub struct Engine {
    registry: Registry,
    blobs: Arc<dyn BlobStore>,
    max_keys: usize,
}

impl Engine {
    /// Create an engine storing bodies in `blobs`
    pub fn new(blobs: Arc<dyn BlobStore>) -> Self {
        Self {
            registry: Registry::new(),
            blobs,
            max_keys: DEFAULT_MAX_KEYS,
        }
    }

    /// Create an engine keeping everything in memory
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryBlobStore))
    }

    /// Create an engine from configuration
    pub async fn from_config(config: &EngineConfig) -> Result<Self> {
        let blobs = blob::from_config(config).await?;
        tracing::info!(backend = blobs.name(), "Engine started");
        Ok(Self::new(blobs).with_max_keys(config.max_keys))
    }

    /// Set the default and maximum listing page size
    pub fn with_max_keys(mut self, max_keys: usize) -> Self {
        self.max_keys = max_keys.max(1);
        self
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("backend", &self.blobs.name())
            .field("max_keys", &self.max_keys)
            .finish_non_exhaustive()
    }
}

fn object_path(bucket: &str, key: &str) -> String {
    format!("{bucket}/{key}")
}

fn check_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(Error::InvalidArgument("Object key cannot be empty".into()));
    }
    Ok(())
}

fn guess_content_type(key: &str) -> String {
    mime_guess::from_path(key)
        .first_raw()
        .unwrap_or(DEFAULT_CONTENT_TYPE)
        .to_string()
}

/// Keep the object alive for as long as its body is being read
fn hold(body: ByteStream, object: Arc<StoredObject>) -> ByteStream {
    Box::pin(body.map(move |chunk| {
        let _held = &object;
        chunk
    }))
}

#[async_trait]
impl ObjectService for Engine {
    async fn create_bucket(&self, name: &str, options: CreateBucketOptions) -> Result<BucketInfo> {
        self.registry.create(name, options).await
    }

    async fn bucket_exists(&self, name: &str) -> Result<bool> {
        Ok(self.registry.contains(name).await)
    }

    async fn list_buckets(&self) -> Result<Vec<BucketInfo>> {
        Ok(self.registry.list().await)
    }

    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: ByteStream,
        options: PutOptions,
    ) -> Result<ObjectInfo> {
        check_key(key)?;
        let target = self.registry.get(bucket).await?;

        let content_type = options
            .content_type
            .unwrap_or_else(|| guess_content_type(key));
        let acl = options.acl.unwrap_or_else(|| DEFAULT_ACL.to_string());

        let content = blob::ingest(self.blobs.as_ref(), body).await?;
        let info = target.catalog.put(key, content, content_type, acl).await;

        tracing::debug!(bucket = %bucket, key = %key, size = info.size, etag = %info.etag, "Stored object");
        Ok(info)
    }

    async fn get_object(
        &self,
        bucket: &str,
        key: &str,
        options: GetOptions,
    ) -> Result<GetObjectOutput> {
        if let Some(version) = options.version_id {
            return Err(Error::UnsupportedQualifier(format!(
                "{}?versionId={version}",
                object_path(bucket, key)
            )));
        }

        let source = self.registry.get(bucket).await?;
        let object = source
            .catalog
            .get(key)
            .await
            .ok_or_else(|| Error::NotFound(object_path(bucket, key)))?;

        let content_range = match options.range {
            Some(range) => Some(range.resolve(object.info.size)?),
            None => None,
        };
        let body = object.blob.open(content_range.clone()).await?;

        Ok(GetObjectOutput {
            info: object.info.clone(),
            content_range,
            body: hold(body, object),
        })
    }

    async fn head_object(&self, bucket: &str, key: &str) -> Result<ObjectInfo> {
        let source = self.registry.get(bucket).await?;
        source
            .catalog
            .get(key)
            .await
            .map(|object| object.info.clone())
            .ok_or_else(|| Error::NotFound(object_path(bucket, key)))
    }

    async fn delete_object(&self, bucket: &str, key: &str) -> Result<()> {
        let target = self.registry.get(bucket).await?;
        if target.catalog.remove(key).await.is_some() {
            tracing::debug!(bucket = %bucket, key = %key, "Deleted object");
        }
        Ok(())
    }

    async fn delete_objects(
        &self,
        bucket: &str,
        requests: Vec<DeleteRequest>,
    ) -> Result<Vec<DeleteOutcome>> {
        let target = self.registry.get(bucket).await?;
        Ok(batch::delete_objects(&target.catalog, bucket, requests).await)
    }

    async fn copy_object(
        &self,
        bucket: &str,
        key: &str,
        source: &CopySource,
        options: CopyOptions,
    ) -> Result<ObjectInfo> {
        if source.version_id.is_some() {
            return Err(Error::UnsupportedQualifier(source.to_string()));
        }
        check_key(key)?;

        let target = self.registry.get(bucket).await?;
        let origin = self.registry.get(&source.bucket).await?;
        let acl = options.acl.unwrap_or_else(|| DEFAULT_ACL.to_string());

        let info = copy::copy_object(&origin.catalog, source, &target.catalog, key, acl).await?;
        tracing::debug!(source = %source, bucket = %bucket, key = %key, "Copied object");
        Ok(info)
    }

    async fn list_objects_v2(&self, bucket: &str, options: ListOptions) -> Result<ListPage> {
        let source = self.registry.get(bucket).await?;
        let limit = self.max_keys;
        Ok(source
            .catalog
            .scan(|objects| listing::list_page(objects, &options, limit))
            .await)
    }
}
