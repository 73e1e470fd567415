//! S3 client implementation
//!
//! Wraps aws-sdk-s3 and implements the ObjectService trait from fs3-core,
//! so the conformance suite can run against any S3-compatible endpoint.

use std::ops::Range;

use async_trait::async_trait;
use aws_sdk_s3::types::{BucketCannedAcl, Delete, ObjectCannedAcl, ObjectIdentifier};
use aws_smithy_types::DateTime;
use futures::{StreamExt, stream};
use jiff::Timestamp;

use fs3_core::config::RemoteConfig;
use fs3_core::traits::{DEFAULT_ACL, DEFAULT_CONTENT_TYPE};
use fs3_core::{
    BucketInfo, ByteStream, CopyOptions, CopySource, CreateBucketOptions, DeleteOutcome,
    DeleteRequest, Error, GetObjectOutput, GetOptions, ListOptions, ListPage, ObjectInfo,
    ObjectService, PutOptions, Result,
};

use crate::error::{code, from_sdk};
use crate::multipart::{MultipartUpload, PartBuffer};

/// ObjectService backed by a remote S3-compatible endpoint
pub struct RemoteService {
    inner: aws_sdk_s3::Client,
    part_size: u64,
}

impl RemoteService {
    /// Create a new client from the remote configuration
    pub async fn connect(config: &RemoteConfig) -> Result<Self> {
        let endpoint = config.endpoint_url()?;

        // Build credentials provider
        let credentials = aws_credential_types::Credentials::new(
            config.access_key.clone(),
            config.secret_key.clone(),
            None, // session token
            None, // expiry
            "fs3-static-credentials",
        );

        // Build SDK config
        let sdk_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .credentials_provider(credentials)
            .region(aws_config::Region::new(config.region.clone()))
            .endpoint_url(endpoint.as_str())
            .load()
            .await;

        let s3_config = aws_sdk_s3::config::Builder::from(&sdk_config)
            .force_path_style(config.path_style)
            .build();

        tracing::debug!(endpoint = %endpoint, path_style = config.path_style, "Connected S3 client");
        Ok(Self {
            inner: aws_sdk_s3::Client::from_conf(s3_config),
            part_size: config.effective_part_size(),
        })
    }

    async fn put_single(
        &self,
        bucket: &str,
        key: &str,
        data: bytes::Bytes,
        options: &PutOptions,
    ) -> Result<Option<String>> {
        let mut request = self
            .inner
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(data.into());
        if let Some(ct) = &options.content_type {
            request = request.content_type(ct);
        }
        if let Some(acl) = &options.acl {
            request = request.acl(ObjectCannedAcl::from(acl.as_str()));
        }

        let response = request
            .send()
            .await
            .map_err(|e| from_sdk(e, bucket, &object_path(bucket, key)))?;
        Ok(response.e_tag().map(unquote))
    }

    async fn upload_body(
        &self,
        bucket: &str,
        key: &str,
        mut body: ByteStream,
        options: &PutOptions,
    ) -> Result<Option<String>> {
        let mut parts = PartBuffer::new(self.part_size as usize);
        let mut upload: Option<MultipartUpload<'_>> = None;

        while let Some(chunk) = body.next().await {
            let ready = match chunk {
                Ok(chunk) => parts.push(&chunk),
                Err(e) => {
                    if let Some(upload) = upload {
                        upload.abort().await;
                    }
                    return Err(e);
                }
            };

            for part in ready {
                if upload.is_none() {
                    upload = Some(MultipartUpload::start(&self.inner, bucket, key, options).await?);
                }
                let Some(current) = upload.as_mut() else {
                    continue;
                };
                if let Err(e) = current.upload_part(part).await {
                    if let Some(upload) = upload.take() {
                        upload.abort().await;
                    }
                    return Err(e);
                }
            }
        }

        let rest = parts.finish();
        match upload {
            // Everything fit in less than one part
            None => self.put_single(bucket, key, rest, options).await,
            Some(mut upload) => {
                if !rest.is_empty() || upload.is_empty() {
                    if let Err(e) = upload.upload_part(rest).await {
                        upload.abort().await;
                        return Err(e);
                    }
                }
                upload.complete().await
            }
        }
    }
}

fn object_path(bucket: &str, key: &str) -> String {
    format!("{bucket}/{key}")
}

fn unquote(etag: &str) -> String {
    etag.trim_matches('"').to_string()
}

/// Convert an SDK timestamp
fn timestamp(value: Option<&DateTime>) -> Timestamp {
    value
        .and_then(|dt| Timestamp::new(dt.secs(), dt.subsec_nanos() as i32).ok())
        .unwrap_or(Timestamp::UNIX_EPOCH)
}

/// Parse a `Content-Range: bytes first-last/total` header into the
/// returned window and the full length
fn parse_content_range(header: &str) -> Option<(Range<u64>, Option<u64>)> {
    let spec = header.trim().strip_prefix("bytes ")?;
    let (window, total) = spec.split_once('/')?;
    let (first, last) = window.split_once('-')?;
    let first: u64 = first.parse().ok()?;
    let last: u64 = last.parse().ok()?;
    if last < first {
        return None;
    }
    Some((first..last + 1, total.parse().ok()))
}

fn into_body(body: aws_sdk_s3::primitives::ByteStream) -> ByteStream {
    Box::pin(stream::unfold(body, |mut body| async move {
        let chunk = body.next().await?;
        Some((chunk.map_err(|e| Error::Network(e.to_string())), body))
    }))
}

#[async_trait]
impl ObjectService for RemoteService {
    async fn create_bucket(&self, name: &str, options: CreateBucketOptions) -> Result<BucketInfo> {
        let acl = options.acl.unwrap_or_else(|| DEFAULT_ACL.to_string());
        let result = self
            .inner
            .create_bucket()
            .bucket(name)
            .acl(BucketCannedAcl::from(acl.as_str()))
            .send()
            .await;

        match result {
            Ok(_) => tracing::info!(bucket = %name, "Created bucket"),
            Err(e) if code(&e) == Some("BucketAlreadyOwnedByYou") => {
                tracing::debug!(bucket = %name, "Bucket already exists");
            }
            Err(e) => return Err(from_sdk(e, name, name)),
        }

        Ok(BucketInfo {
            name: name.to_string(),
            created: Timestamp::now(),
            acl,
            owner: options.owner,
        })
    }

    async fn bucket_exists(&self, name: &str) -> Result<bool> {
        match self.inner.head_bucket().bucket(name).send().await {
            Ok(_) => Ok(true),
            Err(e) => match from_sdk(e, name, name) {
                err if err.is_not_found() => Ok(false),
                err => Err(err),
            },
        }
    }

    async fn list_buckets(&self) -> Result<Vec<BucketInfo>> {
        let response = self
            .inner
            .list_buckets()
            .send()
            .await
            .map_err(|e| from_sdk(e, "", "buckets"))?;

        let buckets = response
            .buckets()
            .iter()
            .map(|b| BucketInfo {
                name: b.name().unwrap_or_default().to_string(),
                created: timestamp(b.creation_date()),
                acl: DEFAULT_ACL.to_string(),
                owner: response
                    .owner()
                    .and_then(|o| o.id())
                    .map(str::to_string),
            })
            .collect();

        Ok(buckets)
    }

    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: ByteStream,
        options: PutOptions,
    ) -> Result<ObjectInfo> {
        let etag = self.upload_body(bucket, key, body, &options).await?;

        // The response carries no length or content type, ask for them
        let mut info = self.head_object(bucket, key).await?;
        if let Some(etag) = etag {
            info.etag = etag;
        }
        info.acl = options.acl;
        tracing::debug!(bucket = %bucket, key = %key, size = info.size, "Uploaded object");
        Ok(info)
    }

    async fn get_object(
        &self,
        bucket: &str,
        key: &str,
        options: GetOptions,
    ) -> Result<GetObjectOutput> {
        let path = object_path(bucket, key);
        let mut request = self.inner.get_object().bucket(bucket).key(key);
        if let Some(range) = &options.range {
            request = request.range(range.to_string());
        }
        if let Some(version) = &options.version_id {
            request = request.version_id(version);
        }

        let response = request.send().await.map_err(|e| {
            match from_sdk(e, bucket, &path) {
                // GetObject reports a missing key as NoSuchKey
                Error::NoSuchKey(p) => Error::NotFound(p),
                other => other,
            }
        })?;

        let content_range = response.content_range().and_then(parse_content_range);
        let size = match &content_range {
            Some((_, Some(total))) => *total,
            _ => response.content_length().unwrap_or(0).max(0) as u64,
        };

        let info = ObjectInfo {
            key: key.to_string(),
            size,
            etag: response.e_tag().map(unquote).unwrap_or_default(),
            content_type: response
                .content_type()
                .unwrap_or(DEFAULT_CONTENT_TYPE)
                .to_string(),
            last_modified: timestamp(response.last_modified()),
            acl: None,
        };

        Ok(GetObjectOutput {
            info,
            content_range: content_range.map(|(window, _)| window),
            body: into_body(response.body),
        })
    }

    async fn head_object(&self, bucket: &str, key: &str) -> Result<ObjectInfo> {
        let path = object_path(bucket, key);
        let response = self
            .inner
            .head_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| match from_sdk(e, bucket, &path) {
                Error::NoSuchKey(p) => Error::NotFound(p),
                other => other,
            })?;

        Ok(ObjectInfo {
            key: key.to_string(),
            size: response.content_length().unwrap_or(0).max(0) as u64,
            etag: response.e_tag().map(unquote).unwrap_or_default(),
            content_type: response
                .content_type()
                .unwrap_or(DEFAULT_CONTENT_TYPE)
                .to_string(),
            last_modified: timestamp(response.last_modified()),
            acl: None,
        })
    }

    async fn delete_object(&self, bucket: &str, key: &str) -> Result<()> {
        self.inner
            .delete_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| from_sdk(e, bucket, &object_path(bucket, key)))?;

        Ok(())
    }

    async fn delete_objects(
        &self,
        bucket: &str,
        requests: Vec<DeleteRequest>,
    ) -> Result<Vec<DeleteOutcome>> {
        if requests.is_empty() {
            return Ok(vec![]);
        }

        let objects = requests
            .iter()
            .map(|r| {
                ObjectIdentifier::builder()
                    .key(&r.key)
                    .set_version_id(r.version_id.clone())
                    .build()
                    .map_err(|e| Error::General(e.to_string()))
            })
            .collect::<Result<Vec<_>>>()?;

        let delete = Delete::builder()
            .set_objects(Some(objects))
            .build()
            .map_err(|e| Error::General(e.to_string()))?;

        let response = self
            .inner
            .delete_objects()
            .bucket(bucket)
            .delete(delete)
            .send()
            .await
            .map_err(|e| from_sdk(e, bucket, bucket))?;

        let mut outcomes: Vec<DeleteOutcome> = response
            .deleted()
            .iter()
            .filter_map(|d| d.key().map(DeleteOutcome::deleted))
            .collect();

        for error in response.errors() {
            let key = error.key().unwrap_or_default();
            tracing::warn!(bucket = %bucket, key = %key, code = ?error.code(), "Failed to delete");
            outcomes.push(DeleteOutcome::failed(
                key,
                error.code().unwrap_or("InternalError"),
                error.message().unwrap_or_default(),
            ));
        }

        Ok(outcomes)
    }

    async fn copy_object(
        &self,
        bucket: &str,
        key: &str,
        source: &CopySource,
        options: CopyOptions,
    ) -> Result<ObjectInfo> {
        // Build copy source: bucket/key
        let copy_source = source.to_path().trim_start_matches('/').to_string();
        let source_path = object_path(&source.bucket, &source.key);

        let mut request = self
            .inner
            .copy_object()
            .copy_source(&copy_source)
            .bucket(bucket)
            .key(key);
        if let Some(acl) = &options.acl {
            request = request.acl(ObjectCannedAcl::from(acl.as_str()));
        }

        let response = request.send().await.map_err(|e| {
            match from_sdk(e, bucket, &source_path) {
                Error::NotFound(p) => Error::NoSuchKey(p),
                other => other,
            }
        })?;

        // Get size from head_object since copy doesn't return it
        let mut info = self.head_object(bucket, key).await?;
        if let Some(etag) = response.copy_object_result().and_then(|r| r.e_tag()) {
            info.etag = unquote(etag);
        }
        info.acl = options.acl;

        Ok(info)
    }

    async fn list_objects_v2(&self, bucket: &str, options: ListOptions) -> Result<ListPage> {
        let mut request = self.inner.list_objects_v2().bucket(bucket);
        if let Some(prefix) = &options.prefix {
            request = request.prefix(prefix);
        }
        if let Some(delimiter) = &options.delimiter {
            request = request.delimiter(delimiter);
        }
        if let Some(max) = options.max_keys {
            request = request.max_keys(max.min(i32::MAX as usize) as i32);
        }
        if let Some(token) = &options.continuation_token {
            request = request.continuation_token(token);
        }
        if let Some(after) = &options.start_after {
            request = request.start_after(after);
        }

        let response = request
            .send()
            .await
            .map_err(|e| from_sdk(e, bucket, bucket))?;

        // Listings do not report content types
        let objects: Vec<ObjectInfo> = response
            .contents()
            .iter()
            .map(|object| ObjectInfo {
                key: object.key().unwrap_or_default().to_string(),
                size: object.size().unwrap_or(0).max(0) as u64,
                etag: object.e_tag().map(unquote).unwrap_or_default(),
                content_type: DEFAULT_CONTENT_TYPE.to_string(),
                last_modified: timestamp(object.last_modified()),
                acl: None,
            })
            .collect();

        let common_prefixes: Vec<String> = response
            .common_prefixes()
            .iter()
            .filter_map(|p| p.prefix().map(str::to_string))
            .collect();

        let key_count = response
            .key_count()
            .map(|n| n.max(0) as usize)
            .unwrap_or(objects.len() + common_prefixes.len());

        Ok(ListPage {
            objects,
            common_prefixes,
            is_truncated: response.is_truncated().unwrap_or(false),
            next_continuation_token: response.next_continuation_token().map(str::to_string),
            key_count,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_content_range() {
        assert_eq!(
            parse_content_range("bytes 0-99/1000"),
            Some((0..100, Some(1000)))
        );
        assert_eq!(parse_content_range("bytes 5-5/*"), Some((5..6, None)));
        assert_eq!(parse_content_range("bytes */1000"), None);
        assert_eq!(parse_content_range("items 0-1/2"), None);
        assert_eq!(parse_content_range("bytes 9-3/10"), None);
    }

    #[test]
    fn test_timestamp_conversion() {
        let dt = DateTime::from_secs_and_nanos(1_700_000_000, 500);
        let ts = timestamp(Some(&dt));
        assert_eq!(ts.as_second(), 1_700_000_000);
        assert_eq!(ts.subsec_nanosecond(), 500);
        assert_eq!(timestamp(None), Timestamp::UNIX_EPOCH);
    }

    #[test]
    fn test_unquote_etag() {
        assert_eq!(unquote("\"9a0364b9e99bb480dd25e1f0284c8555\""), "9a0364b9e99bb480dd25e1f0284c8555");
        assert_eq!(unquote("abc"), "abc");
    }
}
