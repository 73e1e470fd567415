//! Bucket Registry
//!
//! Owns the set of buckets and their catalogs. Buckets are created once and
//! never removed.

use std::collections::BTreeMap;
use std::sync::Arc;

use jiff::Timestamp;
use tokio::sync::RwLock;

use fs3_core::traits::DEFAULT_ACL;
use fs3_core::{BucketInfo, CreateBucketOptions, Error, Result, validate_bucket_name};

use crate::catalog::Catalog;

/// A bucket and its objects
#[derive(Debug)]
pub struct Bucket {
    /// Bucket metadata
    pub info: BucketInfo,
    /// Objects in the bucket
    pub catalog: Catalog,
}

/// All buckets of one engine
#[derive(Debug, Default)]
pub struct Registry {
    buckets: RwLock<BTreeMap<String, Arc<Bucket>>>,
}

impl Registry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a bucket
    ///
    /// Re-creating an existing bucket returns its metadata unchanged, unless
    /// both the existing bucket and the request name an owner and the two
    /// differ.
    pub async fn create(&self, name: &str, options: CreateBucketOptions) -> Result<BucketInfo> {
        validate_bucket_name(name)?;

        let mut buckets = self.buckets.write().await;
        if let Some(existing) = buckets.get(name) {
            if let (Some(current), Some(caller)) = (&existing.info.owner, &options.owner)
                && current != caller
            {
                return Err(Error::AlreadyOwnedByOther(name.to_string()));
            }
            tracing::debug!(bucket = %name, "Bucket already exists");
            return Ok(existing.info.clone());
        }

        let info = BucketInfo {
            name: name.to_string(),
            created: Timestamp::now(),
            acl: options.acl.unwrap_or_else(|| DEFAULT_ACL.to_string()),
            owner: options.owner,
        };
        buckets.insert(
            name.to_string(),
            Arc::new(Bucket {
                info: info.clone(),
                catalog: Catalog::new(),
            }),
        );
        tracing::info!(bucket = %name, acl = %info.acl, "Created bucket");
        Ok(info)
    }

    /// Look up a bucket
    pub async fn get(&self, name: &str) -> Result<Arc<Bucket>> {
        self.buckets
            .read()
            .await
            .get(name)
            .cloned()
            .ok_or_else(|| Error::NoSuchBucket(name.to_string()))
    }

    /// Check if a bucket exists
    pub async fn contains(&self, name: &str) -> bool {
        self.buckets.read().await.contains_key(name)
    }

    /// Metadata of every bucket, sorted by name
    pub async fn list(&self) -> Vec<BucketInfo> {
        self.buckets
            .read()
            .await
            .values()
            .map(|b| b.info.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn owned_by(owner: &str) -> CreateBucketOptions {
        CreateBucketOptions {
            acl: None,
            owner: Some(owner.to_string()),
        }
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let registry = Registry::new();
        let info = registry
            .create("testbucket", CreateBucketOptions::default())
            .await
            .unwrap();
        assert_eq!(info.name, "testbucket");
        assert_eq!(info.acl, DEFAULT_ACL);

        let bucket = registry.get("testbucket").await.unwrap();
        assert_eq!(bucket.info.name, "testbucket");
        assert!(registry.contains("testbucket").await);
    }

    #[tokio::test]
    async fn test_missing_bucket() {
        let registry = Registry::new();
        assert!(matches!(
            registry.get("nobucket").await,
            Err(Error::NoSuchBucket(_))
        ));
        assert!(!registry.contains("nobucket").await);
    }

    #[tokio::test]
    async fn test_recreate_by_same_owner_is_noop() {
        let registry = Registry::new();
        let first = registry.create("testbucket", owned_by("alice")).await.unwrap();

        let options = CreateBucketOptions {
            acl: Some("public-read".to_string()),
            owner: Some("alice".to_string()),
        };
        let second = registry.create("testbucket", options).await.unwrap();
        assert_eq!(second.created, first.created);
        assert_eq!(second.acl, DEFAULT_ACL);

        // an anonymous caller is treated as the owner
        registry
            .create("testbucket", CreateBucketOptions::default())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_recreate_by_other_owner_conflicts() {
        let registry = Registry::new();
        registry.create("testbucket", owned_by("alice")).await.unwrap();
        let result = registry.create("testbucket", owned_by("bob")).await;
        assert!(matches!(result, Err(Error::AlreadyOwnedByOther(_))));
    }

    #[tokio::test]
    async fn test_recreate_keeps_objects() {
        let registry = Registry::new();
        registry
            .create("testbucket", CreateBucketOptions::default())
            .await
            .unwrap();
        let bucket = registry.get("testbucket").await.unwrap();
        bucket
            .catalog
            .put(
                "a.txt",
                crate::blob::ingest(&crate::blob::MemoryBlobStore, fs3_core::body::from_bytes("a"))
                    .await
                    .unwrap(),
                "text/plain".into(),
                DEFAULT_ACL.into(),
            )
            .await;

        registry
            .create("testbucket", CreateBucketOptions::default())
            .await
            .unwrap();
        let bucket = registry.get("testbucket").await.unwrap();
        assert_eq!(bucket.catalog.len().await, 1);
    }

    #[tokio::test]
    async fn test_invalid_name() {
        let registry = Registry::new();
        let result = registry.create("Bad_Name", CreateBucketOptions::default()).await;
        assert!(matches!(result, Err(Error::InvalidBucketName(_))));
    }

    #[tokio::test]
    async fn test_list_sorted() {
        let registry = Registry::new();
        for name in ["zeta", "alpha", "mid"] {
            registry
                .create(name, CreateBucketOptions::default())
                .await
                .unwrap();
        }
        let names: Vec<_> = registry.list().await.into_iter().map(|b| b.name).collect();
        assert_eq!(names, vec!["alpha", "mid", "zeta"]);
    }
}
