//! Object Catalog
//!
//! The per-bucket map from key to object. Each entry pairs the object's
//! metadata with its blob handle; replacing or removing an entry drops the
//! catalog's handle, and the content goes away once no reader holds it.

use std::collections::BTreeMap;
use std::sync::Arc;

use jiff::Timestamp;
use tokio::sync::RwLock;

use fs3_core::{Blob, ObjectInfo};

use crate::blob::Ingested;

/// A stored object: metadata plus content
#[derive(Debug)]
pub struct StoredObject {
    /// Object metadata
    pub info: ObjectInfo,
    /// Object content
    pub blob: Arc<dyn Blob>,
}

/// Sorted key to object map for one bucket
#[derive(Debug, Default)]
pub struct Catalog {
    objects: RwLock<BTreeMap<String, Arc<StoredObject>>>,
}

impl Catalog {
    /// Create an empty catalog
    pub fn new() -> Self {
        Self::default()
    }

    /// Commit an ingested body under `key`, replacing any previous object
    ///
    /// Concurrent puts to one key are ordered by when they reach this
    /// point; the last one wins.
    pub async fn put(
        &self,
        key: &str,
        content: Ingested,
        content_type: String,
        acl: String,
    ) -> ObjectInfo {
        let info = ObjectInfo {
            key: key.to_string(),
            size: content.blob.len(),
            etag: content.etag,
            content_type,
            last_modified: Timestamp::now(),
            acl: Some(acl),
        };
        self.insert(StoredObject {
            info: info.clone(),
            blob: content.blob,
        })
        .await;
        info
    }

    /// Insert an object, returning the one it replaced
    pub async fn insert(&self, object: StoredObject) -> Option<Arc<StoredObject>> {
        let key = object.info.key.clone();
        self.objects.write().await.insert(key, Arc::new(object))
    }

    /// Look up an object
    pub async fn get(&self, key: &str) -> Option<Arc<StoredObject>> {
        self.objects.read().await.get(key).cloned()
    }

    /// Remove an object, returning it if it existed
    pub async fn remove(&self, key: &str) -> Option<Arc<StoredObject>> {
        self.objects.write().await.remove(key)
    }

    /// Number of objects
    pub async fn len(&self) -> usize {
        self.objects.read().await.len()
    }

    /// Whether the catalog holds no objects
    pub async fn is_empty(&self) -> bool {
        self.objects.read().await.is_empty()
    }

    /// Run `f` over the sorted map under the read lock
    pub async fn scan<T>(&self, f: impl FnOnce(&BTreeMap<String, Arc<StoredObject>>) -> T) -> T {
        f(&*self.objects.read().await)
    }
}
