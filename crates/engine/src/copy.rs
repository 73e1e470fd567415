//! Copy Engine
//!
//! Copies duplicate the source blob, so later writes or deletes of the
//! source never reach the destination.

use jiff::Timestamp;

use fs3_core::{CopySource, Error, ObjectInfo, Result};

use crate::catalog::{Catalog, StoredObject};

/// Copy `source` out of `from` into `to` under `key`
///
/// Fails `NoSuchKey` when the source is absent; the destination is left
/// untouched in that case.
pub async fn copy_object(
    from: &Catalog,
    source: &CopySource,
    to: &Catalog,
    key: &str,
    acl: String,
) -> Result<ObjectInfo> {
    let original = from
        .get(&source.key)
        .await
        .ok_or_else(|| Error::NoSuchKey(format!("{}/{}", source.bucket, source.key)))?;

    let blob = original.blob.duplicate().await?;
    let info = ObjectInfo {
        key: key.to_string(),
        last_modified: Timestamp::now(),
        acl: Some(acl),
        ..original.info.clone()
    };

    to.insert(StoredObject {
        info: info.clone(),
        blob,
    })
    .await;
    Ok(info)
}
