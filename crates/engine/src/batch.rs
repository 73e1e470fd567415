//! Batch Delete Coordinator
//!
//! Deletes each requested key independently and reports one outcome per
//! request. The batch itself never fails: an absent key is reported
//! deleted, and a version-qualified request is refused for that key alone.

use futures::future::join_all;

use fs3_core::{DeleteOutcome, DeleteRequest, Error};

use crate::catalog::Catalog;

/// Delete every requested key from `catalog`
pub async fn delete_objects(
    catalog: &Catalog,
    bucket: &str,
    requests: Vec<DeleteRequest>,
) -> Vec<DeleteOutcome> {
    let deletes = requests
        .into_iter()
        .map(|request| delete_one(catalog, bucket, request));
    let outcomes = join_all(deletes).await;

    let deleted = outcomes.iter().filter(|o| o.deleted).count();
    tracing::debug!(
        bucket = %bucket,
        deleted,
        refused = outcomes.len() - deleted,
        "Batch delete finished"
    );
    outcomes
}

async fn delete_one(catalog: &Catalog, bucket: &str, request: DeleteRequest) -> DeleteOutcome {
    if let Some(version) = request.version_id {
        let refused = Error::UnsupportedQualifier(format!(
            "{bucket}/{}?versionId={version}",
            request.key
        ));
        return DeleteOutcome::failed(
            request.key,
            refused.code(),
            "Version-qualified deletes are not supported",
        );
    }

    if catalog.remove(&request.key).await.is_some() {
        tracing::debug!(bucket = %bucket, key = %request.key, "Deleted object");
    }
    DeleteOutcome::deleted(request.key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blob::{MemoryBlobStore, ingest};
    use fs3_core::body;

    async fn catalog_with(keys: &[&str]) -> Catalog {
        let catalog = Catalog::new();
        for key in keys {
            let content = ingest(&MemoryBlobStore, body::from_bytes(key.to_string()))
                .await
                .unwrap();
            catalog
                .put(key, content, "text/plain".into(), "private".into())
                .await;
        }
        catalog
    }

    #[tokio::test]
    async fn test_absent_keys_report_deleted() {
        let catalog = catalog_with(&["a.txt", "b.txt", "c.txt"]).await;
        let outcomes = delete_objects(
            &catalog,
            "testbucket",
            vec![DeleteRequest::key("b.txt"), DeleteRequest::key("z.txt")],
        )
        .await;

        assert_eq!(outcomes.len(), 2);
        assert!(outcomes.iter().all(|o| o.deleted && o.error.is_none()));
        assert!(catalog.get("b.txt").await.is_none());
        assert!(catalog.get("a.txt").await.is_some());
        assert!(catalog.get("c.txt").await.is_some());
    }

    #[tokio::test]
    async fn test_duplicates_each_reported() {
        let catalog = catalog_with(&["a.txt"]).await;
        let outcomes = delete_objects(
            &catalog,
            "testbucket",
            vec![DeleteRequest::key("a.txt"), DeleteRequest::key("a.txt")],
        )
        .await;

        assert_eq!(outcomes.len(), 2);
        assert!(outcomes.iter().all(|o| o.key == "a.txt" && o.deleted));
        assert!(catalog.is_empty().await);
    }

    #[tokio::test]
    async fn test_versioned_request_is_refused() {
        let catalog = catalog_with(&["a.txt", "b.txt"]).await;
        let outcomes = delete_objects(
            &catalog,
            "testbucket",
            vec![
                DeleteRequest::versioned("a.txt", "v1"),
                DeleteRequest::key("b.txt"),
            ],
        )
        .await;

        let refused = outcomes.iter().find(|o| o.key == "a.txt").unwrap();
        assert!(!refused.deleted);
        assert_eq!(refused.error.as_ref().unwrap().code, "NotImplemented");
        assert!(catalog.get("a.txt").await.is_some());

        let deleted = outcomes.iter().find(|o| o.key == "b.txt").unwrap();
        assert!(deleted.deleted);
        assert!(catalog.get("b.txt").await.is_none());
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let catalog = Catalog::new();
        assert!(delete_objects(&catalog, "testbucket", vec![]).await.is_empty());
    }
}
