//! Conformance scenario suite
//!
//! One suite of scenarios written against [`ObjectService`], so the same
//! checks run against the in-process engine and against any remote
//! S3-compatible endpoint. All scenarios share one bucket; each removes the
//! keys it wrote when it finishes, pass or fail.

use std::time::Instant;

use anyhow::{Context, anyhow, bail, ensure};
use bytes::Bytes;
use futures::{StreamExt, stream};
use serde::Serialize;

use crate::body::{self, ByteRange, ByteStream};
use crate::config::SuiteConfig;
use crate::error::Error;
use crate::path::CopySource;
use crate::traits::{
    CopyOptions, CreateBucketOptions, DeleteOutcome, DeleteRequest, GetOptions, ListOptions,
    ListPage, ObjectService, PutOptions,
};

/// ACL tag the scenarios attach to everything they create
pub const SCENARIO_ACL: &str = "bucket-owner-full-control";

const TEXT_PLAIN: &str = "text/plain";
const BIG_PATTERN: &[u8] = b"123456789_";
// Multiple of the pattern length, so every chunk starts at pattern offset 0
const BIG_CHUNK_LEN: usize = 104_857 * BIG_PATTERN.len();

const LIST_FILES: [(&str, &str); 7] = [
    ("list/a.txt", "1"),
    ("list/one/b.txt", "2"),
    ("list/one/c.txt", "3"),
    ("list/one/two/d.txt", "4"),
    ("list/f/o/u/r/e.txt", "5"),
    ("list/f/o/u/r/f.txt", "6"),
    ("list/g.txt", "7"),
];

const PAGE_FILES: [(&str, &str); 6] = [
    ("page/a.txt", "1"),
    ("page/b/1.txt", "2"),
    ("page/b/2.txt", "3"),
    ("page/b/3.txt", "4"),
    ("page/c.txt", "5"),
    ("page/d/1.txt", "6"),
];

const MULTI_DEL_FILES: [(&str, &str); 5] = [
    ("multi-del/a.txt", "1"),
    ("multi-del/b.txt", "2"),
    ("multi-del/c.txt", "3"),
    ("multi-del/d.txt", "4"),
    ("multi-del/e.txt", "5"),
];

/// Settings shared by every scenario of a run
#[derive(Debug, Clone)]
pub struct SuiteOptions {
    /// Bucket the scenarios run in
    pub bucket: String,
    /// Size of the streamed upload/download
    pub big_object_size: u64,
}

impl From<&SuiteConfig> for SuiteOptions {
    fn from(config: &SuiteConfig) -> Self {
        Self {
            bucket: config.bucket.clone(),
            big_object_size: config.big_object_size,
        }
    }
}

impl Default for SuiteOptions {
    fn default() -> Self {
        Self::from(&SuiteConfig::default())
    }
}

/// The scenarios of the suite
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scenario {
    CreateBucket,
    PutGetDelete,
    CopyObject,
    CopyObject404,
    ListObjects,
    ListPagination,
    DeleteObjects,
    VersionedDelete,
    BigUploadDownload,
}

impl Scenario {
    /// Every scenario, in run order
    pub const ALL: [Scenario; 9] = [
        Scenario::CreateBucket,
        Scenario::PutGetDelete,
        Scenario::CopyObject,
        Scenario::CopyObject404,
        Scenario::ListObjects,
        Scenario::ListPagination,
        Scenario::DeleteObjects,
        Scenario::VersionedDelete,
        Scenario::BigUploadDownload,
    ];

    /// Stable scenario name
    pub const fn name(self) -> &'static str {
        match self {
            Scenario::CreateBucket => "create_bucket",
            Scenario::PutGetDelete => "put_get_delete",
            Scenario::CopyObject => "copy_object",
            Scenario::CopyObject404 => "copy_object_404",
            Scenario::ListObjects => "list_objects",
            Scenario::ListPagination => "list_pagination",
            Scenario::DeleteObjects => "delete_objects",
            Scenario::VersionedDelete => "versioned_delete",
            Scenario::BigUploadDownload => "big_upload_download",
        }
    }

    /// One-line description
    pub const fn description(self) -> &'static str {
        match self {
            Scenario::CreateBucket => "re-creating an owned bucket succeeds",
            Scenario::PutGetDelete => "put, get, delete and idempotent re-delete of one key",
            Scenario::CopyObject => "copy keeps bytes, ETag and content type",
            Scenario::CopyObject404 => "copy from a missing source fails NoSuchKey",
            Scenario::ListObjects => "prefix and delimiter grouping",
            Scenario::ListPagination => "max-keys paging never splits a common prefix",
            Scenario::DeleteObjects => "batch delete is idempotent for absent keys",
            Scenario::VersionedDelete => "version-qualified delete is refused per key",
            Scenario::BigUploadDownload => "streamed upload and ranged download of a large body",
        }
    }

    /// Whether the expected results hold for any S3-compatible store, not
    /// only for this engine's simplifications
    pub const fn portable(self) -> bool {
        !matches!(self, Scenario::VersionedDelete)
    }

    /// Look a scenario up by name
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.name() == name)
    }

    fn cleanup_keys(self) -> Vec<&'static str> {
        match self {
            Scenario::CreateBucket | Scenario::CopyObject404 => vec![],
            Scenario::PutGetDelete => vec!["file.txt"],
            Scenario::CopyObject => vec!["copy/src.txt", "copy/dst.txt"],
            Scenario::ListObjects => LIST_FILES.iter().map(|(k, _)| *k).collect(),
            Scenario::ListPagination => PAGE_FILES.iter().map(|(k, _)| *k).collect(),
            Scenario::DeleteObjects => MULTI_DEL_FILES.iter().map(|(k, _)| *k).collect(),
            Scenario::VersionedDelete => vec!["versioned/a.txt"],
            Scenario::BigUploadDownload => vec!["big-file"],
        }
    }

    async fn run(self, svc: &dyn ObjectService, options: &SuiteOptions) -> anyhow::Result<()> {
        let bucket = options.bucket.as_str();
        match self {
            Scenario::CreateBucket => create_bucket(svc, bucket).await,
            Scenario::PutGetDelete => put_get_delete(svc, bucket).await,
            Scenario::CopyObject => copy_object(svc, bucket).await,
            Scenario::CopyObject404 => copy_object_404(svc, bucket).await,
            Scenario::ListObjects => list_objects(svc, bucket).await,
            Scenario::ListPagination => list_pagination(svc, bucket).await,
            Scenario::DeleteObjects => delete_objects(svc, bucket).await,
            Scenario::VersionedDelete => versioned_delete(svc, bucket).await,
            Scenario::BigUploadDownload => {
                big_upload_download(svc, bucket, options.big_object_size).await
            }
        }
    }
}

impl std::fmt::Display for Scenario {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Outcome of one scenario
#[derive(Debug, Clone, Serialize)]
pub struct ScenarioReport {
    /// Scenario name
    pub name: &'static str,
    /// Whether every check passed
    pub passed: bool,
    /// Wall-clock duration in milliseconds, cleanup included
    pub duration_ms: u64,
    /// First failed check, with context
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Outcome of a suite run
#[derive(Debug, Clone, Serialize)]
pub struct SuiteReport {
    /// Bucket the suite ran in
    pub bucket: String,
    /// Per-scenario results, in run order
    pub scenarios: Vec<ScenarioReport>,
}

impl SuiteReport {
    /// Number of passed scenarios
    pub fn passed(&self) -> usize {
        self.scenarios.iter().filter(|s| s.passed).count()
    }

    /// Number of failed scenarios
    pub fn failed(&self) -> usize {
        self.scenarios.len() - self.passed()
    }

    /// Whether every scenario passed
    pub fn is_success(&self) -> bool {
        self.failed() == 0
    }
}

/// Create the suite bucket if needed and check it can be listed
pub async fn prepare_bucket(svc: &dyn ObjectService, bucket: &str) -> anyhow::Result<()> {
    svc.create_bucket(bucket, bucket_options())
        .await
        .with_context(|| format!("creating bucket {bucket}"))?;
    svc.list_objects_v2(bucket, ListOptions::default().with_delimiter("/"))
        .await
        .with_context(|| format!("listing bucket {bucket}"))?;
    Ok(())
}

/// Run one scenario and clean up after it
pub async fn run_scenario(
    svc: &dyn ObjectService,
    scenario: Scenario,
    options: &SuiteOptions,
) -> ScenarioReport {
    let started = Instant::now();
    let outcome = scenario.run(svc, options).await;
    delete_all_keys(svc, &options.bucket, &scenario.cleanup_keys()).await;

    if let Err(e) = &outcome {
        tracing::warn!(scenario = scenario.name(), error = %format!("{e:#}"), "Scenario failed");
    }

    ScenarioReport {
        name: scenario.name(),
        passed: outcome.is_ok(),
        duration_ms: started.elapsed().as_millis() as u64,
        error: outcome.err().map(|e| format!("{e:#}")),
    }
}

/// Prepare the bucket and run the given scenarios in order
pub async fn run_suite(
    svc: &dyn ObjectService,
    scenarios: &[Scenario],
    options: &SuiteOptions,
) -> anyhow::Result<SuiteReport> {
    prepare_bucket(svc, &options.bucket).await?;

    let mut reports = Vec::with_capacity(scenarios.len());
    for scenario in scenarios {
        reports.push(run_scenario(svc, *scenario, options).await);
    }

    Ok(SuiteReport {
        bucket: options.bucket.clone(),
        scenarios: reports,
    })
}

fn bucket_options() -> CreateBucketOptions {
    CreateBucketOptions {
        acl: Some(SCENARIO_ACL.to_string()),
        owner: None,
    }
}

fn text_options() -> PutOptions {
    PutOptions::content_type(TEXT_PLAIN).with_acl(SCENARIO_ACL)
}

async fn put_text_files(
    svc: &dyn ObjectService,
    bucket: &str,
    files: &[(&str, &str)],
) -> anyhow::Result<()> {
    for (key, content) in files {
        svc.put_object(
            bucket,
            key,
            body::from_bytes(content.as_bytes().to_vec()),
            text_options(),
        )
        .await
        .with_context(|| format!("putting {key}"))?;
    }
    Ok(())
}

async fn delete_all_keys(svc: &dyn ObjectService, bucket: &str, keys: &[&str]) {
    for key in keys {
        if let Err(e) = svc.delete_object(bucket, key).await {
            tracing::warn!(bucket = %bucket, key = %key, error = %e, "Failed to delete");
        }
    }
}

async fn list(
    svc: &dyn ObjectService,
    bucket: &str,
    options: ListOptions,
) -> anyhow::Result<ListPage> {
    let what = format!(
        "listing prefix={:?} delimiter={:?} max_keys={:?}",
        options.prefix, options.delimiter, options.max_keys
    );
    svc.list_objects_v2(bucket, options).await.context(what)
}

fn assert_list(page: &ListPage, keys: &[&str], prefixes: &[&str]) -> anyhow::Result<()> {
    let actual_keys = page.keys();
    ensure!(
        actual_keys == keys,
        "unexpected keys in list result:\n  actual:   {actual_keys:?}\n  expected: {keys:?}"
    );
    let actual_prefixes: Vec<&str> = page.common_prefixes.iter().map(String::as_str).collect();
    ensure!(
        actual_prefixes == prefixes,
        "unexpected prefixes in list result:\n  actual:   {actual_prefixes:?}\n  expected: {prefixes:?}"
    );
    Ok(())
}

fn assert_deleted_keys(outcomes: &[DeleteOutcome], expected: &[&str]) -> anyhow::Result<()> {
    // the order does not matter
    let mut deleted: Vec<&str> = outcomes
        .iter()
        .filter(|o| o.deleted)
        .map(|o| o.key.as_str())
        .collect();
    deleted.sort_unstable();
    let mut expected = expected.to_vec();
    expected.sort_unstable();
    ensure!(
        deleted == expected,
        "unexpected keys in delete result:\n  actual:   {deleted:?}\n  expected: {expected:?}"
    );
    Ok(())
}

fn expect_error<T>(
    result: crate::Result<T>,
    what: &str,
    matches: impl Fn(&Error) -> bool,
    expected: &str,
) -> anyhow::Result<()> {
    match result {
        Ok(_) => bail!("{what} should fail with {expected}"),
        Err(e) if matches(&e) => Ok(()),
        Err(e) => bail!("{what} should fail with {expected}, got {e} ({})", e.code()),
    }
}

async fn create_bucket(svc: &dyn ObjectService, bucket: &str) -> anyhow::Result<()> {
    svc.create_bucket(bucket, bucket_options())
        .await
        .context("re-creating an owned bucket")?;
    ensure!(
        svc.bucket_exists(bucket).await?,
        "bucket {bucket} should exist"
    );
    let buckets = svc.list_buckets().await.context("listing buckets")?;
    ensure!(
        buckets.iter().any(|b| b.name == bucket),
        "bucket {bucket} missing from bucket list"
    );
    Ok(())
}

async fn put_get_delete(svc: &dyn ObjectService, bucket: &str) -> anyhow::Result<()> {
    const KEY: &str = "file.txt";
    const CONTENT: &str = "content";

    let put = svc
        .put_object(bucket, KEY, body::from_bytes(CONTENT), text_options())
        .await
        .context("putting object")?;
    ensure!(!put.etag.is_empty(), "ETag is empty");

    let obj = svc
        .get_object(bucket, KEY, GetOptions::default())
        .await
        .context("getting object")?;
    ensure!(
        obj.info.etag == put.etag,
        "ETag is wrong:\n- expected: {:?}\n- actual:   {:?}",
        put.etag,
        obj.info.etag
    );
    ensure!(
        obj.info.content_type == TEXT_PLAIN,
        "Content-Type is wrong: {:?}",
        obj.info.content_type
    );
    let data = body::collect(obj.body).await.context("reading body")?;
    ensure!(&data[..] == CONTENT.as_bytes(), "content doesn't match");

    let again = svc
        .put_object(bucket, KEY, body::from_bytes(CONTENT), text_options())
        .await
        .context("putting identical content")?;
    ensure!(
        again.etag == put.etag,
        "identical content produced a different ETag"
    );

    svc.delete_object(bucket, KEY)
        .await
        .context("deleting object")?;

    expect_error(
        svc.get_object(bucket, KEY, GetOptions::default()).await,
        &format!("get of deleted /{bucket}/{KEY}"),
        |e| matches!(e, Error::NotFound(_)),
        "NotFound",
    )?;

    svc.delete_object(bucket, KEY)
        .await
        .context("deleting an absent key")?;
    Ok(())
}

async fn copy_object(svc: &dyn ObjectService, bucket: &str) -> anyhow::Result<()> {
    const SRC_KEY: &str = "copy/src.txt";
    const SRC_CONTENT: &str = "source";
    const DST_KEY: &str = "copy/dst.txt";

    let put = svc
        .put_object(bucket, SRC_KEY, body::from_bytes(SRC_CONTENT), text_options())
        .await
        .context("putting source")?;
    ensure!(!put.etag.is_empty(), "ETag is empty");

    let copied = svc
        .copy_object(
            bucket,
            DST_KEY,
            &CopySource::new(bucket, SRC_KEY),
            CopyOptions {
                acl: Some(SCENARIO_ACL.to_string()),
            },
        )
        .await
        .context("copying object")?;
    ensure!(
        copied.etag == put.etag,
        "copy ETag {:?} differs from source {:?}",
        copied.etag,
        put.etag
    );

    // The copy must not alias the source content
    svc.put_object(bucket, SRC_KEY, body::from_bytes("changed"), text_options())
        .await
        .context("overwriting source")?;

    let obj = svc
        .get_object(bucket, DST_KEY, GetOptions::default())
        .await
        .context("getting copy")?;
    ensure!(obj.info.etag == put.etag, "copy ETag changed after source overwrite");
    ensure!(
        obj.info.content_type == TEXT_PLAIN,
        "Content-Type is wrong: {:?}",
        obj.info.content_type
    );
    let data = body::collect(obj.body).await.context("reading copy")?;
    ensure!(&data[..] == SRC_CONTENT.as_bytes(), "copy content doesn't match");
    Ok(())
}

async fn copy_object_404(svc: &dyn ObjectService, bucket: &str) -> anyhow::Result<()> {
    const SRC_KEY: &str = "copy-404/@@@unknown-file@@@";
    const DST_KEY: &str = "copy-404/dst.txt";

    expect_error(
        svc.head_object(bucket, SRC_KEY).await,
        &format!("head of /{bucket}/{SRC_KEY}"),
        |e| matches!(e, Error::NotFound(_)),
        "NotFound",
    )?;

    expect_error(
        svc.copy_object(
            bucket,
            DST_KEY,
            &CopySource::new(bucket, SRC_KEY),
            CopyOptions::default(),
        )
        .await,
        &format!("copy of /{bucket}/{SRC_KEY}"),
        |e| matches!(e, Error::NoSuchKey(_)),
        "NoSuchKey",
    )?;

    expect_error(
        svc.head_object(bucket, DST_KEY).await,
        "head of the copy destination",
        |e| matches!(e, Error::NotFound(_)),
        "NotFound",
    )
}

async fn list_objects(svc: &dyn ObjectService, bucket: &str) -> anyhow::Result<()> {
    put_text_files(svc, bucket, &LIST_FILES).await?;

    let page = list(svc, bucket, ListOptions::default()).await?;
    assert_list(
        &page,
        &[
            "list/a.txt",
            "list/f/o/u/r/e.txt",
            "list/f/o/u/r/f.txt",
            "list/g.txt",
            "list/one/b.txt",
            "list/one/c.txt",
            "list/one/two/d.txt",
        ],
        &[],
    )?;

    let page = list(svc, bucket, ListOptions::default().with_delimiter("/")).await?;
    assert_list(&page, &[], &["list/"])?;

    let page = list(svc, bucket, ListOptions::prefix("list/").with_delimiter("/")).await?;
    assert_list(
        &page,
        &["list/a.txt", "list/g.txt"],
        &["list/f/", "list/one/"],
    )?;

    let page = list(svc, bucket, ListOptions::prefix("list").with_delimiter("/")).await?;
    assert_list(&page, &[], &["list/"])?;

    let page = list(
        svc,
        bucket,
        ListOptions::prefix("list").with_delimiter("/").with_max_keys(2),
    )
    .await?;
    assert_list(&page, &[], &["list/"])?;

    let page = list(svc, bucket, ListOptions::prefix("unknown/prefix/")).await?;
    assert_list(&page, &[], &[])?;
    Ok(())
}

async fn list_pagination(svc: &dyn ObjectService, bucket: &str) -> anyhow::Result<()> {
    put_text_files(svc, bucket, &PAGE_FILES).await?;

    let grouped = ListOptions::prefix("page/").with_delimiter("/").with_max_keys(2);
    let (keys, prefixes, pages) = list_all_pages(svc, bucket, grouped).await?;
    ensure!(
        keys == ["page/a.txt", "page/c.txt"],
        "unexpected keys across pages: {keys:?}"
    );
    ensure!(
        prefixes == ["page/b/", "page/d/"],
        "unexpected prefixes across pages: {prefixes:?}"
    );
    ensure!(pages == 2, "expected 2 pages, got {pages}");

    let flat = ListOptions::prefix("page/").with_max_keys(4);
    let (keys, prefixes, pages) = list_all_pages(svc, bucket, flat).await?;
    let expected: Vec<&str> = PAGE_FILES.iter().map(|(k, _)| *k).collect();
    ensure!(keys == expected, "unexpected keys across pages: {keys:?}");
    ensure!(prefixes.is_empty(), "unexpected prefixes: {prefixes:?}");
    ensure!(pages == 2, "expected 2 pages, got {pages}");
    Ok(())
}

async fn list_all_pages(
    svc: &dyn ObjectService,
    bucket: &str,
    options: ListOptions,
) -> anyhow::Result<(Vec<String>, Vec<String>, usize)> {
    let mut keys = Vec::new();
    let mut prefixes = Vec::new();
    let mut token: Option<String> = None;
    let mut pages = 0;

    loop {
        let opts = ListOptions {
            continuation_token: token.clone(),
            ..options.clone()
        };
        let page = list(svc, bucket, opts).await?;
        pages += 1;
        ensure!(pages <= 100, "listing did not terminate");

        keys.extend(page.objects.iter().map(|o| o.key.clone()));
        prefixes.extend(page.common_prefixes.iter().cloned());

        if !page.is_truncated {
            break;
        }
        token = Some(
            page.next_continuation_token
                .ok_or_else(|| anyhow!("truncated page without continuation token"))?,
        );
    }

    Ok((keys, prefixes, pages))
}

async fn delete_objects(svc: &dyn ObjectService, bucket: &str) -> anyhow::Result<()> {
    put_text_files(svc, bucket, &MULTI_DEL_FILES).await?;

    let page = list(svc, bucket, ListOptions::default()).await?;
    assert_list(
        &page,
        &[
            "multi-del/a.txt",
            "multi-del/b.txt",
            "multi-del/c.txt",
            "multi-del/d.txt",
            "multi-del/e.txt",
        ],
        &[],
    )?;

    // multi-del/z.txt never existed
    let batch = ["multi-del/b.txt", "multi-del/z.txt"];
    let outcomes = batch_delete(svc, bucket, &batch).await?;
    assert_deleted_keys(&outcomes, &batch)?;

    let page = list(svc, bucket, ListOptions::default()).await?;
    assert_list(
        &page,
        &[
            "multi-del/a.txt",
            "multi-del/c.txt",
            "multi-del/d.txt",
            "multi-del/e.txt",
        ],
        &[],
    )?;

    // multi-del/b.txt is already gone
    let batch = ["multi-del/a.txt", "multi-del/b.txt", "multi-del/e.txt"];
    let outcomes = batch_delete(svc, bucket, &batch).await?;
    assert_deleted_keys(&outcomes, &batch)?;

    let page = list(svc, bucket, ListOptions::default()).await?;
    assert_list(&page, &["multi-del/c.txt", "multi-del/d.txt"], &[])?;

    let batch: Vec<&str> = MULTI_DEL_FILES.iter().map(|(k, _)| *k).collect();
    let outcomes = batch_delete(svc, bucket, &batch).await?;
    assert_deleted_keys(&outcomes, &batch)?;

    let page = list(svc, bucket, ListOptions::default()).await?;
    assert_list(&page, &[], &[])?;
    Ok(())
}

async fn batch_delete(
    svc: &dyn ObjectService,
    bucket: &str,
    keys: &[&str],
) -> anyhow::Result<Vec<DeleteOutcome>> {
    let requests = keys.iter().map(|k| DeleteRequest::key(*k)).collect();
    svc.delete_objects(bucket, requests)
        .await
        .with_context(|| format!("batch deleting {keys:?}"))
}

async fn versioned_delete(svc: &dyn ObjectService, bucket: &str) -> anyhow::Result<()> {
    const KEY: &str = "versioned/a.txt";

    put_text_files(svc, bucket, &[(KEY, "1")]).await?;

    let outcomes = svc
        .delete_objects(bucket, vec![DeleteRequest::versioned(KEY, "v1")])
        .await
        .context("version-qualified batch delete")?;
    ensure!(outcomes.len() == 1, "expected one outcome, got {outcomes:?}");
    ensure!(
        !outcomes[0].deleted && outcomes[0].error.is_some(),
        "version-qualified delete should be refused, got {:?}",
        outcomes[0]
    );
    svc.head_object(bucket, KEY)
        .await
        .context("object should survive a version-qualified delete")?;

    let outcomes = batch_delete(svc, bucket, &[KEY]).await?;
    assert_deleted_keys(&outcomes, &[KEY])?;
    expect_error(
        svc.head_object(bucket, KEY).await,
        "head after unqualified delete",
        |e| matches!(e, Error::NotFound(_)),
        "NotFound",
    )
}

async fn big_upload_download(
    svc: &dyn ObjectService,
    bucket: &str,
    size: u64,
) -> anyhow::Result<()> {
    const KEY: &str = "big-file";

    let put = svc
        .put_object(bucket, KEY, pattern_body(size), text_options())
        .await
        .context("uploading big object")?;
    ensure!(put.size == size, "upload reported {} bytes, sent {size}", put.size);

    let head = svc
        .head_object(bucket, KEY)
        .await
        .context("head of big object")?;
    ensure!(
        head.size == size,
        "Content-Length is wrong:\n- expected: {size}\n- actual:   {}",
        head.size
    );

    let obj = svc
        .get_object(bucket, KEY, GetOptions::default())
        .await
        .context("downloading big object")?;
    let read = verify_pattern_body(obj.body, 0).await?;
    ensure!(read == size, "Wrong length: expected {size}, got {read}");

    if size > 0 {
        let first = size / 2;
        let last = (first + 99).min(size - 1);
        let obj = svc
            .get_object(bucket, KEY, GetOptions::range(ByteRange::Span { first, last }))
            .await
            .context("ranged download of big object")?;
        let read = verify_pattern_body(obj.body, first).await?;
        ensure!(
            read == last - first + 1,
            "ranged read returned {read} bytes, expected {}",
            last - first + 1
        );
    }
    Ok(())
}

/// A body of `size` bytes repeating `123456789_`, produced chunk by chunk
pub fn pattern_body(size: u64) -> ByteStream {
    let chunk = Bytes::from(BIG_PATTERN.repeat(BIG_CHUNK_LEN / BIG_PATTERN.len()));
    let chunks = stream::unfold(0u64, move |sent| {
        let chunk = chunk.clone();
        async move {
            if sent >= size {
                return None;
            }
            let n = (size - sent).min(BIG_CHUNK_LEN as u64);
            Some((Ok(chunk.slice(..n as usize)), sent + n))
        }
    });
    Box::pin(chunks)
}

async fn verify_pattern_body(mut body: ByteStream, start: u64) -> anyhow::Result<u64> {
    let mut offset = start;
    while let Some(chunk) = body.next().await {
        let chunk = chunk.context("reading body")?;
        for (i, byte) in chunk.iter().enumerate() {
            let at = offset + i as u64;
            if *byte != BIG_PATTERN[(at % BIG_PATTERN.len() as u64) as usize] {
                bail!("Wrong content at byte {at}");
            }
        }
        offset += chunk.len() as u64;
    }
    Ok(offset - start)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scenario_names_round_trip() {
        for scenario in Scenario::ALL {
            assert_eq!(Scenario::from_name(scenario.name()), Some(scenario));
        }
        assert_eq!(Scenario::from_name("nope"), None);
    }

    #[test]
    fn test_only_versioned_delete_is_engine_specific() {
        let local: Vec<_> = Scenario::ALL.into_iter().filter(|s| !s.portable()).collect();
        assert_eq!(local, vec![Scenario::VersionedDelete]);
    }

    #[test]
    fn test_suite_report_counts() {
        let report = SuiteReport {
            bucket: "testbucket".to_string(),
            scenarios: vec![
                ScenarioReport {
                    name: "a",
                    passed: true,
                    duration_ms: 1,
                    error: None,
                },
                ScenarioReport {
                    name: "b",
                    passed: false,
                    duration_ms: 1,
                    error: Some("boom".to_string()),
                },
            ],
        };
        assert_eq!(report.passed(), 1);
        assert_eq!(report.failed(), 1);
        assert!(!report.is_success());
    }

    #[tokio::test]
    async fn test_pattern_body_length_and_content() {
        let size = BIG_CHUNK_LEN as u64 * 2 + 7;
        let read = verify_pattern_body(pattern_body(size), 0).await.unwrap();
        assert_eq!(read, size);
    }

    #[tokio::test]
    async fn test_pattern_body_empty() {
        let data = body::collect(pattern_body(0)).await.unwrap();
        assert!(data.is_empty());
    }

    #[tokio::test]
    async fn test_verify_pattern_detects_corruption() {
        let body = body::from_bytes(&b"123456789_12x"[..]);
        assert!(verify_pattern_body(body, 0).await.is_err());
    }

    #[tokio::test]
    async fn test_verify_pattern_with_offset() {
        let body = body::from_bytes(&b"56789_1"[..]);
        assert_eq!(verify_pattern_body(body, 4).await.unwrap(), 7);
    }
}
