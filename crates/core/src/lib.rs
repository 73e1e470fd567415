//! fs3-core: Core library for the fs3 object store
//!
//! This crate provides the pieces every other fs3 crate builds on:
//! - Configuration management
//! - The closed error taxonomy and its S3 codes
//! - Object bodies and byte ranges
//! - Copy source and bucket name parsing
//! - The `ObjectService` boundary and the blob storage collaborators
//! - The conformance scenario suite, runnable against any `ObjectService`
//!
//! This crate knows nothing about HTTP or any specific S3 SDK.

pub mod body;
pub mod config;
pub mod conformance;
pub mod error;
pub mod path;
pub mod traits;

pub use body::{ByteRange, ByteStream};
pub use config::{Config, ConfigManager};
pub use conformance::{Scenario, ScenarioReport, SuiteOptions, SuiteReport};
pub use error::{Error, Result};
pub use path::{CopySource, validate_bucket_name};
pub use traits::{
    Blob, BlobStore, BlobWriter, BucketInfo, CopyOptions, CreateBucketOptions, DeleteError,
    DeleteOutcome, DeleteRequest, GetObjectOutput, GetOptions, ListOptions, ListPage, ObjectInfo,
    ObjectService, PutOptions,
};
