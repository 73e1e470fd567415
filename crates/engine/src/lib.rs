//! fs3-engine: In-process S3-compatible storage engine
//!
//! This crate implements the `ObjectService` boundary from fs3-core:
//! - Bucket Registry: bucket creation and lookup
//! - Object Catalog: per-bucket sorted key to object map
//! - Listing Engine: prefix/delimiter grouping and pagination
//! - Batch Delete Coordinator: per-key outcomes, never a whole-batch failure
//! - Copy Engine: copies that never alias the source content
//!
//! Object bodies live in a `BlobStore`, either in memory or one file per
//! blob on disk.

pub mod batch;
pub mod blob;
pub mod catalog;
pub mod copy;
mod engine;
pub mod etag;
pub mod listing;
pub mod registry;

pub use blob::{FsBlobStore, MemoryBlobStore};
pub use engine::Engine;
