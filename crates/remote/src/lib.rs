//! fs3-remote: S3 SDK adapter for fs3
//!
//! This crate provides the implementation of the ObjectService trait
//! using the aws-sdk-s3 crate, so the conformance suite can target a
//! running S3-compatible endpoint. It is the only crate that directly
//! depends on the AWS SDK.

pub mod client;
mod error;
pub mod multipart;

pub use client::RemoteService;
