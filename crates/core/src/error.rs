//! Error types for fs3-core
//!
//! A single closed error enum shared by the engine, the remote adapter and
//! the CLI. Callers match on variants; the protocol code, HTTP status and
//! exit code are all derived from the variant, never from message text.

use thiserror::Error;

/// Result type alias for fs3 operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for fs3 operations
#[derive(Error, Debug)]
pub enum Error {
    /// Bucket does not exist
    #[error("No such bucket: {0}")]
    NoSuchBucket(String),

    /// Object does not exist (get/head)
    #[error("Not found: {0}")]
    NotFound(String),

    /// Copy source does not exist
    #[error("No such key: {0}")]
    NoSuchKey(String),

    /// Bucket name is taken by another owner
    #[error("Bucket already owned by another account: {0}")]
    AlreadyOwnedByOther(String),

    /// Request referenced an object version
    #[error("Unsupported qualifier: {0}")]
    UnsupportedQualifier(String),

    /// Bucket name violates naming rules
    #[error("Invalid bucket name: {0}")]
    InvalidBucketName(String),

    /// Malformed request argument
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Requested byte range cannot be satisfied
    #[error("Invalid range: {0}")]
    InvalidRange(String),

    /// Configuration file error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parsing error
    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// TOML serialization error
    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// URL parsing error
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Network error talking to a remote endpoint
    #[error("Network error: {0}")]
    Network(String),

    /// Body storage collaborator failure
    #[error("Storage error: {0}")]
    Storage(String),

    /// General error
    #[error("{0}")]
    General(String),
}

impl Error {
    /// S3 error code reported by the protocol layer for this error
    pub const fn code(&self) -> &'static str {
        match self {
            Error::NoSuchBucket(_) => "NoSuchBucket",
            Error::NotFound(_) => "NotFound",
            Error::NoSuchKey(_) => "NoSuchKey",
            Error::AlreadyOwnedByOther(_) => "BucketAlreadyExists",
            Error::UnsupportedQualifier(_) => "NotImplemented",
            Error::InvalidBucketName(_) => "InvalidBucketName",
            Error::InvalidArgument(_) => "InvalidArgument",
            Error::InvalidRange(_) => "InvalidRange",
            Error::Network(_) => "ServiceUnavailable",
            Error::Config(_)
            | Error::Io(_)
            | Error::TomlParse(_)
            | Error::TomlSerialize(_)
            | Error::Json(_)
            | Error::InvalidUrl(_)
            | Error::Storage(_)
            | Error::General(_) => "InternalError",
        }
    }

    /// HTTP status equivalent of this error
    pub const fn status(&self) -> u16 {
        match self {
            Error::NoSuchBucket(_) | Error::NotFound(_) | Error::NoSuchKey(_) => 404,
            Error::AlreadyOwnedByOther(_) => 409,
            Error::UnsupportedQualifier(_) => 501,
            Error::InvalidBucketName(_) | Error::InvalidArgument(_) => 400,
            Error::InvalidRange(_) => 416,
            Error::Network(_) => 503,
            Error::Config(_)
            | Error::Io(_)
            | Error::TomlParse(_)
            | Error::TomlSerialize(_)
            | Error::Json(_)
            | Error::InvalidUrl(_)
            | Error::Storage(_)
            | Error::General(_) => 500,
        }
    }

    /// Get the appropriate exit code for this error
    pub const fn exit_code(&self) -> i32 {
        match self {
            Error::InvalidBucketName(_) | Error::InvalidArgument(_) => 2, // UsageError
            Error::Config(_) | Error::InvalidUrl(_) => 2,                 // UsageError
            Error::Network(_) => 3,                                       // NetworkError
            Error::NoSuchBucket(_) | Error::NotFound(_) | Error::NoSuchKey(_) => 5, // NotFound
            Error::AlreadyOwnedByOther(_) | Error::InvalidRange(_) => 6,  // Conflict
            Error::UnsupportedQualifier(_) => 7,                          // UnsupportedFeature
            _ => 1,                                                       // GeneralError
        }
    }

    /// Whether this error reports the absence of a bucket or object
    pub const fn is_not_found(&self) -> bool {
        matches!(
            self,
            Error::NoSuchBucket(_) | Error::NotFound(_) | Error::NoSuchKey(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(Error::NotFound("b/k".into()).code(), "NotFound");
        assert_eq!(Error::NoSuchKey("b/k".into()).code(), "NoSuchKey");
        assert_eq!(Error::NoSuchBucket("b".into()).code(), "NoSuchBucket");
        assert_eq!(
            Error::AlreadyOwnedByOther("b".into()).code(),
            "BucketAlreadyExists"
        );
        assert_eq!(
            Error::UnsupportedQualifier("versionId".into()).code(),
            "NotImplemented"
        );
        assert_eq!(Error::Storage("disk".into()).code(), "InternalError");
    }

    #[test]
    fn test_not_found_and_no_such_key_share_status() {
        assert_eq!(Error::NotFound("b/k".into()).status(), 404);
        assert_eq!(Error::NoSuchKey("b/k".into()).status(), 404);
        assert_eq!(Error::AlreadyOwnedByOther("b".into()).status(), 409);
        assert_eq!(Error::InvalidRange("bytes=9-".into()).status(), 416);
    }

    #[test]
    fn test_error_exit_codes() {
        assert_eq!(Error::InvalidBucketName("A".into()).exit_code(), 2);
        assert_eq!(Error::Config("test".into()).exit_code(), 2);
        assert_eq!(Error::Network("test".into()).exit_code(), 3);
        assert_eq!(Error::NotFound("test".into()).exit_code(), 5);
        assert_eq!(Error::NoSuchKey("test".into()).exit_code(), 5);
        assert_eq!(Error::AlreadyOwnedByOther("test".into()).exit_code(), 6);
        assert_eq!(Error::UnsupportedQualifier("test".into()).exit_code(), 7);
        assert_eq!(Error::General("test".into()).exit_code(), 1);
    }

    #[test]
    fn test_error_display() {
        let err = Error::NoSuchKey("testbucket/copy-404/x".into());
        assert_eq!(err.to_string(), "No such key: testbucket/copy-404/x");
        assert!(err.is_not_found());
        assert!(!Error::General("boom".into()).is_not_found());
    }
}
