//! Bucket names and copy source paths
//!
//! Copy sources arrive in the form `/bucket/key` or `bucket/key`, optionally
//! followed by `?versionId=...`. Percent-decoding belongs to the protocol
//! layer; the path handed in here is already decoded.

use crate::error::{Error, Result};

/// A parsed `CopySource` value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopySource {
    /// Source bucket name
    pub bucket: String,
    /// Source object key
    pub key: String,
    /// Version qualifier, if the caller named one
    pub version_id: Option<String>,
}

impl CopySource {
    /// Create a new unqualified CopySource
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
            version_id: None,
        }
    }

    /// Parse a copy source path
    pub fn parse(source: &str) -> Result<Self> {
        let trimmed = source.strip_prefix('/').unwrap_or(source);
        if trimmed.is_empty() {
            return Err(Error::InvalidArgument(
                "Copy source cannot be empty".into(),
            ));
        }

        let (path, version_id) = match trimmed.split_once("?versionId=") {
            Some((path, version)) => (path, Some(version.to_string())),
            None => (trimmed, None),
        };

        let (bucket, key) = path.split_once('/').ok_or_else(|| {
            Error::InvalidArgument(format!(
                "Copy source '{source}' is incomplete. Use format: /bucket/key"
            ))
        })?;

        if bucket.is_empty() {
            return Err(Error::InvalidArgument(
                "Copy source bucket cannot be empty".into(),
            ));
        }
        if key.is_empty() {
            return Err(Error::InvalidArgument(
                "Copy source key cannot be empty".into(),
            ));
        }

        Ok(Self {
            bucket: bucket.to_string(),
            key: key.to_string(),
            version_id,
        })
    }

    /// Get the path as a string (/bucket/key)
    pub fn to_path(&self) -> String {
        match &self.version_id {
            Some(version) => format!("/{}/{}?versionId={version}", self.bucket, self.key),
            None => format!("/{}/{}", self.bucket, self.key),
        }
    }
}

impl std::fmt::Display for CopySource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_path())
    }
}

/// Check a bucket name against S3 naming rules
///
/// 3 to 63 characters of lowercase letters, digits, `.` and `-`, starting
/// and ending with a letter or digit, no `..`.
pub fn validate_bucket_name(name: &str) -> Result<()> {
    let reject = |reason: &str| Err(Error::InvalidBucketName(format!("'{name}': {reason}")));

    if name.len() < 3 || name.len() > 63 {
        return reject("must be between 3 and 63 characters");
    }

    if !name
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '.' || c == '-')
    {
        return reject("only lowercase letters, digits, '.' and '-' are allowed");
    }

    let edge_ok = |c: Option<char>| c.is_some_and(|c| c.is_ascii_lowercase() || c.is_ascii_digit());
    if !edge_ok(name.chars().next()) || !edge_ok(name.chars().last()) {
        return reject("must start and end with a letter or digit");
    }

    if name.contains("..") {
        return reject("must not contain consecutive dots");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_copy_source_leading_slash() {
        let src = CopySource::parse("/testbucket/copy/src.txt").unwrap();
        assert_eq!(src.bucket, "testbucket");
        assert_eq!(src.key, "copy/src.txt");
        assert!(src.version_id.is_none());
    }

    #[test]
    fn test_parse_copy_source_without_slash() {
        let src = CopySource::parse("testbucket/a.txt").unwrap();
        assert_eq!(src, CopySource::new("testbucket", "a.txt"));
    }

    #[test]
    fn test_parse_copy_source_keeps_odd_keys() {
        let src = CopySource::parse("/testbucket/copy-404/@@@unknown-file@@@").unwrap();
        assert_eq!(src.key, "copy-404/@@@unknown-file@@@");
    }

    #[test]
    fn test_parse_copy_source_version() {
        let src = CopySource::parse("/testbucket/a.txt?versionId=3").unwrap();
        assert_eq!(src.key, "a.txt");
        assert_eq!(src.version_id.as_deref(), Some("3"));
        assert_eq!(src.to_string(), "/testbucket/a.txt?versionId=3");
    }

    #[test]
    fn test_parse_copy_source_incomplete() {
        assert!(CopySource::parse("").is_err());
        assert!(CopySource::parse("/").is_err());
        assert!(CopySource::parse("/testbucket").is_err());
        assert!(CopySource::parse("/testbucket/").is_err());
        assert!(CopySource::parse("//key").is_err());
    }

    #[test]
    fn test_copy_source_display() {
        let src = CopySource::new("bucket", "key/file.txt");
        assert_eq!(src.to_string(), "/bucket/key/file.txt");
    }

    #[test]
    fn test_valid_bucket_names() {
        assert!(validate_bucket_name("testbucket").is_ok());
        assert!(validate_bucket_name("testbucket-plntr").is_ok());
        assert!(validate_bucket_name("my.bucket.01").is_ok());
    }

    #[test]
    fn test_invalid_bucket_names() {
        assert!(validate_bucket_name("ab").is_err());
        assert!(validate_bucket_name(&"a".repeat(64)).is_err());
        assert!(validate_bucket_name("MyBucket").is_err());
        assert!(validate_bucket_name("-bucket").is_err());
        assert!(validate_bucket_name("bucket.").is_err());
        assert!(validate_bucket_name("my..bucket").is_err());
        assert!(validate_bucket_name("my_bucket").is_err());
    }
}
