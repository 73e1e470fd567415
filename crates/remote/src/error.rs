//! SDK error conversion
//!
//! Every SDK failure is turned into the closed `fs3_core::Error` here, by
//! S3 error code and HTTP status. Operations that give absence a different
//! meaning remap the result themselves.

use aws_sdk_s3::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};

use fs3_core::Error;

/// HTTP status of a service error response
pub(crate) fn status<E>(err: &SdkError<E>) -> Option<u16> {
    match err {
        SdkError::ServiceError(service) => Some(service.raw().status().as_u16()),
        _ => None,
    }
}

/// S3 error code of a service error response
pub(crate) fn code<E: ProvideErrorMetadata>(err: &SdkError<E>) -> Option<&str> {
    match err {
        SdkError::ServiceError(service) => service.err().code(),
        _ => None,
    }
}

/// Convert an SDK error raised while working on `path` in `bucket`
pub(crate) fn from_sdk<E>(err: SdkError<E>, bucket: &str, path: &str) -> Error
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
{
    let message = || format!("{path}: {}", DisplayErrorContext(&err));

    match &err {
        SdkError::ServiceError(_) => {
            let status = status(&err);
            match code(&err) {
                Some("NoSuchBucket") => Error::NoSuchBucket(bucket.to_string()),
                Some("NoSuchKey") => Error::NoSuchKey(path.to_string()),
                Some("NotFound") => Error::NotFound(path.to_string()),
                None if status == Some(404) => Error::NotFound(path.to_string()),
                Some("BucketAlreadyExists") => Error::AlreadyOwnedByOther(bucket.to_string()),
                Some("InvalidBucketName") => Error::InvalidBucketName(bucket.to_string()),
                Some("InvalidRange") => Error::InvalidRange(message()),
                Some("NotImplemented") => Error::UnsupportedQualifier(message()),
                Some("InvalidArgument") => Error::InvalidArgument(message()),
                _ => Error::General(message()),
            }
        }
        SdkError::TimeoutError(_) | SdkError::DispatchFailure(_) | SdkError::ResponseError(_) => {
            Error::Network(message())
        }
        _ => Error::General(message()),
    }
}
