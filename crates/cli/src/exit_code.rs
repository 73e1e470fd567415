//! Exit code definitions for the fs3 CLI
//!
//! Scripts running the suite in CI tell a failing store apart from a
//! misconfigured run by these codes.

/// Exit codes for the fs3 CLI application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    /// Every selected scenario passed
    Success = 0,

    /// A scenario failed, or an unspecified error occurred
    GeneralError = 1,

    /// User input error: invalid arguments, bad config, unknown scenario
    UsageError = 2,

    /// Retryable network error: timeout, connection refused, etc.
    NetworkError = 3,

    /// Bucket or object does not exist
    NotFound = 5,

    /// Conflict: bucket owned by another account, unsatisfiable range
    Conflict = 6,

    /// Target does not support a requested feature
    UnsupportedFeature = 7,

    /// Run was interrupted (Ctrl+C)
    Interrupted = 130,
}

impl ExitCode {
    /// Convert exit code to i32 for use with std::process::exit
    #[inline]
    pub const fn as_i32(self) -> i32 {
        self as i32
    }

    /// Create exit code from i32 value
    ///
    /// Returns None if the value doesn't correspond to a known exit code.
    pub const fn from_i32(code: i32) -> Option<Self> {
        match code {
            0 => Some(Self::Success),
            1 => Some(Self::GeneralError),
            2 => Some(Self::UsageError),
            3 => Some(Self::NetworkError),
            5 => Some(Self::NotFound),
            6 => Some(Self::Conflict),
            7 => Some(Self::UnsupportedFeature),
            130 => Some(Self::Interrupted),
            _ => None,
        }
    }

    /// Exit code for a storage error
    pub const fn from_error(err: &fs3_core::Error) -> Self {
        match Self::from_i32(err.exit_code()) {
            Some(code) => code,
            None => Self::GeneralError,
        }
    }

    /// Exit code for an error chain, using the first storage error in it
    pub fn from_anyhow(err: &anyhow::Error) -> Self {
        err.chain()
            .find_map(|cause| cause.downcast_ref::<fs3_core::Error>())
            .map_or(Self::GeneralError, Self::from_error)
    }

    /// Get a human-readable description of the exit code
    pub const fn description(self) -> &'static str {
        match self {
            Self::Success => "All scenarios passed",
            Self::GeneralError => "General error",
            Self::UsageError => "Invalid arguments or configuration",
            Self::NetworkError => "Network error (retryable)",
            Self::NotFound => "Resource not found",
            Self::Conflict => "Conflict",
            Self::UnsupportedFeature => "Feature not supported by target",
            Self::Interrupted => "Run interrupted",
        }
    }
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> Self {
        code.as_i32()
    }
}

impl std::fmt::Display for ExitCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.description(), self.as_i32())
    }
}
