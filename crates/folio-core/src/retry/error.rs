//! Remote failure and retry driver error types.

use std::fmt;

/// Failure reported by a single remote call.
///
/// Carries only what classification needs: an HTTP status when the service
/// answered, or a connectivity marker when it did not.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// The service answered with a non-2xx status.
    Http(u16),
    /// No HTTP status at all (connect, resolve, send/recv failure or timeout).
    Connectivity { timed_out: bool, detail: String },
    /// A response arrived but its body could not be decoded.
    Malformed(String),
    /// Any other failure shape.
    Other(String),
}

impl FetchError {
    /// HTTP status code, if the failure has one.
    pub fn status(&self) -> Option<u16> {
        match self {
            FetchError::Http(code) => Some(*code),
            _ => None,
        }
    }

    /// True for failures that never reached an HTTP response.
    pub fn is_connectivity(&self) -> bool {
        matches!(self, FetchError::Connectivity { .. })
    }

    pub fn timeout(detail: impl Into<String>) -> Self {
        FetchError::Connectivity {
            timed_out: true,
            detail: detail.into(),
        }
    }

    pub fn offline(detail: impl Into<String>) -> Self {
        FetchError::Connectivity {
            timed_out: false,
            detail: detail.into(),
        }
    }
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchError::Http(code) => write!(f, "HTTP {}", code),
            FetchError::Connectivity {
                timed_out: true,
                detail,
            } => write!(f, "request timed out: {}", detail),
            FetchError::Connectivity { detail, .. } => write!(f, "network unavailable: {}", detail),
            FetchError::Malformed(detail) => write!(f, "malformed response: {}", detail),
            FetchError::Other(detail) => write!(f, "{}", detail),
        }
    }
}

impl std::error::Error for FetchError {}

/// Error returned by the retry driver itself, as opposed to a load outcome.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RetryError {
    /// Retry parameters are unusable (e.g. zero max attempts). Never retried.
    #[error("invalid retry configuration: {0}")]
    Configuration(String),
    /// The owning invocation was cancelled before an outcome was produced.
    #[error("load cancelled")]
    Cancelled,
}
