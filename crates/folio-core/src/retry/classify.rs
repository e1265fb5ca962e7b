//! Classify remote failures into retry classes.

use super::error::FetchError;

/// Closed set of failure classes the retry driver switches on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Gateway-level server trouble (502/503/504). Retried.
    ServerTransient,
    /// No response at all: connectivity loss or timeout. Retried.
    NetworkTransient,
    /// Anything that will not get better by asking again.
    Terminal,
    /// The credential was rejected (401). Not retried; the session must be cleared.
    AuthExpired,
}

impl ErrorClass {
    pub fn is_retryable(self) -> bool {
        match self {
            ErrorClass::ServerTransient | ErrorClass::NetworkTransient => true,
            ErrorClass::Terminal | ErrorClass::AuthExpired => false,
        }
    }
}

/// Classify an HTTP status code.
pub fn classify_http_status(code: u16) -> ErrorClass {
    match code {
        502..=504 => ErrorClass::ServerTransient,
        401 => ErrorClass::AuthExpired,
        _ => ErrorClass::Terminal,
    }
}

/// Classify a remote failure.
pub fn classify(e: &FetchError) -> ErrorClass {
    match e {
        FetchError::Http(code) => classify_http_status(*code),
        FetchError::Connectivity { .. } => ErrorClass::NetworkTransient,
        FetchError::Malformed(_) | FetchError::Other(_) => ErrorClass::Terminal,
    }
}
