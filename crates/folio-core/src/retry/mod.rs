//! Retry and backoff.
//!
//! Error classification, exponential backoff with jitter, and the retry
//! driver that turns one logical load into a single [`RetryOutcome`].

mod classify;
mod error;
mod policy;
mod run;

pub use classify::{classify, classify_http_status, ErrorClass};
pub use error::{FetchError, RetryError};
pub use policy::{
    backoff_delay, FixedJitter, JitterSource, RandomJitter, RetryDecision, RetryPolicy,
    StopReason, JITTER_BOUND,
};
pub use run::{FallbackFn, FallbackReason, LoadFailure, RetryDriver, RetryOutcome, RetryRun};
