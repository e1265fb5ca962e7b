//! Retry driver: run one logical load to a single outcome.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;

use crate::control::CancelToken;

use super::classify::{classify, ErrorClass};
use super::error::{FetchError, RetryError};
use super::policy::{JitterSource, RandomJitter, RetryDecision, RetryPolicy, StopReason};

/// Why a fallback value was substituted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FallbackReason {
    /// The load failed with a non-retryable error.
    Terminal,
    /// Every attempt failed with a transient error.
    Exhausted,
}

impl std::fmt::Display for FallbackReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FallbackReason::Terminal => write!(f, "terminal"),
            FallbackReason::Exhausted => write!(f, "exhausted"),
        }
    }
}

/// The error a load finally failed with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadFailure {
    pub class: ErrorClass,
    pub error: FetchError,
    pub attempts: u32,
}

impl LoadFailure {
    /// True when transient failures ran out of attempts.
    pub fn exhausted(&self) -> bool {
        self.class.is_retryable()
    }
}

/// Exactly one of these is produced per driver run.
#[derive(Debug, Clone, PartialEq)]
pub enum RetryOutcome<T> {
    Success(T),
    Fallback(T, FallbackReason),
    Failed(LoadFailure),
}

/// Outcome plus the bookkeeping of how it was reached.
#[derive(Debug, Clone)]
pub struct RetryRun<T> {
    pub outcome: RetryOutcome<T>,
    /// Number of times the load function was invoked.
    pub attempts: u32,
    /// Every backoff wait performed, in order.
    pub waits: Vec<Duration>,
}

/// Supplies a substitute value when a load cannot produce a real one.
pub type FallbackFn<T> = Arc<dyn Fn() -> T + Send + Sync>;

/// Drives one resource load through bounded retries.
///
/// Retry state lives only for the duration of [`RetryDriver::run`]; nothing
/// carries over between runs.
pub struct RetryDriver<T> {
    resource: String,
    policy: RetryPolicy,
    jitter: Arc<dyn JitterSource>,
    cancel: CancelToken,
    fallback: Option<FallbackFn<T>>,
}

impl<T> RetryDriver<T> {
    pub fn new(resource: impl Into<String>, policy: RetryPolicy) -> Self {
        Self {
            resource: resource.into(),
            policy,
            jitter: Arc::new(RandomJitter),
            cancel: CancelToken::new(),
            fallback: None,
        }
    }

    pub fn with_jitter(mut self, jitter: Arc<dyn JitterSource>) -> Self {
        self.jitter = jitter;
        self
    }

    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn with_fallback(mut self, fallback: Option<FallbackFn<T>>) -> Self {
        self.fallback = fallback;
        self
    }

    /// Attempt `load` until it succeeds, fails for good, or retries run out.
    ///
    /// Suspends only inside `load` and during backoff waits; both race the
    /// cancel token. Returns `Err` for invalid policy or cancellation, never
    /// for a failed load (that is `RetryOutcome::Failed`).
    pub async fn run<F, Fut>(&self, mut load: F) -> Result<RetryRun<T>, RetryError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, FetchError>>,
    {
        self.policy.validate()?;

        let mut attempts = 0u32;
        let mut waits = Vec::new();
        loop {
            if self.cancel.is_cancelled() {
                return Err(RetryError::Cancelled);
            }

            let result = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return Err(RetryError::Cancelled),
                r = load() => r,
            };
            attempts += 1;

            let error = match result {
                Ok(value) => {
                    tracing::debug!(resource = %self.resource, attempts, "load succeeded");
                    return Ok(RetryRun {
                        outcome: RetryOutcome::Success(value),
                        attempts,
                        waits,
                    });
                }
                Err(e) => e,
            };

            let class = classify(&error);
            match self.policy.decide(attempts, class, self.jitter.as_ref()) {
                RetryDecision::RetryAfter(delay) => {
                    tracing::warn!(
                        resource = %self.resource,
                        attempt = attempts,
                        max_attempts = self.policy.max_attempts,
                        ?class,
                        error = %error,
                        delay_ms = delay.as_millis() as u64,
                        "retryable failure, backing off"
                    );
                    tokio::select! {
                        biased;
                        _ = self.cancel.cancelled() => return Err(RetryError::Cancelled),
                        _ = tokio::time::sleep(delay) => {}
                    }
                    waits.push(delay);
                }
                RetryDecision::Stop(reason) => {
                    let outcome = self.finish(reason, class, error, attempts);
                    return Ok(RetryRun {
                        outcome,
                        attempts,
                        waits,
                    });
                }
            }
        }
    }

    fn finish(
        &self,
        reason: StopReason,
        class: ErrorClass,
        error: FetchError,
        attempts: u32,
    ) -> RetryOutcome<T> {
        let fallback_reason = match reason {
            StopReason::Terminal => Some(FallbackReason::Terminal),
            StopReason::Exhausted => Some(FallbackReason::Exhausted),
            StopReason::AuthExpired => None,
        };
        match (fallback_reason, &self.fallback) {
            (Some(why), Some(supply)) => {
                tracing::warn!(
                    resource = %self.resource,
                    reason = %why,
                    error = %error,
                    "substituting fallback value"
                );
                RetryOutcome::Fallback(supply(), why)
            }
            _ => {
                tracing::debug!(resource = %self.resource, ?class, attempts, error = %error, "load failed");
                RetryOutcome::Failed(LoadFailure {
                    class,
                    error,
                    attempts,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retry::FixedJitter;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    fn driver(max_attempts: u32) -> RetryDriver<u32> {
        RetryDriver::new("test", RetryPolicy::new(max_attempts, ms(2000), ms(30_000)))
            .with_jitter(Arc::new(FixedJitter(ms(0))))
    }

    fn fallback() -> Option<FallbackFn<u32>> {
        Some(Arc::new(|| 7))
    }

    #[tokio::test(start_paused = true)]
    async fn immediate_success_has_no_waits() {
        let calls = AtomicU32::new(0);
        let run = driver(5)
            .run(|| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Ok(42) }
            })
            .await
            .unwrap();
        assert_eq!(run.outcome, RetryOutcome::Success(42));
        assert_eq!(run.attempts, 1);
        assert!(run.waits.is_empty());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn server_transient_forever_falls_back_after_max_attempts() {
        let calls = AtomicU32::new(0);
        let run = driver(5)
            .with_fallback(fallback())
            .run(|| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err::<u32, _>(FetchError::Http(503)) }
            })
            .await
            .unwrap();
        assert_eq!(run.outcome, RetryOutcome::Fallback(7, FallbackReason::Exhausted));
        assert_eq!(run.attempts, 5);
        assert_eq!(run.waits.len(), 4);
        assert_eq!(calls.load(Ordering::SeqCst), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn exhaustion_without_fallback_fails() {
        let run = driver(2)
            .run(|| async { Err::<u32, _>(FetchError::offline("down")) })
            .await
            .unwrap();
        match run.outcome {
            RetryOutcome::Failed(f) => {
                assert_eq!(f.class, ErrorClass::NetworkTransient);
                assert_eq!(f.attempts, 2);
                assert!(f.exhausted());
            }
            other => panic!("expected Failed, got {:?}", other),
        }
        assert_eq!(run.waits, vec![ms(2000)]);
    }

    #[tokio::test(start_paused = true)]
    async fn terminal_without_fallback_fails_immediately() {
        let run = driver(5)
            .run(|| async { Err::<u32, _>(FetchError::Http(404)) })
            .await
            .unwrap();
        assert!(matches!(
            run.outcome,
            RetryOutcome::Failed(LoadFailure { class: ErrorClass::Terminal, attempts: 1, .. })
        ));
        assert!(run.waits.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn terminal_with_fallback_substitutes_immediately() {
        let run = driver(5)
            .with_fallback(fallback())
            .run(|| async { Err::<u32, _>(FetchError::Malformed("bad json".into())) })
            .await
            .unwrap();
        assert_eq!(run.outcome, RetryOutcome::Fallback(7, FallbackReason::Terminal));
        assert!(run.waits.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn auth_expired_never_falls_back() {
        let run = driver(5)
            .with_fallback(fallback())
            .run(|| async { Err::<u32, _>(FetchError::Http(401)) })
            .await
            .unwrap();
        assert!(matches!(
            run.outcome,
            RetryOutcome::Failed(LoadFailure { class: ErrorClass::AuthExpired, .. })
        ));
        assert_eq!(run.attempts, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn network_twice_then_success_waits_twice() {
        let calls = AtomicU32::new(0);
        let started = tokio::time::Instant::now();
        let run = RetryDriver::new("trending", RetryPolicy::new(3, ms(2000), ms(30_000)))
            .run(|| {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n < 2 {
                        Err(FetchError::timeout("read timed out"))
                    } else {
                        Ok(n)
                    }
                }
            })
            .await
            .unwrap();
        assert_eq!(run.outcome, RetryOutcome::Success(2));
        assert_eq!(run.waits.len(), 2);
        assert!(run.waits[0] >= ms(2000) && run.waits[0] < ms(3000));
        assert!(run.waits[1] >= ms(4000) && run.waits[1] < ms(5000));
        assert!(started.elapsed() >= ms(6000));
    }

    #[tokio::test(start_paused = true)]
    async fn zero_max_attempts_fails_fast_without_calling_load() {
        let calls = AtomicU32::new(0);
        let err = driver(0)
            .run(|| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Ok(1) }
            })
            .await
            .unwrap_err();
        assert!(matches!(err, RetryError::Configuration(_)));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_during_backoff_stops_retrying() {
        let cancel = CancelToken::new();
        let calls = Arc::new(AtomicU32::new(0));
        let d = driver(5).with_cancel(cancel.clone());
        let counter = Arc::clone(&calls);
        let task = tokio::spawn(async move {
            d.run(|| {
                counter.fetch_add(1, Ordering::SeqCst);
                async { Err::<u32, _>(FetchError::Http(502)) }
            })
            .await
        });
        // First attempt fails at t=0; the driver is now in its 2s backoff.
        tokio::time::sleep(ms(500)).await;
        cancel.cancel();
        let result = task.await.unwrap();
        assert_eq!(result.unwrap_err(), RetryError::Cancelled);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_interrupts_pending_load() {
        let cancel = CancelToken::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        let d = driver(5).with_cancel(cancel.clone());
        let seen = Arc::clone(&log);
        let task = tokio::spawn(async move {
            d.run(|| {
                let seen = Arc::clone(&seen);
                async move {
                    tokio::time::sleep(Duration::from_secs(60)).await;
                    seen.lock().unwrap().push("completed");
                    Ok(1u32)
                }
            })
            .await
        });
        tokio::time::sleep(ms(10)).await;
        cancel.cancel();
        assert_eq!(task.await.unwrap().unwrap_err(), RetryError::Cancelled);
        assert!(log.lock().unwrap().is_empty());
    }
}
