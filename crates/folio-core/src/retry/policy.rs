use std::time::Duration;

use rand::Rng;

use super::classify::ErrorClass;
use super::error::RetryError;

/// Exclusive upper bound of the random jitter added to each backoff delay.
pub const JITTER_BOUND: Duration = Duration::from_millis(1000);

/// Largest exponent applied to the base delay; the ceiling clamps long before this.
const MAX_EXPONENT: u32 = 20;

/// Source of backoff jitter. Injected so tests can pin the delay.
pub trait JitterSource: Send + Sync {
    /// A sample in `[0, JITTER_BOUND)`.
    fn sample(&self) -> Duration;
}

/// Uniform jitter from the thread-local RNG.
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomJitter;

impl JitterSource for RandomJitter {
    fn sample(&self) -> Duration {
        let bound = JITTER_BOUND.as_millis() as u64;
        Duration::from_millis(rand::thread_rng().gen_range(0..bound))
    }
}

/// Always returns the same jitter. Values at or above the bound are clamped just below it.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixedJitter(pub Duration);

impl JitterSource for FixedJitter {
    fn sample(&self) -> Duration {
        self.0.min(JITTER_BOUND - Duration::from_millis(1))
    }
}

/// `min(base * 2^(attempt-1) + jitter, ceiling)`. `attempt` is 1-based.
pub fn backoff_delay(attempt: u32, base: Duration, ceiling: Duration, jitter: Duration) -> Duration {
    let exp = attempt.saturating_sub(1).min(MAX_EXPONENT);
    base.saturating_mul(1u32 << exp)
        .saturating_add(jitter)
        .min(ceiling)
}

/// Why the driver stopped attempting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    Terminal,
    AuthExpired,
    Exhausted,
}

/// Decision returned by the retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Stop; no further attempts.
    Stop(StopReason),
    /// Retry after the given delay.
    RetryAfter(Duration),
}

/// Exponential backoff policy with a ceiling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum number of attempts (including the first).
    pub max_attempts: u32,
    /// Base delay for backoff.
    pub base_delay: Duration,
    /// Upper bound on backoff delay.
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_millis(2000),
            max_delay: Duration::from_millis(30_000),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay,
            max_delay,
        }
    }

    /// Reject parameters the driver cannot run with.
    pub fn validate(&self) -> Result<(), RetryError> {
        if self.max_attempts == 0 {
            return Err(RetryError::Configuration(
                "max_attempts must be at least 1".to_string(),
            ));
        }
        if self.base_delay.is_zero() {
            return Err(RetryError::Configuration(
                "base delay must be non-zero".to_string(),
            ));
        }
        if self.max_delay < self.base_delay {
            return Err(RetryError::Configuration(format!(
                "max delay {:?} is below base delay {:?}",
                self.max_delay, self.base_delay
            )));
        }
        Ok(())
    }

    /// Backoff for the given 1-based retry number.
    pub fn delay(&self, attempt: u32, jitter: &dyn JitterSource) -> Duration {
        backoff_delay(attempt, self.base_delay, self.max_delay, jitter.sample())
    }

    /// Decide what to do after `attempts_made` attempts, the last of which failed with `class`.
    pub fn decide(
        &self,
        attempts_made: u32,
        class: ErrorClass,
        jitter: &dyn JitterSource,
    ) -> RetryDecision {
        match class {
            ErrorClass::Terminal => RetryDecision::Stop(StopReason::Terminal),
            ErrorClass::AuthExpired => RetryDecision::Stop(StopReason::AuthExpired),
            ErrorClass::ServerTransient | ErrorClass::NetworkTransient => {
                if attempts_made >= self.max_attempts {
                    RetryDecision::Stop(StopReason::Exhausted)
                } else {
                    RetryDecision::RetryAfter(self.delay(attempts_made, jitter))
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn delay_stays_within_bounds_for_all_attempts() {
        let base = ms(2000);
        let ceiling = ms(30_000);
        for attempt in 1..=40u32 {
            for jitter in [ms(0), ms(1), ms(500), ms(999)] {
                let d = backoff_delay(attempt, base, ceiling, jitter);
                assert!(d <= ceiling, "attempt {} exceeded ceiling", attempt);
                let exp = base.saturating_mul(1u32 << (attempt - 1).min(MAX_EXPONENT));
                assert!(d >= exp.min(ceiling), "attempt {} below exponential floor", attempt);
                assert!(d < exp.saturating_add(JITTER_BOUND).min(ceiling + ms(1)));
            }
        }
    }

    #[test]
    fn delay_doubles_with_fixed_jitter() {
        let base = ms(2000);
        let ceiling = ms(30_000);
        assert_eq!(backoff_delay(1, base, ceiling, ms(250)), ms(2250));
        assert_eq!(backoff_delay(2, base, ceiling, ms(250)), ms(4250));
        assert_eq!(backoff_delay(3, base, ceiling, ms(250)), ms(8250));
        assert_eq!(backoff_delay(5, base, ceiling, ms(250)), ms(30_000));
    }

    #[test]
    fn random_jitter_is_below_bound() {
        let j = RandomJitter;
        for _ in 0..1000 {
            assert!(j.sample() < JITTER_BOUND);
        }
    }

    #[test]
    fn fixed_jitter_is_clamped_below_bound() {
        assert_eq!(FixedJitter(ms(300)).sample(), ms(300));
        assert_eq!(FixedJitter(ms(5000)).sample(), ms(999));
    }

    #[test]
    fn no_retry_for_terminal_or_auth() {
        let p = RetryPolicy::default();
        let j = FixedJitter(ms(0));
        assert_eq!(
            p.decide(1, ErrorClass::Terminal, &j),
            RetryDecision::Stop(StopReason::Terminal)
        );
        assert_eq!(
            p.decide(1, ErrorClass::AuthExpired, &j),
            RetryDecision::Stop(StopReason::AuthExpired)
        );
    }

    #[test]
    fn respects_max_attempts() {
        let p = RetryPolicy::new(3, ms(2000), ms(30_000));
        let j = FixedJitter(ms(0));
        assert_eq!(
            p.decide(1, ErrorClass::ServerTransient, &j),
            RetryDecision::RetryAfter(ms(2000))
        );
        assert_eq!(
            p.decide(2, ErrorClass::NetworkTransient, &j),
            RetryDecision::RetryAfter(ms(4000))
        );
        assert_eq!(
            p.decide(3, ErrorClass::NetworkTransient, &j),
            RetryDecision::Stop(StopReason::Exhausted)
        );
    }

    #[test]
    fn zero_attempts_is_a_configuration_error() {
        let p = RetryPolicy::new(0, ms(2000), ms(30_000));
        assert!(matches!(p.validate(), Err(RetryError::Configuration(_))));
        let p = RetryPolicy::new(3, ms(5000), ms(1000));
        assert!(matches!(p.validate(), Err(RetryError::Configuration(_))));
        assert!(RetryPolicy::default().validate().is_ok());
    }
}
