/*!
 * Generic retry wrapper with exponential backoff.
 *
 * Wraps a single fallible async operation in an exponential-backoff retry
 * loop with jitter, a fixed maximum attempt count and a ceiling on total
 * wait time. Callers supply an error classifier so permanent failures
 * (authentication, malformed-request class) short-circuit the loop, and an
 * observer invoked before each backoff sleep. The final error is re-raised
 * unchanged so callers can distinguish transient-exhausted failures from
 * logic errors.
 */

use std::future::Future;
use std::time::Duration;

use log::warn;
use rand::Rng;

/// Backoff and attempt-count policy for the retry wrapper.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum attempts including the first (default 3)
    pub max_attempts: u32,

    /// Base delay; attempt N sleeps `base * 2^(N-1)` before jitter
    pub backoff_base: Duration,

    /// Ceiling for a single backoff sleep
    pub backoff_cap: Duration,

    /// Ceiling on cumulative sleep time; once reached, remaining attempts
    /// are abandoned and the last error is returned
    pub total_wait_cap: Duration,

    /// Jitter fraction in `0.0..=1.0`; each sleep is scaled by a random
    /// factor in `[1 - jitter, 1 + jitter]`
    pub jitter: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_base: Duration::from_millis(500),
            backoff_cap: Duration::from_secs(8),
            total_wait_cap: Duration::from_secs(30),
            jitter: 0.2,
        }
    }
}

impl RetryPolicy {
    /// Policy that never retries, for permanent-error paths and tests
    pub fn no_retries() -> Self {
        Self {
            max_attempts: 1,
            ..Default::default()
        }
    }

    /// Compute the backoff delay before the given retry (1-based attempt
    /// number of the attempt that just failed), jitter applied.
    fn backoff_delay(&self, failed_attempt: u32) -> Duration {
        let exponent = failed_attempt.saturating_sub(1).min(16);
        let base_ms = self.backoff_base.as_millis() as u64;
        let raw_ms = base_ms.saturating_mul(1u64 << exponent);
        let capped = Duration::from_millis(raw_ms).min(self.backoff_cap);

        if self.jitter <= 0.0 {
            return capped;
        }
        let factor = 1.0 + rand::rng().random_range(-self.jitter..=self.jitter);
        capped.mul_f64(factor.max(0.0))
    }
}

/// Retry `operation` under `policy`.
///
/// `classify` returns whether an error is worth retrying; pass
/// `retry_always` to retry every error class. `on_attempt_failure` is
/// invoked synchronously with the 1-based attempt number and the error
/// before each backoff sleep; it observes, it cannot swallow.
pub async fn retry<T, E, Fut, Op, Cls, Obs>(
    policy: &RetryPolicy,
    classify: Cls,
    mut on_attempt_failure: Obs,
    mut operation: Op,
) -> Result<T, E>
where
    Op: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    Cls: Fn(&E) -> bool,
    Obs: FnMut(u32, &E),
{
    let max_attempts = policy.max_attempts.max(1);
    let mut total_slept = Duration::ZERO;

    for attempt in 1..=max_attempts {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(error) => {
                if attempt == max_attempts {
                    return Err(error);
                }
                if !classify(&error) {
                    return Err(error);
                }

                on_attempt_failure(attempt, &error);

                let delay = policy.backoff_delay(attempt);
                if total_slept + delay > policy.total_wait_cap {
                    warn!(
                        "Retry wait budget exhausted after attempt {}/{}",
                        attempt, max_attempts
                    );
                    return Err(error);
                }
                total_slept += delay;
                tokio::time::sleep(delay).await;
            }
        }
    }

    unreachable!("retry loop always returns from its final attempt")
}

/// Classifier that treats every error as retryable
pub fn retry_always<E>(_error: &E) -> bool {
    true
}
