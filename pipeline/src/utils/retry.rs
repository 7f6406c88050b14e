use common::config::RetrySettings;
use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

use crate::processor::StageError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub initial_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, initial_delay: Duration) -> Self {
        Self {
            max_retries,
            initial_delay,
        }
    }

    pub fn none() -> Self {
        Self::new(0, Duration::ZERO)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&RetrySettings::default())
    }
}

impl From<&RetrySettings> for RetryPolicy {
    fn from(settings: &RetrySettings) -> Self {
        Self::new(
            settings.max_retries,
            Duration::from_millis(settings.initial_delay_ms),
        )
    }
}

async fn sleep_with_jitter(delay: Duration) {
    let jitter_ms = (delay.as_millis() / 4) as u64;
    let jitter = if jitter_ms > 0 {
        Duration::from_millis(rand::rng().random_range(0..=jitter_ms))
    } else {
        Duration::ZERO
    };
    tokio::time::sleep(delay + jitter).await;
}

/// Runs `operation` until it succeeds, fails with a non-transient error, or
/// runs out of retries. The delay doubles after every attempt.
pub async fn retry_with_backoff<T, F, Fut>(
    policy: &RetryPolicy,
    operation: F,
) -> Result<T, StageError>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, StageError>>,
{
    let mut retries = policy.max_retries;
    let mut delay = policy.initial_delay;

    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(e) => {
                if retries == 0 || !e.is_transient() {
                    return Err(e);
                }

                retries -= 1;
                warn!(
                    stage = %e.stage,
                    error = %e,
                    retries_left = retries,
                    delay_ms = delay.as_millis() as u64,
                    "Stage failed, retrying"
                );
                sleep_with_jitter(delay).await;
                delay *= 2;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processor::Stage;
    use common::Error;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast(max_retries: u32) -> RetryPolicy {
        RetryPolicy::new(max_retries, Duration::from_millis(1))
    }

    fn transient() -> StageError {
        StageError::new(Stage::Store, "put", Error::Storage("timeout".into()))
    }

    #[tokio::test]
    async fn test_transient_error_is_retried_until_success() {
        let attempts = AtomicU32::new(0);

        let result = retry_with_backoff(&fast(3), || async {
            if attempts.fetch_add(1, Ordering::SeqCst) < 2 {
                Err(transient())
            } else {
                Ok("stored")
            }
        })
        .await;

        assert_eq!(result.unwrap(), "stored");
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_retries() {
        let attempts = AtomicU32::new(0);

        let result: Result<(), _> = retry_with_backoff(&fast(3), || async {
            attempts.fetch_add(1, Ordering::SeqCst);
            Err(transient())
        })
        .await;

        assert!(result.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_permanent_error_is_not_retried() {
        let attempts = AtomicU32::new(0);

        let result: Result<(), _> = retry_with_backoff(&fast(3), || async {
            attempts.fetch_add(1, Ordering::SeqCst);
            Err(StageError::new(
                Stage::Store,
                "populate",
                Error::parse("FareAmount", "bad"),
            ))
        })
        .await;

        assert!(result.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_policy_from_settings() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_retries, 3);
        assert_eq!(policy.initial_delay, Duration::from_secs(1));
    }
}
