use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};
use rand::Rng;

/// Exponential backoff for store requests that fail transiently.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Total attempts, including the first one
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    pub backoff_multiplier: f64,
    /// Add up to 25% random delay on top of each backoff
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_secs(30),
            backoff_multiplier: 2.0,
            jitter: true,
        }
    }
}

impl RetryConfig {
    /// Few, short retries. A backup run is interactive enough that an
    /// unreachable store should fail within seconds.
    pub fn quick() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(50),
            max_backoff: Duration::from_secs(5),
            ..Default::default()
        }
    }

    fn backoff_duration(&self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        let base_ms = self.initial_backoff.as_millis() as f64 * self.backoff_multiplier.powi(exponent);
        let duration_ms = base_ms.min(self.max_backoff.as_millis() as f64) as u64;
        let mut duration = Duration::from_millis(duration_ms);

        if self.jitter {
            let jitter_ms = rand::thread_rng().gen_range(0..=(duration_ms / 4));
            duration += Duration::from_millis(jitter_ms);
        }

        duration
    }
}

pub trait Retryable {
    fn is_retryable(&self) -> bool;
}

/// Only errors the backend classified as transient are retried; a plain
/// `Store` error is final whatever its message says.
impl Retryable for minio_backup_core::Error {
    fn is_retryable(&self) -> bool {
        matches!(
            self,
            minio_backup_core::Error::Io(_) | minio_backup_core::Error::Unavailable(_)
        )
    }
}

/// Run `operation` until it succeeds, returns a non-retryable error, or the
/// attempts run out. The last error is returned in the latter two cases.
pub async fn retry_with_backoff<F, Fut, T, E>(
    config: &RetryConfig,
    operation_name: &str,
    mut operation: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Retryable + std::fmt::Display,
{
    let max_attempts = config.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        let error = match operation().await {
            Ok(result) => {
                if attempt > 0 {
                    debug!(
                        operation = operation_name,
                        attempt = attempt + 1,
                        "Operation succeeded after retry"
                    );
                }
                return Ok(result);
            }
            Err(error) => error,
        };

        if !error.is_retryable() {
            debug!(operation = operation_name, error = %error, "Error is not retryable");
            return Err(error);
        }

        attempt += 1;
        if attempt >= max_attempts {
            warn!(
                operation = operation_name,
                max_attempts,
                error = %error,
                "Operation failed after all retry attempts"
            );
            return Err(error);
        }

        let backoff = config.backoff_duration(attempt - 1);
        warn!(
            operation = operation_name,
            attempt,
            max_attempts,
            backoff_ms = backoff.as_millis() as u64,
            error = %error,
            "Operation failed, retrying after backoff"
        );
        sleep(backoff).await;
    }
}
