use crate::config::RetryConfig;
use crate::{Result, ScrobbleIndexError};
use std::future::Future;
use std::time::Duration;

/// Result of a retry operation with context
#[derive(Debug)]
pub struct RetryResult<T> {
    /// The successful result
    pub result: T,
    /// Number of retry attempts made
    pub attempts_made: u32,
    /// Total time spent retrying (in seconds)
    pub total_retry_time: u64,
}

/// Delay before retry number `retries` (0-based) after a rate limit.
fn backoff_delay(config: &RetryConfig, retries: u32, retry_after: u64) -> u64 {
    let base_backoff = config.base_delay.saturating_mul(2_u64.saturating_pow(retries));
    std::cmp::min(retry_after.saturating_add(base_backoff), config.max_delay)
}

/// Execute an async operation, retrying only when it is rate limited.
///
/// Every other error is returned immediately. `sleep` performs the wait so
/// callers can make it cancellable; returning an error from it stops the
/// retry loop with that error.
pub async fn retry_with_backoff<T, F, Fut, S, SleepFut>(
    config: &RetryConfig,
    operation_name: &str,
    mut operation: F,
    mut sleep: S,
) -> Result<RetryResult<T>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
    S: FnMut(Duration) -> SleepFut,
    SleepFut: Future<Output = Result<()>>,
{
    let mut retries = 0;
    let mut total_retry_time = 0;

    loop {
        match operation().await {
            Ok(result) => {
                return Ok(RetryResult {
                    result,
                    attempts_made: retries,
                    total_retry_time,
                });
            }
            Err(ScrobbleIndexError::RateLimit { retry_after }) => {
                if retries >= config.max_retries {
                    log::warn!(
                        "Max retries ({}) exceeded for {} operation",
                        config.max_retries,
                        operation_name
                    );
                    return Err(ScrobbleIndexError::RateLimit { retry_after });
                }

                let delay = backoff_delay(config, retries, retry_after);
                log::info!(
                    "{} rate limited. Waiting {} seconds before retry {} of {}",
                    operation_name,
                    delay,
                    retries + 1,
                    config.max_retries
                );

                sleep(Duration::from_secs(delay)).await?;
                retries += 1;
                total_retry_time += delay;
            }
            Err(other_error) => {
                return Err(other_error);
            }
        }
    }
}
