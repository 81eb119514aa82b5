//! Retry Logic with a Fixed Delay
//!
//! Wraps Manifold API calls in a bounded retry loop. Only errors that
//! `ApiError::is_retryable()` accepts get another attempt; the last failure
//! is returned once the attempts run out.

use super::api_errors::ApiError;
use std::future::Future;
use tokio::time::{sleep, Duration};
use tracing::{debug, warn};

/// Retry configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryConfig {
    /// Total attempts, including the first one
    pub max_attempts: u32,
    /// Delay between attempts
    pub delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 12,
            delay: Duration::from_secs(5),
        }
    }
}

/// Execute an async closure with retry logic.
///
/// The closure should return `Result<T, ApiError>`. A `max_attempts` of zero
/// is treated as a single attempt.
pub async fn with_retry<T, F, Fut>(
    config: &RetryConfig,
    operation_name: &str,
    mut f: F,
) -> Result<T, ApiError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ApiError>>,
{
    let max_attempts = config.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        attempt += 1;
        match f().await {
            Ok(result) => {
                if attempt > 1 {
                    debug!("[Retry] {} succeeded on attempt {}", operation_name, attempt);
                }
                return Ok(result);
            }
            Err(err) => {
                if !err.is_retryable() {
                    return Err(err);
                }
                if attempt >= max_attempts {
                    warn!(
                        "[Retry] {} failed after {} attempts: {}",
                        operation_name, attempt, err
                    );
                    return Err(err);
                }

                warn!(
                    "[Retry] {} attempt {}/{} failed ({}), retrying in {:?}",
                    operation_name, attempt, max_attempts, err, config.delay
                );

                sleep(config.delay).await;
            }
        }
    }
}
