use log::{debug, info, warn};
use std::time::Duration;
use thiserror::Error;
use tokio::time::sleep;

#[derive(Debug, Clone, Error)]
pub enum FeedError {
    /// Missing or invalid configuration (empty roster, bad env vars)
    #[error("Config Error: {0}")]
    Config(String),

    /// Upstream search API failures (network, non-2xx, malformed body)
    #[error("Upstream Error: {0}")]
    Upstream(String),

    /// Cache/Redis errors
    #[error("Cache Error: {0}")]
    Cache(String),

    /// Malformed individual records
    #[error("Parse Error: {0}")]
    Parse(String),
}

impl From<serde_json::Error> for FeedError {
    fn from(err: serde_json::Error) -> Self {
        FeedError::Parse(format!("JSON serialization/deserialization error: {}", err))
    }
}

impl From<redis::RedisError> for FeedError {
    fn from(err: redis::RedisError) -> Self {
        FeedError::Cache(format!("Redis error: {}", err))
    }
}

impl From<reqwest::Error> for FeedError {
    fn from(err: reqwest::Error) -> Self {
        FeedError::Upstream(format!("HTTP error: {}", err))
    }
}

impl FeedError {
    /// Determines if an error is recoverable through retry
    pub fn is_recoverable(&self) -> bool {
        match self {
            FeedError::Config(_) => false, // Config needs fixing
            FeedError::Upstream(_) => true,
            FeedError::Cache(_) => true, // Redis might recover
            FeedError::Parse(_) => false, // Data format issues aren't recoverable
        }
    }
}

/// Retry policy with exponential backoff
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    /// Mirrors the capped reconnect strategy used against the cache backend:
    /// at most 5 retries, delays growing from 50ms up to a 1s ceiling.
    fn default() -> Self {
        Self::new(5, Duration::from_millis(50), Duration::from_secs(1))
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

    /// Calculate delay for a given attempt (exponential backoff)
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::from_millis(0);
        }

        // Saturate instead of overflowing for caller-configured attempt
        // counts beyond 128; the cap wins long before that anyway.
        let factor = 2_u128.checked_pow(attempt - 1).unwrap_or(u128::MAX);
        let delay_ms = self.base_delay.as_millis().saturating_mul(factor);
        let delay = Duration::from_millis(delay_ms.min(self.max_delay.as_millis()) as u64);

        debug!("Retry attempt {}: delay = {:?}", attempt, delay);
        delay
    }

    /// Execute operation with retry logic. Gives up after `max_attempts`
    /// rather than retrying forever.
    pub async fn execute<F, T, E, Fut>(&self, mut operation: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = std::result::Result<T, E>>,
        E: Into<FeedError>,
    {
        let mut last_error = None;

        for attempt in 0..self.max_attempts {
            if attempt > 0 {
                let delay = self.delay_for_attempt(attempt);
                sleep(delay).await;
            }

            match operation().await {
                Ok(result) => {
                    if attempt > 0 {
                        info!("Operation succeeded after {} retries", attempt);
                    }
                    return Ok(result);
                }
                Err(e) => {
                    let feed_error: FeedError = e.into();

                    if !feed_error.is_recoverable() {
                        warn!(
                            "Non-retryable error on attempt {}: {}",
                            attempt + 1,
                            feed_error
                        );
                        return Err(feed_error);
                    }

                    warn!(
                        "Attempt {} failed: {} (retrying...)",
                        attempt + 1,
                        feed_error
                    );
                    last_error = Some(feed_error);
                }
            }
        }

        warn!("All {} retry attempts failed", self.max_attempts);
        Err(last_error.unwrap_or_else(|| FeedError::Cache("Max retries exceeded".to_string())))
    }
}

// Convenience type alias
pub type Result<T> = std::result::Result<T, FeedError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delay_grows_exponentially_up_to_cap() {
        let policy = RetryPolicy::new(6, Duration::from_millis(100), Duration::from_millis(500));

        assert_eq!(policy.delay_for_attempt(0), Duration::from_millis(0));
        assert_eq!(policy.delay_for_attempt(1), Duration::from_millis(100));
        assert_eq!(policy.delay_for_attempt(2), Duration::from_millis(200));
        assert_eq!(policy.delay_for_attempt(3), Duration::from_millis(400));
        // Capped at max_delay from here on
        assert_eq!(policy.delay_for_attempt(4), Duration::from_millis(500));
        assert_eq!(policy.delay_for_attempt(10), Duration::from_millis(500));
    }

    #[test]
    fn test_delay_saturates_for_very_large_attempt_counts() {
        let policy = RetryPolicy::new(u32::MAX, Duration::from_millis(100), Duration::from_secs(1));

        // 2^(attempt-1) no longer fits in u128 here; the cap still applies.
        assert_eq!(policy.delay_for_attempt(129), Duration::from_secs(1));
        assert_eq!(policy.delay_for_attempt(u32::MAX), Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_execute_stops_after_max_attempts() {
        let policy = RetryPolicy::new(3, Duration::from_millis(1), Duration::from_millis(2));
        let mut calls = 0u32;

        let result: Result<()> = policy
            .execute(|| {
                calls += 1;
                async { Err::<(), _>(FeedError::Cache("still down".to_string())) }
            })
            .await;

        assert!(result.is_err());
        assert_eq!(calls, 3);
    }

    #[tokio::test]
    async fn test_execute_does_not_retry_config_errors() {
        let policy = RetryPolicy::new(5, Duration::from_millis(1), Duration::from_millis(2));
        let mut calls = 0u32;

        let result: Result<()> = policy
            .execute(|| {
                calls += 1;
                async { Err::<(), _>(FeedError::Config("no accounts configured".to_string())) }
            })
            .await;

        assert!(result.is_err());
        assert_eq!(calls, 1);
    }

    #[tokio::test]
    async fn test_execute_returns_first_success() {
        let policy = RetryPolicy::new(5, Duration::from_millis(1), Duration::from_millis(2));
        let mut calls = 0u32;

        let result = policy
            .execute(|| {
                calls += 1;
                let attempt = calls;
                async move {
                    if attempt < 3 {
                        Err(FeedError::Cache("warming up".to_string()))
                    } else {
                        Ok(attempt)
                    }
                }
            })
            .await;

        assert_eq!(result.ok(), Some(3));
    }
}
