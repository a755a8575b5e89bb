//! Timeout utilities
//!
//! Wrappers for operations that might hang. Breakers carry their own
//! configurable call timeout and go through [`with_custom_timeout`].

use std::future::Future;
use std::time::Duration;
use tokio::time::timeout;

/// Execute operation with custom timeout
pub async fn with_custom_timeout<F, T>(
    operation: F,
    duration: Duration,
) -> Result<T, tokio::time::error::Elapsed>
where
    F: Future<Output = T>,
{
    timeout(duration, operation).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_custom_timeout_elapses() {
        let slow = tokio::time::sleep(Duration::from_secs(10));
        assert!(with_custom_timeout(slow, Duration::from_secs(1)).await.is_err());
    }

    #[tokio::test]
    async fn test_custom_timeout_passes_value() {
        let value = with_custom_timeout(async { 7 }, Duration::from_secs(1)).await;
        assert_eq!(value.unwrap(), 7);
    }
}
