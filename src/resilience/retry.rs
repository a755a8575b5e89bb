//! Retry executor with backoff and jitter
//!
//! Re-runs a fallible async operation until it succeeds, the error is
//! classified as non-retryable, the attempts run out, or the executor's
//! cancellation token fires. Backoff sleeps hold no locks.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinError;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::circuit_breaker::CircuitBreakerError;
use crate::utils::{run_blocking, sleep_unless_cancelled};

/// Fraction of the computed delay that jitter may add or remove
const JITTER_FRACTION: f64 = 0.25;

/// How the delay grows between attempts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetryStrategy {
    /// `base * exponential_base^(k-1)`
    Exponential,
    /// `base * k`
    Linear,
    /// `base`
    Fixed,
}

/// Retry policy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub max_attempts: u32,
    #[serde(rename = "base_delay_ms", with = "crate::utils::serde_millis")]
    pub base_delay: Duration,
    #[serde(rename = "max_delay_ms", with = "crate::utils::serde_millis")]
    pub max_delay: Duration,
    pub strategy: RetryStrategy,
    pub exponential_base: f64,
    /// Randomize each delay by up to ±25%
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
            strategy: RetryStrategy::Exponential,
            exponential_base: 2.0,
            jitter: true,
        }
    }
}

impl RetryPolicy {
    /// Exponential policy with the given attempts and delay bounds
    pub fn new(max_attempts: u32, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay,
            max_delay,
            ..Self::default()
        }
    }

    /// Policy for persistence calls
    pub fn database() -> Self {
        Self::new(3, Duration::from_millis(500), Duration::from_secs(5))
    }

    /// Policy for generic external APIs
    pub fn api() -> Self {
        Self::new(4, Duration::from_secs(1), Duration::from_secs(30))
    }

    /// Policy for the chat platform API
    pub fn messaging() -> Self {
        Self::new(3, Duration::from_secs(2), Duration::from_secs(20))
    }

    /// Policy for the payment processor
    pub fn payments() -> Self {
        Self::new(4, Duration::from_secs(1), Duration::from_secs(30))
    }

    pub fn with_strategy(mut self, strategy: RetryStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }

    pub fn with_exponential_base(mut self, exponential_base: f64) -> Self {
        self.exponential_base = exponential_base;
        self
    }

    /// Delay after failed attempt `attempt` (1-based), before jitter, capped at `max_delay`
    pub fn base_delay_for(&self, attempt: u32) -> Duration {
        let k = attempt.max(1);
        let base = self.base_delay.as_secs_f64();
        let secs = match self.strategy {
            RetryStrategy::Exponential => {
                let exponent = (k - 1).min(i32::MAX as u32) as i32;
                base * self.exponential_base.powi(exponent)
            }
            RetryStrategy::Linear => base * k as f64,
            RetryStrategy::Fixed => base,
        };
        let capped = secs.min(self.max_delay.as_secs_f64());
        if capped.is_nan() || capped <= 0.0 {
            Duration::ZERO
        } else {
            Duration::try_from_secs_f64(capped).unwrap_or(self.max_delay)
        }
    }

    /// Delay after failed attempt `attempt` (1-based), including jitter
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let delay = self.base_delay_for(attempt);
        if !self.jitter || delay.is_zero() {
            return delay;
        }
        let factor = rand::thread_rng().gen_range(-JITTER_FRACTION..=JITTER_FRACTION);
        let jittered = (delay.as_secs_f64() * (1.0 + factor)).max(0.0);
        Duration::try_from_secs_f64(jittered).unwrap_or(self.max_delay)
    }
}

/// Classification of errors as transient
///
/// Errors are retryable unless their type says otherwise.
pub trait Retryable {
    fn is_retryable(&self) -> bool {
        true
    }
}

impl Retryable for std::io::Error {}

impl Retryable for tokio::time::error::Elapsed {}

impl Retryable for JoinError {
    fn is_retryable(&self) -> bool {
        !self.is_cancelled()
    }
}

impl Retryable for anyhow::Error {}

impl<E: Retryable> Retryable for CircuitBreakerError<E> {
    fn is_retryable(&self) -> bool {
        match self {
            // Retrying into an open breaker only burns attempts
            CircuitBreakerError::Open { .. } => false,
            CircuitBreakerError::Timeout { .. } => true,
            CircuitBreakerError::Inner(e) => e.is_retryable(),
        }
    }
}

/// Errors returned by [`RetryExecutor`]
#[derive(Debug, Error)]
pub enum RetryError<E> {
    /// Every attempt failed with a retryable error
    #[error("Operation failed after {attempts} attempts: {last_error}")]
    Exhausted { attempts: u32, last_error: E },

    /// An attempt failed with an error classified as non-retryable
    #[error("{0}")]
    NonRetryable(E),

    /// The cancellation token fired during an attempt or a backoff sleep
    #[error("Retry cancelled after {attempts} attempts")]
    Cancelled { attempts: u32, last_error: Option<E> },
}

impl<E> RetryError<E> {
    /// The most recent operation error, if any attempt completed
    pub fn last_error(&self) -> Option<&E> {
        match self {
            RetryError::Exhausted { last_error, .. } => Some(last_error),
            RetryError::NonRetryable(e) => Some(e),
            RetryError::Cancelled { last_error, .. } => last_error.as_ref(),
        }
    }

    /// Consume into the most recent operation error
    pub fn into_inner(self) -> Option<E> {
        match self {
            RetryError::Exhausted { last_error, .. } => Some(last_error),
            RetryError::NonRetryable(e) => Some(e),
            RetryError::Cancelled { last_error, .. } => last_error,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, RetryError::Cancelled { .. })
    }
}

/// Runs operations under a [`RetryPolicy`]
#[derive(Debug, Clone, Default)]
pub struct RetryExecutor {
    policy: RetryPolicy,
    cancel: Option<CancellationToken>,
}

impl RetryExecutor {
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            cancel: None,
        }
    }

    /// Stop retrying as soon as `token` is cancelled
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Execute with retries, classifying errors through [`Retryable`]
    pub async fn execute<F, Fut, T, E>(&self, operation: F) -> Result<T, RetryError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Retryable + std::fmt::Display,
    {
        self.execute_with(operation, |e: &E| e.is_retryable()).await
    }

    /// Execute with retries, classifying errors with `is_retryable`
    pub async fn execute_with<F, Fut, T, E, P>(
        &self,
        mut operation: F,
        is_retryable: P,
    ) -> Result<T, RetryError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: std::fmt::Display,
        P: Fn(&E) -> bool,
    {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut last_error: Option<E> = None;
        let mut attempt = 0;

        loop {
            attempt += 1;
            if self.is_cancelled() {
                return Err(RetryError::Cancelled {
                    attempts: attempt - 1,
                    last_error,
                });
            }

            let outcome = match &self.cancel {
                Some(token) => {
                    tokio::select! {
                        biased;
                        _ = token.cancelled() => None,
                        result = operation() => Some(result),
                    }
                }
                None => Some(operation().await),
            };

            let error = match outcome {
                Some(Ok(value)) => {
                    if attempt > 1 {
                        debug!("Operation succeeded on attempt {}", attempt);
                    }
                    return Ok(value);
                }
                Some(Err(e)) => e,
                None => {
                    debug!("Retry cancelled during attempt {}", attempt);
                    return Err(RetryError::Cancelled {
                        attempts: attempt,
                        last_error,
                    });
                }
            };

            if !is_retryable(&error) {
                debug!("Non-retryable error on attempt {}: {}", attempt, error);
                return Err(RetryError::NonRetryable(error));
            }

            if attempt == max_attempts {
                warn!("Operation failed after {} attempts: {}", attempt, error);
                return Err(RetryError::Exhausted {
                    attempts: attempt,
                    last_error: error,
                });
            }

            let delay = self.policy.delay_for(attempt);
            debug!(
                "Attempt {}/{} failed: {}. Retrying in {:?}",
                attempt, max_attempts, error, delay
            );
            last_error = Some(error);

            if !sleep_unless_cancelled(delay, self.cancel.as_ref()).await {
                debug!("Retry cancelled during backoff after attempt {}", attempt);
                return Err(RetryError::Cancelled {
                    attempts: attempt,
                    last_error,
                });
            }
        }
    }

    /// Execute a blocking operation with retries, one `spawn_blocking` per attempt
    pub async fn execute_blocking<F, T, E>(&self, operation: F) -> Result<T, RetryError<E>>
    where
        F: Fn() -> Result<T, E> + Send + Sync + 'static,
        T: Send + 'static,
        E: From<JoinError> + Retryable + std::fmt::Display + Send + 'static,
    {
        let operation = Arc::new(operation);
        self.execute(|| {
            let operation = Arc::clone(&operation);
            run_blocking(move || operation())
        })
        .await
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().map_or(false, |t| t.is_cancelled())
    }
}

/// Run `operation` under `policy`, classifying errors through [`Retryable`]
pub async fn retry<F, Fut, T, E>(policy: RetryPolicy, operation: F) -> Result<T, RetryError<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Retryable + std::fmt::Display,
{
    RetryExecutor::new(policy).execute(operation).await
}
