//! Circuit breaker pattern for fault tolerance
//!
//! Prevents cascading failures by fast-failing calls to a service that keeps
//! failing. State moves Closed -> Open after `failure_threshold` consecutive
//! failures, Open -> HalfOpen when a call is attempted after
//! `recovery_timeout` (there is no background timer), HalfOpen -> Closed
//! after `success_threshold` consecutive successes, and HalfOpen -> Open on
//! any failure.

use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::utils::current_timestamp_millis;
use crate::utils::timeout::with_custom_timeout;

/// Circuit breaker state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    /// Circuit is closed - normal operation
    Closed,
    /// Circuit is open - failing, reject requests
    Open,
    /// Circuit is half-open - testing if service recovered
    HalfOpen,
}

/// Circuit breaker tuning
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures before opening
    pub failure_threshold: u32,
    /// Time after the last failure before a probe call is let through
    #[serde(rename = "recovery_timeout_ms", with = "crate::utils::serde_millis")]
    pub recovery_timeout: Duration,
    /// Consecutive half-open successes needed to close
    pub success_threshold: u32,
    /// Per-call timeout
    #[serde(rename = "call_timeout_ms", with = "crate::utils::serde_millis")]
    pub call_timeout: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            recovery_timeout: Duration::from_secs(60),
            success_threshold: 3,
            call_timeout: Duration::from_secs(30),
        }
    }
}

impl CircuitBreakerConfig {
    /// Create a configuration with the default call timeout
    pub fn new(failure_threshold: u32, recovery_timeout: Duration, success_threshold: u32) -> Self {
        Self {
            failure_threshold,
            recovery_timeout,
            success_threshold,
            ..Self::default()
        }
    }

    /// Set the per-call timeout
    pub fn with_call_timeout(mut self, call_timeout: Duration) -> Self {
        self.call_timeout = call_timeout;
        self
    }

    /// Configuration for the chat platform API
    pub fn messaging() -> Self {
        Self {
            failure_threshold: 3,
            recovery_timeout: Duration::from_secs(30),
            success_threshold: 2,
            call_timeout: Duration::from_secs(15),
        }
    }

    /// Configuration for the payment processor
    pub fn payments() -> Self {
        Self {
            failure_threshold: 5,
            recovery_timeout: Duration::from_secs(60),
            success_threshold: 3,
            call_timeout: Duration::from_secs(30),
        }
    }

    /// Configuration for the persistence layer
    pub fn database() -> Self {
        Self {
            failure_threshold: 10,
            recovery_timeout: Duration::from_secs(30),
            success_threshold: 5,
            call_timeout: Duration::from_secs(20),
        }
    }
}

/// Errors returned by [`CircuitBreaker::call`]
#[derive(Debug, Error)]
pub enum CircuitBreakerError<E> {
    /// The call was not attempted; the service is presumed unhealthy
    #[error("Circuit breaker '{name}' is open - service unavailable")]
    Open { name: String },

    /// The call did not finish within the call timeout
    #[error("Circuit breaker '{name}' - call timed out after {timeout:?}")]
    Timeout { name: String, timeout: Duration },

    /// The call itself failed
    #[error("{0}")]
    Inner(E),
}

impl<E> CircuitBreakerError<E> {
    /// Whether the call was rejected without being attempted
    pub fn is_open(&self) -> bool {
        matches!(self, CircuitBreakerError::Open { .. })
    }

    /// Whether the call timed out
    pub fn is_timeout(&self) -> bool {
        matches!(self, CircuitBreakerError::Timeout { .. })
    }

    /// The underlying error, if the call itself failed
    pub fn into_inner(self) -> Option<E> {
        match self {
            CircuitBreakerError::Inner(e) => Some(e),
            _ => None,
        }
    }
}

/// Point-in-time view of a breaker, for monitoring
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CircuitBreakerSnapshot {
    pub name: String,
    pub state: CircuitState,
    pub failure_count: u32,
    pub success_count: u32,
    /// Unix time of the last failure, in milliseconds
    pub last_failure_time: Option<u64>,
    /// Unix time of the last success, in milliseconds
    pub last_success_time: Option<u64>,
    pub config: CircuitBreakerConfig,
}

#[derive(Debug)]
struct BreakerState {
    state: CircuitState,
    failure_count: u32,
    success_count: u32,
    /// Monotonic time of the last failure, drives the recovery window
    last_failure_at: Option<Instant>,
    last_failure_time: Option<u64>,
    last_success_time: Option<u64>,
}

/// Circuit breaker guarding one external service
///
/// All bookkeeping happens under a short-lived mutex that is never held
/// while the guarded call runs.
#[derive(Debug)]
pub struct CircuitBreaker {
    name: String,
    config: CircuitBreakerConfig,
    inner: Mutex<BreakerState>,
}

impl CircuitBreaker {
    /// Create a new circuit breaker
    pub fn new(name: impl Into<String>, config: CircuitBreakerConfig) -> Self {
        Self {
            name: name.into(),
            config,
            inner: Mutex::new(BreakerState {
                state: CircuitState::Closed,
                failure_count: 0,
                success_count: 0,
                last_failure_at: None,
                last_failure_time: None,
                last_success_time: None,
            }),
        }
    }

    /// Service name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Configuration
    pub fn config(&self) -> &CircuitBreakerConfig {
        &self.config
    }

    /// Get current state
    ///
    /// Does not evaluate the recovery window; an Open breaker whose window
    /// has elapsed still reads Open until the next call.
    pub fn state(&self) -> CircuitState {
        self.lock().state
    }

    /// Execute an operation through the breaker
    ///
    /// Fails fast with [`CircuitBreakerError::Open`] without invoking
    /// `operation` while the circuit is open. Otherwise runs it under the
    /// call timeout and records exactly one success or failure.
    pub async fn call<F, Fut, T, E>(&self, operation: F) -> Result<T, CircuitBreakerError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: std::fmt::Display,
    {
        self.try_acquire()?;

        match with_custom_timeout(operation(), self.config.call_timeout).await {
            Ok(Ok(value)) => {
                self.record_success();
                Ok(value)
            }
            Ok(Err(e)) => {
                warn!("Circuit breaker '{}' - call failed: {}", self.name, e);
                self.record_failure();
                Err(CircuitBreakerError::Inner(e))
            }
            Err(_) => {
                warn!("Circuit breaker '{}' - call timed out", self.name);
                self.record_failure();
                Err(CircuitBreakerError::Timeout {
                    name: self.name.clone(),
                    timeout: self.config.call_timeout,
                })
            }
        }
    }

    /// Check whether a call may proceed, moving Open -> HalfOpen once the recovery window has elapsed
    pub fn try_acquire<E>(&self) -> Result<(), CircuitBreakerError<E>> {
        let mut inner = self.lock();

        if inner.state == CircuitState::Open {
            let elapsed = inner
                .last_failure_at
                .map_or(true, |at| at.elapsed() >= self.config.recovery_timeout);

            if !elapsed {
                debug!("Circuit breaker '{}' rejected call", self.name);
                return Err(CircuitBreakerError::Open {
                    name: self.name.clone(),
                });
            }

            inner.state = CircuitState::HalfOpen;
            inner.success_count = 0;
            info!("Circuit breaker '{}' half-open - testing service", self.name);
        }

        Ok(())
    }

    /// Record success
    pub fn record_success(&self) {
        let mut inner = self.lock();
        inner.last_success_time = Some(current_timestamp_millis());
        inner.failure_count = 0;

        match inner.state {
            CircuitState::HalfOpen => {
                inner.success_count += 1;
                if inner.success_count >= self.config.success_threshold {
                    inner.state = CircuitState::Closed;
                    inner.failure_count = 0;
                    inner.success_count = 0;
                    info!("Circuit breaker '{}' closed - service recovered", self.name);
                }
            }
            CircuitState::Closed => {}
            CircuitState::Open => {
                // A probe admitted before a concurrent failure reopened the circuit
                debug!("Circuit breaker '{}' ignoring late success while open", self.name);
            }
        }

        debug!("Circuit breaker '{}' recorded success", self.name);
    }

    /// Record failure
    pub fn record_failure(&self) {
        let mut inner = self.lock();
        inner.last_failure_at = Some(Instant::now());
        inner.last_failure_time = Some(current_timestamp_millis());
        inner.failure_count = inner.failure_count.saturating_add(1);
        inner.success_count = 0;

        match inner.state {
            CircuitState::Closed => {
                if inner.failure_count >= self.config.failure_threshold {
                    inner.state = CircuitState::Open;
                    warn!(
                        "Circuit breaker '{}' opened - {} consecutive failures",
                        self.name, inner.failure_count
                    );
                }
            }
            CircuitState::HalfOpen => {
                inner.state = CircuitState::Open;
                warn!("Circuit breaker '{}' reopened - test call failed", self.name);
            }
            CircuitState::Open => {}
        }

        debug!("Circuit breaker '{}' recorded failure", self.name);
    }

    /// Reset circuit breaker to closed (manual recovery)
    pub fn reset(&self) {
        let mut inner = self.lock();
        inner.state = CircuitState::Closed;
        inner.failure_count = 0;
        inner.success_count = 0;
        info!("Circuit breaker '{}' manually reset", self.name);
    }

    /// Snapshot for monitoring
    pub fn get_state(&self) -> CircuitBreakerSnapshot {
        let inner = self.lock();
        CircuitBreakerSnapshot {
            name: self.name.clone(),
            state: inner.state,
            failure_count: inner.failure_count,
            success_count: inner.success_count,
            last_failure_time: inner.last_failure_time,
            last_success_time: inner.last_success_time,
            config: self.config.clone(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, BreakerState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
