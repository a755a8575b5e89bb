//! Resiliency layer for calls to external services
//!
//! - [`circuit_breaker`]: fast-fail a service after consecutive failures
//! - [`registry`]: named, lazily created breakers shared across callers
//! - [`retry`]: bounded re-execution with backoff, jitter and cancellation
//!
//! A typical call composes both, retrying through a breaker:
//!
//! ```rust,no_run
//! # async fn demo() {
//! use dispatch_platform::resilience::{CircuitBreakerRegistry, RetryExecutor, RetryPolicy};
//!
//! let breakers = CircuitBreakerRegistry::new();
//! let executor = RetryExecutor::new(RetryPolicy::database());
//! let rows = executor
//!     .execute(|| breakers.call("database", || async { Ok::<_, std::io::Error>(3) }))
//!     .await;
//! # let _ = rows;
//! # }
//! ```

pub mod circuit_breaker;
pub mod registry;
pub mod retry;

pub use circuit_breaker::{
    CircuitBreaker, CircuitBreakerConfig, CircuitBreakerError, CircuitBreakerSnapshot,
    CircuitState,
};
pub use registry::{CircuitBreakerRegistry, DATABASE, MESSAGING_API, PAYMENT_API};
pub use retry::{retry, RetryError, RetryExecutor, RetryPolicy, RetryStrategy, Retryable};
