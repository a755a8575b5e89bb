//! Error handling utilities for graceful degradation
//!
//! Helpers for logging-and-continuing and for turning panic payloads into
//! error text.

use std::any::Any;
use tracing::warn;

/// Execute an operation and log errors without failing
///
/// Returns `Some(T)` on success, `None` on error (after logging).
///
/// # Example
/// ```rust
/// use dispatch_platform::utils::log_error;
///
/// let parsed = log_error(|| "42".parse::<u32>(), "Failed to parse value");
/// assert_eq!(parsed, Some(42));
/// ```
pub fn log_error<F, T, E>(operation: F, context: &str) -> Option<T>
where
    F: FnOnce() -> Result<T, E>,
    E: std::fmt::Display,
{
    match operation() {
        Ok(value) => Some(value),
        Err(e) => {
            warn!("{}: {}", context, e);
            None
        }
    }
}

/// Extract a readable message from a panic payload
///
/// Handles the two payload types `panic!` produces; anything else is
/// reported generically.
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("panicked: {}", s)
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("panicked: {}", s)
    } else {
        "panicked with a non-string payload".to_string()
    }
}
