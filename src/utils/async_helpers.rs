//! Async operation helpers
//!
//! Bridges for blocking work and cancellable waits used by the retry executor.

use std::time::Duration;
use tokio::task::JoinError;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

/// Run a blocking closure on the blocking thread pool
///
/// A panic inside the closure surfaces as the `JoinError` converted into `E`.
pub async fn run_blocking<F, T, E>(operation: F) -> Result<T, E>
where
    F: FnOnce() -> Result<T, E> + Send + 'static,
    T: Send + 'static,
    E: From<JoinError> + Send + 'static,
{
    match tokio::task::spawn_blocking(operation).await {
        Ok(result) => result,
        Err(join_error) => Err(E::from(join_error)),
    }
}

/// Sleep for `delay`, returning `false` early if the token is cancelled
pub async fn sleep_unless_cancelled(delay: Duration, cancel: Option<&CancellationToken>) -> bool {
    match cancel {
        Some(token) => {
            tokio::select! {
                biased;
                _ = token.cancelled() => false,
                _ = sleep(delay) => true,
            }
        }
        None => {
            sleep(delay).await;
            true
        }
    }
}
