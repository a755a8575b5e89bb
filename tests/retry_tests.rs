//! Retry executor tests
//!
//! Backoff timing is observed on tokio's paused clock.

mod common;

use common::Transient;
use dispatch_platform::resilience::{retry, RetryError, RetryExecutor, RetryPolicy, RetryStrategy};
use std::io;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

fn fixed_zero(max_attempts: u32) -> RetryPolicy {
    RetryPolicy::new(max_attempts, Duration::ZERO, Duration::ZERO)
        .with_strategy(RetryStrategy::Fixed)
}

#[tokio::test]
async fn test_fails_twice_then_succeeds() {
    let calls = &AtomicU32::new(0);
    let executor = RetryExecutor::new(fixed_zero(3));

    let value = executor
        .execute(|| async move {
            let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
            if n < 3 {
                Err(Transient(format!("attempt {}", n)))
            } else {
                Ok("done")
            }
        })
        .await
        .unwrap();

    assert_eq!(value, "done");
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[tokio::test(start_paused = true)]
async fn test_exponential_backoff_delays() {
    let attempts = &Mutex::new(Vec::new());
    let policy = RetryPolicy::new(4, Duration::from_secs(1), Duration::from_secs(60)).with_jitter(false);
    let start = Instant::now();

    let result = retry(policy, || async move {
        attempts.lock().unwrap().push(start.elapsed());
        Err::<(), _>(Transient("still down".to_string()))
    })
    .await;

    let seen: Vec<u64> = attempts
        .lock()
        .unwrap()
        .iter()
        .map(|d| d.as_millis() as u64)
        .collect();
    assert_eq!(seen, vec![0, 1_000, 3_000, 7_000]);

    match result {
        Err(RetryError::Exhausted { attempts, last_error }) => {
            assert_eq!(attempts, 4);
            assert_eq!(last_error, Transient("still down".to_string()));
        }
        other => panic!("expected exhaustion, got {:?}", other),
    }
}

#[tokio::test]
async fn test_exhaustion_carries_last_error() {
    let calls = &AtomicU32::new(0);
    let executor = RetryExecutor::new(fixed_zero(3));

    let err = executor
        .execute(|| async move {
            let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
            Err::<(), _>(Transient(format!("failure {}", n)))
        })
        .await
        .unwrap_err();

    assert!(err.to_string().contains("after 3 attempts"));
    assert_eq!(err.into_inner(), Some(Transient("failure 3".to_string())));
}

#[tokio::test]
async fn test_non_retryable_error_propagates_immediately() {
    let calls = &AtomicU32::new(0);
    let executor = RetryExecutor::new(fixed_zero(5));

    let err = executor
        .execute_with(
            || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(Transient("card declined".to_string()))
            },
            |e: &Transient| !e.0.contains("declined"),
        )
        .await
        .unwrap_err();

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(matches!(err, RetryError::NonRetryable(Transient(ref m)) if m == "card declined"));
}

#[tokio::test(start_paused = true)]
async fn test_cancellation_during_backoff() {
    let token = CancellationToken::new();
    let calls = &AtomicU32::new(0);
    let executor = RetryExecutor::new(
        RetryPolicy::new(5, Duration::from_secs(30), Duration::from_secs(30)).with_jitter(false),
    )
    .with_cancellation(token.clone());

    let canceller = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(10)).await;
        token.cancel();
    });

    let started = Instant::now();
    let err = executor
        .execute(|| async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err::<(), _>(Transient("flaky".to_string()))
        })
        .await
        .unwrap_err();
    canceller.await.unwrap();

    assert!(err.is_cancelled());
    assert!(started.elapsed() < Duration::from_secs(30));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    match err {
        RetryError::Cancelled { attempts, last_error } => {
            assert_eq!(attempts, 1);
            assert_eq!(last_error, Some(Transient("flaky".to_string())));
        }
        other => panic!("expected cancellation, got {:?}", other),
    }
}

#[tokio::test(start_paused = true)]
async fn test_cancellation_during_attempt() {
    let token = CancellationToken::new();
    let executor = RetryExecutor::new(fixed_zero(3)).with_cancellation(token.clone());

    let canceller = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(1)).await;
        token.cancel();
    });

    let err = executor
        .execute(|| async move {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok::<_, Transient>(())
        })
        .await
        .unwrap_err();
    canceller.await.unwrap();

    assert!(matches!(
        err,
        RetryError::Cancelled { attempts: 1, last_error: None }
    ));
}

#[tokio::test]
async fn test_already_cancelled_token_runs_nothing() {
    let token = CancellationToken::new();
    token.cancel();
    let calls = &AtomicU32::new(0);

    let err = RetryExecutor::new(fixed_zero(3))
        .with_cancellation(token)
        .execute(|| async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok::<_, Transient>(())
        })
        .await
        .unwrap_err();

    assert!(matches!(err, RetryError::Cancelled { attempts: 0, .. }));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_blocking_operation_is_retried() {
    let calls = Arc::new(AtomicU32::new(0));
    let counter = Arc::clone(&calls);
    let executor = RetryExecutor::new(fixed_zero(3));

    let value = executor
        .execute_blocking(move || {
            if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(io::Error::new(io::ErrorKind::ConnectionRefused, "db offline"))
            } else {
                Ok(7)
            }
        })
        .await
        .unwrap();

    assert_eq!(value, 7);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}
