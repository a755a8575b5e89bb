//! Time utilities
//!
//! Provides safe wall-clock reads that never panic.

use std::time::{SystemTime, UNIX_EPOCH};
use tracing::warn;

/// Get current Unix timestamp in milliseconds
///
/// Returns zero if system time is before epoch.
pub fn current_timestamp_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as u64)
        .unwrap_or_else(|_| {
            warn!("System time is before UNIX epoch, using zero timestamp");
            0
        })
}
