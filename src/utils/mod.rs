//! Shared helpers: logging setup, environment, time, timeouts, async bridges

pub mod async_helpers;
pub mod env;
pub mod error;
pub mod logging;
pub mod serde_millis;
pub mod signal;
pub mod time;
pub mod timeout;

// Re-export commonly used items
pub use async_helpers::{run_blocking, sleep_unless_cancelled};
pub use env::{env_flag, env_opt, env_or_default, parse_flag};
pub use error::{log_error, panic_message};
#[cfg(feature = "json-logging")]
pub use logging::init_json_logging;
pub use logging::{init_logging, init_logging_from_config, resolve_filter};
pub use signal::wait_for_shutdown_signal;
pub use time::current_timestamp_millis;
pub use timeout::with_custom_timeout;
