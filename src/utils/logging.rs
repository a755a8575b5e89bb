//! Logging initialization
//!
//! One entry point for the binary and embedding hosts:
//! - `RUST_LOG` always wins when set
//! - otherwise the filter from configuration (or `DISPATCH_LOG`) applies
//! - otherwise "info"
//!
//! # Usage
//! ```rust,no_run
//! use dispatch_platform::config::LoggingConfig;
//! use dispatch_platform::utils::init_logging_from_config;
//!
//! init_logging_from_config(&LoggingConfig::default());
//! ```

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::LoggingConfig;

const DEFAULT_FILTER: &str = "info";

/// Build the effective filter: `RUST_LOG`, then `configured`, then "info"
pub fn resolve_filter(configured: Option<&str>) -> EnvFilter {
    if std::env::var("RUST_LOG").is_ok() {
        return EnvFilter::from_default_env();
    }
    EnvFilter::try_new(configured.unwrap_or(DEFAULT_FILTER)).unwrap_or_else(|e| {
        eprintln!("Invalid log filter {:?}: {}; using {}", configured, e, DEFAULT_FILTER);
        EnvFilter::new(DEFAULT_FILTER)
    })
}

/// Initialize human-readable logging to stderr
///
/// Safe to call more than once; later calls leave the first subscriber in place.
pub fn init_logging(filter: Option<&str>) {
    let _ = tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_thread_ids(false)
                .with_ansi(std::env::var("NO_COLOR").is_err()),
        )
        .with(resolve_filter(filter))
        .try_init();
}

/// Initialize logging with JSON output for log aggregation
#[cfg(feature = "json-logging")]
pub fn init_json_logging(filter: Option<&str>) {
    let _ = tracing_subscriber::registry()
        .with(
            fmt::layer()
                .json()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_current_span(true)
                .with_span_list(true),
        )
        .with(resolve_filter(filter))
        .try_init();
}

/// Initialize logging from the `[logging]` section of the platform config
///
/// Falls back to plain output when JSON is requested but the
/// `json-logging` feature is off.
pub fn init_logging_from_config(config: &LoggingConfig) {
    let filter = config.filter.as_deref();

    if config.json_format {
        #[cfg(feature = "json-logging")]
        {
            init_json_logging(filter);
            return;
        }
        #[cfg(not(feature = "json-logging"))]
        {
            init_logging(filter);
            tracing::warn!("JSON logging requested but the json-logging feature is disabled");
            return;
        }
    }

    init_logging(filter);
}
