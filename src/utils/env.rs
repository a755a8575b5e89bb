//! Environment variable utilities
//!
//! Names of the variables the platform honors, plus typed readers for them.

/// Log filter override (takes effect when `RUST_LOG` is unset)
pub const ENV_LOG_FILTER: &str = "DISPATCH_LOG";
/// Path of the platform configuration file
pub const ENV_CONFIG_PATH: &str = "DISPATCH_CONFIG";
/// Switch to JSON log output
pub const ENV_JSON_LOGS: &str = "DISPATCH_JSON_LOGS";

/// Get environment variable as Option, treating empty values as unset
pub fn env_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Get environment variable or return default value
///
/// # Example
/// ```rust
/// use dispatch_platform::utils::env_or_default;
///
/// let filter = env_or_default("DISPATCH_LOG", "info");
/// assert!(!filter.is_empty());
/// ```
pub fn env_or_default(key: &str, default: &str) -> String {
    env_opt(key).unwrap_or_else(|| default.to_string())
}

/// Parse a boolean flag value
///
/// Accepts "true", "1", "yes", "on" and "false", "0", "no", "off"
/// (case-insensitive); anything else is `None`.
pub fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Get environment variable as boolean, `None` if unset or unrecognized
pub fn env_flag(key: &str) -> Option<bool> {
    env_opt(key).as_deref().and_then(parse_flag)
}
