//! Configuration management for the dispatch platform
//!
//! Loads [`PlatformConfig`] from TOML or JSON (chosen by file extension),
//! applies environment overrides, and validates breaker and retry tunings.

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tracing::debug;

use crate::module::traits::ModuleSettings;
use crate::resilience::{CircuitBreakerConfig, CircuitBreakerRegistry, RetryPolicy};
use crate::utils::env::{env_flag, env_opt, ENV_JSON_LOGS, ENV_LOG_FILTER};

/// Logging configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log filter (e.g. "info", "dispatch_platform::module=debug");
    /// `RUST_LOG` takes precedence when set
    pub filter: Option<String>,

    /// Emit JSON lines (needs the `json-logging` feature)
    pub json_format: bool,
}

/// Module system configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModuleSystemConfig {
    /// Directory holding per-module `<name>.toml` files
    pub config_dir: Option<String>,

    /// Modules initialized but left disabled at startup
    pub disabled_modules: Vec<String>,

    /// Inline per-module settings
    pub module_configs: HashMap<String, ModuleSettings>,
}

impl ModuleSystemConfig {
    /// Whether a module should stay disabled at startup
    pub fn is_disabled(&self, name: &str) -> bool {
        self.disabled_modules.iter().any(|m| m == name)
    }
}

/// Platform configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlatformConfig {
    pub logging: LoggingConfig,

    pub modules: ModuleSystemConfig,

    /// Per-service breaker tunings, keyed by breaker name
    pub circuit_breakers: HashMap<String, CircuitBreakerConfig>,

    /// Named retry policies
    pub retry_policies: HashMap<String, RetryPolicy>,

    /// Host version modules are checked against (defaults to the crate version)
    pub host_version: String,
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            logging: LoggingConfig::default(),
            modules: ModuleSystemConfig::default(),
            circuit_breakers: HashMap::new(),
            retry_policies: HashMap::new(),
            host_version: crate::VERSION.to_string(),
        }
    }
}

impl PlatformConfig {
    /// Load configuration from a TOML or JSON file
    ///
    /// `.json` files are parsed as JSON, everything else as TOML.
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        let is_json = path
            .extension()
            .and_then(|e| e.to_str())
            .map_or(false, |e| e.eq_ignore_ascii_case("json"));

        let config: PlatformConfig = if is_json {
            serde_json::from_str(&content)
                .with_context(|| format!("Invalid JSON in {}", path.display()))?
        } else {
            toml::from_str(&content)
                .with_context(|| format!("Invalid TOML in {}", path.display()))?
        };

        debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Save configuration as pretty JSON
    pub fn to_json_file(&self, path: &Path) -> anyhow::Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file {}", path.display()))?;
        Ok(())
    }

    /// Apply `DISPATCH_LOG` and `DISPATCH_JSON_LOGS`
    pub fn apply_env_overrides(&mut self) {
        if let Some(filter) = env_opt(ENV_LOG_FILTER) {
            self.logging.filter = Some(filter);
        }
        if let Some(json) = env_flag(ENV_JSON_LOGS) {
            self.logging.json_format = json;
        }
    }

    /// Retry policy by name, falling back to the built-in presets and then the default
    pub fn retry_policy(&self, name: &str) -> RetryPolicy {
        if let Some(policy) = self.retry_policies.get(name) {
            return policy.clone();
        }
        match name {
            "database" => RetryPolicy::database(),
            "api" => RetryPolicy::api(),
            "messaging" => RetryPolicy::messaging(),
            "payments" => RetryPolicy::payments(),
            _ => RetryPolicy::default(),
        }
    }

    /// Breaker registry carrying the configured per-service tunings
    pub fn breaker_registry(&self) -> CircuitBreakerRegistry {
        CircuitBreakerRegistry::with_overrides(self.circuit_breakers.clone())
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.host_version.trim().is_empty() {
            return Err(anyhow::anyhow!("host_version must not be empty"));
        }

        for (name, breaker) in &self.circuit_breakers {
            if breaker.failure_threshold == 0 {
                return Err(anyhow::anyhow!(
                    "circuit breaker '{}': failure_threshold must be at least 1",
                    name
                ));
            }
            if breaker.success_threshold == 0 {
                return Err(anyhow::anyhow!(
                    "circuit breaker '{}': success_threshold must be at least 1",
                    name
                ));
            }
            if breaker.call_timeout.is_zero() {
                return Err(anyhow::anyhow!(
                    "circuit breaker '{}': call_timeout_ms must be positive",
                    name
                ));
            }
        }

        for (name, policy) in &self.retry_policies {
            if policy.max_attempts == 0 {
                return Err(anyhow::anyhow!(
                    "retry policy '{}': max_attempts must be at least 1",
                    name
                ));
            }
            if policy.base_delay > policy.max_delay {
                return Err(anyhow::anyhow!(
                    "retry policy '{}': base_delay_ms ({:?}) exceeds max_delay_ms ({:?})",
                    name,
                    policy.base_delay,
                    policy.max_delay
                ));
            }
            if !(policy.exponential_base.is_finite() && policy.exponential_base >= 1.0) {
                return Err(anyhow::anyhow!(
                    "retry policy '{}': exponential_base must be a finite number >= 1",
                    name
                ));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resilience::RetryStrategy;
    use std::io::Write;
    use std::time::Duration;

    const SAMPLE: &str = r#"
host_version = "1.2.0"

[logging]
filter = "debug"

[modules]
disabled_modules = ["ops"]

[modules.module_configs.ops]
prefix = "!"

[circuit_breakers.payment_api]
failure_threshold = 2
recovery_timeout_ms = 10000

[retry_policies.database]
max_attempts = 5
base_delay_ms = 100
max_delay_ms = 1000
strategy = "fixed"
"#;

    #[test]
    fn test_load_toml() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();

        let config = PlatformConfig::from_file(file.path()).unwrap();
        config.validate().unwrap();

        assert_eq!(config.host_version, "1.2.0");
        assert_eq!(config.logging.filter.as_deref(), Some("debug"));
        assert!(config.modules.is_disabled("ops"));
        assert_eq!(
            config.modules.module_configs["ops"]["prefix"],
            serde_json::json!("!")
        );

        let breaker = &config.circuit_breakers["payment_api"];
        assert_eq!(breaker.failure_threshold, 2);
        assert_eq!(breaker.recovery_timeout, Duration::from_secs(10));
        assert_eq!(breaker.success_threshold, 3);

        let policy = config.retry_policy("database");
        assert_eq!(policy.max_attempts, 5);
        assert_eq!(policy.strategy, RetryStrategy::Fixed);
        assert_eq!(config.retry_policy("payments"), RetryPolicy::payments());
    }

    #[test]
    fn test_json_round_trip_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("platform.json");

        let mut config = PlatformConfig::default();
        config
            .circuit_breakers
            .insert("database".to_string(), CircuitBreakerConfig::database());
        config.to_json_file(&path).unwrap();

        let loaded = PlatformConfig::from_file(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_validate_rejects_bad_retry_bounds() {
        let mut config = PlatformConfig::default();
        config.retry_policies.insert(
            "broken".to_string(),
            RetryPolicy::new(3, Duration::from_secs(10), Duration::from_secs(1)),
        );
        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("broken"), "{}", err);
    }

    #[test]
    fn test_validate_rejects_zero_threshold() {
        let mut config = PlatformConfig::default();
        config.circuit_breakers.insert(
            "svc".to_string(),
            CircuitBreakerConfig::new(0, Duration::from_secs(1), 1),
        );
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(PlatformConfig::from_file(&dir.path().join("absent.toml")).is_err());
    }
}
