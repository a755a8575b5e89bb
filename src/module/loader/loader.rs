//! Module configuration loader
//!
//! Settings for a module come from two places, merged in order:
//! inline `module_configs.<name>` tables, then `<config_dir>/<name>.toml`.

use std::path::Path;
use tracing::debug;

use crate::config::ModuleSystemConfig;
use crate::module::traits::{ModuleError, ModuleSettings};
use crate::utils::log_error;

/// Module configuration loader
pub struct ModuleLoader;

impl ModuleLoader {
    /// Settings for one module; file errors are logged and the inline settings kept
    pub fn resolve_settings(module_name: &str, config: &ModuleSystemConfig) -> ModuleSettings {
        let mut settings = config
            .module_configs
            .get(module_name)
            .cloned()
            .unwrap_or_default();

        if let Some(dir) = &config.config_dir {
            let path = Path::new(dir).join(format!("{}.toml", module_name));
            let context = format!("Ignoring config file for module {}", module_name);
            if let Some(file_settings) =
                log_error(|| Self::load_module_config(module_name, &path), &context)
            {
                settings.extend(file_settings);
            }
        }

        settings
    }

    /// Load module configuration from a TOML file
    ///
    /// A missing file yields empty settings.
    pub fn load_module_config<P: AsRef<Path>>(
        module_name: &str,
        config_path: P,
    ) -> Result<ModuleSettings, ModuleError> {
        let config_path = config_path.as_ref();
        if !config_path.exists() {
            debug!("No config file for module {}, using defaults", module_name);
            return Ok(ModuleSettings::new());
        }

        let contents = std::fs::read_to_string(config_path).map_err(|e| {
            ModuleError::ConfigError(format!(
                "Failed to read config file {}: {}",
                config_path.display(),
                e
            ))
        })?;

        let table: toml::Table = toml::from_str(&contents)?;
        Ok(table
            .into_iter()
            .map(|(key, value)| (key, Self::toml_to_json(value)))
            .collect())
    }

    /// Convert a TOML value into the JSON value modules receive
    fn toml_to_json(value: toml::Value) -> serde_json::Value {
        use serde_json::Value as Json;
        use toml::Value;

        match value {
            Value::String(s) => Json::String(s),
            Value::Integer(i) => Json::from(i),
            Value::Float(f) => serde_json::Number::from_f64(f)
                .map(Json::Number)
                .unwrap_or(Json::Null),
            Value::Boolean(b) => Json::Bool(b),
            Value::Datetime(dt) => Json::String(dt.to_string()),
            Value::Array(arr) => Json::Array(arr.into_iter().map(Self::toml_to_json).collect()),
            Value::Table(table) => Json::Object(
                table
                    .into_iter()
                    .map(|(k, v)| (k, Self::toml_to_json(v)))
                    .collect(),
            ),
        }
    }
}
