//! Operations module
//!
//! Exposes read-only operator commands: module status and circuit breaker
//! states. Settings:
//! - `prefix` (string, optional): prepended to every command name

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

use crate::module::traits::{CommandHost, Module, ModuleDescriptor, ModuleError, ModuleSettings};
use crate::resilience::CircuitBreakerRegistry;

/// Module name
pub const OPS_MODULE: &str = "ops";

const COMMANDS: [(&str, &str); 2] = [
    ("status", "Show module status"),
    ("breakers", "Show circuit breaker states"),
];

/// Built-in operator commands
pub struct OpsModule {
    breakers: Arc<CircuitBreakerRegistry>,
    prefix: String,
}

impl OpsModule {
    pub fn new(breakers: Arc<CircuitBreakerRegistry>) -> Self {
        Self {
            breakers,
            prefix: String::new(),
        }
    }

    /// Circuit breaker states as pretty JSON, the body of the `breakers` command
    pub fn breaker_report(&self) -> Result<String, ModuleError> {
        Ok(serde_json::to_string_pretty(&self.breakers.all_states())?)
    }

    fn command_name(&self, command: &str) -> String {
        format!("{}{}", self.prefix, command)
    }
}

#[async_trait]
impl Module for OpsModule {
    fn descriptor(&self) -> ModuleDescriptor {
        ModuleDescriptor::new(OPS_MODULE, crate::VERSION)
            .with_description("Operator status and circuit breaker commands")
            .with_author("dispatch-platform")
    }

    async fn initialize(&mut self, config: &ModuleSettings) -> Result<(), ModuleError> {
        self.prefix = match config.get("prefix") {
            None | Some(serde_json::Value::Null) => String::new(),
            Some(serde_json::Value::String(prefix)) => prefix.clone(),
            Some(other) => {
                return Err(ModuleError::ConfigError(format!(
                    "prefix must be a string, got {}",
                    other
                )))
            }
        };
        debug!("Ops module using command prefix {:?}", self.prefix);
        Ok(())
    }

    fn register_handlers(&self, host: &mut dyn CommandHost) -> Result<(), ModuleError> {
        for (command, description) in COMMANDS {
            host.add_command(OPS_MODULE, &self.command_name(command), description)?;
        }
        Ok(())
    }

    fn commands(&self) -> HashMap<String, String> {
        COMMANDS
            .iter()
            .map(|(command, description)| (self.command_name(command), description.to_string()))
            .collect()
    }

    async fn on_enable(&mut self) -> Result<(), ModuleError> {
        info!("Ops commands available");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module::host::CommandTable;

    #[tokio::test]
    async fn test_prefix_applies_to_commands() {
        let mut module = OpsModule::new(Arc::new(CircuitBreakerRegistry::new()));
        let mut settings = ModuleSettings::new();
        settings.insert("prefix".to_string(), serde_json::json!("ops_"));
        module.initialize(&settings).await.unwrap();

        let mut table = CommandTable::new();
        module.register_handlers(&mut table).unwrap();
        assert_eq!(table.commands_of(OPS_MODULE), vec!["ops_breakers", "ops_status"]);
        assert!(module.commands().contains_key("ops_status"));
    }

    #[tokio::test]
    async fn test_non_string_prefix_is_rejected() {
        let mut module = OpsModule::new(Arc::new(CircuitBreakerRegistry::new()));
        let mut settings = ModuleSettings::new();
        settings.insert("prefix".to_string(), serde_json::json!(3));
        assert!(matches!(
            module.initialize(&settings).await,
            Err(ModuleError::ConfigError(_))
        ));
    }

    #[test]
    fn test_breaker_report_lists_breakers() {
        let breakers = Arc::new(CircuitBreakerRegistry::new());
        breakers.database();
        let module = OpsModule::new(breakers);
        let report = module.breaker_report().unwrap();
        assert!(report.contains("\"database\""));
    }
}
