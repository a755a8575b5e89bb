//! Module system traits and interfaces
//!
//! Defines the contract every feature module implements and the interface
//! modules use to bind their commands into the host dispatch framework.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

/// Opaque per-module configuration, as supplied by the configuration source
pub type ModuleSettings = HashMap<String, serde_json::Value>;

/// Module lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModuleState {
    /// Instantiated and registered, not yet initialized
    Discovered,
    /// `initialize` succeeded
    Initialized,
    /// Serving commands
    Enabled,
    /// Initialized but not serving commands
    Disabled,
    /// Torn down; terminal
    ShutDown,
}

impl ModuleState {
    /// Whether the module has passed initialization and has not been shut down
    pub fn is_initialized(self) -> bool {
        matches!(
            self,
            ModuleState::Initialized | ModuleState::Enabled | ModuleState::Disabled
        )
    }
}

impl fmt::Display for ModuleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ModuleState::Discovered => "discovered",
            ModuleState::Initialized => "initialized",
            ModuleState::Enabled => "enabled",
            ModuleState::Disabled => "disabled",
            ModuleState::ShutDown => "shut_down",
        };
        f.write_str(s)
    }
}

/// Module descriptor describing module identity and requirements
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleDescriptor {
    /// Module name (unique identifier)
    pub name: String,
    /// Module version (semantic versioning)
    pub version: String,
    /// Human-readable description
    pub description: String,
    /// Module author
    #[serde(default)]
    pub author: String,
    /// Names of modules that must be initialized before this one
    #[serde(default)]
    pub dependencies: Vec<String>,
    /// Minimum host version this module runs on
    #[serde(default = "default_min_host_version")]
    pub min_host_version: String,
}

fn default_min_host_version() -> String {
    "0.1.0".to_string()
}

impl ModuleDescriptor {
    /// Create a descriptor with no dependencies
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            description: String::new(),
            author: String::new(),
            dependencies: Vec::new(),
            min_host_version: default_min_host_version(),
        }
    }

    /// Set the description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Set the author
    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = author.into();
        self
    }

    /// Declare a dependency on another module (duplicates are ignored)
    pub fn depends_on(mut self, dependency: impl Into<String>) -> Self {
        let dependency = dependency.into();
        if !self.dependencies.contains(&dependency) {
            self.dependencies.push(dependency);
        }
        self
    }

    /// Require a minimum host version
    pub fn with_min_host_version(mut self, version: impl Into<String>) -> Self {
        self.min_host_version = version.into();
        self
    }
}

/// Host dispatch framework as seen by modules
///
/// Modules bind their commands here during the registration phase. The
/// framework behind it (message routing, callback dispatch) is external.
pub trait CommandHost: Send {
    /// Bind a command owned by `owner`
    fn add_command(
        &mut self,
        owner: &str,
        command: &str,
        description: &str,
    ) -> Result<(), ModuleError>;
}

/// Module trait that all feature modules must implement
///
/// Lifecycle state is owned by the [`ModuleManager`](crate::module::ModuleManager);
/// implementations only provide behaviour for each phase.
#[async_trait]
pub trait Module: Send + Sync {
    /// Get module descriptor
    fn descriptor(&self) -> ModuleDescriptor;

    /// Initialize the module with its configuration
    ///
    /// Called once, in dependency order. Returning an error marks the module
    /// as failed; it will not be registered or enabled.
    async fn initialize(&mut self, config: &ModuleSettings) -> Result<(), ModuleError>;

    /// Bind this module's commands and events into the host
    fn register_handlers(&self, host: &mut dyn CommandHost) -> Result<(), ModuleError>;

    /// Commands this module exposes (name -> description)
    fn commands(&self) -> HashMap<String, String>;

    /// Hook run before the module is marked enabled
    async fn on_enable(&mut self) -> Result<(), ModuleError> {
        Ok(())
    }

    /// Hook run before the module is marked disabled
    async fn on_disable(&mut self) -> Result<(), ModuleError> {
        Ok(())
    }

    /// Hook run during shutdown, after the module has been disabled
    async fn on_shutdown(&mut self) -> Result<(), ModuleError> {
        Ok(())
    }
}

/// Module system errors
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ModuleError {
    #[error("Module discovery failed: {0}")]
    DiscoveryError(String),

    #[error("Circular dependency detected among modules: {}", .cycle.join(", "))]
    DependencyError {
        /// Modules lying on at least one dependency cycle
        cycle: Vec<String>,
        /// Every module that could not be ordered (cycle members and their dependents)
        unresolved: Vec<String>,
    },

    #[error("Module initialization failed: {0}")]
    InitializationError(String),

    #[error("Handler registration failed: {0}")]
    HandlerRegistrationError(String),

    #[error("Module {module} cannot go from {from} to {to}")]
    InvalidTransition {
        module: String,
        from: ModuleState,
        to: ModuleState,
    },

    #[error("Module not found: {0}")]
    ModuleNotFound(String),

    #[error("Module version incompatible: {0}")]
    VersionIncompatible(String),

    #[error("Module hook failed: {0}")]
    HookFailed(String),

    #[error("Module panicked: {0}")]
    Panicked(String),

    #[error("Module configuration error: {0}")]
    ConfigError(String),
}

impl From<serde_json::Error> for ModuleError {
    fn from(e: serde_json::Error) -> Self {
        ModuleError::ConfigError(e.to_string())
    }
}

impl From<toml::de::Error> for ModuleError {
    fn from(e: toml::de::Error) -> Self {
        ModuleError::ConfigError(e.to_string())
    }
}
