//! Module manager for orchestrating all modules
//!
//! Drives every module through discovery, initialization, handler
//! registration, enable/disable and shutdown. Startup phases run
//! sequentially in dependency order; failures are isolated per module and
//! surface only through [`ModuleManager::get_status`]. The one error that
//! escapes a startup phase is a dependency cycle.

use futures::FutureExt;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::config::ModuleSystemConfig;
use crate::module::loader::ModuleLoader;
use crate::module::registry::{
    DependencyGraph, DiscoveryReport, ModuleCatalog, ModuleDiscovery, ModuleEntry, ModuleRegistry,
};
use crate::module::traits::{CommandHost, ModuleError, ModuleSettings, ModuleState};
use crate::utils::panic_message;

/// Status snapshot of a single module
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ModuleStatus {
    /// Module is registered and reached initialization at some point
    Loaded {
        version: String,
        state: ModuleState,
        initialized: bool,
        enabled: bool,
        description: String,
        dependencies: Vec<String>,
        /// Most recent isolated failure (registration, enable), if any
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
    /// Module never got past discovery or initialization
    Failed {
        #[serde(skip_serializing_if = "Option::is_none")]
        version: Option<String>,
        description: String,
        error: String,
    },
}

impl ModuleStatus {
    /// Whether this entry describes a failed module
    pub fn is_failed(&self) -> bool {
        matches!(self, ModuleStatus::Failed { .. })
    }

    /// Whether the module is currently initialized (or later)
    pub fn is_initialized(&self) -> bool {
        matches!(self, ModuleStatus::Loaded { initialized: true, .. })
    }

    /// Whether the module is currently enabled
    pub fn is_enabled(&self) -> bool {
        matches!(self, ModuleStatus::Loaded { enabled: true, .. })
    }

    /// Recorded error text, if any
    pub fn error(&self) -> Option<&str> {
        match self {
            ModuleStatus::Loaded { error, .. } => error.as_deref(),
            ModuleStatus::Failed { error, .. } => Some(error),
        }
    }
}

/// Outcome of a batch lifecycle phase
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PhaseReport {
    /// Modules the phase succeeded for, in processing order
    pub succeeded: Vec<String>,
    /// Modules the phase did not apply to
    pub skipped: Vec<String>,
    /// Modules the phase failed for, with error text
    pub failed: BTreeMap<String, String>,
}

/// Outcome of a full startup
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StartupReport {
    pub discovery: DiscoveryReport,
    pub load_order: Vec<String>,
    pub initialization: PhaseReport,
    pub registration: PhaseReport,
    pub enablement: PhaseReport,
}

/// Module manager coordinates all registered modules
pub struct ModuleManager {
    /// Registered modules and failure record
    registry: ModuleRegistry,
    /// Discovery pass (holds the host version modules are checked against)
    discovery: ModuleDiscovery,
    /// Module system configuration (per-module settings, disabled list)
    config: ModuleSystemConfig,
    /// Load order computed by the last initialization
    load_order: Vec<String>,
}

impl ModuleManager {
    /// Create a new module manager with default configuration
    pub fn new() -> Self {
        Self::with_config(ModuleSystemConfig::default())
    }

    /// Create a new module manager with the given configuration
    pub fn with_config(config: ModuleSystemConfig) -> Self {
        Self::with_host_version(config, crate::VERSION)
    }

    /// Create a manager that checks module requirements against a specific host version
    pub fn with_host_version(config: ModuleSystemConfig, host_version: impl Into<String>) -> Self {
        Self {
            registry: ModuleRegistry::new(),
            discovery: ModuleDiscovery::new(host_version),
            config,
            load_order: Vec::new(),
        }
    }

    /// Registered modules
    pub fn registry(&self) -> &ModuleRegistry {
        &self.registry
    }

    /// Look up a registered module
    pub fn get_module(&self, name: &str) -> Option<Arc<ModuleEntry>> {
        self.registry.get(name).cloned()
    }

    /// Current state of a registered module
    pub async fn module_state(&self, name: &str) -> Option<ModuleState> {
        match self.registry.get(name) {
            Some(entry) => Some(entry.state().await),
            None => None,
        }
    }

    /// Load order computed by the last `initialize_all`
    pub fn last_load_order(&self) -> &[String] {
        &self.load_order
    }

    /// Discover modules from a compiled catalog
    pub fn discover(&mut self, catalog: &ModuleCatalog) -> DiscoveryReport {
        self.discovery.discover(catalog, &mut self.registry)
    }

    /// Compute the dependency-respecting load order
    pub fn load_order(&self) -> Result<Vec<String>, ModuleError> {
        DependencyGraph::from_registry(&self.registry).load_order()
    }

    /// Set configuration for a module
    ///
    /// Takes effect at the module's next initialization; an already
    /// registered module also has its stored settings replaced.
    pub async fn set_module_config(&mut self, name: &str, settings: ModuleSettings) {
        self.config
            .module_configs
            .insert(name.to_string(), settings.clone());

        if let Some(entry) = self.registry.get(name) {
            entry.lock().await.config = settings;
        }
    }

    /// Settings a module would receive at initialization
    pub fn settings_for(&self, name: &str) -> ModuleSettings {
        ModuleLoader::resolve_settings(name, &self.config)
    }

    /// Run discovery, initialization, handler registration and enablement
    pub async fn startup(
        &mut self,
        catalog: &ModuleCatalog,
        host: &mut dyn CommandHost,
    ) -> Result<StartupReport, ModuleError> {
        let discovery = self.discover(catalog);
        let initialization = self.initialize_all().await?;
        let registration = self.register_handlers(host).await;
        let enablement = self.enable_all().await;

        Ok(StartupReport {
            discovery,
            load_order: self.load_order.clone(),
            initialization,
            registration,
            enablement,
        })
    }

    /// Initialize every registered module in dependency order
    ///
    /// Every module is attempted, including those whose dependencies failed.
    /// Only a dependency cycle is returned as an error.
    pub async fn initialize_all(&mut self) -> Result<PhaseReport, ModuleError> {
        let mut report = PhaseReport::default();

        if self.registry.is_empty() {
            info!("No modules to initialize");
            return Ok(report);
        }

        let order = self.load_order().map_err(|e| {
            error!("Module dependency error: {}", e);
            e
        })?;
        self.load_order = order.clone();
        info!("Initializing modules in order: {:?}", order);

        for name in &order {
            match self.initialize_module(name).await {
                Ok(true) => report.succeeded.push(name.clone()),
                Ok(false) => report.skipped.push(name.clone()),
                Err(e) => {
                    report.failed.insert(name.clone(), e.to_string());
                }
            }
        }

        info!(
            "Initialized {} modules ({} failed)",
            report.succeeded.len(),
            report.failed.len()
        );
        Ok(report)
    }

    /// Initialize one module; `Ok(false)` if it was already initialized
    async fn initialize_module(&self, name: &str) -> Result<bool, ModuleError> {
        let entry = self
            .registry
            .get(name)
            .cloned()
            .ok_or_else(|| ModuleError::ModuleNotFound(name.to_string()))?;
        let mut slot = entry.lock().await;

        match slot.state {
            ModuleState::Discovered => {}
            ModuleState::ShutDown => {
                return Err(ModuleError::InvalidTransition {
                    module: name.to_string(),
                    from: ModuleState::ShutDown,
                    to: ModuleState::Initialized,
                });
            }
            _ => {
                debug!("Module {} already initialized", name);
                return Ok(false);
            }
        }

        let settings = self.settings_for(name);
        let result = guarded(slot.module.initialize(&settings)).await;
        slot.config = settings;

        match result {
            Ok(()) => {
                slot.state = ModuleState::Initialized;
                slot.reached_initialized = true;
                info!("Initialized module: {}", name);
                Ok(true)
            }
            Err(e) => {
                let e = match e {
                    ModuleError::InitializationError(_) | ModuleError::Panicked(_) => e,
                    other => ModuleError::InitializationError(other.to_string()),
                };
                error!("Failed to initialize module {}: {}", name, e);
                self.registry.record_failure(name, &e);
                Err(e)
            }
        }
    }

    /// Bind handlers for every initialized module into the host
    ///
    /// Modules that never initialized are skipped with a warning.
    pub async fn register_handlers(&self, host: &mut dyn CommandHost) -> PhaseReport {
        let mut report = PhaseReport::default();

        for entry in self.registry.iter() {
            let name = entry.name();
            let slot = entry.lock().await;

            if !slot.state.is_initialized() {
                warn!(
                    "Skipping handler registration for uninitialized module: {} ({})",
                    name, slot.state
                );
                report.skipped.push(name.to_string());
                continue;
            }

            let result = catch_unwind(AssertUnwindSafe(|| slot.module.register_handlers(&mut *host)))
                .unwrap_or_else(|payload| Err(ModuleError::Panicked(panic_message(payload.as_ref()))));

            match result {
                Ok(()) => {
                    info!("Registered handlers for module: {}", name);
                    report.succeeded.push(name.to_string());
                }
                Err(e) => {
                    let e = match e {
                        ModuleError::HandlerRegistrationError(_) => e,
                        other => ModuleError::HandlerRegistrationError(other.to_string()),
                    };
                    error!("Failed to register handlers for module {}: {}", name, e);
                    self.registry.record_failure(name, &e);
                    report.failed.insert(name.to_string(), e.to_string());
                }
            }
        }

        info!("Registered handlers for {} modules", report.succeeded.len());
        report
    }

    /// Enable every initialized module not listed as disabled in configuration
    pub async fn enable_all(&self) -> PhaseReport {
        let mut report = PhaseReport::default();

        for entry in self.registry.iter() {
            let name = entry.name();

            if self.config.is_disabled(name) {
                info!("Module {} is disabled by configuration", name);
                report.skipped.push(name.to_string());
                continue;
            }

            if !entry.state().await.is_initialized() {
                report.skipped.push(name.to_string());
                continue;
            }

            match self.enable_entry(entry).await {
                Ok(()) => report.succeeded.push(name.to_string()),
                Err(e) => {
                    self.registry.record_failure(name, &e);
                    report.failed.insert(name.to_string(), e.to_string());
                }
            }
        }

        info!("Enabled {} modules", report.succeeded.len());
        report
    }

    /// Enable a module
    ///
    /// Valid from `Initialized` or `Disabled`; enabling an enabled module is a
    /// no-op. Safe to call while other modules are serving traffic.
    pub async fn enable(&self, name: &str) -> Result<(), ModuleError> {
        let entry = self
            .registry
            .get(name)
            .ok_or_else(|| ModuleError::ModuleNotFound(name.to_string()))?;
        self.enable_entry(entry).await
    }

    async fn enable_entry(&self, entry: &ModuleEntry) -> Result<(), ModuleError> {
        let name = entry.name();
        let mut slot = entry.lock().await;

        match slot.state {
            ModuleState::Initialized | ModuleState::Disabled => {}
            ModuleState::Enabled => {
                debug!("Module {} already enabled", name);
                return Ok(());
            }
            from => {
                error!("Cannot enable module {}: {}", name, from);
                return Err(ModuleError::InvalidTransition {
                    module: name.to_string(),
                    from,
                    to: ModuleState::Enabled,
                });
            }
        }

        match guarded(slot.module.on_enable()).await {
            Ok(()) => {
                slot.state = ModuleState::Enabled;
                info!("Module {} enabled", name);
                Ok(())
            }
            Err(e) => {
                error!("Failed to enable module {}: {}", name, e);
                Err(e)
            }
        }
    }

    /// Disable a module
    ///
    /// Valid from `Enabled`; disabling a disabled module is a no-op.
    pub async fn disable(&self, name: &str) -> Result<(), ModuleError> {
        let entry = self
            .registry
            .get(name)
            .ok_or_else(|| ModuleError::ModuleNotFound(name.to_string()))?;
        let mut slot = entry.lock().await;

        match slot.state {
            ModuleState::Enabled => {}
            ModuleState::Disabled => {
                debug!("Module {} already disabled", name);
                return Ok(());
            }
            from => {
                return Err(ModuleError::InvalidTransition {
                    module: name.to_string(),
                    from,
                    to: ModuleState::Disabled,
                });
            }
        }

        match guarded(slot.module.on_disable()).await {
            Ok(()) => {
                slot.state = ModuleState::Disabled;
                info!("Module {} disabled", name);
                Ok(())
            }
            Err(e) => {
                error!("Failed to disable module {}: {}", name, e);
                Err(e)
            }
        }
    }

    /// Shut down every module, whatever its state
    ///
    /// Dependents go first (reverse load order). Each module is disabled if
    /// enabled, its shutdown hook runs, and it is marked `ShutDown` even if a
    /// hook failed. Errors are logged and returned in the report, never raised.
    pub async fn shutdown_all(&self) -> PhaseReport {
        info!("Shutting down all modules");
        let mut report = PhaseReport::default();

        let order: Vec<String> = if self.load_order.len() == self.registry.len() {
            self.load_order.iter().rev().cloned().collect()
        } else {
            self.registry.names().into_iter().rev().collect()
        };

        for name in order {
            let Some(entry) = self.registry.get(&name) else {
                continue;
            };
            let mut slot = entry.lock().await;

            if slot.state == ModuleState::ShutDown {
                report.skipped.push(name);
                continue;
            }

            let mut errors = Vec::new();

            if slot.state == ModuleState::Enabled {
                match guarded(slot.module.on_disable()).await {
                    Ok(()) => slot.state = ModuleState::Disabled,
                    Err(e) => errors.push(format!("disable: {}", e)),
                }
            }

            if let Err(e) = guarded(slot.module.on_shutdown()).await {
                errors.push(format!("shutdown: {}", e));
            }

            slot.state = ModuleState::ShutDown;

            if errors.is_empty() {
                info!("Module {} shut down", name);
                report.succeeded.push(name);
            } else {
                let text = errors.join("; ");
                warn!("Error shutting down module {}: {}", name, text);
                report.failed.insert(name, text);
            }
        }

        info!("All modules shut down");
        report
    }

    /// Commands of all enabled modules; later modules win on name collisions
    pub async fn get_all_commands(&self) -> HashMap<String, String> {
        let mut all_commands = HashMap::new();

        for entry in self.registry.iter() {
            let slot = entry.lock().await;
            if slot.state != ModuleState::Enabled {
                continue;
            }

            match catch_unwind(AssertUnwindSafe(|| slot.module.commands())) {
                Ok(commands) => all_commands.extend(commands),
                Err(payload) => error!(
                    "Error getting commands from module {}: {}",
                    entry.name(),
                    panic_message(payload.as_ref())
                ),
            }
        }

        all_commands
    }

    /// Status of every module, including candidates that failed before registration
    pub async fn get_status(&self) -> BTreeMap<String, ModuleStatus> {
        let mut status = BTreeMap::new();
        let mut failures = self.registry.failures();

        for entry in self.registry.iter() {
            let descriptor = entry.descriptor();
            let (state, reached_initialized) = {
                let slot = entry.lock().await;
                (slot.state, slot.reached_initialized)
            };
            let failure = failures.remove(entry.name());

            let module_status = match failure {
                Some(error) if !reached_initialized => ModuleStatus::Failed {
                    version: Some(descriptor.version.clone()),
                    description: descriptor.description.clone(),
                    error,
                },
                error => ModuleStatus::Loaded {
                    version: descriptor.version.clone(),
                    state,
                    initialized: state.is_initialized(),
                    enabled: state == ModuleState::Enabled,
                    description: descriptor.description.clone(),
                    dependencies: descriptor.dependencies.clone(),
                    error,
                },
            };
            status.insert(entry.name().to_string(), module_status);
        }

        for (name, error) in failures {
            status.insert(
                name,
                ModuleStatus::Failed {
                    version: None,
                    description: "Failed to load".to_string(),
                    error,
                },
            );
        }

        status
    }
}

impl Default for ModuleManager {
    fn default() -> Self {
        Self::new()
    }
}

/// Await a module hook, turning a panic into a module error
async fn guarded<F, T>(hook: F) -> Result<T, ModuleError>
where
    F: Future<Output = Result<T, ModuleError>>,
{
    AssertUnwindSafe(hook)
        .catch_unwind()
        .await
        .unwrap_or_else(|payload| Err(ModuleError::Panicked(panic_message(payload.as_ref()))))
}
