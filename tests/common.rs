//! Shared fixtures for integration tests
#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use dispatch_platform::module::{
    CommandHost, Module, ModuleCatalog, ModuleDescriptor, ModuleError, ModuleSettings,
};

/// Ordered record of hook calls across modules ("name:hook")
#[derive(Debug, Clone, Default)]
pub struct EventLog(Arc<Mutex<Vec<String>>>);

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, event: String) {
        self.0.lock().unwrap().push(event);
    }

    pub fn events(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    /// Events for one hook, module names only, in call order
    pub fn modules_for(&self, hook: &str) -> Vec<String> {
        let suffix = format!(":{}", hook);
        self.events()
            .into_iter()
            .filter_map(|e| e.strip_suffix(&suffix).map(str::to_string))
            .collect()
    }

    pub fn count(&self, event: &str) -> usize {
        self.events().iter().filter(|e| *e == event).count()
    }
}

/// How a test module's hook should behave
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Behavior {
    #[default]
    Succeed,
    Fail,
    Panic,
}

/// Configurable module for lifecycle tests
#[derive(Debug, Clone)]
pub struct TestModule {
    pub name: String,
    pub version: String,
    pub min_host_version: Option<String>,
    pub dependencies: Vec<String>,
    pub commands: Vec<(String, String)>,
    pub init: Behavior,
    pub register: Behavior,
    pub enable: Behavior,
    pub shutdown: Behavior,
    pub log: EventLog,
}

impl TestModule {
    pub fn new(name: &str, log: &EventLog) -> Self {
        Self {
            name: name.to_string(),
            version: "1.0.0".to_string(),
            min_host_version: None,
            dependencies: Vec::new(),
            commands: Vec::new(),
            init: Behavior::Succeed,
            register: Behavior::Succeed,
            enable: Behavior::Succeed,
            shutdown: Behavior::Succeed,
            log: log.clone(),
        }
    }

    pub fn version(mut self, version: &str) -> Self {
        self.version = version.to_string();
        self
    }

    pub fn requires_host(mut self, version: &str) -> Self {
        self.min_host_version = Some(version.to_string());
        self
    }

    pub fn depends_on(mut self, dependency: &str) -> Self {
        self.dependencies.push(dependency.to_string());
        self
    }

    pub fn with_command(mut self, command: &str) -> Self {
        self.commands
            .push((command.to_string(), format!("{} command", command)));
        self
    }

    pub fn init(mut self, behavior: Behavior) -> Self {
        self.init = behavior;
        self
    }

    pub fn register(mut self, behavior: Behavior) -> Self {
        self.register = behavior;
        self
    }

    pub fn enable(mut self, behavior: Behavior) -> Self {
        self.enable = behavior;
        self
    }

    pub fn shutdown(mut self, behavior: Behavior) -> Self {
        self.shutdown = behavior;
        self
    }

    fn record(&self, hook: &str) {
        self.log.push(format!("{}:{}", self.name, hook));
    }

    fn outcome(&self, hook: &str, behavior: Behavior) -> Result<(), ModuleError> {
        self.record(hook);
        match behavior {
            Behavior::Succeed => Ok(()),
            Behavior::Fail => Err(ModuleError::HookFailed(format!(
                "{} {} failed",
                self.name, hook
            ))),
            Behavior::Panic => panic!("{} {} exploded", self.name, hook),
        }
    }
}

#[async_trait]
impl Module for TestModule {
    fn descriptor(&self) -> ModuleDescriptor {
        let mut descriptor = ModuleDescriptor::new(self.name.clone(), self.version.clone())
            .with_description(format!("{} test module", self.name));
        for dep in &self.dependencies {
            descriptor = descriptor.depends_on(dep.clone());
        }
        if let Some(min) = &self.min_host_version {
            descriptor = descriptor.with_min_host_version(min.clone());
        }
        descriptor
    }

    async fn initialize(&mut self, _config: &ModuleSettings) -> Result<(), ModuleError> {
        self.record("initialize");
        match self.init {
            Behavior::Succeed => Ok(()),
            Behavior::Fail => Err(ModuleError::InitializationError(format!(
                "{} could not start",
                self.name
            ))),
            Behavior::Panic => panic!("{} initialize exploded", self.name),
        }
    }

    fn register_handlers(&self, host: &mut dyn CommandHost) -> Result<(), ModuleError> {
        self.outcome("register", self.register)?;
        for (command, description) in &self.commands {
            host.add_command(&self.name, command, description)?;
        }
        Ok(())
    }

    fn commands(&self) -> HashMap<String, String> {
        self.commands.iter().cloned().collect()
    }

    async fn on_enable(&mut self) -> Result<(), ModuleError> {
        self.outcome("enable", self.enable)
    }

    async fn on_disable(&mut self) -> Result<(), ModuleError> {
        self.outcome("disable", Behavior::Succeed)
    }

    async fn on_shutdown(&mut self) -> Result<(), ModuleError> {
        self.outcome("shutdown", self.shutdown)
    }
}

/// Catalog listing the given modules in order
pub fn catalog_of(modules: Vec<TestModule>) -> ModuleCatalog {
    modules.into_iter().fold(ModuleCatalog::new(), |catalog, module| {
        let label = format!("test::{}", module.name);
        catalog.with(label, move || module.clone())
    })
}

/// Simple retryable error for resilience tests
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transient(pub String);

impl std::fmt::Display for Transient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "transient: {}", self.0)
    }
}

impl std::error::Error for Transient {}

impl dispatch_platform::resilience::Retryable for Transient {}
