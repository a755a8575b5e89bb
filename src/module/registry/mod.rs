//! Module registry and discovery
//!
//! Holds instantiated modules keyed by name (in discovery order), the record
//! of modules that failed at any phase, and the dependency resolver.

pub mod catalog;
pub mod dependencies;
pub mod discovery;

pub use catalog::{ModuleCatalog, ModuleFactory};
pub use dependencies::DependencyGraph;
pub use discovery::{DiscoveryReport, ModuleDiscovery};

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::{Mutex as AsyncMutex, MutexGuard};
use tracing::debug;

use crate::module::traits::{Module, ModuleDescriptor, ModuleError, ModuleSettings, ModuleState};

/// A registered module together with its lifecycle state
///
/// The descriptor is captured once at registration; everything mutable sits
/// behind a per-module lock so enable/disable from concurrent request paths
/// cannot lose updates.
pub struct ModuleEntry {
    descriptor: ModuleDescriptor,
    slot: AsyncMutex<ModuleSlot>,
}

/// Mutable part of a registered module
pub struct ModuleSlot {
    /// The module implementation
    pub module: Box<dyn Module>,
    /// Current lifecycle state
    pub state: ModuleState,
    /// Configuration supplied at initialization
    pub config: ModuleSettings,
    /// Whether `initialize` ever succeeded (stays set after shutdown)
    pub reached_initialized: bool,
}

impl ModuleEntry {
    fn new(descriptor: ModuleDescriptor, module: Box<dyn Module>) -> Self {
        Self {
            descriptor,
            slot: AsyncMutex::new(ModuleSlot {
                module,
                state: ModuleState::Discovered,
                config: ModuleSettings::new(),
                reached_initialized: false,
            }),
        }
    }

    /// Module name
    pub fn name(&self) -> &str {
        &self.descriptor.name
    }

    /// Descriptor captured at registration
    pub fn descriptor(&self) -> &ModuleDescriptor {
        &self.descriptor
    }

    /// Lock the mutable part of the module
    pub async fn lock(&self) -> MutexGuard<'_, ModuleSlot> {
        self.slot.lock().await
    }

    /// Current lifecycle state
    pub async fn state(&self) -> ModuleState {
        self.slot.lock().await.state
    }
}

/// Name-keyed table of modules plus the failure record
#[derive(Default)]
pub struct ModuleRegistry {
    entries: Vec<Arc<ModuleEntry>>,
    index: HashMap<String, usize>,
    failed: Mutex<BTreeMap<String, String>>,
}

impl ModuleRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a module under its descriptor name
    ///
    /// Fails if the name is already taken; the existing module is kept.
    pub fn insert(
        &mut self,
        descriptor: ModuleDescriptor,
        module: Box<dyn Module>,
    ) -> Result<Arc<ModuleEntry>, ModuleError> {
        if self.index.contains_key(&descriptor.name) {
            return Err(ModuleError::DiscoveryError(format!(
                "Module {} is already registered",
                descriptor.name
            )));
        }

        let name = descriptor.name.clone();
        let entry = Arc::new(ModuleEntry::new(descriptor, module));
        self.index.insert(name.clone(), self.entries.len());
        self.entries.push(Arc::clone(&entry));
        debug!("Registered module {}", name);
        Ok(entry)
    }

    /// Whether a module with this name is registered
    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Look up a module by name
    pub fn get(&self, name: &str) -> Option<&Arc<ModuleEntry>> {
        self.index.get(name).map(|&i| &self.entries[i])
    }

    /// Modules in discovery order
    pub fn iter(&self) -> impl Iterator<Item = &Arc<ModuleEntry>> {
        self.entries.iter()
    }

    /// Module names in discovery order
    pub fn names(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.name().to_string()).collect()
    }

    /// Number of registered modules
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no modules are registered
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Record a failure for a module (or discovery candidate); later failures overwrite earlier ones
    pub fn record_failure(&self, name: &str, error: impl ToString) {
        self.failed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.to_string(), error.to_string());
    }

    /// Recorded failure for a name, if any
    pub fn failure(&self, name: &str) -> Option<String> {
        self.failed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    /// Snapshot of all recorded failures
    pub fn failures(&self) -> BTreeMap<String, String> {
        self.failed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}
