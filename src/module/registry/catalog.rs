//! Compiled module catalog
//!
//! The catalog is the static registration table modules are listed in at
//! build time. Discovery walks it in order; nothing is found by scanning
//! directories.

use crate::module::traits::{Module, ModuleError};

/// Constructor for a module instance
pub type ModuleFactory = Box<dyn Fn() -> Result<Box<dyn Module>, ModuleError> + Send + Sync>;

/// One catalog entry
pub struct CatalogEntry {
    /// Label used to report failures before the module's own name is known
    pub label: String,
    /// Module constructor
    pub factory: ModuleFactory,
}

/// Ordered list of module constructors
#[derive(Default)]
pub struct ModuleCatalog {
    entries: Vec<CatalogEntry>,
}

impl ModuleCatalog {
    /// Create an empty catalog
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a fallible constructor
    pub fn register<F>(mut self, label: impl Into<String>, factory: F) -> Self
    where
        F: Fn() -> Result<Box<dyn Module>, ModuleError> + Send + Sync + 'static,
    {
        self.entries.push(CatalogEntry {
            label: label.into(),
            factory: Box::new(factory),
        });
        self
    }

    /// Add an infallible constructor
    pub fn with<M, F>(self, label: impl Into<String>, factory: F) -> Self
    where
        M: Module + 'static,
        F: Fn() -> M + Send + Sync + 'static,
    {
        self.register(label, move || Ok(Box::new(factory()) as Box<dyn Module>))
    }

    /// Entries in registration order
    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the catalog is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
