//! Module discovery
//!
//! Instantiates every catalog entry and admits it into the registry.

use std::collections::BTreeMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use tracing::{debug, info, warn};

use crate::module::registry::catalog::{CatalogEntry, ModuleCatalog};
use crate::module::registry::ModuleRegistry;
use crate::module::traits::{Module, ModuleDescriptor, ModuleError};
use crate::module::validation::DescriptorValidator;
use crate::utils::panic_message;

/// Outcome of a discovery pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiscoveryReport {
    /// Number of modules admitted into the registry
    pub discovered: usize,
    /// Candidates skipped because their name was already taken
    pub skipped: Vec<String>,
    /// Candidates that failed (catalog label or module name -> error text)
    pub failed: BTreeMap<String, String>,
}

/// Module discovery over a compiled catalog
pub struct ModuleDiscovery {
    validator: DescriptorValidator,
}

impl ModuleDiscovery {
    /// Create a discovery pass validating against the given host version
    pub fn new(host_version: impl Into<String>) -> Self {
        Self {
            validator: DescriptorValidator::new(host_version),
        }
    }

    /// Discover all modules in the catalog
    ///
    /// Never fails as a whole: each candidate's failure is recorded in the
    /// registry and in the returned report, and discovery moves on.
    pub fn discover(&self, catalog: &ModuleCatalog, registry: &mut ModuleRegistry) -> DiscoveryReport {
        info!("Discovering modules from catalog ({} entries)", catalog.len());

        let mut report = DiscoveryReport::default();

        for entry in catalog.entries() {
            let (module, descriptor) = match self.instantiate(entry) {
                Ok(found) => found,
                Err((key, e)) => {
                    warn!("Failed to instantiate module {}: {}", key, e);
                    registry.record_failure(&key, &e);
                    report.failed.insert(key, e.to_string());
                    continue;
                }
            };

            if registry.contains(&descriptor.name) {
                warn!(
                    "Module {} already exists, skipping candidate {}",
                    descriptor.name, entry.label
                );
                report.skipped.push(entry.label.clone());
                continue;
            }

            let name = descriptor.name.clone();
            let version = descriptor.version.clone();
            match registry.insert(descriptor, module) {
                Ok(_) => {
                    report.discovered += 1;
                    info!("Discovered module: {} v{}", name, version);
                }
                Err(e) => {
                    warn!("Failed to register module {}: {}", name, e);
                    registry.record_failure(&name, &e);
                    report.failed.insert(name, e.to_string());
                }
            }
        }

        info!(
            "Discovered {} modules ({} failed, {} skipped)",
            report.discovered,
            report.failed.len(),
            report.skipped.len()
        );
        report
    }

    /// Build the module and read its descriptor; errors are keyed by the best name available
    fn instantiate(
        &self,
        entry: &CatalogEntry,
    ) -> Result<(Box<dyn Module>, ModuleDescriptor), (String, ModuleError)> {
        let module = catch_unwind(AssertUnwindSafe(|| (entry.factory)()))
            .map_err(|payload| {
                (
                    entry.label.clone(),
                    ModuleError::Panicked(panic_message(payload.as_ref())),
                )
            })?
            .map_err(|e| (entry.label.clone(), e))?;

        let descriptor = catch_unwind(AssertUnwindSafe(|| module.descriptor())).map_err(|payload| {
            (
                entry.label.clone(),
                ModuleError::DiscoveryError(format!(
                    "descriptor unavailable: {}",
                    panic_message(payload.as_ref())
                )),
            )
        })?;

        let key = if descriptor.name.is_empty() {
            entry.label.clone()
        } else {
            descriptor.name.clone()
        };
        self.validator
            .check(&descriptor)
            .map_err(|e| (key, e))?;

        debug!("Instantiated {} from catalog entry {}", descriptor.name, entry.label);
        Ok((module, descriptor))
    }
}

impl Default for ModuleDiscovery {
    fn default() -> Self {
        Self::new(crate::VERSION)
    }
}
