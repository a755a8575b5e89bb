//! Modules compiled into the platform

pub mod ops;

pub use ops::OpsModule;

use std::sync::Arc;

use crate::module::registry::ModuleCatalog;
use crate::resilience::CircuitBreakerRegistry;

/// Catalog of the built-in modules
pub fn catalog(breakers: Arc<CircuitBreakerRegistry>) -> ModuleCatalog {
    ModuleCatalog::new().with("builtin::ops", move || OpsModule::new(Arc::clone(&breakers)))
}
