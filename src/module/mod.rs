//! Module system for the dispatch platform
//!
//! Optional features ship as modules: self-describing units that declare
//! their dependencies, receive configuration, bind commands into the host and
//! react to enable/disable/shutdown.
//!
//! ## Architecture
//!
//! - **Catalog**: modules are listed at build time and instantiated by discovery
//! - **Dependency order**: initialization follows declared dependencies; a cycle is the only fatal error
//! - **Failure isolation**: a failing or panicking module is recorded and the rest carry on
//! - **Concurrent control**: enable/disable after startup go through per-module locks

pub mod builtin;
pub mod host;
pub mod loader;
pub mod manager;
pub mod registry;
pub mod traits;
pub mod validation;

pub use host::{CommandBinding, CommandTable};
pub use manager::{ModuleManager, ModuleStatus, PhaseReport, StartupReport};
pub use registry::{DiscoveryReport, ModuleCatalog, ModuleRegistry};
pub use traits::{
    CommandHost, Module, ModuleDescriptor, ModuleError, ModuleSettings, ModuleState,
};
