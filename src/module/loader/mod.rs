//! Module configuration loading
//!
//! Supplies each module its settings from inline configuration and optional
//! per-module TOML files.

pub mod loader;

pub use loader::ModuleLoader;
