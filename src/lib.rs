//! Dispatch Platform - extensibility and resiliency core of a message-dispatch bot
//!
//! The bot routes user messages to an operator group and talks to a
//! persistence layer and a payment processor. This crate provides the parts
//! underneath those features:
//!
//! 1. [`module`]: dependency-aware module loading with an explicit lifecycle
//! 2. [`resilience`]: circuit breakers and a retry executor for external calls
//! 3. status snapshots of both for an operations surface
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use dispatch_platform::module::{builtin, CommandTable, ModuleManager};
//! use dispatch_platform::resilience::CircuitBreakerRegistry;
//! use std::sync::Arc;
//!
//! # async fn demo() -> anyhow::Result<()> {
//! let breakers = Arc::new(CircuitBreakerRegistry::new());
//! let mut manager = ModuleManager::new();
//! let mut commands = CommandTable::new();
//!
//! manager.startup(&builtin::catalog(breakers), &mut commands).await?;
//! println!("{:?}", manager.get_status().await);
//! manager.shutdown_all().await;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod module;
pub mod resilience;
pub mod utils;

pub use config::{LoggingConfig, ModuleSystemConfig, PlatformConfig};

/// Version modules' `min_host_version` is checked against by default
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
