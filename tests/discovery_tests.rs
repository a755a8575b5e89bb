//! Module discovery tests
//!
//! Name collisions, factory failures, descriptor validation and how
//! candidates that never registered show up in status.

mod common;

use common::{catalog_of, EventLog, TestModule};
use dispatch_platform::config::ModuleSystemConfig;
use dispatch_platform::module::{Module, ModuleCatalog, ModuleError, ModuleManager};

fn failing_factory() -> Result<Box<dyn Module>, ModuleError> {
    Err(ModuleError::DiscoveryError("missing credentials".to_string()))
}

fn panicking_factory() -> Result<Box<dyn Module>, ModuleError> {
    panic!("factory blew up")
}

#[tokio::test]
async fn test_failures_are_recorded_and_discovery_continues() {
    let log = EventLog::new();
    let first = TestModule::new("dup", &log).version("1.0.0");
    let second = TestModule::new("dup", &log).version("2.0.0");
    let catalog = ModuleCatalog::new()
        .with("first", move || first.clone())
        .register("broken", failing_factory)
        .register("boom", panicking_factory)
        .with("second", move || second.clone());

    let mut manager = ModuleManager::new();
    let report = manager.discover(&catalog);

    assert_eq!(report.discovered, 1);
    assert_eq!(report.skipped, vec!["second"]);
    assert_eq!(
        report.failed.keys().map(String::as_str).collect::<Vec<_>>(),
        vec!["boom", "broken"]
    );
    assert!(report.failed["broken"].contains("missing credentials"));
    assert!(report.failed["boom"].contains("factory blew up"));

    // The first module with a name wins
    assert_eq!(manager.registry().len(), 1);
    let entry = manager.get_module("dup").unwrap();
    assert_eq!(entry.descriptor().version, "1.0.0");

    let status = manager.get_status().await;
    assert_eq!(
        status.keys().map(String::as_str).collect::<Vec<_>>(),
        vec!["boom", "broken", "dup"]
    );
    assert!(!status["dup"].is_failed());
    assert!(status["broken"].is_failed());
    assert!(status["boom"].is_failed());
    assert!(status["boom"].error().unwrap().contains("factory blew up"));
}

#[tokio::test]
async fn test_invalid_descriptor_is_rejected_by_name() {
    let log = EventLog::new();
    let mut manager = ModuleManager::new();
    let report = manager.discover(&catalog_of(vec![
        TestModule::new("ok", &log),
        TestModule::new("sloppy", &log).version("latest"),
        TestModule::new("bad name!", &log),
    ]));

    assert_eq!(report.discovered, 1);
    assert!(report.failed["sloppy"].contains("Invalid version format"));
    assert!(report.failed["bad name!"].contains("Invalid module name"));
    assert!(manager.get_module("sloppy").is_none());

    let status = manager.get_status().await;
    assert!(status["sloppy"].is_failed());
    assert!(status["bad name!"].is_failed());
    assert!(!status["ok"].is_failed());
}

#[tokio::test]
async fn test_module_requiring_newer_host_is_not_registered() {
    let log = EventLog::new();
    let mut manager = ModuleManager::with_host_version(ModuleSystemConfig::default(), "1.2.0");
    let report = manager.discover(&catalog_of(vec![
        TestModule::new("current", &log).requires_host("1.2.0"),
        TestModule::new("future", &log).requires_host("2.0.0"),
    ]));

    assert_eq!(report.discovered, 1);
    assert!(report.failed["future"].contains("requires host 2.0.0"));
    assert!(manager.get_module("current").is_some());
    assert!(manager.get_module("future").is_none());

    // Failed candidates are never initialized
    let init = manager.initialize_all().await.unwrap();
    assert_eq!(init.succeeded, vec!["current"]);
    assert_eq!(log.modules_for("initialize"), vec!["current"]);
    assert!(manager.get_status().await["future"].is_failed());
}
