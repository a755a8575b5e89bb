//! Dependency resolution tests
//!
//! Load order through the manager, cycle reporting, and an ordering property
//! over random acyclic graphs.

mod common;

use common::{catalog_of, EventLog, TestModule};
use dispatch_platform::module::registry::DependencyGraph;
use dispatch_platform::module::{ModuleError, ModuleManager};
use proptest::prelude::*;
use std::collections::HashMap;

#[tokio::test]
async fn test_chain_loads_in_dependency_order() {
    let log = EventLog::new();
    let mut manager = ModuleManager::new();
    manager.discover(&catalog_of(vec![
        TestModule::new("c", &log).depends_on("b"),
        TestModule::new("a", &log),
        TestModule::new("b", &log).depends_on("a"),
    ]));

    assert_eq!(manager.load_order().unwrap(), vec!["a", "b", "c"]);
    manager.initialize_all().await.unwrap();
    assert_eq!(log.modules_for("initialize"), vec!["a", "b", "c"]);
}

#[test]
fn test_two_module_cycle_is_named() {
    let log = EventLog::new();
    let mut manager = ModuleManager::new();
    manager.discover(&catalog_of(vec![
        TestModule::new("a", &log).depends_on("b"),
        TestModule::new("b", &log).depends_on("a"),
    ]));

    let err = manager.load_order().unwrap_err();
    match &err {
        ModuleError::DependencyError { cycle, .. } => assert_eq!(cycle, &vec!["a", "b"]),
        other => panic!("expected dependency error, got {:?}", other),
    }
    let message = err.to_string();
    assert!(message.contains("a") && message.contains("b"), "{}", message);
}

#[test]
fn test_missing_dependency_does_not_block_loading() {
    let log = EventLog::new();
    let mut manager = ModuleManager::new();
    manager.discover(&catalog_of(vec![
        TestModule::new("payments", &log).depends_on("storage"),
        TestModule::new("chat", &log),
    ]));

    let graph = DependencyGraph::from_registry(manager.registry());
    assert_eq!(graph.unresolved().len(), 1);
    assert_eq!(manager.load_order().unwrap(), vec!["payments", "chat"]);
}

/// Random DAG: node i may only depend on nodes with a smaller index
fn dag_strategy() -> impl Strategy<Value = (Vec<usize>, Vec<Vec<usize>>)> {
    (1usize..12).prop_flat_map(|n| {
        let deps = (0..n)
            .map(|i| {
                if i == 0 {
                    Just(Vec::new()).boxed()
                } else {
                    proptest::collection::vec(0..i, 0..3).boxed()
                }
            })
            .collect::<Vec<_>>();
        (Just((0..n).collect::<Vec<_>>()).prop_shuffle(), deps)
    })
}

proptest! {
    #[test]
    fn prop_load_order_respects_dependencies((registration, deps) in dag_strategy()) {
        let name = |i: usize| format!("m{}", i);
        let pairs: Vec<(String, Vec<String>)> = registration
            .iter()
            .map(|&i| (name(i), deps[i].iter().map(|&d| name(d)).collect()))
            .collect();

        let order = DependencyGraph::from_pairs(pairs).load_order().unwrap();
        prop_assert_eq!(order.len(), registration.len());

        let position: HashMap<&str, usize> = order
            .iter()
            .enumerate()
            .map(|(p, m)| (m.as_str(), p))
            .collect();
        for (i, dependencies) in deps.iter().enumerate() {
            for &d in dependencies {
                let module = name(i);
                let dependency = name(d);
                prop_assert!(position[dependency.as_str()] < position[module.as_str()]);
            }
        }
    }

    #[test]
    fn prop_independent_modules_keep_registration_order(n in 1usize..10) {
        let names: Vec<String> = (0..n).map(|i| format!("m{}", i)).collect();
        let order = DependencyGraph::from_pairs(names.iter().map(|m| (m.clone(), Vec::new())))
            .load_order()
            .unwrap();
        prop_assert_eq!(order, names);
    }
}
