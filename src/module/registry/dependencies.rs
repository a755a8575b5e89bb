//! Module dependency resolution
//!
//! Builds the dependency graph over the registry and computes the load order.

use std::collections::{HashMap, HashSet, VecDeque};
use tracing::{debug, warn};

use crate::module::registry::ModuleRegistry;
use crate::module::traits::ModuleError;

/// Dependency graph over registered modules
///
/// Derived from the registry whenever a load order is needed; never cached.
#[derive(Debug, Clone)]
pub struct DependencyGraph {
    /// Module names in registry order
    modules: Vec<String>,
    /// Module -> declared dependency names
    dependencies: HashMap<String, Vec<String>>,
    /// Declared dependencies that are not registered (module, dependency)
    unresolved: Vec<(String, String)>,
}

impl DependencyGraph {
    /// Build the graph from the registry, logging unresolved references
    pub fn from_registry(registry: &ModuleRegistry) -> Self {
        Self::from_pairs(
            registry
                .iter()
                .map(|e| (e.name().to_string(), e.descriptor().dependencies.clone())),
        )
    }

    /// Build the graph from `(module, dependencies)` pairs in registry order
    pub fn from_pairs<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (String, Vec<String>)>,
    {
        let mut modules = Vec::new();
        let mut dependencies = HashMap::new();
        for (name, deps) in pairs {
            if dependencies.contains_key(&name) {
                continue;
            }
            modules.push(name.clone());
            dependencies.insert(name, deps);
        }

        let mut unresolved = Vec::new();
        for name in &modules {
            for dep in &dependencies[name] {
                if !dependencies.contains_key(dep) {
                    warn!("Module {} has missing dependency: {}", name, dep);
                    unresolved.push((name.clone(), dep.clone()));
                }
            }
        }

        Self {
            modules,
            dependencies,
            unresolved,
        }
    }

    /// Declared dependencies of a module
    pub fn dependencies_of(&self, module: &str) -> &[String] {
        self.dependencies
            .get(module)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Dependency references with no registered target
    pub fn unresolved(&self) -> &[(String, String)] {
        &self.unresolved
    }

    /// Compute a load order in which every module follows its dependencies
    ///
    /// Kahn's algorithm with a FIFO queue seeded in registry order; edges to
    /// unregistered modules are ignored. Fails only on a cycle.
    pub fn load_order(&self) -> Result<Vec<String>, ModuleError> {
        let mut in_degree: HashMap<&str, usize> = HashMap::new();
        let mut dependents: HashMap<&str, Vec<&str>> = HashMap::new();

        for module in &self.modules {
            let deps = self.registered_deps(module);
            in_degree.insert(module.as_str(), deps.len());
            for dep in deps {
                dependents.entry(dep).or_default().push(module.as_str());
            }
        }

        let mut queue: VecDeque<&str> = self
            .modules
            .iter()
            .map(String::as_str)
            .filter(|m| in_degree[m] == 0)
            .collect();

        let mut order = Vec::with_capacity(self.modules.len());

        while let Some(module) = queue.pop_front() {
            order.push(module.to_string());

            if let Some(waiting) = dependents.get(module) {
                for &dependent in waiting {
                    if let Some(degree) = in_degree.get_mut(dependent) {
                        *degree -= 1;
                        if *degree == 0 {
                            queue.push_back(dependent);
                        }
                    }
                }
            }
        }

        if order.len() < self.modules.len() {
            let placed: HashSet<&str> = order.iter().map(String::as_str).collect();
            let unresolved: Vec<String> = self
                .modules
                .iter()
                .filter(|m| !placed.contains(m.as_str()))
                .cloned()
                .collect();
            let cycle = self.cycle_members(&unresolved);
            warn!(
                "Circular dependencies detected: {:?} (unordered: {:?})",
                cycle, unresolved
            );
            return Err(ModuleError::DependencyError { cycle, unresolved });
        }

        debug!("Dependency resolution complete: {:?}", order);
        Ok(order)
    }

    /// Dependencies of a module that are registered, without duplicates
    fn registered_deps(&self, module: &str) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.dependencies_of(module)
            .iter()
            .map(String::as_str)
            .filter(|d| self.dependencies.contains_key(*d) && seen.insert(*d))
            .collect()
    }

    /// Members of `candidates` that can reach themselves through dependency edges
    ///
    /// Modules that merely depend on a cycle are left out.
    fn cycle_members(&self, candidates: &[String]) -> Vec<String> {
        let within: HashSet<&str> = candidates.iter().map(String::as_str).collect();

        candidates
            .iter()
            .filter(|start| {
                let mut stack: Vec<&str> = self
                    .registered_deps(start)
                    .into_iter()
                    .filter(|d| within.contains(d))
                    .collect();
                let mut visited = HashSet::new();

                while let Some(node) = stack.pop() {
                    if node == start.as_str() {
                        return true;
                    }
                    if !visited.insert(node) {
                        continue;
                    }
                    stack.extend(
                        self.registered_deps(node)
                            .into_iter()
                            .filter(|d| within.contains(d)),
                    );
                }
                false
            })
            .cloned()
            .collect()
    }
}
