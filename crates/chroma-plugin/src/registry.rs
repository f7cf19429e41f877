//! Registry state: the live collection of registered plugins.
//!
//! Owned exclusively by the manager behind a single lock, so every mutation
//! (including execution-order recomputation) is atomic between observable
//! points.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::error;

use crate::descriptor::PluginDescriptor;
use crate::hooks::ConfigMap;
use crate::plugin::ThemePlugin;
use crate::resolver::{self, DependencyNode};
use crate::stats::PluginStats;

/// One registered plugin with its runtime state.
#[derive(Debug)]
pub(crate) struct PluginRecord {
    /// Static descriptor.
    pub descriptor: PluginDescriptor,
    /// The plugin instance.
    pub instance: Arc<dyn ThemePlugin>,
    /// Merged configuration: defaults, registration overrides, later patches.
    pub config: ConfigMap,
    /// Whether the plugin participates in lifecycle runs.
    pub enabled: bool,
    /// Whether the init hook has completed without error.
    pub initialized: bool,
    /// When the plugin was registered.
    pub registered_at: DateTime<Utc>,
}

/// Read view of one registered plugin.
#[derive(Debug, Clone, Serialize)]
pub struct PluginStatus {
    /// Static descriptor.
    pub descriptor: PluginDescriptor,
    /// Whether the plugin participates in lifecycle runs.
    pub enabled: bool,
    /// Whether the init hook has completed without error.
    pub initialized: bool,
    /// When the plugin was registered.
    pub registered_at: DateTime<Utc>,
}

impl PluginRecord {
    /// Builds the read view of this record.
    pub fn status(&self) -> PluginStatus {
        PluginStatus {
            descriptor: self.descriptor.clone(),
            enabled: self.enabled,
            initialized: self.initialized,
            registered_at: self.registered_at,
        }
    }
}

/// All mutable registry state, behind the manager's lock.
#[derive(Debug, Default)]
pub(crate) struct RegistryState {
    /// Name to record.
    pub records: HashMap<String, PluginRecord>,
    /// Names in registration order; drives resolver traversal and ties.
    pub registration_order: Vec<String>,
    /// Resolved execution order, recomputed on every register/unregister.
    pub execution_order: Vec<String>,
}

impl RegistryState {
    /// Inserts a record and tracks its registration position.
    pub fn insert(&mut self, record: PluginRecord) {
        let name = record.descriptor.name.clone();
        self.records.insert(name.clone(), record);
        self.registration_order.push(name);
    }

    /// Removes a record and its registration position.
    pub fn remove(&mut self, name: &str) -> Option<PluginRecord> {
        let removed = self.records.remove(name);
        if removed.is_some() {
            self.registration_order.retain(|n| n != name);
        }
        removed
    }

    /// Recomputes the execution order from the current records.
    ///
    /// On a resolution failure (a dependency cycle) the order falls back to
    /// priority rank, stable by registration order within equal rank.
    pub fn recompute_order(&mut self) {
        let order = {
            let nodes = self.nodes();
            match resolver::resolve_order(&nodes) {
                Ok(order) => order,
                Err(err) => {
                    error!(
                        error = %err,
                        "Dependency resolution failed; falling back to priority order"
                    );
                    resolver::priority_order(&nodes)
                }
            }
        };
        self.execution_order = order;
    }

    /// Derives resolver nodes from the records, in registration order.
    fn nodes(&self) -> Vec<DependencyNode<'_>> {
        self.registration_order
            .iter()
            .filter_map(|name| self.records.get(name))
            .map(|record| DependencyNode {
                name: &record.descriptor.name,
                dependencies: &record.descriptor.dependencies,
                priority: record.descriptor.priority,
            })
            .collect()
    }

    /// Returns every registered name in execution order, appending any name
    /// missing from the cached order (treated as lowest priority).
    pub fn ordered_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .execution_order
            .iter()
            .filter(|name| self.records.contains_key(*name))
            .cloned()
            .collect();
        for name in &self.registration_order {
            if !names.contains(name) {
                names.push(name.clone());
            }
        }
        names
    }

    /// Read views of every plugin, in registration order.
    pub fn list(&self) -> Vec<PluginStatus> {
        self.registration_order
            .iter()
            .filter_map(|name| self.records.get(name))
            .map(PluginRecord::status)
            .collect()
    }

    /// Aggregates counts over the current records.
    pub fn stats(&self) -> PluginStats {
        PluginStats::collect(self.records.values())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{PluginCategory, PluginPriority};
    use crate::plugin::FnPlugin;

    fn make_record(name: &str, dependencies: &[&str], priority: PluginPriority) -> PluginRecord {
        let descriptor = PluginDescriptor::builder(name, "1.0.0")
            .with_description("test plugin")
            .with_category(PluginCategory::Utility)
            .with_priority(priority)
            .with_dependencies(dependencies.iter().copied())
            .build();
        PluginRecord {
            instance: Arc::new(FnPlugin::builder(descriptor.clone()).build()),
            descriptor,
            config: ConfigMap::new(),
            enabled: true,
            initialized: false,
            registered_at: Utc::now(),
        }
    }

    #[test]
    fn test_recompute_orders_dependencies_first() {
        let mut state = RegistryState::default();
        state.insert(make_record("c", &["b"], PluginPriority::Normal));
        state.insert(make_record("a", &[], PluginPriority::Normal));
        state.insert(make_record("b", &["a"], PluginPriority::Normal));
        state.recompute_order();

        assert_eq!(state.execution_order, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_cycle_falls_back_to_priority() {
        let mut state = RegistryState::default();
        state.insert(make_record("x", &["y"], PluginPriority::Low));
        state.insert(make_record("y", &["x"], PluginPriority::Critical));
        state.insert(make_record("z", &[], PluginPriority::Normal));
        state.recompute_order();

        assert_eq!(state.execution_order, vec!["y", "z", "x"]);
    }

    #[test]
    fn test_remove_clears_registration_order() {
        let mut state = RegistryState::default();
        state.insert(make_record("a", &[], PluginPriority::Normal));
        state.insert(make_record("b", &[], PluginPriority::Normal));
        state.recompute_order();

        assert!(state.remove("a").is_some());
        state.recompute_order();
        assert_eq!(state.registration_order, vec!["b"]);
        assert_eq!(state.execution_order, vec!["b"]);
        assert!(state.remove("a").is_none());
    }

    #[test]
    fn test_ordered_names_appends_missing() {
        let mut state = RegistryState::default();
        state.insert(make_record("a", &[], PluginPriority::Normal));
        state.recompute_order();
        // registered after the last recompute, so absent from the order
        state.insert(make_record("b", &[], PluginPriority::Normal));

        assert_eq!(state.ordered_names(), vec!["a", "b"]);
    }
}
