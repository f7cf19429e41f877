//! Dependency resolution into a deterministic execution order.
//!
//! Depth-first post-order traversal over the dependency graph: each node's
//! dependencies are appended before the node itself. Top-level traversal
//! follows the order of the input slice (registration order), so ties
//! between independent plugins are stable and predictable. Cycles are
//! reported as [`CycleError`]; the manager responds by falling back to
//! [`priority_order`].

use std::collections::{HashMap, HashSet};

use thiserror::Error;

use crate::descriptor::PluginPriority;

/// Borrowed view of one plugin for resolution purposes.
#[derive(Debug, Clone, Copy)]
pub struct DependencyNode<'a> {
    /// Plugin name.
    pub name: &'a str,
    /// Declared dependency names.
    pub dependencies: &'a [String],
    /// Priority, used by the fallback ordering.
    pub priority: PluginPriority,
}

/// A dependency cycle, reported with the chain that closes it.
#[derive(Debug, Clone, Error)]
#[error("dependency cycle detected: {}", chain.join(" -> "))]
pub struct CycleError {
    /// The names forming the cycle, first name repeated at the end.
    pub chain: Vec<String>,
}

/// Resolves a total execution order over the given nodes.
///
/// Every node is placed after all of its dependencies that are present in
/// the input. Dependencies naming absent plugins are skipped; registration
/// already warned about them. Deterministic and side-effect-free.
pub fn resolve_order(nodes: &[DependencyNode<'_>]) -> Result<Vec<String>, CycleError> {
    let mut walk = Walk {
        by_name: nodes.iter().map(|node| (node.name, node)).collect(),
        visited: HashSet::new(),
        in_progress: Vec::new(),
        order: Vec::with_capacity(nodes.len()),
    };
    for node in nodes {
        walk.visit(node)?;
    }
    Ok(walk.order)
}

/// Fallback ordering by priority rank (critical, high, normal, low).
///
/// The sort is stable, so nodes of equal priority keep the order of the
/// input slice.
pub fn priority_order(nodes: &[DependencyNode<'_>]) -> Vec<String> {
    let mut sorted: Vec<&DependencyNode<'_>> = nodes.iter().collect();
    sorted.sort_by_key(|node| node.priority.rank());
    sorted.iter().map(|node| node.name.to_string()).collect()
}

/// Traversal state for one resolution pass.
struct Walk<'a> {
    by_name: HashMap<&'a str, &'a DependencyNode<'a>>,
    visited: HashSet<&'a str>,
    in_progress: Vec<&'a str>,
    order: Vec<String>,
}

impl<'a> Walk<'a> {
    fn visit(&mut self, node: &'a DependencyNode<'a>) -> Result<(), CycleError> {
        if self.visited.contains(node.name) {
            return Ok(());
        }
        if let Some(start) = self.in_progress.iter().position(|name| *name == node.name) {
            let mut chain: Vec<String> = self.in_progress[start..]
                .iter()
                .map(|name| (*name).to_string())
                .collect();
            chain.push(node.name.to_string());
            return Err(CycleError { chain });
        }

        self.in_progress.push(node.name);
        for dependency in node.dependencies {
            if let Some(target) = self.by_name.get(dependency.as_str()).copied() {
                self.visit(target)?;
            }
        }
        self.in_progress.pop();

        self.visited.insert(node.name);
        self.order.push(node.name.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node<'a>(
        name: &'a str,
        dependencies: &'a [String],
        priority: PluginPriority,
    ) -> DependencyNode<'a> {
        DependencyNode {
            name,
            dependencies,
            priority,
        }
    }

    fn index_of(order: &[String], name: &str) -> usize {
        order.iter().position(|n| n == name).expect("name in order")
    }

    #[test]
    fn test_dependencies_come_first() {
        let no_deps: Vec<String> = vec![];
        let on_a = vec!["a".to_string()];
        let on_b = vec!["b".to_string()];
        // registered in order [c, a, b] with c -> b -> a
        let nodes = [
            node("c", &on_b, PluginPriority::Normal),
            node("a", &no_deps, PluginPriority::Normal),
            node("b", &on_a, PluginPriority::Normal),
        ];

        let order = resolve_order(&nodes).expect("acyclic");
        assert!(index_of(&order, "a") < index_of(&order, "b"));
        assert!(index_of(&order, "b") < index_of(&order, "c"));
    }

    #[test]
    fn test_independent_nodes_keep_input_order() {
        let no_deps: Vec<String> = vec![];
        let nodes = [
            node("third", &no_deps, PluginPriority::Normal),
            node("first", &no_deps, PluginPriority::Normal),
            node("second", &no_deps, PluginPriority::Normal),
        ];

        let order = resolve_order(&nodes).expect("acyclic");
        assert_eq!(order, vec!["third", "first", "second"]);
    }

    #[test]
    fn test_unknown_dependencies_are_skipped() {
        let on_ghost = vec!["ghost".to_string()];
        let nodes = [node("solo", &on_ghost, PluginPriority::Normal)];

        let order = resolve_order(&nodes).expect("unknown deps are not an error");
        assert_eq!(order, vec!["solo"]);
    }

    #[test]
    fn test_cycle_is_reported_with_chain() {
        let on_b = vec!["b".to_string()];
        let on_a = vec!["a".to_string()];
        let nodes = [
            node("a", &on_b, PluginPriority::Normal),
            node("b", &on_a, PluginPriority::Normal),
        ];

        let err = resolve_order(&nodes).expect_err("cycle");
        assert_eq!(err.chain.first().map(String::as_str), err.chain.last().map(String::as_str));
        assert!(err.to_string().contains("a"));
        assert!(err.to_string().contains("b"));
    }

    #[test]
    fn test_self_dependency_is_a_cycle() {
        let on_self = vec!["loop".to_string()];
        let nodes = [node("loop", &on_self, PluginPriority::Normal)];

        let err = resolve_order(&nodes).expect_err("self cycle");
        assert_eq!(err.chain, vec!["loop".to_string(), "loop".to_string()]);
    }

    #[test]
    fn test_shared_dependency_visited_once() {
        let no_deps: Vec<String> = vec![];
        let on_base = vec!["base".to_string()];
        let nodes = [
            node("base", &no_deps, PluginPriority::Normal),
            node("left", &on_base, PluginPriority::Normal),
            node("right", &on_base, PluginPriority::Normal),
        ];

        let order = resolve_order(&nodes).expect("acyclic");
        assert_eq!(order, vec!["base", "left", "right"]);
    }

    #[test]
    fn test_priority_order_ranks_then_input_order() {
        let no_deps: Vec<String> = vec![];
        let nodes = [
            node("late", &no_deps, PluginPriority::Low),
            node("steady-1", &no_deps, PluginPriority::Normal),
            node("urgent", &no_deps, PluginPriority::Critical),
            node("steady-2", &no_deps, PluginPriority::Normal),
            node("soon", &no_deps, PluginPriority::High),
        ];

        let order = priority_order(&nodes);
        assert_eq!(order, vec!["urgent", "soon", "steady-1", "steady-2", "late"]);
    }
}
