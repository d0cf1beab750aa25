//! TargetGraph - the immutable, resolved dependency graph of one run.
//!
//! Built fresh for every flag configuration. Edges point from a dependent to
//! its dependency.

use std::collections::HashMap;

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::{Dfs, Reversed, Walker};
use petgraph::Direction;

/// The resolved graph plus its execution order.
#[derive(Debug, Clone)]
pub struct TargetGraph {
    /// Target graph
    graph: DiGraph<String, ()>,

    /// Map from target name to node index
    nodes: HashMap<String, NodeIndex>,

    /// Dependencies before dependents
    order: Vec<String>,

    /// Direct dependencies in declared order
    deps: HashMap<String, Vec<String>>,

    root: String,
}

impl TargetGraph {
    /// Assemble a graph from an execution order and each target's direct
    /// dependencies. Every dependency must itself appear in `order`.
    pub(crate) fn new(
        root: String,
        order: Vec<String>,
        deps: HashMap<String, Vec<String>>,
    ) -> Self {
        let mut graph = DiGraph::new();
        let mut nodes = HashMap::new();

        for name in &order {
            let node = graph.add_node(name.clone());
            nodes.insert(name.clone(), node);
        }

        for name in &order {
            for dep in deps.get(name).into_iter().flatten() {
                if let (Some(&from), Some(&to)) = (nodes.get(name), nodes.get(dep)) {
                    graph.add_edge(from, to, ());
                }
            }
        }

        TargetGraph {
            graph,
            nodes,
            order,
            deps,
            root,
        }
    }

    pub fn root(&self) -> &str {
        &self.root
    }

    /// Execution order: every dependency precedes its dependents.
    pub fn order(&self) -> &[String] {
        &self.order
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.nodes.contains_key(name)
    }

    /// Index of a target in the execution order.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.order.iter().position(|n| n == name)
    }

    /// Direct dependencies, in declared order.
    pub fn deps(&self, name: &str) -> &[String] {
        self.deps.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Targets that depend directly on `name`, in execution order.
    pub fn dependents(&self, name: &str) -> Vec<String> {
        let Some(&node) = self.nodes.get(name) else {
            return Vec::new();
        };
        let mut dependents: Vec<String> = self
            .graph
            .neighbors_directed(node, Direction::Incoming)
            .map(|n| self.graph[n].clone())
            .collect();
        self.sort_by_order(&mut dependents);
        dependents
    }

    /// Everything that depends on `name`, directly or not, in execution order.
    pub fn transitive_dependents(&self, name: &str) -> Vec<String> {
        let Some(&node) = self.nodes.get(name) else {
            return Vec::new();
        };
        let mut dependents: Vec<String> = Dfs::new(Reversed(&self.graph), node)
            .iter(Reversed(&self.graph))
            .filter(|&n| n != node)
            .map(|n| self.graph[n].clone())
            .collect();
        self.sort_by_order(&mut dependents);
        dependents
    }

    /// Everything `name` depends on, directly or not, in execution order.
    pub fn transitive_deps(&self, name: &str) -> Vec<String> {
        let Some(&node) = self.nodes.get(name) else {
            return Vec::new();
        };
        let mut deps: Vec<String> = Dfs::new(&self.graph, node)
            .iter(&self.graph)
            .filter(|&n| n != node)
            .map(|n| self.graph[n].clone())
            .collect();
        self.sort_by_order(&mut deps);
        deps
    }

    /// Whether a path of dependency edges connects the two targets in
    /// either direction.
    pub fn are_related(&self, a: &str, b: &str) -> bool {
        a == b
            || self.transitive_deps(a).iter().any(|n| n == b)
            || self.transitive_deps(b).iter().any(|n| n == a)
    }

    /// All edges as (dependent, dependency) pairs.
    pub fn edges(&self) -> Vec<(&str, &str)> {
        self.order
            .iter()
            .flat_map(|name| {
                self.deps(name)
                    .iter()
                    .map(move |dep| (name.as_str(), dep.as_str()))
            })
            .collect()
    }

    fn sort_by_order(&self, names: &mut [String]) {
        names.sort_by_key(|n| self.position(n).unwrap_or(usize::MAX));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn diamond() -> TargetGraph {
        // App -> [Gfx, Net], Gfx -> [Core], Net -> [Core]
        let order = vec!["Core", "Gfx", "Net", "App"]
            .into_iter()
            .map(String::from)
            .collect();
        let mut deps = HashMap::new();
        deps.insert("App".to_string(), vec!["Gfx".to_string(), "Net".to_string()]);
        deps.insert("Gfx".to_string(), vec!["Core".to_string()]);
        deps.insert("Net".to_string(), vec!["Core".to_string()]);
        deps.insert("Core".to_string(), vec![]);
        TargetGraph::new("App".to_string(), order, deps)
    }

    #[test]
    fn test_dependents() {
        let graph = diamond();
        assert_eq!(graph.dependents("Core"), vec!["Gfx", "Net"]);
        assert!(graph.dependents("App").is_empty());
        assert_eq!(graph.transitive_dependents("Core"), vec!["Gfx", "Net", "App"]);
        assert_eq!(graph.transitive_dependents("Gfx"), vec!["App"]);
    }

    #[test]
    fn test_transitive_deps() {
        let graph = diamond();
        assert_eq!(graph.transitive_deps("App"), vec!["Core", "Gfx", "Net"]);
        assert!(graph.transitive_deps("Core").is_empty());
    }

    #[test]
    fn test_related() {
        let graph = diamond();
        assert!(graph.are_related("App", "Core"));
        assert!(graph.are_related("Core", "App"));
        assert!(!graph.are_related("Gfx", "Net"));
    }

    #[test]
    fn test_edges_follow_declared_order() {
        let graph = diamond();
        assert_eq!(
            graph.edges(),
            vec![("Gfx", "Core"), ("Net", "Core"), ("App", "Gfx"), ("App", "Net")]
        );
    }
}
