//! Dependency graph construction.
//!
//! Turns a [`DescriptorSet`] and a root target into a [`TargetGraph`] for one
//! [`RunConfig`]. The builder is pure and deterministic: all I/O (descriptor
//! loading, fetching) happens before it runs, and the same inputs always
//! produce the same order.

pub mod errors;
pub mod graph;

pub use errors::ResolveError;
pub use graph::TargetGraph;

use std::collections::HashMap;

use crate::core::{DescriptorSet, Origin, RunConfig};

/// Build the dependency graph of `root` for this run's configuration.
///
/// Dependencies are visited depth-first in declared order and emitted in
/// post-order, so dependencies precede dependents and siblings keep the
/// order their dependent declared them in. Only the root's transitive
/// closure is included; other descriptors in the set are ignored.
pub fn build_graph(
    descriptors: &DescriptorSet,
    root: &str,
    cfg: &RunConfig,
) -> Result<TargetGraph, ResolveError> {
    if !descriptors.contains(root) {
        return Err(ResolveError::UnknownRoot {
            name: root.to_string(),
        });
    }

    let mut walk = Walk {
        descriptors,
        cfg,
        marks: HashMap::new(),
        stack: Vec::new(),
        order: Vec::new(),
        deps: HashMap::new(),
    };
    walk.visit(root)?;

    tracing::debug!("resolved {} targets: {}", walk.order.len(), walk.order.join(", "));

    Ok(TargetGraph::new(root.to_string(), walk.order, walk.deps))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    InProgress,
    Done,
}

struct Walk<'a> {
    descriptors: &'a DescriptorSet,
    cfg: &'a RunConfig,
    marks: HashMap<String, Mark>,
    /// Targets currently being visited, outermost first
    stack: Vec<String>,
    order: Vec<String>,
    deps: HashMap<String, Vec<String>>,
}

impl Walk<'_> {
    fn visit(&mut self, name: &str) -> Result<(), ResolveError> {
        match self.marks.get(name) {
            Some(Mark::Done) => return Ok(()),
            Some(Mark::InProgress) => {
                let start = self.stack.iter().position(|n| n == name).unwrap_or(0);
                let mut path = self.stack[start..].to_vec();
                path.push(name.to_string());
                return Err(ResolveError::CyclicDependency { path });
            }
            None => {}
        }

        let Some(descriptor) = self.descriptors.get(name) else {
            return Err(ResolveError::UnknownRoot {
                name: name.to_string(),
            });
        };

        self.marks.insert(name.to_string(), Mark::InProgress);
        self.stack.push(name.to_string());

        let mut direct: Vec<String> = Vec::new();
        for spec in descriptor.dependencies(self.cfg) {
            let Some(dependency) = self.descriptors.get(&spec.name) else {
                return Err(ResolveError::UnresolvedDependency {
                    name: spec.name,
                    required_by: name.to_string(),
                });
            };

            if *dependency.origin() != Origin::Root && *dependency.origin() != spec.origin {
                return Err(ResolveError::AmbiguousTarget {
                    name: spec.name,
                    first: dependency.origin().to_string(),
                    second: spec.origin.to_string(),
                });
            }

            if direct.contains(&spec.name) {
                continue;
            }
            self.visit(&spec.name)?;
            direct.push(spec.name);
        }

        self.stack.pop();
        self.marks.insert(name.to_string(), Mark::Done);
        self.order.push(name.to_string());
        self.deps.insert(name.to_string(), direct);
        Ok(())
    }
}
