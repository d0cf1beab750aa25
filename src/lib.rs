//! Mast - a build target lifecycle orchestrator for native C/C++ projects
//!
//! This crate resolves a project's target descriptors into a dependency
//! graph and drives every target through fetch, configure, build, package
//! and test, in dependency order, in isolated or shared workspaces.

pub mod builder;
pub mod core;
pub mod ops;
pub mod resolver;
pub mod sources;
pub mod util;

/// Test utilities and mocks for Mast unit tests.
///
/// This module is only available when compiling with `--cfg test` or
/// running tests. It provides recording implementations of the native
/// build, fetch and test steps plus descriptor fixtures.
#[cfg(test)]
pub mod test_support;

pub use builder::{BuildReport, LifecycleExecutor, LifecycleState};
pub use core::{DescriptorSet, Origin, RunConfig, TargetDescriptor};
pub use resolver::{build_graph, ResolveError, TargetGraph};
pub use util::context::GlobalContext;
