//! Core data structures for Mast.
//!
//! This module contains the foundational types used throughout Mast:
//! - Target descriptors, origins and recipes
//! - The resolved run configuration (platform, feature flags, conditions)
//! - Workspaces and the export registry

pub mod condition;
pub mod export;
pub mod flags;
pub mod manifest;
pub mod platform;
pub mod project;
pub mod recipe;
pub mod run_config;
pub mod target;
pub mod workspace;

pub use condition::Condition;
pub use export::{ExportRegistry, ExportSet};
pub use flags::{FeatureFlags, Toggle};
pub use manifest::{DescriptorManifest, DESCRIPTOR_NAME};
pub use platform::Platform;
pub use project::Project;
pub use recipe::{ConfigureScope, FnRecipe, PackageScope, PathBase, Recipe, TestInvocation};
pub use run_config::RunConfig;
pub use target::{DependencySpec, DescriptorSet, GitReference, Origin, TargetDescriptor};
pub use workspace::{WorkspaceKey, WorkspaceManager};
