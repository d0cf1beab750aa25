//! Test fixtures: descriptor builders and on-disk project trees.

use std::path::{Path, PathBuf};

use crate::core::recipe::{FnRecipe, PathBase};
use crate::core::target::{DependencySpec, Origin, TargetDescriptor};

/// Source directory of a fixture target.
pub fn source_dir(root: &Path, name: &str) -> PathBuf {
    root.join("src").join(name)
}

/// Dependency on a fixture target living under `root`.
pub fn local_dep(root: &Path, name: &str) -> DependencySpec {
    DependencySpec::new(name, Origin::local(source_dir(root, name)))
}

/// A local target with fixed dependencies and no hooks. Its source
/// directory is created.
pub fn local_target(root: &Path, name: &str, deps: &[&str]) -> TargetDescriptor {
    local_target_with(root, name, deps, FnRecipe::new())
}

/// A local target with the given recipe; `deps` replaces its dependency hook.
pub fn local_target_with(
    root: &Path,
    name: &str,
    deps: &[&str],
    recipe: FnRecipe,
) -> TargetDescriptor {
    let dir = source_dir(root, name);
    std::fs::create_dir_all(&dir).unwrap();
    let specs: Vec<DependencySpec> = deps.iter().map(|d| local_dep(root, d)).collect();
    TargetDescriptor::new(name, Origin::local(dir), recipe.with_dependencies(specs))
}

/// The root target of a fixture project.
pub fn root_target(root: &Path, deps: &[&str], recipe: FnRecipe) -> TargetDescriptor {
    let dir = source_dir(root, "Root");
    std::fs::create_dir_all(&dir).unwrap();
    let specs: Vec<DependencySpec> = deps.iter().map(|d| local_dep(root, d)).collect();
    TargetDescriptor::new("Root", Origin::Root, recipe.with_dependencies(specs)).with_source_dir(dir)
}

/// A recipe exporting `include` from its sources and the first of
/// `candidates` from its workspace.
pub fn library_recipe(candidates: &[&str]) -> FnRecipe {
    let candidates: Vec<String> = candidates.iter().map(|c| c.to_string()).collect();
    FnRecipe::new().on_package(move |_, scope| {
        scope.export_include("include", PathBase::Source);
        scope.export_libs("", &candidates, PathBase::Build)?;
        Ok(())
    })
}

/// Write files (path relative to `root`, contents) to disk.
pub fn write_tree(root: &Path, files: &[(&str, &str)]) {
    for (path, contents) in files {
        let path = root.join(path);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, contents).unwrap();
    }
}
