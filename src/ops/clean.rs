//! Implementation of `mast clean`.

use std::path::PathBuf;

use anyhow::Result;

use crate::core::Project;
use crate::ops::resolve::{RunOptions, Session};
use crate::util::fs::remove_dir_all_if_exists;
use crate::util::GlobalContext;

#[derive(Debug, Clone, Default)]
pub struct CleanOptions {
    pub run: RunOptions,

    /// Remove the whole `.mast` directory instead of resolving the graph
    pub all: bool,
}

/// Remove build state; returns the paths that existed and were removed.
///
/// Without `all`, every workspace the current flag set would assign is
/// removed, shared ones included, together with the persisted exports.
pub fn clean(ctx: &GlobalContext, opts: &CleanOptions) -> Result<Vec<PathBuf>> {
    if opts.all {
        let project = Project::new(&ctx.find_descriptor()?)?;
        return remove_existing([project.mast_dir()]);
    }

    let session = Session::open(ctx, &opts.run)?;
    let loaded = session.load()?;
    let graph = session.graph(&loaded, opts.run.target.as_deref())?;
    let workspaces = session.workspaces();

    let mut paths: Vec<PathBuf> = Vec::new();
    for name in graph.order() {
        if let Some(descriptor) = loaded.descriptors.get(name) {
            let path = workspaces.path_for_target(descriptor);
            if !paths.contains(&path) {
                paths.push(path);
            }
        }
    }
    paths.push(session.project.exports_path());

    remove_existing(paths)
}

fn remove_existing(paths: impl IntoIterator<Item = PathBuf>) -> Result<Vec<PathBuf>> {
    let mut removed = Vec::new();
    for path in paths {
        if path.is_dir() {
            remove_dir_all_if_exists(&path)?;
        } else if path.is_file() {
            std::fs::remove_file(&path)?;
        } else {
            continue;
        }
        tracing::debug!("removed {}", path.display());
        removed.push(path);
    }
    Ok(removed)
}
