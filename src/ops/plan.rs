//! Implementation of `mast plan` and `mast tree`.

use std::collections::HashSet;
use std::path::PathBuf;

use anyhow::Result;
use serde::Serialize;

use crate::core::WorkspaceKey;
use crate::ops::resolve::{RunOptions, Session};
use crate::resolver::TargetGraph;
use crate::util::GlobalContext;

/// Execution order and workspace assignment, without running anything.
#[derive(Debug, Clone, Serialize)]
pub struct BuildPlan {
    pub root: String,
    pub platform: String,
    pub flags: Vec<(String, bool)>,
    pub targets: Vec<PlannedTarget>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlannedTarget {
    pub name: String,
    pub origin: String,
    pub dependencies: Vec<String>,
    pub workspace: PathBuf,
    /// Shared workspace key, when the target opts into one
    pub global_workspace: Option<String>,
}

/// Resolve the graph and describe what a build would do.
pub fn plan(ctx: &GlobalContext, opts: &RunOptions) -> Result<BuildPlan> {
    let session = Session::open(ctx, opts)?;
    let loaded = session.load()?;
    let graph = session.graph(&loaded, opts.target.as_deref())?;
    let workspaces = session.workspaces();

    let mut targets = Vec::with_capacity(graph.len());
    for name in graph.order() {
        let Some(descriptor) = loaded.descriptors.get(name) else {
            continue;
        };
        let key = WorkspaceKey::for_target(descriptor);
        targets.push(PlannedTarget {
            name: name.clone(),
            origin: descriptor.origin().to_string(),
            dependencies: graph.deps(name).to_vec(),
            workspace: workspaces.path_for(&key),
            global_workspace: key.is_global().then(|| key.as_str().to_string()),
        });
    }

    Ok(BuildPlan {
        root: graph.root().to_string(),
        platform: session.cfg.platform.to_string(),
        flags: session
            .cfg
            .flags
            .iter()
            .map(|(name, value)| (name.to_string(), value))
            .collect(),
        targets,
    })
}

/// Resolve the graph for `mast tree`.
pub fn tree(ctx: &GlobalContext, opts: &RunOptions) -> Result<TargetGraph> {
    let session = Session::open(ctx, opts)?;
    let loaded = session.load()?;
    session.graph(&loaded, opts.target.as_deref())
}

/// Render the graph as an indented tree; repeated subtrees are marked `(*)`.
pub fn render_tree(graph: &TargetGraph, max_depth: Option<usize>) -> String {
    let mut out = String::new();
    let mut seen = HashSet::new();
    render_node(
        graph,
        graph.root(),
        "",
        None,
        max_depth.unwrap_or(usize::MAX),
        0,
        &mut seen,
        &mut out,
    );
    out
}

#[allow(clippy::too_many_arguments)]
fn render_node<'g>(
    graph: &'g TargetGraph,
    name: &'g str,
    prefix: &str,
    last: Option<bool>,
    max_depth: usize,
    depth: usize,
    seen: &mut HashSet<&'g str>,
    out: &mut String,
) {
    let repeated = !seen.insert(name);
    let branch = match last {
        None => "",
        Some(true) => "└── ",
        Some(false) => "├── ",
    };
    out.push_str(prefix);
    out.push_str(branch);
    out.push_str(name);
    if repeated && !graph.deps(name).is_empty() {
        out.push_str(" (*)");
    }
    out.push('\n');

    if repeated || depth >= max_depth {
        return;
    }

    let child_prefix = match last {
        None => String::new(),
        Some(true) => format!("{}    ", prefix),
        Some(false) => format!("{}│   ", prefix),
    };
    let deps = graph.deps(name);
    for (i, dep) in deps.iter().enumerate() {
        render_node(
            graph,
            dep,
            &child_prefix,
            Some(i + 1 == deps.len()),
            max_depth,
            depth + 1,
            seen,
            out,
        );
    }
}
