//! Workspace manager - build output directories per target.
//!
//! Every target builds in a workspace directory. By default the workspace is
//! isolated and keyed by the target's own name. A target declaring a
//! `global_workspace` key shares one directory with every other target,
//! from any root project, that declares exactly the same key.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use thiserror::Error;

use crate::core::target::TargetDescriptor;
use crate::util::hash::short_hash;

/// A workspace directory could not be prepared.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("workspace {} is unavailable: {cause}", .path.display())]
pub struct WorkspaceError {
    pub path: PathBuf,
    pub cause: String,
}

/// Identity of a workspace.
///
/// Isolated and global keys never collide, even when the strings are equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum WorkspaceKey {
    Isolated(String),
    Global(String),
}

impl WorkspaceKey {
    /// `global_workspace` when declared, otherwise the target's name.
    pub fn for_target(descriptor: &TargetDescriptor) -> Self {
        match descriptor.global_workspace() {
            Some(key) => WorkspaceKey::Global(key.to_string()),
            None => WorkspaceKey::Isolated(descriptor.name().to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            WorkspaceKey::Isolated(k) | WorkspaceKey::Global(k) => k,
        }
    }

    pub fn is_global(&self) -> bool {
        matches!(self, WorkspaceKey::Global(_))
    }
}

impl fmt::Display for WorkspaceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkspaceKey::Isolated(k) => f.write_str(k),
            WorkspaceKey::Global(k) => write!(f, "global:{}", k),
        }
    }
}

/// Assigns workspace directories for one run.
#[derive(Debug)]
pub struct WorkspaceManager {
    local_root: PathBuf,
    shared_root: PathBuf,
    assigned: Mutex<BTreeMap<WorkspaceKey, PathBuf>>,
}

impl WorkspaceManager {
    /// Isolated workspaces live under `local_root`, global ones under `shared_root`.
    pub fn new(local_root: impl Into<PathBuf>, shared_root: impl Into<PathBuf>) -> Self {
        WorkspaceManager {
            local_root: local_root.into(),
            shared_root: shared_root.into(),
            assigned: Mutex::new(BTreeMap::new()),
        }
    }

    pub fn local_root(&self) -> &Path {
        &self.local_root
    }

    pub fn shared_root(&self) -> &Path {
        &self.shared_root
    }

    /// Directory for a key. Pure; creates nothing.
    pub fn path_for(&self, key: &WorkspaceKey) -> PathBuf {
        let dir_name = dir_name(key.as_str());
        match key {
            WorkspaceKey::Isolated(_) => self.local_root.join(dir_name),
            WorkspaceKey::Global(_) => self.shared_root.join(dir_name),
        }
    }

    /// Directory a target would be assigned. Pure; creates nothing.
    pub fn path_for_target(&self, descriptor: &TargetDescriptor) -> PathBuf {
        self.path_for(&WorkspaceKey::for_target(descriptor))
    }

    /// Assign a target its workspace, creating the directory.
    pub fn assign(&self, descriptor: &TargetDescriptor) -> Result<PathBuf, WorkspaceError> {
        let key = WorkspaceKey::for_target(descriptor);
        let path = self.path_for(&key);

        std::fs::create_dir_all(&path).map_err(|e| WorkspaceError {
            path: path.clone(),
            cause: e.to_string(),
        })?;

        tracing::debug!(
            "workspace for `{}`: {} ({})",
            descriptor.name(),
            path.display(),
            key
        );

        self.assigned
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key, path.clone());

        Ok(path)
    }

    /// Workspaces handed out so far, ordered by key.
    pub fn assigned(&self) -> Vec<(WorkspaceKey, PathBuf)> {
        self.assigned
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .map(|(k, p)| (k.clone(), p.clone()))
            .collect()
    }
}

/// Directory name for a key, always a single normal path component.
///
/// A key that is not usable as-is gets its separators replaced and a hash of
/// the original appended, so distinct keys keep distinct directories.
fn dir_name(key: &str) -> String {
    let sanitized: String = key
        .chars()
        .map(|c| if is_reserved_char(c) { '_' } else { c })
        .collect();
    if sanitized == key && !matches!(key, "" | "." | "..") {
        sanitized
    } else {
        format!("{}-{}", sanitized, short_hash(key))
    }
}

/// Characters that cannot appear in a workspace directory name.
pub(crate) fn is_reserved_char(c: char) -> bool {
    matches!(c, '/' | '\\' | ':') || c.is_control()
}

/// Whether a key names a single plain directory under its root.
pub(crate) fn is_plain_key(key: &str) -> bool {
    !key.trim().is_empty() && !matches!(key, "." | "..") && !key.chars().any(is_reserved_char)
}
