//! Project - the root descriptor and its `.mast` directory.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

/// The root project a run starts from.
#[derive(Debug, Clone)]
pub struct Project {
    /// Path of the root `Mast.toml`
    descriptor_path: PathBuf,

    /// Directory containing the root descriptor
    root: PathBuf,
}

impl Project {
    /// Create a project from the path of its root descriptor.
    pub fn new(descriptor_path: &Path) -> Result<Self> {
        let descriptor_path = descriptor_path
            .canonicalize()
            .with_context(|| format!("failed to locate {}", descriptor_path.display()))?;
        let root = descriptor_path
            .parent()
            .unwrap_or(Path::new("."))
            .to_path_buf();

        Ok(Project {
            descriptor_path,
            root,
        })
    }

    pub fn descriptor_path(&self) -> &Path {
        &self.descriptor_path
    }

    /// Get the project root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Get the .mast directory.
    pub fn mast_dir(&self) -> PathBuf {
        self.root.join(".mast")
    }

    /// Root of isolated target workspaces.
    pub fn build_root(&self) -> PathBuf {
        self.mast_dir().join("build")
    }

    /// Export registry written after each build.
    pub fn exports_path(&self) -> PathBuf {
        self.mast_dir().join("exports.json")
    }

    /// Project-local configuration file.
    pub fn config_path(&self) -> PathBuf {
        self.mast_dir().join("config.toml")
    }
}
