//! Global context for Mast operations.
//!
//! Provides centralized access to configuration, paths, and environment.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use anyhow::{bail, Context, Result};
use directories::ProjectDirs;

use crate::core::manifest::DESCRIPTOR_NAME;

/// Project directories for Mast
static PROJECT_DIRS: LazyLock<Option<ProjectDirs>> =
    LazyLock::new(|| ProjectDirs::from("com", "mast", "mast"));

/// Global context containing paths and output settings.
#[derive(Debug, Clone)]
pub struct GlobalContext {
    /// Current working directory
    cwd: PathBuf,

    /// Home directory for global Mast data
    home: PathBuf,

    /// Whether to use verbose output
    verbose: bool,

    /// Whether to use colors in output
    color: bool,
}

impl GlobalContext {
    /// Create a new GlobalContext with defaults.
    ///
    /// `MAST_HOME` overrides the platform cache directory.
    pub fn new() -> Result<Self> {
        let cwd = std::env::current_dir().context("failed to get current directory")?;

        let home = match std::env::var_os("MAST_HOME") {
            Some(home) => PathBuf::from(home),
            None => match PROJECT_DIRS.as_ref() {
                Some(dirs) => dirs.cache_dir().to_path_buf(),
                None => cwd.join(".mast").join("home"),
            },
        };

        Ok(GlobalContext {
            cwd,
            home,
            verbose: false,
            color: true,
        })
    }

    /// Create a GlobalContext with a specific working directory.
    pub fn with_cwd(cwd: PathBuf) -> Result<Self> {
        let mut ctx = Self::new()?;
        ctx.cwd = cwd;
        Ok(ctx)
    }

    /// Override the home directory.
    pub fn with_home(mut self, home: PathBuf) -> Self {
        self.home = home;
        self
    }

    /// Set verbose mode.
    pub fn set_verbose(&mut self, verbose: bool) {
        self.verbose = verbose;
    }

    /// Set color output.
    pub fn set_color(&mut self, color: bool) {
        self.color = color;
    }

    /// Get the current working directory.
    pub fn cwd(&self) -> &Path {
        &self.cwd
    }

    /// Get the Mast home directory.
    pub fn home(&self) -> &Path {
        &self.home
    }

    /// Get the git checkout cache directory.
    pub fn git_cache_dir(&self) -> PathBuf {
        self.home.join("git")
    }

    /// Default root for global workspaces.
    pub fn shared_workspace_root(&self) -> PathBuf {
        self.home.join("workspaces")
    }

    /// Get the global configuration file path.
    pub fn config_path(&self) -> PathBuf {
        self.home.join("config.toml")
    }

    /// Check if verbose mode is enabled.
    pub fn is_verbose(&self) -> bool {
        self.verbose
    }

    /// Check if color output is enabled.
    pub fn color(&self) -> bool {
        self.color
    }

    /// Find `Mast.toml` starting from cwd and searching upward.
    pub fn find_descriptor(&self) -> Result<PathBuf> {
        let mut current = self.cwd.clone();
        loop {
            let candidate = current.join(DESCRIPTOR_NAME);
            if candidate.is_file() {
                return Ok(candidate);
            }
            if !current.pop() {
                bail!(
                    "could not find {} in {} or any parent directory",
                    DESCRIPTOR_NAME,
                    self.cwd.display()
                );
            }
        }
    }
}
