//! Configuration file support for Mast.
//!
//! Mast supports two configuration file locations:
//! - Global: `<home>/config.toml` - User-wide defaults
//! - Project: `.mast/config.toml` - Project-specific overrides
//!
//! Project config takes precedence over global config.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Mast configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Build settings
    pub build: BuildConfig,

    /// Default feature-flag values, overridden by command-line toggles
    pub flags: BTreeMap<String, bool>,

    /// Shared workspace settings
    pub workspace: WorkspaceConfig,

    /// Network settings
    pub net: NetConfig,
}

/// Build-related configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    /// Default number of parallel target jobs (None = sequential)
    pub jobs: Option<usize>,

    /// Keep building unrelated targets after a failure
    pub keep_going: Option<bool>,

    /// Explicit path to the cmake executable
    pub cmake: Option<PathBuf>,

    /// CMake generator (e.g. "Ninja")
    pub generator: Option<String>,
}

/// Configuration for global workspaces.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkspaceConfig {
    /// Directory holding every global workspace (defaults to `<home>/workspaces`)
    pub shared_root: Option<PathBuf>,
}

/// Network-related configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NetConfig {
    /// Offline mode (never fetch; use cached checkouts only)
    pub offline: bool,
}

impl Config {
    /// Load configuration from a file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;

        toml::from_str(&contents)
            .with_context(|| format!("failed to parse config file: {}", path.display()))
    }

    /// Load configuration with fallback to defaults if file doesn't exist.
    pub fn load_or_default(path: &Path) -> Self {
        if path.exists() {
            Self::load(path).unwrap_or_else(|e| {
                tracing::warn!("Failed to load config from {}: {:#}", path.display(), e);
                Self::default()
            })
        } else {
            Self::default()
        }
    }

    /// Merge another config into this one (other takes precedence).
    pub fn merge(&mut self, other: Config) {
        if other.build.jobs.is_some() {
            self.build.jobs = other.build.jobs;
        }
        if other.build.keep_going.is_some() {
            self.build.keep_going = other.build.keep_going;
        }
        if other.build.cmake.is_some() {
            self.build.cmake = other.build.cmake;
        }
        if other.build.generator.is_some() {
            self.build.generator = other.build.generator;
        }

        self.flags.extend(other.flags);

        if other.workspace.shared_root.is_some() {
            self.workspace.shared_root = other.workspace.shared_root;
        }

        if other.net.offline {
            self.net.offline = true;
        }
    }
}

/// Load merged configuration from global and project locations.
///
/// Order of precedence (highest to lowest):
/// 1. Project config (.mast/config.toml)
/// 2. Global config (<home>/config.toml)
/// 3. Defaults
pub fn load_config(global_path: &Path, project_path: &Path) -> Config {
    let mut config = Config::default();
    config.merge(Config::load_or_default(global_path));
    config.merge(Config::load_or_default(project_path));
    config
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_config() {
        let config: Config = toml::from_str(
            r#"
[build]
jobs = 4
keep_going = true
generator = "Ninja"

[flags]
NO_FBX = true

[workspace]
shared_root = "/opt/mast/ws"
"#,
        )
        .unwrap();

        assert_eq!(config.build.jobs, Some(4));
        assert_eq!(config.build.keep_going, Some(true));
        assert_eq!(config.build.generator.as_deref(), Some("Ninja"));
        assert_eq!(config.flags.get("NO_FBX"), Some(&true));
        assert_eq!(
            config.workspace.shared_root,
            Some(PathBuf::from("/opt/mast/ws"))
        );
        assert!(!config.net.offline);
    }

    #[test]
    fn test_project_overrides_global() {
        let tmp = TempDir::new().unwrap();
        let global = tmp.path().join("global.toml");
        let project = tmp.path().join("project.toml");

        std::fs::write(&global, "[build]\njobs = 8\n[flags]\nA = true\nB = true\n").unwrap();
        std::fs::write(&project, "[build]\njobs = 2\n[flags]\nB = false\n").unwrap();

        let config = load_config(&global, &project);
        assert_eq!(config.build.jobs, Some(2));
        assert_eq!(config.flags.get("A"), Some(&true));
        assert_eq!(config.flags.get("B"), Some(&false));
    }

    #[test]
    fn test_missing_files_give_defaults() {
        let tmp = TempDir::new().unwrap();
        let config = load_config(&tmp.path().join("a.toml"), &tmp.path().join("b.toml"));
        assert!(config.build.jobs.is_none());
        assert!(config.flags.is_empty());
    }
}
