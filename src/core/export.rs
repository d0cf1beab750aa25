//! Export registry - what each packaged target exposes to its dependents.
//!
//! A target's export set is created empty when the target is registered and
//! filled exactly once, when its package stage completes. Dependents only
//! ever read export sets of packaged targets.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::util::fs::{read_to_string, write_string};

/// Export registry and artifact selection errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExportError {
    #[error("no export set registered for `{target}`")]
    NotFound { target: String },

    #[error("exports of `{target}` were read before it was packaged")]
    NotPackaged { target: String },

    #[error("exports of `{target}` were already recorded")]
    AlreadyRecorded { target: String },

    #[error("none of [{}] found in {}", .candidates.join(", "), .dir.display())]
    NoMatchingArtifact {
        dir: PathBuf,
        candidates: Vec<String>,
    },
}

/// Include paths, library artifacts and assets exported by one target.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportSet {
    /// Include directories
    #[serde(default)]
    pub includes: BTreeSet<PathBuf>,

    /// Library artifacts, in link order
    #[serde(default)]
    pub libs: Vec<PathBuf>,

    /// Asset files
    #[serde(default)]
    pub assets: BTreeSet<PathBuf>,
}

impl ExportSet {
    pub fn new() -> Self {
        ExportSet::default()
    }

    pub fn add_include(&mut self, path: impl Into<PathBuf>) {
        self.includes.insert(path.into());
    }

    /// Append a library, ignoring duplicates so link order stays stable.
    pub fn add_lib(&mut self, path: impl Into<PathBuf>) {
        let path = path.into();
        if !self.libs.contains(&path) {
            self.libs.push(path);
        }
    }

    pub fn add_asset(&mut self, path: impl Into<PathBuf>) {
        self.assets.insert(path.into());
    }

    pub fn is_empty(&self) -> bool {
        self.includes.is_empty() && self.libs.is_empty() && self.assets.is_empty()
    }
}

#[derive(Debug, Clone, Default)]
struct Entry {
    exports: ExportSet,
    packaged: bool,
}

/// Per-target export sets for one build run.
#[derive(Debug, Clone, Default)]
pub struct ExportRegistry {
    entries: BTreeMap<String, Entry>,
}

impl ExportRegistry {
    pub fn new() -> Self {
        ExportRegistry::default()
    }

    /// Create the empty export set of a target. Re-registering is a no-op.
    pub fn register(&mut self, target: &str) {
        self.entries.entry(target.to_string()).or_default();
    }

    /// Record the export set produced by a target's package stage.
    pub fn record(&mut self, target: &str, exports: ExportSet) -> Result<(), ExportError> {
        let entry = self
            .entries
            .get_mut(target)
            .ok_or_else(|| ExportError::NotFound {
                target: target.to_string(),
            })?;

        if entry.packaged {
            return Err(ExportError::AlreadyRecorded {
                target: target.to_string(),
            });
        }

        entry.exports = exports;
        entry.packaged = true;
        tracing::debug!("recorded exports for `{}`", target);
        Ok(())
    }

    /// Look up the export set of a packaged target.
    pub fn lookup(&self, target: &str) -> Result<&ExportSet, ExportError> {
        let entry = self.entries.get(target).ok_or_else(|| ExportError::NotFound {
            target: target.to_string(),
        })?;

        if !entry.packaged {
            return Err(ExportError::NotPackaged {
                target: target.to_string(),
            });
        }

        Ok(&entry.exports)
    }

    pub fn is_packaged(&self, target: &str) -> bool {
        self.entries.get(target).is_some_and(|e| e.packaged)
    }

    /// Packaged targets and their exports, ordered by name.
    pub fn packaged(&self) -> impl Iterator<Item = (&str, &ExportSet)> {
        self.entries
            .iter()
            .filter(|(_, e)| e.packaged)
            .map(|(name, e)| (name.as_str(), &e.exports))
    }

    /// Persist the packaged export sets as JSON.
    pub fn save(&self, path: &Path) -> Result<()> {
        let map: BTreeMap<&str, &ExportSet> = self.packaged().collect();
        let json = serde_json::to_string_pretty(&map).context("failed to serialize exports")?;
        write_string(path, &json)
    }

    /// Load a registry written by [`ExportRegistry::save`]; every entry is packaged.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = read_to_string(path)?;
        let map: BTreeMap<String, ExportSet> = serde_json::from_str(&contents)
            .with_context(|| format!("failed to parse exports file: {}", path.display()))?;

        let entries = map
            .into_iter()
            .map(|(name, exports)| {
                (
                    name,
                    Entry {
                        exports,
                        packaged: true,
                    },
                )
            })
            .collect();

        Ok(ExportRegistry { entries })
    }
}

/// Pick the first candidate artifact present in `dir`, in declared order.
///
/// A candidate starting with `.` is an extension pattern and matches any file
/// in `dir` with that suffix (first by file name). Any other candidate is an
/// exact file name.
pub fn select_artifact(dir: &Path, candidates: &[String]) -> Result<PathBuf, ExportError> {
    for candidate in candidates {
        if candidate.starts_with('.') {
            if let Some(found) = first_with_suffix(dir, candidate) {
                return Ok(found);
            }
        } else {
            let path = dir.join(candidate);
            if path.is_file() {
                return Ok(path);
            }
        }
    }

    Err(ExportError::NoMatchingArtifact {
        dir: dir.to_path_buf(),
        candidates: candidates.to_vec(),
    })
}

fn first_with_suffix(dir: &Path, suffix: &str) -> Option<PathBuf> {
    let mut matches: Vec<PathBuf> = std::fs::read_dir(dir)
        .ok()?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_file())
        .filter(|p| {
            p.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.len() > suffix.len() && n.ends_with(suffix))
        })
        .collect();
    matches.sort();
    matches.into_iter().next()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn candidates(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_record_then_lookup() {
        let mut registry = ExportRegistry::new();
        registry.register("Lib");
        assert!(!registry.is_packaged("Lib"));

        let mut exports = ExportSet::new();
        exports.add_include("/src/lib/include");
        exports.add_lib("/build/lib/liblib.a");
        registry.record("Lib", exports.clone()).unwrap();

        assert!(registry.is_packaged("Lib"));
        assert_eq!(registry.lookup("Lib").unwrap(), &exports);
    }

    #[test]
    fn test_lookup_before_package_is_rejected() {
        let mut registry = ExportRegistry::new();
        registry.register("Lib");

        assert_eq!(
            registry.lookup("Lib").unwrap_err(),
            ExportError::NotPackaged {
                target: "Lib".to_string()
            }
        );
        assert!(matches!(
            registry.lookup("Other"),
            Err(ExportError::NotFound { .. })
        ));
    }

    #[test]
    fn test_record_only_once() {
        let mut registry = ExportRegistry::new();
        registry.register("Lib");
        registry.record("Lib", ExportSet::new()).unwrap();

        assert!(matches!(
            registry.record("Lib", ExportSet::new()),
            Err(ExportError::AlreadyRecorded { .. })
        ));
        assert!(matches!(
            registry.record("Unregistered", ExportSet::new()),
            Err(ExportError::NotFound { .. })
        ));
    }

    #[test]
    fn test_libs_keep_order_without_duplicates() {
        let mut exports = ExportSet::new();
        exports.add_lib("b.a");
        exports.add_lib("a.a");
        exports.add_lib("b.a");
        assert_eq!(exports.libs, vec![PathBuf::from("b.a"), PathBuf::from("a.a")]);
    }

    #[test]
    fn test_select_first_existing_candidate() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("lib.so"), "").unwrap();

        let found = select_artifact(tmp.path(), &candidates(&["lib.a", "lib.so"])).unwrap();
        assert_eq!(found, tmp.path().join("lib.so"));

        std::fs::write(tmp.path().join("lib.a"), "").unwrap();
        let found = select_artifact(tmp.path(), &candidates(&["lib.a", "lib.so"])).unwrap();
        assert_eq!(found, tmp.path().join("lib.a"));
    }

    #[test]
    fn test_select_none_found() {
        let tmp = TempDir::new().unwrap();
        let err = select_artifact(tmp.path(), &candidates(&["lib.a", "lib.so"])).unwrap_err();
        assert!(matches!(err, ExportError::NoMatchingArtifact { .. }));
        assert!(err.to_string().contains("lib.a, lib.so"));
    }

    #[test]
    fn test_select_extension_pattern() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("zeta.so"), "").unwrap();
        std::fs::write(tmp.path().join("alpha.so"), "").unwrap();
        std::fs::write(tmp.path().join("fbx.dll"), "").unwrap();

        let found = select_artifact(tmp.path(), &candidates(&[".lib", ".so", ".dll"])).unwrap();
        assert_eq!(found, tmp.path().join("alpha.so"));
    }

    #[test]
    fn test_save_and_load() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(".mast/exports.json");

        let mut registry = ExportRegistry::new();
        registry.register("Lib");
        registry.register("Pending");
        let mut exports = ExportSet::new();
        exports.add_include("include");
        registry.record("Lib", exports.clone()).unwrap();
        registry.save(&path).unwrap();

        let loaded = ExportRegistry::load(&path).unwrap();
        assert_eq!(loaded.lookup("Lib").unwrap(), &exports);
        assert!(matches!(
            loaded.lookup("Pending"),
            Err(ExportError::NotFound { .. })
        ));
    }
}
