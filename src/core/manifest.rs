//! `Mast.toml` descriptors and the declarative recipe built from them.
//!
//! ```toml
//! [target]
//! name = "NanoMesh"
//! global_workspace = "wolf3d"
//!
//! [flags]
//! NO_FBX = false
//!
//! [[dependencies]]
//! name = "ReCpp"
//! git = "https://github.com/RedFox20/ReCpp.git"
//!
//! [[dependencies]]
//! name = "FbxSdk"
//! path = "src/FBX"
//! when = "windows && !NO_FBX"
//!
//! [[configure]]
//! when = "test"
//! options = ["NANO_BUILD_TESTS=ON"]
//!
//! [[export.include]]
//! path = "include"
//!
//! [[export.libs]]
//! dir = "lib"
//! candidates = ["NanoMesh.lib", "libNanoMesh.a"]
//!
//! [test]
//! command = "bin/NanoMeshTests"
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use url::Url;

use crate::core::condition::Condition;
use crate::core::flags::validate_flag_name;
use crate::core::recipe::{ConfigureScope, PackageScope, PathBase, Recipe, TestInvocation};
use crate::core::run_config::RunConfig;
use crate::core::target::{DependencySpec, GitReference, Origin, TargetDescriptor};
use crate::core::workspace::is_plain_key;
use crate::util::fs::read_to_string;

/// File name of a target descriptor.
pub const DESCRIPTOR_NAME: &str = "Mast.toml";

/// The parsed contents of a `Mast.toml`.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DescriptorManifest {
    pub target: TargetSection,

    /// Default feature-flag values
    #[serde(default)]
    pub flags: BTreeMap<String, bool>,

    #[serde(default)]
    pub dependencies: Vec<DependencyEntry>,

    #[serde(default)]
    pub configure: Vec<ConfigureRule>,

    #[serde(default)]
    pub export: ExportSection,

    pub test: Option<TestSection>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TargetSection {
    pub name: String,

    /// Shared workspace key
    pub global_workspace: Option<String>,

    /// Whether the native build step runs
    #[serde(default = "default_true")]
    pub build: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DependencyEntry {
    pub name: String,
    pub git: Option<String>,
    pub branch: Option<String>,
    pub tag: Option<String>,
    pub rev: Option<String>,
    pub path: Option<PathBuf>,
    pub when: Option<Condition>,
}

/// Build options appended when `when` holds, `otherwise` when it does not.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigureRule {
    pub when: Option<Condition>,
    #[serde(default)]
    pub options: Vec<String>,
    #[serde(default)]
    pub otherwise: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExportSection {
    #[serde(default)]
    pub include: Vec<IncludeRule>,
    #[serde(default)]
    pub libs: Vec<LibsRule>,
    #[serde(default)]
    pub assets: Vec<AssetRule>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IncludeRule {
    pub path: PathBuf,
    #[serde(default = "source_base")]
    pub from: PathBase,
    pub when: Option<Condition>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LibsRule {
    pub dir: PathBuf,
    pub candidates: Vec<String>,
    #[serde(default = "build_base")]
    pub from: PathBase,
    pub when: Option<Condition>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AssetRule {
    pub pattern: String,
    #[serde(default = "source_base")]
    pub from: PathBase,
    pub when: Option<Condition>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TestSection {
    pub command: PathBuf,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default = "build_base")]
    pub from: PathBase,
    pub when: Option<Condition>,
}

fn default_true() -> bool {
    true
}

fn source_base() -> PathBase {
    PathBase::Source
}

fn build_base() -> PathBase {
    PathBase::Build
}

fn holds(when: &Option<Condition>, cfg: &RunConfig) -> bool {
    when.as_ref().map_or(true, |c| c.evaluate(cfg))
}

impl DescriptorManifest {
    /// Load and validate a descriptor file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = read_to_string(path)?;
        Self::parse(&contents).with_context(|| format!("invalid descriptor: {}", path.display()))
    }

    /// Parse and validate descriptor text.
    pub fn parse(contents: &str) -> Result<Self> {
        let manifest: DescriptorManifest = toml::from_str(contents)?;
        manifest.validate()?;
        Ok(manifest)
    }

    /// Descriptor for a dependency directory that ships no `Mast.toml`.
    ///
    /// The native build runs only if the directory holds a `CMakeLists.txt`.
    pub fn implicit(name: &str, dir: &Path) -> Self {
        DescriptorManifest {
            target: TargetSection {
                name: name.to_string(),
                global_workspace: None,
                build: dir.join("CMakeLists.txt").is_file(),
            },
            flags: BTreeMap::new(),
            dependencies: Vec::new(),
            configure: Vec::new(),
            export: ExportSection::default(),
            test: None,
        }
    }

    fn validate(&self) -> Result<()> {
        if self.target.name.trim().is_empty() {
            bail!("target name must not be empty");
        }
        if let Some(key) = &self.target.global_workspace {
            if !is_plain_key(key) {
                bail!("invalid global_workspace `{}`", key);
            }
        }
        for name in self.flags.keys() {
            validate_flag_name(name)?;
        }
        for dep in &self.dependencies {
            match (&dep.git, &dep.path) {
                (Some(_), Some(_)) => {
                    bail!("dependency `{}` declares both `git` and `path`", dep.name)
                }
                (None, None) => bail!("dependency `{}` needs either `git` or `path`", dep.name),
                _ => {}
            }
            let refs = [&dep.branch, &dep.tag, &dep.rev]
                .iter()
                .filter(|r| r.is_some())
                .count();
            if refs > 1 {
                bail!(
                    "dependency `{}` may set only one of `branch`, `tag` or `rev`",
                    dep.name
                );
            }
            if refs == 1 && dep.git.is_none() {
                bail!("dependency `{}` sets a git reference without `git`", dep.name);
            }
        }
        for rule in &self.export.libs {
            if rule.candidates.is_empty() {
                bail!("export.libs rule for `{}` has no candidates", rule.dir.display());
            }
        }
        Ok(())
    }

    /// Resolve dependency entries against the descriptor's directory.
    fn resolve_dependencies(&self, dir: &Path) -> Result<Vec<(DependencySpec, Option<Condition>)>> {
        self.dependencies
            .iter()
            .map(|dep| -> Result<(DependencySpec, Option<Condition>)> {
                let origin = match (&dep.git, &dep.path) {
                    (Some(git), _) => {
                        let url = Url::parse(git).with_context(|| {
                            format!("invalid git url for dependency `{}`: {}", dep.name, git)
                        })?;
                        let reference = if let Some(b) = &dep.branch {
                            GitReference::Branch(b.clone())
                        } else if let Some(t) = &dep.tag {
                            GitReference::Tag(t.clone())
                        } else if let Some(r) = &dep.rev {
                            GitReference::Rev(r.clone())
                        } else {
                            GitReference::DefaultBranch
                        };
                        Origin::Remote { url, reference }
                    }
                    (None, Some(path)) => Origin::local(normalize(&dir.join(path))),
                    (None, None) => bail!("dependency `{}` has no origin", dep.name),
                };
                Ok((DependencySpec::new(dep.name.clone(), origin), dep.when.clone()))
            })
            .collect()
    }

    /// Turn the manifest into a descriptor rooted at `dir`.
    pub fn into_descriptor(self, origin: Origin, dir: &Path) -> Result<TargetDescriptor> {
        let name = self.target.name.clone();
        let global_workspace = self.target.global_workspace.clone();
        let dependencies = self.resolve_dependencies(dir)?;

        let recipe = ManifestRecipe {
            manifest: self,
            dependencies,
        };

        let mut descriptor = TargetDescriptor::new(name, origin, recipe).with_source_dir(dir);
        if let Some(key) = global_workspace {
            descriptor = descriptor.with_global_workspace(key);
        }
        Ok(descriptor)
    }
}

/// Lexically clean `.` and `..` components so equal paths compare equal.
fn normalize(path: &Path) -> PathBuf {
    use std::path::Component;

    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Declarative recipe evaluated from a `Mast.toml`.
#[derive(Debug)]
pub struct ManifestRecipe {
    manifest: DescriptorManifest,
    dependencies: Vec<(DependencySpec, Option<Condition>)>,
}

impl ManifestRecipe {
    pub fn manifest(&self) -> &DescriptorManifest {
        &self.manifest
    }
}

impl Recipe for ManifestRecipe {
    fn dependencies(&self, cfg: &RunConfig) -> Vec<DependencySpec> {
        self.dependencies
            .iter()
            .filter(|(_, when)| holds(when, cfg))
            .map(|(spec, _)| spec.clone())
            .collect()
    }

    fn configure(&self, cfg: &RunConfig, scope: &mut ConfigureScope<'_>) -> Result<()> {
        if !self.manifest.target.build {
            scope.nothing_to_build();
        }
        for rule in &self.manifest.configure {
            let options = if holds(&rule.when, cfg) {
                &rule.options
            } else {
                &rule.otherwise
            };
            for option in options {
                scope.add_option(option.clone());
            }
        }
        Ok(())
    }

    fn package(&self, cfg: &RunConfig, scope: &mut PackageScope<'_>) -> Result<()> {
        let export = &self.manifest.export;

        for rule in export.include.iter().filter(|r| holds(&r.when, cfg)) {
            scope.export_include(&rule.path, rule.from);
        }
        for rule in export.libs.iter().filter(|r| holds(&r.when, cfg)) {
            scope.export_libs(&rule.dir, &rule.candidates, rule.from)?;
        }
        for rule in export.assets.iter().filter(|r| holds(&r.when, cfg)) {
            scope.export_assets(&rule.pattern, rule.from)?;
        }
        Ok(())
    }

    fn test(&self, cfg: &RunConfig) -> Option<TestInvocation> {
        let test = self.manifest.test.as_ref()?;
        if !holds(&test.when, cfg) {
            return None;
        }
        Some(
            TestInvocation::new(&test.command)
                .with_args(test.args.clone())
                .with_base(test.from),
        )
    }

    fn flag_defaults(&self) -> Vec<(String, bool)> {
        self.manifest
            .flags
            .iter()
            .map(|(k, v)| (k.clone(), *v))
            .collect()
    }
}
