//! Recipes - the per-target lifecycle hooks.
//!
//! A [`Recipe`] supplies one callback per lifecycle stage. The executor calls
//! them in order and hands each one the run's [`RunConfig`] explicitly.
//! Recipes come either from `Mast.toml` descriptors
//! ([`ManifestRecipe`](crate::core::manifest::ManifestRecipe)) or from code
//! ([`FnRecipe`]).

use std::path::{Path, PathBuf};

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::core::export::{select_artifact, ExportError, ExportRegistry, ExportSet};
use crate::core::run_config::RunConfig;
use crate::core::target::DependencySpec;
use crate::util::fs::glob_files;

/// Lifecycle hooks of one target.
pub trait Recipe: Send + Sync {
    /// Dependencies for this run. Disabled optional dependencies are simply
    /// not returned.
    fn dependencies(&self, _cfg: &RunConfig) -> Vec<DependencySpec> {
        Vec::new()
    }

    /// Append build options; may read exports of packaged dependencies.
    fn configure(&self, _cfg: &RunConfig, _scope: &mut ConfigureScope<'_>) -> Result<()> {
        Ok(())
    }

    /// Declare the target's exports.
    fn package(&self, _cfg: &RunConfig, _scope: &mut PackageScope<'_>) -> Result<()> {
        Ok(())
    }

    /// Test hook; `None` leaves the target untested.
    fn test(&self, _cfg: &RunConfig) -> Option<TestInvocation> {
        None
    }

    /// Default feature-flag values declared by the descriptor.
    fn flag_defaults(&self) -> Vec<(String, bool)> {
        Vec::new()
    }
}

/// Which directory a relative export or test path is resolved against.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PathBase {
    /// The target's source directory
    #[default]
    Source,
    /// The target's workspace (build output) directory
    Build,
}

/// A test command declared by a target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestInvocation {
    /// Program to run; relative paths resolve against `base`
    pub command: PathBuf,
    /// Fixed arguments placed before the run's free-form test arguments
    pub args: Vec<String>,
    pub base: PathBase,
}

impl TestInvocation {
    pub fn new(command: impl Into<PathBuf>) -> Self {
        TestInvocation {
            command: command.into(),
            args: Vec::new(),
            base: PathBase::Source,
        }
    }

    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.args = args;
        self
    }

    pub fn with_base(mut self, base: PathBase) -> Self {
        self.base = base;
        self
    }
}

/// Directories of a target while its stages run.
#[derive(Debug, Clone, Copy)]
pub struct StageDirs<'a> {
    pub source: &'a Path,
    pub workspace: &'a Path,
}

impl StageDirs<'_> {
    pub fn resolve(&self, base: PathBase, path: &Path) -> PathBuf {
        match base {
            PathBase::Source => self.source.join(path),
            PathBase::Build => self.workspace.join(path),
        }
    }
}

/// What a recipe can do during its configure stage.
pub struct ConfigureScope<'a> {
    target: &'a str,
    dirs: StageDirs<'a>,
    dependencies: &'a [String],
    registry: &'a ExportRegistry,
    options: Vec<String>,
    native_build: bool,
}

impl<'a> ConfigureScope<'a> {
    pub fn new(
        target: &'a str,
        dirs: StageDirs<'a>,
        dependencies: &'a [String],
        registry: &'a ExportRegistry,
    ) -> Self {
        ConfigureScope {
            target,
            dirs,
            dependencies,
            registry,
            options: Vec::new(),
            native_build: true,
        }
    }

    pub fn target(&self) -> &str {
        self.target
    }

    pub fn dirs(&self) -> StageDirs<'a> {
        self.dirs
    }

    /// Names of the target's resolved dependencies, in declared order.
    pub fn dependencies(&self) -> &[String] {
        self.dependencies
    }

    /// Append a build option (e.g. `NANO_BUILD_TESTS=ON`).
    pub fn add_option(&mut self, option: impl Into<String>) {
        self.options.push(option.into());
    }

    pub fn options(&self) -> &[String] {
        &self.options
    }

    /// Skip the native build step; the target only packages existing files.
    pub fn nothing_to_build(&mut self) {
        self.native_build = false;
    }

    pub fn builds(&self) -> bool {
        self.native_build
    }

    /// Exports of a direct dependency. Only declared dependencies are visible.
    pub fn dependency_exports(&self, name: &str) -> Result<&ExportSet, ExportError> {
        if !self.dependencies.iter().any(|d| d == name) {
            return Err(ExportError::NotFound {
                target: name.to_string(),
            });
        }
        self.registry.lookup(name)
    }

    /// Consume the scope, returning the options and whether to build.
    pub fn finish(self) -> (Vec<String>, bool) {
        (self.options, self.native_build)
    }
}

/// What a recipe can do during its package stage.
///
/// Exports accumulate here and only reach the registry once the whole
/// package stage succeeds.
pub struct PackageScope<'a> {
    target: &'a str,
    dirs: StageDirs<'a>,
    exports: ExportSet,
}

impl<'a> PackageScope<'a> {
    pub fn new(target: &'a str, dirs: StageDirs<'a>) -> Self {
        PackageScope {
            target,
            dirs,
            exports: ExportSet::new(),
        }
    }

    pub fn target(&self) -> &str {
        self.target
    }

    pub fn dirs(&self) -> StageDirs<'a> {
        self.dirs
    }

    /// Export an include directory.
    pub fn export_include(&mut self, path: impl AsRef<Path>, base: PathBase) {
        let resolved = self.dirs.resolve(base, path.as_ref());
        self.exports.add_include(resolved);
    }

    /// Export the first library in `dir` matching `candidates`, in order.
    pub fn export_libs(
        &mut self,
        dir: impl AsRef<Path>,
        candidates: &[String],
        base: PathBase,
    ) -> Result<PathBuf, ExportError> {
        let dir = self.dirs.resolve(base, dir.as_ref());
        let artifact = select_artifact(&dir, candidates)?;
        tracing::debug!("`{}` exports {}", self.target, artifact.display());
        self.exports.add_lib(artifact.clone());
        Ok(artifact)
    }

    /// Export every file matching a glob pattern; returns the number exported.
    pub fn export_assets(&mut self, pattern: &str, base: PathBase) -> Result<usize> {
        let root = match base {
            PathBase::Source => self.dirs.source,
            PathBase::Build => self.dirs.workspace,
        };
        let files = glob_files(root, pattern)?;
        if files.is_empty() {
            tracing::warn!("`{}`: asset pattern `{}` matched nothing", self.target, pattern);
        }
        let count = files.len();
        for file in files {
            self.exports.add_asset(file);
        }
        Ok(count)
    }

    pub fn exports(&self) -> &ExportSet {
        &self.exports
    }

    pub fn into_exports(self) -> ExportSet {
        self.exports
    }
}

type DependenciesFn = dyn Fn(&RunConfig) -> Vec<DependencySpec> + Send + Sync;
type ConfigureFn = dyn Fn(&RunConfig, &mut ConfigureScope<'_>) -> Result<()> + Send + Sync;
type PackageFn = dyn Fn(&RunConfig, &mut PackageScope<'_>) -> Result<()> + Send + Sync;
type TestFn = dyn Fn(&RunConfig) -> Option<TestInvocation> + Send + Sync;

/// A recipe assembled from closures.
#[derive(Default)]
pub struct FnRecipe {
    dependencies: Option<Box<DependenciesFn>>,
    configure: Option<Box<ConfigureFn>>,
    package: Option<Box<PackageFn>>,
    test: Option<Box<TestFn>>,
}

impl FnRecipe {
    pub fn new() -> Self {
        FnRecipe::default()
    }

    /// Fixed dependency list, independent of the run configuration.
    pub fn with_dependencies(self, deps: Vec<DependencySpec>) -> Self {
        self.on_dependencies(move |_| deps.clone())
    }

    pub fn on_dependencies<F>(mut self, f: F) -> Self
    where
        F: Fn(&RunConfig) -> Vec<DependencySpec> + Send + Sync + 'static,
    {
        self.dependencies = Some(Box::new(f));
        self
    }

    pub fn on_configure<F>(mut self, f: F) -> Self
    where
        F: Fn(&RunConfig, &mut ConfigureScope<'_>) -> Result<()> + Send + Sync + 'static,
    {
        self.configure = Some(Box::new(f));
        self
    }

    pub fn on_package<F>(mut self, f: F) -> Self
    where
        F: Fn(&RunConfig, &mut PackageScope<'_>) -> Result<()> + Send + Sync + 'static,
    {
        self.package = Some(Box::new(f));
        self
    }

    pub fn on_test<F>(mut self, f: F) -> Self
    where
        F: Fn(&RunConfig) -> Option<TestInvocation> + Send + Sync + 'static,
    {
        self.test = Some(Box::new(f));
        self
    }
}

impl Recipe for FnRecipe {
    fn dependencies(&self, cfg: &RunConfig) -> Vec<DependencySpec> {
        self.dependencies.as_ref().map(|f| f(cfg)).unwrap_or_default()
    }

    fn configure(&self, cfg: &RunConfig, scope: &mut ConfigureScope<'_>) -> Result<()> {
        match &self.configure {
            Some(f) => f(cfg, scope),
            None => Ok(()),
        }
    }

    fn package(&self, cfg: &RunConfig, scope: &mut PackageScope<'_>) -> Result<()> {
        match &self.package {
            Some(f) => f(cfg, scope),
            None => Ok(()),
        }
    }

    fn test(&self, cfg: &RunConfig) -> Option<TestInvocation> {
        self.test.as_ref().and_then(|f| f(cfg))
    }
}
