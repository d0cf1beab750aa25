//! Lifecycle executor with progress reporting.
//!
//! Targets run in waves. A wave holds targets whose dependencies are all
//! packaged, at most `jobs` of them and never two sharing a workspace key.
//! With `jobs = 1` this is the plain topological walk of the graph order.
//! Exports produced by a wave are recorded once the wave completes, so a
//! dependent never sees a partial export set.

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::time::Instant;

use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;

use crate::builder::errors::TargetError;
use crate::builder::events::{BuildEvent, EventSink};
use crate::builder::lifecycle::{LifecycleState, TargetRecord};
use crate::builder::report::{Abandoned, BuildReport};
use crate::builder::steps::{BuildRequest, Fetch, NativeBuild, TestRequest, TestRunner};
use crate::core::export::{ExportRegistry, ExportSet};
use crate::core::recipe::{ConfigureScope, PackageScope, StageDirs, TestInvocation};
use crate::core::target::{DescriptorSet, Origin, TargetDescriptor};
use crate::core::workspace::{WorkspaceKey, WorkspaceManager};
use crate::core::RunConfig;
use crate::resolver::TargetGraph;

/// What happens to unrelated targets once one target fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Start no new targets; report the rest as skipped
    #[default]
    FailFast,
    /// Keep building everything not depending on the failure
    KeepGoing,
}

/// Which targets run their test stage when tests are requested.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TestScope {
    /// Only the graph's root target
    #[default]
    Root,
    All,
}

/// Executor settings.
#[derive(Debug, Clone, Copy)]
pub struct ExecutorOptions {
    /// Maximum targets running at once
    pub jobs: usize,
    pub policy: FailurePolicy,
    pub tests: TestScope,
    /// Show a progress bar
    pub progress: bool,
}

impl Default for ExecutorOptions {
    fn default() -> Self {
        ExecutorOptions {
            jobs: 1,
            policy: FailurePolicy::FailFast,
            tests: TestScope::Root,
            progress: false,
        }
    }
}

/// Drives every target of a graph through its lifecycle.
pub struct LifecycleExecutor<'a> {
    cfg: &'a RunConfig,
    workspaces: &'a WorkspaceManager,
    native: &'a dyn NativeBuild,
    fetcher: &'a dyn Fetch,
    tests: &'a dyn TestRunner,
    options: ExecutorOptions,
    events: Option<&'a dyn EventSink>,
}

/// Result of running one target.
struct Outcome {
    record: TargetRecord,
    /// Present once the package stage completed
    exports: Option<ExportSet>,
}

impl<'a> LifecycleExecutor<'a> {
    /// Create a new executor.
    pub fn new(
        cfg: &'a RunConfig,
        workspaces: &'a WorkspaceManager,
        native: &'a dyn NativeBuild,
        fetcher: &'a dyn Fetch,
        tests: &'a dyn TestRunner,
    ) -> Self {
        LifecycleExecutor {
            cfg,
            workspaces,
            native,
            fetcher,
            tests,
            options: ExecutorOptions::default(),
            events: None,
        }
    }

    pub fn with_options(mut self, options: ExecutorOptions) -> Self {
        self.options = options;
        self
    }

    /// Send build events to `sink`.
    pub fn with_events(mut self, sink: &'a dyn EventSink) -> Self {
        self.events = Some(sink);
        self
    }

    /// Execute every target of `graph`.
    pub fn execute(&self, descriptors: &DescriptorSet, graph: &TargetGraph) -> BuildReport {
        let start = Instant::now();
        let order = graph.order().to_vec();

        self.emit(BuildEvent::BuildStarted {
            root: graph.root().to_string(),
            order: order.clone(),
            platform: self.cfg.platform.to_string(),
            profile: if self.cfg.release { "release" } else { "debug" }.to_string(),
        });

        let mut registry = ExportRegistry::new();
        for name in &order {
            registry.register(name);
        }

        let mut records: HashMap<String, TargetRecord> = order
            .iter()
            .map(|name| (name.clone(), TargetRecord::new(name)))
            .collect();
        let mut pending = order.clone();
        let mut failures = Vec::new();
        let mut test_failures = Vec::new();
        let mut abandoned = Vec::new();
        let mut skipped = Vec::new();
        let mut stop = false;

        let pb = self.progress_bar(order.len());

        while !pending.is_empty() {
            if stop {
                for name in pending.drain(..) {
                    self.emit(BuildEvent::TargetSkipped {
                        target: name.clone(),
                    });
                    skipped.push(name);
                }
                break;
            }

            let wave = self.next_wave(descriptors, graph, &pending, &registry);
            if wave.is_empty() {
                tracing::error!("no runnable target among {}", pending.join(", "));
                skipped.append(&mut pending);
                break;
            }
            pending.retain(|name| !wave.contains(name));
            pb.set_message(wave.join(", "));

            let outcomes: Vec<Outcome> = if wave.len() > 1 {
                wave.par_iter()
                    .map(|name| self.run_target(descriptors, graph, &registry, name))
                    .collect()
            } else {
                wave.iter()
                    .map(|name| self.run_target(descriptors, graph, &registry, name))
                    .collect()
            };

            for outcome in outcomes {
                pb.inc(1);
                let record = outcome.record;
                let name = record.name().to_string();

                if let Some(exports) = outcome.exports {
                    if let Err(e) = registry.record(&name, exports) {
                        tracing::error!("{}", e);
                    }
                }

                match (record.state(), record.error()) {
                    (LifecycleState::Failed, Some(err)) => {
                        tracing::error!("{}", err);
                        self.emit(BuildEvent::TargetFailed {
                            target: name.clone(),
                            stage: err.stage().to_string(),
                            message: err.to_string(),
                        });
                        failures.push(err.clone());

                        for dependent in graph.transitive_dependents(&name) {
                            if let Some(pos) = pending.iter().position(|p| *p == dependent) {
                                pending.remove(pos);
                                tracing::warn!(
                                    "abandoning `{}`: dependency `{}` failed",
                                    dependent,
                                    name
                                );
                                self.emit(BuildEvent::TargetAbandoned {
                                    target: dependent.clone(),
                                    failed_dependency: name.clone(),
                                });
                                abandoned.push(Abandoned {
                                    target: dependent,
                                    failed_dependency: name.clone(),
                                });
                            }
                        }

                        if self.options.policy == FailurePolicy::FailFast {
                            stop = true;
                        }
                    }
                    (LifecycleState::TestedFailure, Some(err)) => {
                        tracing::error!("{}", err);
                        self.emit(BuildEvent::TargetFailed {
                            target: name.clone(),
                            stage: err.stage().to_string(),
                            message: err.to_string(),
                        });
                        test_failures.push(err.clone());
                    }
                    _ => {}
                }

                records.insert(name, record);
            }
        }

        pb.finish_and_clear();

        let records: Vec<TargetRecord> =
            order.iter().filter_map(|name| records.remove(name)).collect();
        let report = BuildReport {
            order,
            records,
            failures,
            test_failures,
            abandoned,
            skipped,
            exports: registry,
            duration: start.elapsed(),
        };

        self.emit(BuildEvent::finished(
            report.is_success(),
            report.duration.as_millis() as u64,
            report.packaged_count() as u64,
            report.failures.len() as u64,
        ));

        report
    }

    /// Ready targets for the next wave, in graph order.
    fn next_wave(
        &self,
        descriptors: &DescriptorSet,
        graph: &TargetGraph,
        pending: &[String],
        registry: &ExportRegistry,
    ) -> Vec<String> {
        let limit = self.options.jobs.max(1);
        let mut wave = Vec::new();
        let mut keys: HashSet<WorkspaceKey> = HashSet::new();

        for name in pending {
            if wave.len() >= limit {
                break;
            }
            if !graph.deps(name).iter().all(|dep| registry.is_packaged(dep)) {
                continue;
            }
            let key = match descriptors.get(name) {
                Some(descriptor) => WorkspaceKey::for_target(descriptor),
                None => WorkspaceKey::Isolated(name.clone()),
            };
            if !keys.insert(key) {
                continue;
            }
            wave.push(name.clone());
        }

        wave
    }

    fn run_target(
        &self,
        descriptors: &DescriptorSet,
        graph: &TargetGraph,
        registry: &ExportRegistry,
        name: &str,
    ) -> Outcome {
        let mut record = TargetRecord::new(name);

        let Some(descriptor) = descriptors.get(name) else {
            self.fail(
                &mut record,
                TargetError::ConfigurationError {
                    target: name.to_string(),
                    message: "no descriptor was loaded for this target".to_string(),
                },
            );
            return Outcome {
                record,
                exports: None,
            };
        };

        let exports = match self.drive(descriptor, graph, registry, &mut record) {
            Ok(exports) => exports,
            Err(err) => {
                self.fail(&mut record, err);
                return Outcome {
                    record,
                    exports: None,
                };
            }
        };

        self.test_stage(descriptor, graph, &mut record);

        Outcome {
            record,
            exports: Some(exports),
        }
    }

    /// Fetch, configure, build and package one target.
    fn drive(
        &self,
        descriptor: &TargetDescriptor,
        graph: &TargetGraph,
        registry: &ExportRegistry,
        record: &mut TargetRecord,
    ) -> Result<ExportSet, TargetError> {
        let name = descriptor.name();
        let deps = graph.deps(name);

        let source_dir = self.source_dir(descriptor)?;
        record.source_dir = Some(source_dir.clone());

        debug_assert!(deps.iter().all(|d| registry.is_packaged(d)));
        self.transition(record, LifecycleState::DependenciesResolved);

        let workspace =
            self.workspaces
                .assign(descriptor)
                .map_err(|e| TargetError::WorkspaceUnavailable {
                    target: name.to_string(),
                    path: e.path,
                    cause: e.cause,
                })?;
        record.workspace = Some(workspace.clone());

        let dirs = StageDirs {
            source: &source_dir,
            workspace: &workspace,
        };

        // configure
        let mut scope = ConfigureScope::new(name, dirs, deps, registry);
        descriptor
            .recipe()
            .configure(self.cfg, &mut scope)
            .map_err(|e| TargetError::ConfigurationError {
                target: name.to_string(),
                message: format!("{:#}", e),
            })?;
        let (options, builds) = scope.finish();
        record.options = options;
        self.transition(record, LifecycleState::Configured);

        // build
        if builds {
            let dependencies = deps
                .iter()
                .filter_map(|dep| registry.lookup(dep).ok().map(|e| (dep.as_str(), e)))
                .collect();
            let request = BuildRequest {
                target: name,
                source_dir: &source_dir,
                workspace: &workspace,
                options: &record.options,
                release: self.cfg.release,
                dependencies,
            };
            self.native
                .build(&request)
                .map_err(|e| TargetError::BuildStepFailure {
                    target: name.to_string(),
                    message: format!("{:#}", e),
                })?;
        } else {
            tracing::debug!("`{}` has nothing to build", name);
        }
        self.transition(record, LifecycleState::Built);

        // package
        let mut scope = PackageScope::new(name, dirs);
        descriptor
            .recipe()
            .package(self.cfg, &mut scope)
            .map_err(|e| TargetError::packaging(name, &e))?;
        let exports = scope.into_exports();
        self.transition(record, LifecycleState::Packaged);
        self.emit(BuildEvent::packaged(name, &exports));

        Ok(exports)
    }

    fn test_stage(&self, descriptor: &TargetDescriptor, graph: &TargetGraph, record: &mut TargetRecord) {
        let name = descriptor.name();
        let in_scope = match self.options.tests {
            TestScope::Root => name == graph.root(),
            TestScope::All => true,
        };
        let invocation = if self.cfg.tests_requested() && in_scope {
            descriptor.recipe().test(self.cfg)
        } else {
            None
        };

        let (Some(invocation), Some(source), Some(workspace)) =
            (invocation, record.source_dir.clone(), record.workspace.clone())
        else {
            self.transition(record, LifecycleState::Untested);
            return;
        };

        let dirs = StageDirs {
            source: &source,
            workspace: &workspace,
        };
        let mut args = invocation.args.clone();
        if let Some(extra) = &self.cfg.test_args {
            args.extend(extra.split_whitespace().map(String::from));
        }
        let request = TestRequest {
            target: name,
            command: resolve_test_command(dirs, &invocation),
            args,
            cwd: &workspace,
        };

        match self.tests.run(&request) {
            Ok(()) => self.transition(record, LifecycleState::TestedSuccess),
            Err(e) => {
                let from = record.state();
                record.fail_tests(TargetError::TestFailure {
                    target: name.to_string(),
                    message: format!("{:#}", e),
                });
                self.emit(BuildEvent::state(name, from, LifecycleState::TestedFailure));
            }
        }
    }

    /// Where the target's sources are; remote targets are fetched on demand.
    fn source_dir(&self, descriptor: &TargetDescriptor) -> Result<PathBuf, TargetError> {
        if let Some(dir) = descriptor.source_dir() {
            return Ok(dir.to_path_buf());
        }

        match descriptor.origin() {
            Origin::Remote { url, reference } => {
                self.fetcher
                    .fetch(url, reference)
                    .map_err(|e| TargetError::FetchFailure {
                        target: descriptor.name().to_string(),
                        url: url.to_string(),
                        message: format!("{:#}", e),
                    })
            }
            _ => Err(TargetError::ConfigurationError {
                target: descriptor.name().to_string(),
                message: "target has no source directory".to_string(),
            }),
        }
    }

    fn transition(&self, record: &mut TargetRecord, next: LifecycleState) {
        let from = record.state();
        record.advance(next);
        tracing::info!("{:>22} {}", next.as_str(), record.name());
        self.emit(BuildEvent::state(record.name(), from, next));
    }

    fn fail(&self, record: &mut TargetRecord, err: TargetError) {
        let from = record.state();
        record.fail(err);
        self.emit(BuildEvent::state(record.name(), from, LifecycleState::Failed));
    }

    fn emit(&self, event: BuildEvent) {
        if let Some(sink) = self.events {
            sink.emit(&event);
        }
    }

    fn progress_bar(&self, len: usize) -> ProgressBar {
        if !self.options.progress || len < 2 {
            return ProgressBar::hidden();
        }

        let pb = ProgressBar::new(len as u64);
        if let Ok(style) = ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
        {
            pb.set_style(style.progress_chars("#>-"));
        }
        pb
    }
}

/// Resolve a test command against the target's directories. A bare program
/// name with no such file is left for PATH lookup.
fn resolve_test_command(dirs: StageDirs<'_>, invocation: &TestInvocation) -> PathBuf {
    let command = invocation.command.as_path();
    if command.is_absolute() {
        return command.to_path_buf();
    }

    let resolved = dirs.resolve(invocation.base, command);
    if command.components().count() == 1 && !resolved.exists() {
        return command.to_path_buf();
    }
    resolved
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::report::ExitKind;
    use crate::core::recipe::{FnRecipe, PathBase};
    use crate::core::target::DependencySpec;
    use crate::core::{FeatureFlags, Platform};
    use crate::resolver::build_graph;
    use crate::test_support::*;
    use std::path::Path;
    use std::time::Duration;
    use tempfile::TempDir;

    struct Harness {
        tmp: TempDir,
        workspaces: WorkspaceManager,
        cfg: RunConfig,
        fetch: MockFetch,
        tests: MockTestRunner,
        sink: RecordingSink,
        options: ExecutorOptions,
    }

    impl Harness {
        fn new() -> Self {
            let tmp = TempDir::new().unwrap();
            let workspaces =
                WorkspaceManager::new(tmp.path().join("build"), tmp.path().join("shared"));
            Harness {
                tmp,
                workspaces,
                cfg: RunConfig::new(Platform::Linux),
                fetch: MockFetch::new(),
                tests: MockTestRunner::new(),
                sink: RecordingSink::new(),
                options: ExecutorOptions::default(),
            }
        }

        fn root(&self) -> &Path {
            self.tmp.path()
        }

        fn run(&self, descriptors: Vec<TargetDescriptor>, build: &RecordingBuild) -> BuildReport {
            let set = DescriptorSet::from_descriptors(descriptors).unwrap();
            let graph = build_graph(&set, "Root", &self.cfg).unwrap();
            LifecycleExecutor::new(&self.cfg, &self.workspaces, build, &self.fetch, &self.tests)
                .with_options(self.options)
                .with_events(&self.sink)
                .execute(&set, &graph)
        }
    }

    #[test]
    fn test_scenario_a_both_packaged() {
        let h = Harness::new();
        let build = RecordingBuild::new().produce("Lib", "libLib.a");
        let lib = local_target_with(h.root(), "Lib", &[], library_recipe(&["libLib.a"]));
        let root = root_target(h.root(), &["Lib"], FnRecipe::new());

        let report = h.run(vec![root, lib], &build);

        assert!(report.is_success());
        assert_eq!(report.order, ["Lib", "Root"]);
        assert_eq!(build.built_targets(), ["Lib", "Root"]);
        for name in ["Lib", "Root"] {
            let record = report.record(name).unwrap();
            assert!(record.reached(LifecycleState::Packaged), "{} not packaged", name);
            assert_eq!(record.state(), LifecycleState::Untested);
        }

        let root_call = &build.calls()[1];
        assert_eq!(root_call.dependencies, ["Lib"]);

        let lib_exports = report.exports.lookup("Lib").unwrap();
        assert_eq!(lib_exports.libs, [h.tmp.path().join("build/Lib/libLib.a")]);
        assert!(lib_exports
            .includes
            .contains(&source_dir(h.root(), "Lib").join("include")));
    }

    #[test]
    fn test_scenario_b_disabled_dependency() {
        let mut h = Harness::new();
        let lib_dir = source_dir(h.root(), "Lib");
        let root_recipe = FnRecipe::new()
            .on_dependencies(move |cfg| {
                if cfg.flags.get("NO_LIB") {
                    Vec::new()
                } else {
                    vec![DependencySpec::new("Lib", Origin::local(lib_dir.clone()))]
                }
            })
            .on_configure(|cfg, scope| {
                if cfg.flags.get("NO_LIB") {
                    scope.add_option("ROOT_USE_LIB=OFF");
                } else {
                    scope.add_option("ROOT_USE_LIB=ON");
                }
                Ok(())
            });
        let root = TargetDescriptor::new("Root", Origin::Root, root_recipe)
            .with_source_dir(h.root().join("src/Root"));
        let lib = local_target(h.root(), "Lib", &[]);
        h.cfg = h.cfg.clone().with_flags(FeatureFlags::new().with("NO_LIB", true));

        let build = RecordingBuild::new();
        let report = h.run(vec![root, lib], &build);

        assert!(report.is_success());
        assert_eq!(report.order, ["Root"]);
        assert_eq!(build.built_targets(), ["Root"]);
        assert_eq!(build.calls()[0].options, ["ROOT_USE_LIB=OFF"]);
    }

    #[test]
    fn test_scenario_d_first_existing_artifact_wins() {
        let h = Harness::new();
        let build = RecordingBuild::new().produce("Lib", "lib.so");
        let lib = local_target_with(h.root(), "Lib", &[], library_recipe(&["lib.a", "lib.so"]));
        let root = root_target(h.root(), &["Lib"], FnRecipe::new());

        let report = h.run(vec![root, lib], &build);

        assert!(report.is_success());
        let exports = report.exports.lookup("Lib").unwrap();
        assert_eq!(exports.libs, [h.tmp.path().join("build/Lib/lib.so")]);
    }

    #[test]
    fn test_scenario_d_missing_artifact_is_packaging_failure() {
        let h = Harness::new();
        let build = RecordingBuild::new();
        let lib = local_target_with(h.root(), "Lib", &[], library_recipe(&["lib.a", "lib.so"]));
        let root = root_target(h.root(), &["Lib"], FnRecipe::new());

        let report = h.run(vec![root, lib], &build);

        assert_eq!(report.exit_kind(), ExitKind::BuildFailure);
        match &report.failures[0] {
            TargetError::PackagingFailure {
                target, candidates, ..
            } => {
                assert_eq!(target, "Lib");
                assert_eq!(candidates, &["lib.a", "lib.so"]);
            }
            other => panic!("unexpected failure {:?}", other),
        }
        assert_eq!(report.state("Lib"), Some(LifecycleState::Failed));
        assert!(!report.exports.is_packaged("Lib"));
    }

    #[test]
    fn test_scenario_e_failed_dependency_abandons_dependent() {
        let h = Harness::new();
        let build = RecordingBuild::new().fail("Lib");
        let lib = local_target(h.root(), "Lib", &[]);
        let root = root_target(h.root(), &["Lib"], FnRecipe::new());

        let report = h.run(vec![root, lib], &build);

        assert_eq!(report.failed_targets(), ["Lib"]);
        assert!(matches!(
            report.failures[0],
            TargetError::BuildStepFailure { .. }
        ));
        assert_eq!(
            report.abandoned,
            [Abandoned {
                target: "Root".into(),
                failed_dependency: "Lib".into()
            }]
        );

        let root = report.record("Root").unwrap();
        assert!(!root.reached(LifecycleState::Configured));
        assert_eq!(root.state(), LifecycleState::Unresolved);
        assert_eq!(build.built_targets(), ["Lib"]);
        assert_eq!(report.exit_kind().code(), 3);
    }

    #[test]
    fn test_configured_only_after_dependencies_packaged() {
        let mut h = Harness::new();
        h.options.jobs = 4;
        let build = RecordingBuild::new().with_delay(Duration::from_millis(5));
        let descriptors = vec![
            root_target(h.root(), &["App", "Tools"], FnRecipe::new()),
            local_target(h.root(), "App", &["Gfx", "Net"]),
            local_target(h.root(), "Tools", &["Net"]),
            local_target(h.root(), "Gfx", &["Core"]),
            local_target(h.root(), "Net", &["Core"]),
            local_target(h.root(), "Core", &[]),
        ];
        let set = DescriptorSet::from_descriptors(descriptors.clone()).unwrap();
        let graph = build_graph(&set, "Root", &h.cfg).unwrap();

        let report = h.run(descriptors, &build);
        assert!(report.is_success());

        for (dependent, dependency) in graph.edges() {
            let configured = h.sink.position_of(dependent, LifecycleState::Configured).unwrap();
            let packaged = h.sink.position_of(dependency, LifecycleState::Packaged).unwrap();
            assert!(
                packaged < configured,
                "`{}` configured before `{}` was packaged",
                dependent,
                dependency
            );
        }
    }

    #[test]
    fn test_shared_workspace_never_runs_concurrently() {
        let mut h = Harness::new();
        h.options.jobs = 4;
        let build = RecordingBuild::new().with_delay(Duration::from_millis(20));
        let a = local_target(h.root(), "A", &[]).with_global_workspace("wolf3d");
        let b = local_target(h.root(), "B", &[]).with_global_workspace("wolf3d");
        let c = local_target(h.root(), "C", &[]);
        let root = root_target(h.root(), &["A", "B", "C"], FnRecipe::new());

        let report = h.run(vec![root, a, b, c], &build);

        assert!(report.is_success());
        assert!(!build.saw_workspace_overlap());
        let shared = h.tmp.path().join("shared/wolf3d");
        assert_eq!(report.record("A").unwrap().workspace.as_deref(), Some(shared.as_path()));
        assert_eq!(report.record("B").unwrap().workspace.as_deref(), Some(shared.as_path()));
    }

    #[test]
    fn test_fail_fast_skips_unrelated_targets() {
        let h = Harness::new();
        let build = RecordingBuild::new().fail("A");
        let descriptors = vec![
            root_target(h.root(), &["A", "B"], FnRecipe::new()),
            local_target(h.root(), "A", &[]),
            local_target(h.root(), "B", &[]),
        ];

        let report = h.run(descriptors, &build);

        assert_eq!(report.failed_targets(), ["A"]);
        assert_eq!(report.skipped, ["B"]);
        assert_eq!(report.abandoned.len(), 1);
        assert_eq!(build.built_targets(), ["A"]);
    }

    #[test]
    fn test_keep_going_builds_unrelated_targets() {
        let mut h = Harness::new();
        h.options.policy = FailurePolicy::KeepGoing;
        let build = RecordingBuild::new().fail("A");
        let descriptors = vec![
            root_target(h.root(), &["A", "B"], FnRecipe::new()),
            local_target(h.root(), "A", &[]),
            local_target(h.root(), "B", &[]),
        ];

        let report = h.run(descriptors, &build);

        assert_eq!(report.failed_targets(), ["A"]);
        assert!(report.skipped.is_empty());
        assert!(report.record("B").unwrap().reached(LifecycleState::Packaged));
        assert_eq!(report.abandoned[0].target, "Root");
        assert_eq!(build.built_targets(), ["A", "B"]);
    }

    #[test]
    fn test_test_failure_does_not_cascade() {
        let mut h = Harness::new();
        h.cfg = h.cfg.clone().with_tests(Some("--gtest_filter=Mesh*".into()));
        h.options.tests = TestScope::All;
        h.tests = MockTestRunner::new().fail("Lib");

        let with_tests = || {
            FnRecipe::new().on_test(|_| {
                Some(TestInvocation::new("bin/RunTests").with_base(PathBase::Build))
            })
        };
        let lib = local_target_with(h.root(), "Lib", &[], with_tests());
        let root = root_target(h.root(), &["Lib"], with_tests());
        let build = RecordingBuild::new();

        let report = h.run(vec![root, lib], &build);

        assert_eq!(report.state("Lib"), Some(LifecycleState::TestedFailure));
        assert_eq!(report.state("Root"), Some(LifecycleState::TestedSuccess));
        assert!(report.failures.is_empty());
        assert_eq!(report.test_failures.len(), 1);
        assert_eq!(report.exit_kind(), ExitKind::TestFailure);
        assert!(report.exports.is_packaged("Lib"));

        let calls = h.tests.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[1].command, h.tmp.path().join("build/Root/bin/RunTests"));
        assert_eq!(calls[1].args, ["--gtest_filter=Mesh*"]);
    }

    #[test]
    fn test_tests_only_run_for_root_by_default() {
        let mut h = Harness::new();
        h.cfg = h.cfg.clone().with_tests(Some(String::new()));
        let with_tests = || FnRecipe::new().on_test(|_| Some(TestInvocation::new("ctest")));
        let lib = local_target_with(h.root(), "Lib", &[], with_tests());
        let root = root_target(h.root(), &["Lib"], with_tests());

        let report = h.run(vec![root, lib], &RecordingBuild::new());

        assert_eq!(report.state("Lib"), Some(LifecycleState::Untested));
        assert_eq!(report.state("Root"), Some(LifecycleState::TestedSuccess));
        assert_eq!(h.tests.calls()[0].command, PathBuf::from("ctest"));
    }

    #[test]
    fn test_untested_when_tests_not_requested() {
        let h = Harness::new();
        let recipe = FnRecipe::new().on_test(|_| Some(TestInvocation::new("ctest")));
        let report = h.run(vec![root_target(h.root(), &[], recipe)], &RecordingBuild::new());

        assert_eq!(report.state("Root"), Some(LifecycleState::Untested));
        assert!(h.tests.calls().is_empty());
    }

    #[test]
    fn test_configure_reads_dependency_exports() {
        let h = Harness::new();
        let build = RecordingBuild::new().produce("Lib", "libLib.a");
        let lib = local_target_with(h.root(), "Lib", &[], library_recipe(&["libLib.a"]));
        let root_recipe = FnRecipe::new().on_configure(|_, scope| {
            let lib = scope.dependency_exports("Lib")?;
            let path = lib.libs[0].display().to_string();
            scope.add_option(format!("LIB_PATH={}", path));
            Ok(())
        });
        let root = root_target(h.root(), &["Lib"], root_recipe);

        h.run(vec![root, lib], &build);

        let expected = format!("LIB_PATH={}", h.tmp.path().join("build/Lib/libLib.a").display());
        assert_eq!(build.calls()[1].options, [expected]);
    }

    #[test]
    fn test_configure_error_fails_target() {
        let h = Harness::new();
        let recipe = FnRecipe::new().on_configure(|_, _| anyhow::bail!("FBX SDK not found"));
        let report = h.run(vec![root_target(h.root(), &[], recipe)], &RecordingBuild::new());

        match &report.failures[0] {
            TargetError::ConfigurationError { target, message } => {
                assert_eq!(target, "Root");
                assert!(message.contains("FBX SDK not found"));
            }
            other => panic!("unexpected failure {:?}", other),
        }
    }

    #[test]
    fn test_nothing_to_build_skips_native_step() {
        let h = Harness::new();
        let recipe = FnRecipe::new().on_configure(|_, scope| {
            scope.nothing_to_build();
            Ok(())
        });
        let report = h.run(vec![root_target(h.root(), &[], recipe)], &RecordingBuild::new().fail("Root"));

        assert!(report.is_success());
        assert!(report.record("Root").unwrap().reached(LifecycleState::Built));
    }

    #[test]
    fn test_fetch_failure_aborts_subtree() {
        let h = Harness::new();
        let remote = Origin::remote("https://github.com/RedFox20/ReCpp.git").unwrap();
        let recpp = TargetDescriptor::new("ReCpp", remote.clone(), FnRecipe::new());
        let root = TargetDescriptor::new(
            "Root",
            Origin::Root,
            FnRecipe::new().with_dependencies(vec![DependencySpec::new("ReCpp", remote)]),
        )
        .with_source_dir(h.root());

        let report = h.run(vec![root, recpp], &RecordingBuild::new());

        assert!(matches!(
            report.failures[0],
            TargetError::FetchFailure { ref target, .. } if target == "ReCpp"
        ));
        assert_eq!(report.abandoned[0].target, "Root");
        assert_eq!(h.fetch.calls(), ["https://github.com/RedFox20/ReCpp.git"]);
    }

    #[test]
    fn test_fetched_source_is_used() {
        let mut h = Harness::new();
        let checkout = h.tmp.path().join("checkout");
        std::fs::create_dir_all(&checkout).unwrap();
        h.fetch = MockFetch::new().serve("https://github.com/RedFox20/ReCpp.git", &checkout);

        let remote = Origin::remote("https://github.com/RedFox20/ReCpp.git").unwrap();
        let recpp = TargetDescriptor::new("ReCpp", remote.clone(), FnRecipe::new());
        let root = TargetDescriptor::new(
            "Root",
            Origin::Root,
            FnRecipe::new().with_dependencies(vec![DependencySpec::new("ReCpp", remote)]),
        )
        .with_source_dir(h.root());

        let report = h.run(vec![root, recpp], &RecordingBuild::new());

        assert!(report.is_success());
        assert_eq!(
            report.record("ReCpp").unwrap().source_dir.as_deref(),
            Some(checkout.as_path())
        );
    }

    #[test]
    fn test_workspace_unavailable_aborts_subtree() {
        let mut h = Harness::new();
        let blocker = h.tmp.path().join("blocked");
        std::fs::write(&blocker, "file").unwrap();
        h.workspaces = WorkspaceManager::new(&blocker, h.tmp.path().join("shared"));
        h.options.policy = FailurePolicy::KeepGoing;

        let lib = local_target(h.root(), "Lib", &[]);
        let shared = local_target(h.root(), "Shared", &[]).with_global_workspace("common");
        let root = root_target(h.root(), &["Lib", "Shared"], FnRecipe::new());

        let report = h.run(vec![root, lib, shared], &RecordingBuild::new());

        assert!(matches!(
            report.failures[0],
            TargetError::WorkspaceUnavailable { ref target, .. } if target == "Lib"
        ));
        assert!(report.record("Shared").unwrap().reached(LifecycleState::Packaged));
        assert_eq!(report.abandoned[0].target, "Root");
    }

    #[test]
    fn test_runs_are_deterministic() {
        let h = Harness::new();
        let make = |h: &Harness| {
            vec![
                root_target(h.root(), &["B", "A"], FnRecipe::new()),
                local_target_with(h.root(), "A", &["C"], library_recipe(&[".a"])),
                local_target_with(h.root(), "B", &["C"], library_recipe(&[".a"])),
                local_target_with(h.root(), "C", &[], library_recipe(&[".a"])),
            ]
        };
        let build = || {
            RecordingBuild::new()
                .produce("A", "libA.a")
                .produce("B", "libB.a")
                .produce("C", "libC.a")
        };

        let first = h.run(make(&h), &build());
        let second = h.run(make(&h), &build());

        assert_eq!(first.order, second.order);
        assert_eq!(first.order, ["C", "B", "A", "Root"]);
        for name in ["A", "B", "C"] {
            assert_eq!(
                first.exports.lookup(name).unwrap(),
                second.exports.lookup(name).unwrap()
            );
        }
    }

    #[test]
    fn test_events_bracket_the_run() {
        let h = Harness::new();
        h.run(vec![root_target(h.root(), &[], FnRecipe::new())], &RecordingBuild::new());

        let events = h.sink.events();
        assert!(matches!(events.first(), Some(BuildEvent::BuildStarted { .. })));
        assert!(matches!(
            events.last(),
            Some(BuildEvent::BuildFinished { success: true, .. })
        ));
    }
}
