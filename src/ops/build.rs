//! Implementation of `mast build` and `mast test`.

use anyhow::Result;

use crate::builder::{
    BuildReport, CMakeStep, CommandTestRunner, EventSink, ExecutorOptions, FailurePolicy,
    LifecycleExecutor, TestScope,
};
use crate::ops::resolve::{RunOptions, Session};
use crate::util::GlobalContext;

/// Options for the build command.
#[derive(Debug, Clone, Default)]
pub struct BuildOptions {
    pub run: RunOptions,

    /// Number of targets built at once (defaults to config, then 1)
    pub jobs: Option<usize>,

    /// Keep building unrelated targets after a failure
    pub keep_going: bool,

    /// Which targets run tests when tests are requested
    pub tests: TestScope,

    /// Show a progress bar
    pub progress: bool,
}

/// Load, resolve and execute the graph, then persist the export registry.
///
/// Errors are returned only for whole-run failures (configuration,
/// resolution, IO); per-target failures are part of the report.
pub fn build(
    ctx: &GlobalContext,
    opts: &BuildOptions,
    events: Option<&dyn EventSink>,
) -> Result<BuildReport> {
    let session = Session::open(ctx, &opts.run)?;
    let loaded = session.load()?;
    let graph = session.graph(&loaded, opts.run.target.as_deref())?;

    tracing::info!(
        "building `{}` ({} targets, {})",
        graph.root(),
        graph.len(),
        session.cfg.platform
    );

    let config = &session.config;
    let native = CMakeStep::new()
        .with_cmake(config.build.cmake.clone())
        .with_generator(config.build.generator.clone());
    let workspaces = session.workspaces();
    let runner = CommandTestRunner;

    let keep_going = opts.keep_going || config.build.keep_going.unwrap_or(false);
    let options = ExecutorOptions {
        jobs: opts.jobs.or(config.build.jobs).unwrap_or(1).max(1),
        policy: if keep_going {
            FailurePolicy::KeepGoing
        } else {
            FailurePolicy::FailFast
        },
        tests: opts.tests,
        progress: opts.progress,
    };

    let mut executor =
        LifecycleExecutor::new(&session.cfg, &workspaces, &native, session.fetcher(), &runner)
            .with_options(options);
    if let Some(sink) = events {
        executor = executor.with_events(sink);
    }

    let report = executor.execute(&loaded.descriptors, &graph);
    report.exports.save(&session.project.exports_path())?;

    Ok(report)
}
