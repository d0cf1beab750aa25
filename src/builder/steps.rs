//! Boundary contracts of the executor: native build, fetch and test.
//!
//! The executor treats each of these as an opaque call that succeeds or
//! fails. Implementations live in [`cmake`](crate::builder::cmake) and
//! [`sources`](crate::sources); tests substitute recording mocks.

use std::path::{Path, PathBuf};

use anyhow::Result;
use url::Url;

use crate::core::export::ExportSet;
use crate::core::target::GitReference;
use crate::util::process::ProcessBuilder;

/// Everything a native build step is told about one target.
#[derive(Debug, Clone)]
pub struct BuildRequest<'a> {
    pub target: &'a str,
    pub source_dir: &'a Path,
    pub workspace: &'a Path,
    /// Options produced by the configure stage, in order
    pub options: &'a [String],
    pub release: bool,
    /// Exports of the target's direct dependencies, in declared order
    pub dependencies: Vec<(&'a str, &'a ExportSet)>,
}

/// Compiles one configured target.
pub trait NativeBuild: Send + Sync {
    fn build(&self, request: &BuildRequest<'_>) -> Result<()>;
}

/// Materializes the source of a remote target.
pub trait Fetch: Send + Sync {
    /// Returns the local checkout directory.
    fn fetch(&self, url: &Url, reference: &GitReference) -> Result<PathBuf>;
}

/// A resolved test command.
#[derive(Debug, Clone)]
pub struct TestRequest<'a> {
    pub target: &'a str,
    pub command: PathBuf,
    /// Fixed arguments followed by the run's free-form arguments
    pub args: Vec<String>,
    pub cwd: &'a Path,
}

/// Runs a target's tests.
pub trait TestRunner: Send + Sync {
    fn run(&self, request: &TestRequest<'_>) -> Result<()>;
}

/// Runs the test command as a subprocess in the target's workspace.
#[derive(Debug, Clone, Copy, Default)]
pub struct CommandTestRunner;

impl TestRunner for CommandTestRunner {
    fn run(&self, request: &TestRequest<'_>) -> Result<()> {
        let cmd = ProcessBuilder::new(&request.command)
            .args(&request.args)
            .cwd(request.cwd);

        tracing::info!("Testing `{}`: {}", request.target, cmd.display_command());

        cmd.exec_and_check()?;
        Ok(())
    }
}
