//! Test utilities and mocks for Mast unit tests.
//!
//! Recording implementations of the executor's boundary contracts (native
//! build, fetch, test runner, event sink), so lifecycle behaviour can be
//! tested without CMake, git or a network.

pub mod fixtures;

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use anyhow::{bail, Result};
use url::Url;

use crate::builder::events::{BuildEvent, EventSink};
use crate::builder::steps::{BuildRequest, Fetch, NativeBuild, TestRequest, TestRunner};
use crate::core::target::GitReference;

// Re-export fixtures for convenience
pub use fixtures::*;

/// One call to [`RecordingBuild`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildCall {
    pub target: String,
    pub options: Vec<String>,
    /// Dependencies whose exports were handed to the build
    pub dependencies: Vec<String>,
    pub workspace: PathBuf,
}

/// Native build mock: records calls, creates declared artifacts and fails
/// on request.
#[derive(Debug, Default)]
pub struct RecordingBuild {
    calls: Mutex<Vec<BuildCall>>,
    failing: HashSet<String>,
    artifacts: HashMap<String, Vec<String>>,
    active: Mutex<HashSet<PathBuf>>,
    overlap: AtomicBool,
    delay: Duration,
}

impl RecordingBuild {
    pub fn new() -> Self {
        RecordingBuild::default()
    }

    /// Make the build of `target` fail.
    pub fn fail(mut self, target: &str) -> Self {
        self.failing.insert(target.to_string());
        self
    }

    /// Create `file` in the workspace of `target` when it builds.
    pub fn produce(mut self, target: &str, file: &str) -> Self {
        self.artifacts
            .entry(target.to_string())
            .or_default()
            .push(file.to_string());
        self
    }

    /// Hold each build for a while, so concurrent builds overlap in time.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> Vec<BuildCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn built_targets(&self) -> Vec<String> {
        self.calls().into_iter().map(|c| c.target).collect()
    }

    /// Whether two builds ever ran in one workspace at the same time.
    pub fn saw_workspace_overlap(&self) -> bool {
        self.overlap.load(Ordering::SeqCst)
    }
}

impl NativeBuild for RecordingBuild {
    fn build(&self, request: &BuildRequest<'_>) -> Result<()> {
        self.calls.lock().unwrap().push(BuildCall {
            target: request.target.to_string(),
            options: request.options.to_vec(),
            dependencies: request
                .dependencies
                .iter()
                .map(|(name, _)| name.to_string())
                .collect(),
            workspace: request.workspace.to_path_buf(),
        });

        if !self.active.lock().unwrap().insert(request.workspace.to_path_buf()) {
            self.overlap.store(true, Ordering::SeqCst);
        }
        if !self.delay.is_zero() {
            std::thread::sleep(self.delay);
        }
        self.active.lock().unwrap().remove(request.workspace);

        if self.failing.contains(request.target) {
            bail!("compiler exited with status 2");
        }

        for file in self.artifacts.get(request.target).into_iter().flatten() {
            std::fs::write(request.workspace.join(file), b"artifact")?;
        }
        Ok(())
    }
}

/// Fetch mock: known URLs map to local directories, everything else fails.
#[derive(Debug, Default)]
pub struct MockFetch {
    checkouts: HashMap<String, PathBuf>,
    calls: Mutex<Vec<String>>,
}

impl MockFetch {
    pub fn new() -> Self {
        MockFetch::default()
    }

    pub fn serve(mut self, url: &str, dir: impl Into<PathBuf>) -> Self {
        self.checkouts.insert(url.to_string(), dir.into());
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

impl Fetch for MockFetch {
    fn fetch(&self, url: &Url, _reference: &GitReference) -> Result<PathBuf> {
        self.calls.lock().unwrap().push(url.to_string());
        match self.checkouts.get(url.as_str()) {
            Some(dir) => Ok(dir.clone()),
            None => bail!("could not reach {}", url),
        }
    }
}

/// One call to [`MockTestRunner`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestCall {
    pub target: String,
    pub command: PathBuf,
    pub args: Vec<String>,
}

/// Test runner mock.
#[derive(Debug, Default)]
pub struct MockTestRunner {
    failing: HashSet<String>,
    calls: Mutex<Vec<TestCall>>,
}

impl MockTestRunner {
    pub fn new() -> Self {
        MockTestRunner::default()
    }

    pub fn fail(mut self, target: &str) -> Self {
        self.failing.insert(target.to_string());
        self
    }

    pub fn calls(&self) -> Vec<TestCall> {
        self.calls.lock().unwrap().clone()
    }
}

impl TestRunner for MockTestRunner {
    fn run(&self, request: &TestRequest<'_>) -> Result<()> {
        self.calls.lock().unwrap().push(TestCall {
            target: request.target.to_string(),
            command: request.command.clone(),
            args: request.args.clone(),
        });
        if self.failing.contains(request.target) {
            bail!("1 test failed");
        }
        Ok(())
    }
}

/// Event sink keeping every event in memory.
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<BuildEvent>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        RecordingSink::default()
    }

    pub fn events(&self) -> Vec<BuildEvent> {
        self.events.lock().unwrap().clone()
    }

    /// Index of the first state change of `target` into `state`.
    pub fn position_of(&self, target: &str, state: crate::builder::LifecycleState) -> Option<usize> {
        self.events().iter().position(|e| {
            matches!(e, BuildEvent::TargetState { target: t, to, .. } if t == target && *to == state)
        })
    }
}

impl EventSink for RecordingSink {
    fn emit(&self, event: &BuildEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}
