//! Build report - the outcome of one executor run.

use std::time::Duration;

use crate::builder::errors::TargetError;
use crate::builder::lifecycle::{LifecycleState, TargetRecord};
use crate::core::export::ExportRegistry;

/// How a run ended, for scripting consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitKind {
    Success,
    /// Unresolved or cyclic dependencies, or an invalid configuration
    ResolutionError,
    /// A fetch, workspace, configure, build or package stage failed
    BuildFailure,
    /// Everything packaged, but at least one test run failed
    TestFailure,
}

impl ExitKind {
    pub fn code(self) -> i32 {
        match self {
            ExitKind::Success => 0,
            ExitKind::ResolutionError => 2,
            ExitKind::BuildFailure => 3,
            ExitKind::TestFailure => 4,
        }
    }
}

/// A target never entered because a dependency failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Abandoned {
    pub target: String,
    pub failed_dependency: String,
}

/// Result of executing a target graph.
#[derive(Debug, Clone)]
pub struct BuildReport {
    /// Execution order of the graph
    pub order: Vec<String>,

    /// One record per target, in execution order
    pub records: Vec<TargetRecord>,

    /// Targets that reached `Failed`
    pub failures: Vec<TargetError>,

    /// Targets whose tests failed; they stay packaged
    pub test_failures: Vec<TargetError>,

    pub abandoned: Vec<Abandoned>,

    /// Targets never started because fail-fast stopped the run
    pub skipped: Vec<String>,

    /// Exports of every packaged target
    pub exports: ExportRegistry,

    pub duration: Duration,
}

impl BuildReport {
    pub fn record(&self, target: &str) -> Option<&TargetRecord> {
        self.records.iter().find(|r| r.name() == target)
    }

    pub fn state(&self, target: &str) -> Option<LifecycleState> {
        self.record(target).map(TargetRecord::state)
    }

    /// Names of targets that reached `Failed`, in execution order.
    pub fn failed_targets(&self) -> Vec<&str> {
        self.failures.iter().map(TargetError::target).collect()
    }

    pub fn packaged_count(&self) -> usize {
        self.records
            .iter()
            .filter(|r| r.state().is_packaged())
            .count()
    }

    /// Every target packaged and every requested test passed.
    pub fn is_success(&self) -> bool {
        self.exit_kind() == ExitKind::Success
    }

    pub fn exit_kind(&self) -> ExitKind {
        if !self.failures.is_empty() || !self.abandoned.is_empty() || !self.skipped.is_empty() {
            ExitKind::BuildFailure
        } else if !self.test_failures.is_empty() {
            ExitKind::TestFailure
        } else {
            ExitKind::Success
        }
    }
}
