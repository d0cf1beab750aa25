//! Per-target lifecycle state machine.

use std::fmt;
use std::path::PathBuf;

use serde::Serialize;

use crate::builder::errors::TargetError;

/// Lifecycle state of one target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum LifecycleState {
    Unresolved,
    DependenciesResolved,
    Configured,
    Built,
    Packaged,
    TestedSuccess,
    TestedFailure,
    Untested,
    Failed,
}

impl LifecycleState {
    /// Whether `self -> next` is a legal transition.
    pub fn can_transition_to(self, next: LifecycleState) -> bool {
        use LifecycleState::*;

        match (self, next) {
            (Unresolved, DependenciesResolved)
            | (DependenciesResolved, Configured)
            | (Configured, Built)
            | (Built, Packaged)
            | (Packaged, TestedSuccess)
            | (Packaged, TestedFailure)
            | (Packaged, Untested) => true,
            (from, Failed) => !from.is_terminal(),
            _ => false,
        }
    }

    /// No transition leaves a terminal state.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            LifecycleState::TestedSuccess
                | LifecycleState::TestedFailure
                | LifecycleState::Untested
                | LifecycleState::Failed
        )
    }

    /// Packaged, or one of the test outcomes that follow it.
    pub fn is_packaged(self) -> bool {
        matches!(
            self,
            LifecycleState::Packaged
                | LifecycleState::TestedSuccess
                | LifecycleState::TestedFailure
                | LifecycleState::Untested
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            LifecycleState::Unresolved => "unresolved",
            LifecycleState::DependenciesResolved => "dependencies-resolved",
            LifecycleState::Configured => "configured",
            LifecycleState::Built => "built",
            LifecycleState::Packaged => "packaged",
            LifecycleState::TestedSuccess => "tested-success",
            LifecycleState::TestedFailure => "tested-failure",
            LifecycleState::Untested => "untested",
            LifecycleState::Failed => "failed",
        }
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything the executor learned about one target during a run.
#[derive(Debug, Clone)]
pub struct TargetRecord {
    name: String,
    state: LifecycleState,
    history: Vec<LifecycleState>,
    error: Option<TargetError>,

    /// Source directory, once fetched or known
    pub source_dir: Option<PathBuf>,

    /// Assigned workspace, once known
    pub workspace: Option<PathBuf>,

    /// Build options produced by the configure stage
    pub options: Vec<String>,
}

impl TargetRecord {
    pub fn new(name: impl Into<String>) -> Self {
        TargetRecord {
            name: name.into(),
            state: LifecycleState::Unresolved,
            history: vec![LifecycleState::Unresolved],
            error: None,
            source_dir: None,
            workspace: None,
            options: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    /// Every state the target has been in, in order.
    pub fn history(&self) -> &[LifecycleState] {
        &self.history
    }

    pub fn error(&self) -> Option<&TargetError> {
        self.error.as_ref()
    }

    /// Whether the target was ever in `state`.
    pub fn reached(&self, state: LifecycleState) -> bool {
        self.history.contains(&state)
    }

    /// Move to the next state.
    pub fn advance(&mut self, next: LifecycleState) {
        debug_assert!(
            self.state.can_transition_to(next),
            "illegal transition for `{}`: {} -> {}",
            self.name,
            self.state,
            next
        );
        self.state = next;
        self.history.push(next);
    }

    /// Enter `Failed`, keeping the cause.
    pub fn fail(&mut self, error: TargetError) {
        self.advance(LifecycleState::Failed);
        self.error = Some(error);
    }

    /// Record a failed test run. The target stays packaged.
    pub fn fail_tests(&mut self, error: TargetError) {
        self.advance(LifecycleState::TestedFailure);
        self.error = Some(error);
    }
}
