//! Per-target runtime errors.
//!
//! Each of these aborts only the failing target's subtree. `TestFailure` is
//! recorded but never cascades.

use std::path::PathBuf;

use thiserror::Error;

use crate::core::export::ExportError;
use crate::util::diagnostic::{suggestions, Diagnostic};

/// A failure of one target during execution.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TargetError {
    #[error("failed to fetch `{target}` from {url}: {message}")]
    FetchFailure {
        target: String,
        url: String,
        message: String,
    },

    #[error("workspace {} for `{target}` is unavailable: {cause}", .path.display())]
    WorkspaceUnavailable {
        target: String,
        path: PathBuf,
        cause: String,
    },

    #[error("failed to configure `{target}`: {message}")]
    ConfigurationError { target: String, message: String },

    #[error("build step for `{target}` failed: {message}")]
    BuildStepFailure { target: String, message: String },

    #[error("failed to package `{target}`: {message}")]
    PackagingFailure {
        target: String,
        message: String,
        /// Directory searched for library artifacts, when that was the cause
        dir: Option<PathBuf>,
        candidates: Vec<String>,
    },

    #[error("tests for `{target}` failed: {message}")]
    TestFailure { target: String, message: String },
}

impl TargetError {
    /// Build a packaging failure from whatever the package stage returned.
    pub fn packaging(target: &str, err: &anyhow::Error) -> Self {
        match err.downcast_ref::<ExportError>() {
            Some(ExportError::NoMatchingArtifact { dir, candidates }) => {
                TargetError::PackagingFailure {
                    target: target.to_string(),
                    message: err.to_string(),
                    dir: Some(dir.clone()),
                    candidates: candidates.clone(),
                }
            }
            _ => TargetError::PackagingFailure {
                target: target.to_string(),
                message: format!("{:#}", err),
                dir: None,
                candidates: Vec::new(),
            },
        }
    }

    /// Name of the target that failed.
    pub fn target(&self) -> &str {
        match self {
            TargetError::FetchFailure { target, .. }
            | TargetError::WorkspaceUnavailable { target, .. }
            | TargetError::ConfigurationError { target, .. }
            | TargetError::BuildStepFailure { target, .. }
            | TargetError::PackagingFailure { target, .. }
            | TargetError::TestFailure { target, .. } => target,
        }
    }

    /// Short name of the stage that failed.
    pub fn stage(&self) -> &'static str {
        match self {
            TargetError::FetchFailure { .. } => "fetch",
            TargetError::WorkspaceUnavailable { .. } => "workspace",
            TargetError::ConfigurationError { .. } => "configure",
            TargetError::BuildStepFailure { .. } => "build",
            TargetError::PackagingFailure { .. } => "package",
            TargetError::TestFailure { .. } => "test",
        }
    }

    pub fn is_test_failure(&self) -> bool {
        matches!(self, TargetError::TestFailure { .. })
    }

    /// Convert to a user-friendly diagnostic.
    pub fn to_diagnostic(&self) -> Diagnostic {
        let diag = Diagnostic::error(self.to_string());
        match self {
            TargetError::FetchFailure { .. } => diag.with_suggestion(suggestions::FETCH_FAILED),
            TargetError::WorkspaceUnavailable { path, .. } => diag.with_suggestion(format!(
                "Check that {} is writable",
                path.display()
            )),
            TargetError::PackagingFailure {
                dir: Some(dir),
                candidates,
                ..
            } => diag
                .with_context(format!("searched {}", dir.display()))
                .with_context(format!("candidates: {}", candidates.join(", ")))
                .with_suggestion("Check that the build produced one of the listed artifacts"),
            TargetError::TestFailure { .. } => diag,
            _ => diag.with_suggestion(suggestions::BUILD_FAILED),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_packaging_from_missing_artifact() {
        let err = anyhow::Error::new(ExportError::NoMatchingArtifact {
            dir: PathBuf::from("/ws/Lib"),
            candidates: vec!["lib.a".into(), "lib.so".into()],
        });

        let target_err = TargetError::packaging("Lib", &err);
        match &target_err {
            TargetError::PackagingFailure { dir, candidates, .. } => {
                assert_eq!(dir.as_deref(), Some(std::path::Path::new("/ws/Lib")));
                assert_eq!(candidates, &["lib.a", "lib.so"]);
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(target_err.target(), "Lib");
        assert_eq!(target_err.stage(), "package");

        let output = target_err.to_diagnostic().format(false);
        assert!(output.contains("candidates: lib.a, lib.so"));
    }

    #[test]
    fn test_only_test_failure_is_test_failure() {
        let test = TargetError::TestFailure {
            target: "App".into(),
            message: "exit status 1".into(),
        };
        let build = TargetError::BuildStepFailure {
            target: "App".into(),
            message: "exit status 1".into(),
        };
        assert!(test.is_test_failure());
        assert!(!build.is_test_failure());
    }
}
