//! Resolution error types and diagnostics.

use thiserror::Error;

use crate::util::diagnostic::{suggestions, Diagnostic};

/// Error while building the target graph.
///
/// These are whole-graph properties: any of them aborts the run before a
/// single target executes.
#[derive(Debug, Clone, PartialEq, Eq, Error, miette::Diagnostic)]
pub enum ResolveError {
    #[error("unresolved dependency `{name}` required by `{required_by}`")]
    #[diagnostic(
        code(mast::resolve::unresolved),
        help("declare `{name}` with a `git` or `path` source")
    )]
    UnresolvedDependency { name: String, required_by: String },

    #[error("cyclic dependency: {}", .path.join(" -> "))]
    #[diagnostic(
        code(mast::resolve::cycle),
        help("break the cycle by removing one of the dependencies")
    )]
    CyclicDependency { path: Vec<String> },

    #[error("target `{name}` is defined more than once")]
    #[diagnostic(code(mast::resolve::duplicate))]
    DuplicateTarget { name: String },

    #[error("target `{name}` is declared with two different sources: {first} and {second}")]
    #[diagnostic(
        code(mast::resolve::ambiguous),
        help("make every declaration of `{name}` use the same source")
    )]
    AmbiguousTarget {
        name: String,
        first: String,
        second: String,
    },

    #[error("root target `{name}` is not among the loaded targets")]
    #[diagnostic(code(mast::resolve::unknown_root))]
    UnknownRoot { name: String },
}

impl ResolveError {
    /// Convert to a user-friendly diagnostic.
    pub fn to_diagnostic(&self) -> Diagnostic {
        match self {
            ResolveError::UnresolvedDependency { name, required_by } => {
                Diagnostic::error(format!("unresolved dependency `{}`", name))
                    .with_context(format!("required by `{}`", required_by))
                    .with_suggestion(format!(
                        "Add a `[[dependencies]]` entry for `{}` with a `git` or `path` source",
                        name
                    ))
                    .with_suggestion(suggestions::UNRESOLVED)
            }

            ResolveError::CyclicDependency { path } => {
                Diagnostic::error(format!("cyclic dependency: {}", path.join(" -> ")))
                    .with_suggestion(
                        "Break the cycle by removing or restructuring dependencies".to_string(),
                    )
            }

            ResolveError::DuplicateTarget { name } => {
                Diagnostic::error(format!("target `{}` is defined more than once", name))
                    .with_suggestion("Rename one of the targets".to_string())
            }

            ResolveError::AmbiguousTarget {
                name,
                first,
                second,
            } => Diagnostic::error(format!("target `{}` has conflicting sources", name))
                .with_context(format!("first declared as {}", first))
                .with_context(format!("then declared as {}", second))
                .with_suggestion(format!(
                    "Use the same `git` or `path` source for every `{}` declaration",
                    name
                )),

            ResolveError::UnknownRoot { name } => {
                Diagnostic::error(format!("unknown root target `{}`", name))
                    .with_suggestion(suggestions::UNRESOLVED)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cycle_message_names_path() {
        let err = ResolveError::CyclicDependency {
            path: vec!["A".into(), "B".into(), "A".into()],
        };
        assert_eq!(err.to_string(), "cyclic dependency: A -> B -> A");

        let output = err.to_diagnostic().format(false);
        assert!(output.contains("cyclic dependency: A -> B -> A"));
    }

    #[test]
    fn test_ambiguous_target_diagnostic() {
        let err = ResolveError::AmbiguousTarget {
            name: "ReCpp".to_string(),
            first: "git+https://github.com/RedFox20/ReCpp.git".to_string(),
            second: "path+../ReCpp".to_string(),
        };

        let output = err.to_diagnostic().format(false);
        assert!(output.contains("conflicting sources"));
        assert!(output.contains("path+../ReCpp"));
        assert!(output.contains("git+https://github.com/RedFox20/ReCpp.git"));
    }

    #[test]
    fn test_unresolved_carries_requirer() {
        let err = ResolveError::UnresolvedDependency {
            name: "Lib".into(),
            required_by: "Root".into(),
        };
        assert!(err.to_string().contains("required by `Root`"));
        let output = err.to_diagnostic().format(false);
        assert!(output.contains("unresolved dependency `Lib`"));
        assert!(output.contains("required by `Root`"));
    }
}
