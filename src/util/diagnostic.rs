//! Error reports printed by the CLI.
//!
//! A report is a one-line message, the chain of causes that led to it and
//! optional numbered suggestions.

use std::fmt;

/// Suggestions shared by several error kinds.
pub mod suggestions {
    pub const NO_DESCRIPTOR: &str = "Create a Mast.toml with a [target] table";

    pub const UNRESOLVED: &str = "Run `mast tree` to see which targets were loaded";

    pub const BUILD_FAILED: &str = "Run `mast build --verbose` for more details";

    pub const FETCH_FAILED: &str = "Check your network connection and try `mast update`";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

impl Severity {
    fn label(self, color: bool) -> &'static str {
        match (self, color) {
            (Severity::Error, true) => "\x1b[1;31merror\x1b[0m",
            (Severity::Error, false) => "error",
            (Severity::Warning, true) => "\x1b[1;33mwarning\x1b[0m",
            (Severity::Warning, false) => "warning",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub message: String,
    pub severity: Severity,
    /// Causes and details, outermost first
    pub context: Vec<String>,
    pub suggestions: Vec<String>,
}

impl Diagnostic {
    pub fn error(message: impl Into<String>) -> Self {
        Diagnostic::new(Severity::Error, message.into())
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Diagnostic::new(Severity::Warning, message.into())
    }

    fn new(severity: Severity, message: String) -> Self {
        Diagnostic {
            message,
            severity,
            context: Vec::new(),
            suggestions: Vec::new(),
        }
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context.push(context.into());
        self
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestions.push(suggestion.into());
        self
    }

    /// Render for a terminal; `color` adds ANSI styling to the labels.
    pub fn format(&self, color: bool) -> String {
        let mut lines = vec![format!("{}: {}", self.severity.label(color), self.message)];
        lines.extend(self.context.iter().map(|c| format!("  -> {}", c)));

        if !self.suggestions.is_empty() {
            let help = if color { "\x1b[1;32mhelp\x1b[0m" } else { "help" };
            lines.push(String::new());
            lines.push(format!("{}: consider:", help));
            lines.extend(
                self.suggestions
                    .iter()
                    .enumerate()
                    .map(|(i, s)| format!("  {}. {}", i + 1, s)),
            );
        }

        let mut out = lines.join("\n");
        out.push('\n');
        out
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.format(false))
    }
}

/// Print a diagnostic to stderr.
pub fn emit(diagnostic: &Diagnostic, color: bool) {
    eprint!("{}", diagnostic.format(color));
}
