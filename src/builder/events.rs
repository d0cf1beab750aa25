//! Build event types for JSON output.
//!
//! These events are emitted when using `--message-format=json`, one JSON
//! object per line.
//!
//! # Event Types
//!
//! - `build-started`: the graph was resolved and execution begins
//! - `target-state`: a target changed lifecycle state
//! - `target-packaged`: a target recorded its exports
//! - `target-failed`: a target failed; carries the stage and message
//! - `target-abandoned`: a target was never entered because a dependency failed
//! - `target-skipped`: fail-fast stopped the run before the target started
//! - `build-finished`: execution completed (success or failure)
//!
//! # Stability
//!
//! New fields may be added, but existing fields should not be removed or renamed.

use std::io::Write;
use std::path::PathBuf;
use std::sync::Mutex;

use serde::Serialize;

use crate::builder::lifecycle::LifecycleState;
use crate::core::export::ExportSet;

/// An event emitted during execution.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "reason")]
pub enum BuildEvent {
    #[serde(rename = "build-started")]
    BuildStarted {
        /// Root target
        root: String,
        /// Targets in execution order
        order: Vec<String>,
        platform: String,
        /// "debug" or "release"
        profile: String,
    },

    #[serde(rename = "target-state")]
    TargetState {
        target: String,
        from: LifecycleState,
        to: LifecycleState,
    },

    #[serde(rename = "target-packaged")]
    TargetPackaged {
        target: String,
        includes: Vec<PathBuf>,
        libs: Vec<PathBuf>,
        assets: Vec<PathBuf>,
    },

    #[serde(rename = "target-failed")]
    TargetFailed {
        target: String,
        /// Stage that failed (fetch, workspace, configure, build, package, test)
        stage: String,
        message: String,
    },

    #[serde(rename = "target-abandoned")]
    TargetAbandoned {
        target: String,
        /// The failed dependency that caused it
        failed_dependency: String,
    },

    #[serde(rename = "target-skipped")]
    TargetSkipped { target: String },

    #[serde(rename = "build-finished")]
    BuildFinished {
        success: bool,
        /// Total duration in milliseconds
        duration_ms: u64,
        packaged: u64,
        failed: u64,
    },
}

impl BuildEvent {
    /// Create a state change event.
    pub fn state(target: impl Into<String>, from: LifecycleState, to: LifecycleState) -> Self {
        BuildEvent::TargetState {
            target: target.into(),
            from,
            to,
        }
    }

    /// Create a packaged event from an export set.
    pub fn packaged(target: impl Into<String>, exports: &ExportSet) -> Self {
        BuildEvent::TargetPackaged {
            target: target.into(),
            includes: exports.includes.iter().cloned().collect(),
            libs: exports.libs.clone(),
            assets: exports.assets.iter().cloned().collect(),
        }
    }

    /// Create a build finished event.
    pub fn finished(success: bool, duration_ms: u64, packaged: u64, failed: u64) -> Self {
        BuildEvent::BuildFinished {
            success,
            duration_ms,
            packaged,
            failed,
        }
    }

    /// Serialize this event to a JSON string.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

/// Receives build events as they happen.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: &BuildEvent);
}

/// Writes each event as one JSON line.
pub struct JsonLines<W: Write + Send> {
    out: Mutex<W>,
}

impl<W: Write + Send> JsonLines<W> {
    pub fn new(out: W) -> Self {
        JsonLines {
            out: Mutex::new(out),
        }
    }

    pub fn into_inner(self) -> W {
        self.out.into_inner().unwrap_or_else(|e| e.into_inner())
    }
}

impl JsonLines<std::io::Stdout> {
    pub fn stdout() -> Self {
        JsonLines::new(std::io::stdout())
    }
}

impl<W: Write + Send> EventSink for JsonLines<W> {
    fn emit(&self, event: &BuildEvent) {
        let mut out = self.out.lock().unwrap_or_else(|e| e.into_inner());
        if let Err(e) = writeln!(out, "{}", event.to_json()) {
            tracing::warn!("failed to write build event: {}", e);
        }
    }
}
