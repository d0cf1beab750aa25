//! High-level operations.
//!
//! This module contains the implementation of Mast commands.

pub mod build;
pub mod clean;
pub mod exports;
pub mod plan;
pub mod resolve;
pub mod update;

pub use build::{build, BuildOptions};
pub use clean::{clean, CleanOptions};
pub use exports::load_exports;
pub use plan::{plan, render_tree, tree, BuildPlan, PlannedTarget};
pub use resolve::{RunOptions, Session};
pub use update::{update, UpdatedTarget};

use crate::core::condition::ConditionError;
use crate::core::flags::FlagError;
use crate::resolver::ResolveError;

/// Process exit code for an error that ended a command before any target ran.
///
/// Resolution and configuration errors map to 2; anything else to 1.
pub fn error_exit_code(err: &anyhow::Error) -> i32 {
    let static_error = err.chain().any(|cause| {
        cause.is::<ResolveError>()
            || cause.is::<FlagError>()
            || cause.is::<ConditionError>()
            || cause.is::<toml::de::Error>()
    });
    if static_error {
        2
    } else {
        1
    }
}
