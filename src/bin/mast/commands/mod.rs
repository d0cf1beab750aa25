//! Command implementations

pub mod build;
pub mod clean;
pub mod completions;
pub mod exports;
pub mod plan;
pub mod tree;
pub mod update;

use anyhow::{anyhow, Result};

use crate::cli::RunArgs;
use mast::core::flags::validate_flag_name;
use mast::core::{Platform, Toggle};
use mast::ops::RunOptions;

/// Turn command-line run arguments into [`RunOptions`].
///
/// Toggles keep their command-line order; a flag both enabled and disabled
/// is rejected when the flags are resolved.
pub fn run_options(args: &RunArgs) -> Result<RunOptions> {
    let mut toggles = Vec::new();
    for name in &args.enable {
        validate_flag_name(name)?;
        toggles.push(Toggle::new(name.as_str(), true));
    }
    for name in &args.disable {
        validate_flag_name(name)?;
        toggles.push(Toggle::new(name.as_str(), false));
    }
    for flag in &args.flags {
        toggles.push(Toggle::parse(flag)?);
    }

    let platform = args
        .platform
        .as_deref()
        .map(|p| p.parse::<Platform>().map_err(|e| anyhow!(e)))
        .transpose()?;

    Ok(RunOptions {
        toggles,
        platform,
        release: args.release,
        target: args.target.clone(),
        test_args: None,
    })
}
