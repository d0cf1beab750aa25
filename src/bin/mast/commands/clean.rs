//! `mast clean` command

use anyhow::Result;

use crate::cli::CleanArgs;
use crate::commands::run_options;
use mast::ops::{clean, CleanOptions};
use mast::util::GlobalContext;

pub fn execute(ctx: &GlobalContext, args: CleanArgs) -> Result<i32> {
    let opts = CleanOptions {
        run: run_options(&args.run)?,
        all: args.all,
    };

    let removed = clean(ctx, &opts)?;
    for path in &removed {
        eprintln!("     Removed {}", path.display());
    }
    if removed.is_empty() {
        eprintln!("     Nothing to clean");
    }
    Ok(0)
}
