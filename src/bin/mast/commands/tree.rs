//! `mast tree` command

use anyhow::Result;

use crate::cli::TreeArgs;
use crate::commands::run_options;
use mast::ops::{render_tree, tree};
use mast::util::GlobalContext;

pub fn execute(ctx: &GlobalContext, args: TreeArgs) -> Result<i32> {
    let graph = tree(ctx, &run_options(&args.run)?)?;
    print!("{}", render_tree(&graph, args.depth));
    Ok(0)
}
