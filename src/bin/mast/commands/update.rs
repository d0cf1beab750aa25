//! `mast update` command

use anyhow::Result;

use crate::cli::UpdateArgs;
use crate::commands::run_options;
use mast::ops::update;
use mast::util::GlobalContext;

pub fn execute(ctx: &GlobalContext, args: UpdateArgs) -> Result<i32> {
    let updated = update(ctx, &run_options(&args.run)?)?;

    for target in &updated {
        eprintln!(
            "     Updated {} ({}) -> {}",
            target.name,
            target.origin,
            target.checkout.display()
        );
    }
    if updated.is_empty() {
        eprintln!("     No remote dependencies");
    }
    Ok(0)
}
