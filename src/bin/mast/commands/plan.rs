//! `mast plan` command

use anyhow::Result;

use crate::cli::{MessageFormat, PlanArgs};
use crate::commands::run_options;
use mast::ops::plan;
use mast::util::fs::relative_path;
use mast::util::GlobalContext;

pub fn execute(ctx: &GlobalContext, args: PlanArgs) -> Result<i32> {
    let plan = plan(ctx, &run_options(&args.run)?)?;

    if args.message_format == MessageFormat::Json {
        println!("{}", serde_json::to_string(&plan)?);
        return Ok(0);
    }

    println!("root: {} ({})", plan.root, plan.platform);
    if !plan.flags.is_empty() {
        let flags: Vec<String> = plan
            .flags
            .iter()
            .map(|(name, value)| format!("{}={}", name, value))
            .collect();
        println!("flags: {}", flags.join(" "));
    }
    for (i, target) in plan.targets.iter().enumerate() {
        let shared = match &target.global_workspace {
            Some(key) => format!(" [global:{}]", key),
            None => String::new(),
        };
        println!(
            "{:>3}. {} ({}) -> {}{}",
            i + 1,
            target.name,
            target.origin,
            relative_path(ctx.cwd(), &target.workspace).display(),
            shared
        );
    }
    Ok(0)
}
