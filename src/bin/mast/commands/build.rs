//! `mast build` command

use std::io::IsTerminal;

use anyhow::Result;

use crate::cli::{BuildArgs, MessageFormat};
use crate::commands::run_options;
use mast::builder::{BuildReport, JsonLines, TestScope};
use mast::ops::{build, BuildOptions, RunOptions};
use mast::util::diagnostic::{emit, Diagnostic};
use mast::util::GlobalContext;

pub fn execute(ctx: &GlobalContext, args: BuildArgs) -> Result<i32> {
    let run = run_options(&args.run)?;
    run_build(ctx, &args, run, TestScope::Root)
}

/// Shared by `mast build` and `mast test`.
pub fn run_build(
    ctx: &GlobalContext,
    args: &BuildArgs,
    run: RunOptions,
    tests: TestScope,
) -> Result<i32> {
    let json = args.message_format == MessageFormat::Json;
    let opts = BuildOptions {
        run,
        jobs: args.jobs,
        keep_going: args.keep_going,
        tests,
        progress: !json && !ctx.is_verbose() && std::io::stderr().is_terminal(),
    };

    let report = if json {
        let sink = JsonLines::stdout();
        build(ctx, &opts, Some(&sink))?
    } else {
        build(ctx, &opts, None)?
    };

    print_summary(&report, ctx.color());
    Ok(report.exit_kind().code())
}

fn print_summary(report: &BuildReport, color: bool) {
    for failure in report.failures.iter().chain(&report.test_failures) {
        emit(&failure.to_diagnostic(), color);
    }
    for abandoned in &report.abandoned {
        let diag = Diagnostic::warning(format!("abandoned `{}`", abandoned.target))
            .with_context(format!("dependency `{}` failed", abandoned.failed_dependency));
        emit(&diag, color);
    }
    if !report.skipped.is_empty() {
        eprintln!("     Skipped {}", report.skipped.join(", "));
    }

    let secs = report.duration.as_secs_f64();
    if report.is_success() {
        eprintln!(
            "    Finished {} target(s) in {:.2}s",
            report.packaged_count(),
            secs
        );
    } else {
        eprintln!(
            "      Failed {} of {} target(s) in {:.2}s",
            report.failed_targets().len(),
            report.order.len(),
            secs
        );
    }
}
