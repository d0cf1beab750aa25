//! Mast CLI - a build target lifecycle orchestrator

use std::io::IsTerminal;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use mast::util::diagnostic::{emit, suggestions, Diagnostic};
use mast::util::GlobalContext;
use mast::ResolveError;

mod cli;
mod commands;

use cli::{Cli, Commands};

fn main() {
    let cli = Cli::parse();

    // Set up logging
    let filter = if cli.verbose {
        EnvFilter::new("mast=debug")
    } else {
        EnvFilter::new("mast=info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_ansi(!cli.no_color)
        .with_writer(std::io::stderr)
        .init();

    let color = !cli.no_color && std::io::stderr().is_terminal();

    let code = match run(cli, color) {
        Ok(code) => code,
        Err(e) => {
            emit(&diagnostic_for(&e), color);
            mast::ops::error_exit_code(&e)
        }
    };
    std::process::exit(code);
}

fn run(cli: Cli, color: bool) -> Result<i32> {
    let mut ctx = GlobalContext::new()?;
    ctx.set_verbose(cli.verbose);
    ctx.set_color(color);

    match cli.command {
        Commands::Build(args) => commands::build::execute(&ctx, args),
        Commands::Test(args) => commands::test::execute(&ctx, args),
        Commands::Plan(args) => commands::plan::execute(&ctx, args),
        Commands::Tree(args) => commands::tree::execute(&ctx, args),
        Commands::Clean(args) => commands::clean::execute(&ctx, args),
        Commands::Update(args) => commands::update::execute(&ctx, args),
        Commands::Exports(args) => commands::exports::execute(&ctx, args),
        Commands::Completions(args) => commands::completions::execute(args),
    }
}

fn diagnostic_for(err: &anyhow::Error) -> Diagnostic {
    if let Some(resolve) = err.chain().find_map(|c| c.downcast_ref::<ResolveError>()) {
        return resolve.to_diagnostic();
    }

    let mut chain = err.chain();
    let mut diag = Diagnostic::error(chain.next().map(|c| c.to_string()).unwrap_or_default());
    for cause in chain {
        diag = diag.with_context(cause.to_string());
    }
    if diag.message.starts_with("could not find Mast.toml") {
        diag = diag.with_suggestion(suggestions::NO_DESCRIPTOR);
    }
    diag
}
