//! CLI definitions using clap.

use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;

/// Mast - a build target lifecycle orchestrator for native C/C++ projects
#[derive(Parser)]
#[command(name = "mast")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Build the root target and everything it depends on
    Build(BuildArgs),

    /// Build, then run the test stage
    Test(TestArgs),

    /// Show the execution order and workspaces without building
    Plan(PlanArgs),

    /// Display the dependency tree
    Tree(TreeArgs),

    /// Remove build workspaces
    Clean(CleanArgs),

    /// Re-fetch remote dependencies
    Update(UpdateArgs),

    /// Show the exports recorded by the last build
    Exports(ExportsArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

/// How results are written to stdout.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum MessageFormat {
    #[default]
    Human,
    /// One JSON object per line
    Json,
}

/// Run configuration shared by every command that resolves the graph.
#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// Enable a feature flag
    #[arg(long, value_name = "NAME")]
    pub enable: Vec<String>,

    /// Disable a feature flag
    #[arg(long, value_name = "NAME")]
    pub disable: Vec<String>,

    /// Set a feature flag (`NAME` or `NAME=true|false`)
    #[arg(long = "flag", value_name = "NAME[=BOOL]")]
    pub flags: Vec<String>,

    /// Target platform (defaults to the host)
    #[arg(long, env = "MAST_PLATFORM")]
    pub platform: Option<String>,

    /// Build in release mode
    #[arg(short, long)]
    pub release: bool,

    /// Use this target as the root instead of the project's own
    #[arg(long, value_name = "NAME")]
    pub target: Option<String>,
}

#[derive(Args)]
pub struct BuildArgs {
    #[command(flatten)]
    pub run: RunArgs,

    /// Number of targets built in parallel
    #[arg(short, long)]
    pub jobs: Option<usize>,

    /// Keep building targets unrelated to a failure
    #[arg(long)]
    pub keep_going: bool,

    /// Output format
    #[arg(long, value_enum, default_value_t)]
    pub message_format: MessageFormat,
}

#[derive(Args)]
pub struct TestArgs {
    #[command(flatten)]
    pub build: BuildArgs,

    /// Run the test stage of every target, not only the root
    #[arg(long)]
    pub all: bool,

    /// Arguments passed to the test command
    #[arg(last = true)]
    pub args: Vec<String>,
}

#[derive(Args)]
pub struct PlanArgs {
    #[command(flatten)]
    pub run: RunArgs,

    /// Output format
    #[arg(long, value_enum, default_value_t)]
    pub message_format: MessageFormat,
}

#[derive(Args)]
pub struct TreeArgs {
    #[command(flatten)]
    pub run: RunArgs,

    /// Maximum depth to display
    #[arg(short, long)]
    pub depth: Option<usize>,
}

#[derive(Args)]
pub struct CleanArgs {
    #[command(flatten)]
    pub run: RunArgs,

    /// Remove the whole .mast directory
    #[arg(long)]
    pub all: bool,
}

#[derive(Args)]
pub struct UpdateArgs {
    #[command(flatten)]
    pub run: RunArgs,
}

#[derive(Args)]
pub struct ExportsArgs {
    /// Only show this target
    pub target: Option<String>,

    /// Output format
    #[arg(long, value_enum, default_value_t)]
    pub message_format: MessageFormat,
}

#[derive(Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: Shell,
}
