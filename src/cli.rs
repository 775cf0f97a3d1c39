use clap::{Parser, Subcommand};
use clap_complete::Shell;

#[derive(Parser)]
#[command(name = "tf-util")]
#[command(version)]
#[command(about = "Local driver for the util provider and its indestructible resources", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Configuration file declaring the provider and resources
    #[arg(long, global = true, default_value = "util.toml")]
    pub config: String,

    /// State file
    #[arg(long, global = true, default_value = "util.tfstate.json")]
    pub state: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Show what apply would change
    Plan(TargetArgs),

    /// Converge state to the configuration
    Apply(ApplyArgs),

    /// Destroy persisted instances (subject to destroy protection)
    Destroy(ApplyArgs),

    /// Show persisted state
    Show,

    /// Print provider and resource schemas as JSON
    Schema,

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Parser)]
pub struct TargetArgs {
    /// Only consider this instance name
    #[arg(short, long)]
    pub target: Option<String>,
}

#[derive(Parser)]
pub struct ApplyArgs {
    /// Only consider this instance name
    #[arg(short, long)]
    pub target: Option<String>,

    /// Show the plan without executing it
    #[arg(long)]
    pub dry_run: bool,

    /// Skip the confirmation prompt
    #[arg(short, long)]
    pub yes: bool,

    /// Number of instances processed in parallel
    #[arg(short, long, default_value = "4")]
    pub jobs: usize,
}
