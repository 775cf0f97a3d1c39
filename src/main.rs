mod cli;
mod commands;
mod config;
mod engine;
mod guard;
mod provider;
mod resource;
mod state;
mod ui;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use clap_complete::generate;
use cli::{Cli, Command};
use std::io;
use std::path::PathBuf;

/// Global context for the application
pub struct Context {
    pub verbose: u8,
    pub quiet: bool,
    pub config_path: PathBuf,
    pub state_path: PathBuf,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    let log_level = match cli.verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    env_logger::Builder::new()
        .filter_level(if cli.quiet {
            log::LevelFilter::Error
        } else {
            log_level
        })
        .format_timestamp(None)
        .init();

    let ctx = Context {
        verbose: cli.verbose,
        quiet: cli.quiet,
        config_path: state::expand_path(&cli.config),
        state_path: state::expand_path(&cli.state),
    };
    log::debug!(
        "config {}, state {}, verbosity {}",
        ctx.config_path.display(),
        ctx.state_path.display(),
        ctx.verbose
    );

    match cli.command {
        Command::Plan(args) => commands::lifecycle::plan(&ctx, args),
        Command::Apply(args) => commands::lifecycle::apply(&ctx, args),
        Command::Destroy(args) => commands::lifecycle::destroy(&ctx, args),
        Command::Show => commands::inspect::show(&ctx),
        Command::Schema => commands::inspect::schema(&ctx),
        Command::Completions { shell } => {
            let mut cmd = Cli::command();
            generate(shell, &mut cmd, "tf-util", &mut io::stdout());
            Ok(())
        }
    }
}
