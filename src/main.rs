mod backend;
mod blueprint;
mod cli;
mod commands;
mod progress;
mod resource;
mod schema;
mod ui;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use clap_complete::generate;
use cli::{Cli, Command};
use std::io;

/// Global context for the application
pub struct Context {
    pub verbose: u8,
    pub quiet: bool,
    /// Manifest path as given on the command line
    pub manifest: Option<String>,
    /// Include the built-in blueprint stack
    pub builtin: bool,
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
        manifest: cli.manifest,
        builtin: cli.builtin,
    };

    match cli.command {
        Command::Plan(args) => commands::plan::run(&ctx, args),
        Command::Validate(args) => commands::plan::validate(&ctx, args),
        Command::Exports(args) => commands::plan::exports(&ctx, args),
        Command::Graph(args) => commands::plan::graph(&ctx, args),
        Command::Emit(args) => commands::emit::run(&ctx, args),
        Command::Completions { shell } => {
            let mut cmd = Cli::command();
            generate(shell, &mut cmd, "stackplan", &mut io::stdout());
            Ok(())
        }
    }
}
