//! Vfsx CLI - Command-line utility for undoable extraction from
//! archive-backed file systems.

mod cli;
mod commands;
mod error;
mod output;
mod progress;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let cli = cli::Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    let formatter = output::create_formatter(cli.json, cli.verbose, cli.quiet);
    let show_progress = !cli.json && !cli.quiet;
    tracing::debug!(command = ?cli.command, targets = %cli.targets.display(), "starting");

    match &cli.command {
        cli::Commands::Target(command) => {
            commands::target::execute(command, &cli.targets, &*formatter)
        }
        cli::Commands::Extract(args) => {
            commands::extract::execute(args, &cli.targets, &*formatter, show_progress, cli.verbose)
        }
        cli::Commands::Undo(args) => {
            commands::undo::execute(args, &cli.targets, &*formatter, show_progress, cli.verbose)
        }
        cli::Commands::Status(args) => commands::status::execute(args, &*formatter),
        cli::Commands::Completion(args) => {
            commands::completion::execute(args.shell);
            Ok(())
        }
    }
}

/// Installs the stderr log subscriber. `RUST_LOG` wins over the flags.
fn init_logging(verbose: bool, quiet: bool) {
    let default_level = if verbose {
        "debug"
    } else if quiet {
        "error"
    } else {
        "warn"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
