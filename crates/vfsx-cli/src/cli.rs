//! CLI argument parsing using clap.

use clap::Parser;
use clap::Subcommand;
use clap_complete::Shell;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "vfsx")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress non-error output
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Output results in JSON format
    #[arg(short, long, global = true)]
    pub json: bool,

    /// File holding the registered targets
    #[arg(long, global = true, value_name = "FILE", default_value = "vfsx-targets.json")]
    pub targets: PathBuf,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Manage registered targets
    #[command(subcommand)]
    Target(TargetCommand),
    /// Extract matching archive entries into target roots
    Extract(RunArgs),
    /// Remove previously extracted files from target roots
    Undo(RunArgs),
    /// Show the extraction manifest of a target root
    Status(StatusArgs),
    /// Generate shell completions
    Completion(CompletionArgs),
}

#[derive(Debug, Subcommand)]
pub enum TargetCommand {
    /// Register a target
    Add {
        /// Display name
        #[arg(value_name = "NAME")]
        name: String,
        /// Directory holding the archive
        #[arg(value_name = "ROOT")]
        root: PathBuf,
    },
    /// Unregister a target (files on disk are left alone)
    Remove {
        /// Root of the target to remove
        #[arg(value_name = "ROOT")]
        root: PathBuf,
    },
    /// List registered targets and their state
    List,
}

#[derive(Debug, clap::Args)]
pub struct RunArgs {
    /// Target roots to process (must be registered)
    #[arg(value_name = "ROOT", required_unless_present = "all", conflicts_with = "all")]
    pub roots: Vec<PathBuf>,

    /// Process every registered target in an eligible state
    #[arg(long)]
    pub all: bool,

    #[command(flatten)]
    pub filter: FilterArgs,
}

#[derive(Debug, clap::Args)]
pub struct FilterArgs {
    /// Virtual path prefix to extract (repeatable), e.g. `data:sound/`
    #[arg(long = "prefix", short = 'p', value_name = "PREFIX", required = true)]
    pub prefixes: Vec<String>,

    /// Archive file name inside each target root
    #[arg(long, value_name = "FILE", default_value = "data.zip")]
    pub archive: PathBuf,

    /// Namespace qualifying archive members
    #[arg(long, value_name = "NAME", default_value = "data")]
    pub namespace: String,
}

#[derive(Debug, clap::Args)]
pub struct StatusArgs {
    /// Target root to inspect
    #[arg(value_name = "ROOT")]
    pub root: PathBuf,
}

#[derive(Debug, clap::Args)]
pub struct CompletionArgs {
    /// Shell to generate completions for
    #[arg(value_name = "SHELL")]
    pub shell: Shell,
}
