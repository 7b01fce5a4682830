//! Undo command implementation.

use super::run;
use crate::cli::RunArgs;
use crate::output::OutputFormatter;
use anyhow::Result;
use std::path::Path;
use vfsx_core::JobKind;

pub fn execute(
    args: &RunArgs,
    targets_file: &Path,
    formatter: &dyn OutputFormatter,
    show_progress: bool,
    verbose: bool,
) -> Result<()> {
    run::execute(JobKind::Undo, args, targets_file, formatter, show_progress, verbose)
}
