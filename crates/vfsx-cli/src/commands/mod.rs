//! Subcommand implementations.

pub mod completion;
pub mod extract;
mod run;
pub mod status;
pub mod target;
pub mod undo;

use anyhow::Context;
use anyhow::Result;
use std::path::Path;
use std::path::PathBuf;

/// Makes a user-supplied root absolute without touching the filesystem.
pub fn resolve_root(root: &Path) -> Result<PathBuf> {
    std::path::absolute(root).with_context(|| format!("invalid target root '{}'", root.display()))
}
