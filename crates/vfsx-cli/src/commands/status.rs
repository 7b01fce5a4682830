//! Status command implementation.

use super::resolve_root;
use crate::cli::StatusArgs;
use crate::error::add_target_context;
use crate::output::OutputFormatter;
use anyhow::Result;
use vfsx_core::MANIFEST_FILE_NAME;
use vfsx_core::TargetState;
use vfsx_core::store::load_manifest;

pub fn execute(args: &StatusArgs, formatter: &dyn OutputFormatter) -> Result<()> {
    let root = resolve_root(&args.root)?;
    let manifest = add_target_context(load_manifest(&root.join(MANIFEST_FILE_NAME)), &root)?;
    let state = match &manifest {
        None => TargetState::Ready,
        Some(manifest) if manifest.complete => TargetState::Extracted,
        Some(_) => TargetState::Partial,
    };
    formatter.format_status(&root, state, manifest.as_ref())
}
