//! Target list management.

use super::resolve_root;
use crate::cli::TargetCommand;
use crate::error::add_target_context;
use crate::output::OutputFormatter;
use anyhow::Result;
use std::path::Path;
use vfsx_core::Target;
use vfsx_core::TargetKey;
use vfsx_core::TargetStatus;
use vfsx_core::VfsxError;
use vfsx_core::evaluate_state;
use vfsx_core::store::TargetList;

pub fn execute(
    command: &TargetCommand,
    targets_file: &Path,
    formatter: &dyn OutputFormatter,
) -> Result<()> {
    let list = TargetList::new(targets_file);
    let mut targets = add_target_context(list.load(), targets_file)?;

    match command {
        TargetCommand::Add { name, root } => {
            let target = Target::new(name.as_str(), resolve_root(root)?);
            if targets.contains(&target) {
                return add_target_context(
                    Err(VfsxError::DuplicateTarget {
                        root: target.root.clone(),
                    }),
                    &target.root,
                );
            }
            if !target.root.is_dir() {
                formatter.format_warning(&format!(
                    "{} does not exist yet; the target is registered anyway",
                    target.root.display()
                ));
            }
            targets.push(target.clone());
            add_target_context(list.save(&targets), targets_file)?;
            formatter.format_target_added(&target, evaluate_state(&target))
        }
        TargetCommand::Remove { root } => {
            let root = resolve_root(root)?;
            let key = TargetKey::new(&root);
            let Some(index) = targets.iter().position(|t| t.key() == key) else {
                return add_target_context(Err(VfsxError::UnknownTarget { root: root.clone() }), &root);
            };
            let removed = targets.remove(index);
            add_target_context(list.save(&targets), targets_file)?;
            formatter.format_target_removed(&removed)
        }
        TargetCommand::List => {
            let statuses: Vec<TargetStatus> = targets
                .into_iter()
                .map(|target| TargetStatus {
                    state: evaluate_state(&target),
                    target,
                })
                .collect();
            formatter.format_targets(&statuses)
        }
    }
}
