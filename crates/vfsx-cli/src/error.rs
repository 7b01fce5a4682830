//! Error conversion utilities for CLI.
//!
//! Converts vfsx-core's typed errors (thiserror) into user-friendly
//! contextual errors (anyhow) with actionable guidance.

use anyhow::anyhow;
use std::path::Path;
use vfsx_core::VfsxError;

/// Converts `VfsxError` to a user-friendly anyhow error with context.
///
/// Takes the error by reference so failures reported by the scheduler
/// worker, which are shared, get the same hints as direct calls.
pub fn convert_error(err: &VfsxError, root: &Path) -> anyhow::Error {
    tracing::debug!(error = ?err, root = %root.display(), "converting error");
    match err {
        VfsxError::StorageOpenFailed { path, reason } => anyhow!(
            "Cannot open the archive under '{}': {}\n\
             HINT: Check that the target root contains the archive, or pass --archive.",
            path.display(),
            reason
        ),
        VfsxError::NoMatchingEntries { scanned } => anyhow!(
            "No archive entries under '{}' matched the given prefixes ({scanned} scanned)\n\
             HINT: Prefixes are namespace-qualified, e.g. --prefix data:sound/ (see --namespace).",
            root.display()
        ),
        VfsxError::ManifestMissing { path } => anyhow!(
            "No extraction manifest at '{}'\n\
             HINT: Nothing has been extracted into this target yet.",
            path.display()
        ),
        VfsxError::ManifestCorrupt { path, source } => anyhow!(
            "Extraction manifest '{}' is unreadable: {source}\n\
             HINT: Files listed in it cannot be undone automatically. Inspect or delete it by hand.",
            path.display()
        ),
        VfsxError::TargetListCorrupt { path, source } => anyhow!(
            "Target list '{}' is unreadable: {source}\n\
             HINT: Fix the JSON or point --targets at another file.",
            path.display()
        ),
        VfsxError::UnknownTarget { root } => anyhow!(
            "Target '{}' is not registered\n\
             HINT: Register it first with `vfsx target add <NAME> {}`.",
            root.display(),
            root.display()
        ),
        VfsxError::DuplicateTarget { root } => anyhow!(
            "Target '{}' is already registered\n\
             HINT: Use `vfsx target list` to see registered targets.",
            root.display()
        ),
        VfsxError::AlreadyExtracted { root } => anyhow!(
            "Target '{}' is already extracted\n\
             HINT: Run `vfsx undo` first to extract again.",
            root.display()
        ),
        VfsxError::NothingToUndo { root } => anyhow!(
            "Target '{}' has nothing to undo",
            root.display()
        ),
        VfsxError::TargetBusy { root } => anyhow!(
            "Target '{}' is busy with another operation",
            root.display()
        ),
        VfsxError::InvalidConfig(reason) => anyhow!(
            "Invalid configuration: {reason}\n\
             HINT: Every --prefix needs a namespace qualifier, e.g. data:sound/."
        ),
        VfsxError::SchedulerShutDown => anyhow!(
            "Cannot queue '{}': the scheduler has shut down",
            root.display()
        ),
        VfsxError::OperationPanicked { root, message } => anyhow!(
            "Operation on '{}' aborted unexpectedly: {message}\n\
             HINT: Run `vfsx status {}` and `vfsx undo` to clean up any partial extraction.",
            root.display(),
            root.display()
        ),
        VfsxError::Io(io_err) => {
            anyhow!("I/O error while processing '{}': {}", root.display(), io_err)
        }
        _ => anyhow!("{err}").context(format!("Error processing target '{}'", root.display())),
    }
}

/// Adds target context to a core result.
pub fn add_target_context<T>(result: vfsx_core::Result<T>, root: &Path) -> anyhow::Result<T> {
    result.map_err(|e| convert_error(&e, root))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::path::PathBuf;

    #[test]
    fn test_convert_unknown_target() {
        let err = VfsxError::UnknownTarget {
            root: PathBuf::from("/games/one"),
        };
        let msg = format!("{:?}", convert_error(&err, Path::new("/games/one")));
        assert!(msg.contains("not registered"));
        assert!(msg.contains("HINT"));
        assert!(msg.contains("vfsx target add"));
    }

    #[test]
    fn test_convert_no_matching_entries() {
        let err = VfsxError::NoMatchingEntries { scanned: 42 };
        let msg = format!("{:?}", convert_error(&err, Path::new("/games/one")));
        assert!(msg.contains("42 scanned"));
        assert!(msg.contains("--prefix"));
    }

    #[test]
    fn test_convert_io_error() {
        let err = VfsxError::Io(io::Error::new(io::ErrorKind::NotFound, "file not found"));
        let msg = format!("{:?}", convert_error(&err, Path::new("/games/one")));
        assert!(msg.contains("I/O error"));
    }

    #[test]
    fn test_convert_panicked_operation() {
        let err = VfsxError::OperationPanicked {
            root: PathBuf::from("/games/one"),
            message: "boom".to_string(),
        };
        let msg = format!("{:#}", convert_error(&err, Path::new("/games/one")));
        assert!(msg.contains("boom"));
        assert!(msg.contains("HINT"));
    }

    #[test]
    fn test_other_errors_keep_context() {
        let err = VfsxError::UnsafePath {
            path: "../x".to_string(),
        };
        let msg = format!("{:?}", convert_error(&err, Path::new("/games/one")));
        assert!(msg.contains("/games/one"));
        assert!(msg.contains("../x"));
    }
}
