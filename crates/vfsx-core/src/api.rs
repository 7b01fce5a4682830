//! High-level public API for extracting and undoing a single target.
//!
//! These functions are what the scheduler's worker runs. They can also be
//! called directly when only one target is involved and no queueing is
//! needed.

use crate::CancellationToken;
use crate::ExtractConfig;
use crate::LogSink;
use crate::Outcome;
use crate::ProgressCallback;
use crate::Result;
use crate::UndoReport;
use crate::VfsxError;
use crate::extraction::Extraction;
use crate::extraction::ExtractionEngine;
use crate::formats::ArchiveProvider;
use crate::store;
use crate::types::Target;
use crate::types::TargetState;
use crate::undo::UndoEngine;

/// Derives a target's persistent state from its manifest on disk.
///
/// No manifest is [`TargetState::Ready`], a complete one
/// [`TargetState::Extracted`], an incomplete one [`TargetState::Partial`].
/// A manifest that cannot be read is [`TargetState::Error`].
///
/// # Examples
///
/// ```
/// use vfsx_core::Target;
/// use vfsx_core::TargetState;
/// use vfsx_core::evaluate_state;
///
/// let dir = tempfile::tempdir().unwrap();
/// let target = Target::new("one", dir.path());
/// assert_eq!(evaluate_state(&target), TargetState::Ready);
/// ```
#[must_use]
pub fn evaluate_state(target: &Target) -> TargetState {
    match store::load_manifest(&target.manifest_path()) {
        Ok(None) => TargetState::Ready,
        Ok(Some(manifest)) if manifest.complete => TargetState::Extracted,
        Ok(Some(_)) => TargetState::Partial,
        Err(e) => {
            tracing::warn!(name = %target.name, error = %e, "manifest unreadable");
            TargetState::Error
        }
    }
}

/// Extracts a target, first cleaning up an interrupted earlier extraction.
///
/// If the target holds an incomplete manifest, its files are undone before
/// the fresh extraction starts, so two attempts never share one manifest.
///
/// # Errors
///
/// Returns [`VfsxError::AlreadyExtracted`] if a complete manifest exists,
/// and any error of the undo or extraction engines.
///
/// # Examples
///
/// ```no_run
/// use vfsx_core::CancellationToken;
/// use vfsx_core::ExtractConfig;
/// use vfsx_core::NoopProgress;
/// use vfsx_core::Target;
/// use vfsx_core::extract_target;
/// use vfsx_core::formats::ZipProvider;
///
/// # fn main() -> vfsx_core::Result<()> {
/// let config = ExtractConfig::new(["data:sound/"]);
/// let outcome = extract_target(
///     &ZipProvider::default(),
///     &Target::new("one", "/games/one"),
///     &config,
///     &mut NoopProgress,
///     &mut NoopProgress,
///     &CancellationToken::new(),
/// )?;
/// println!("cancelled: {}", outcome.is_cancelled());
/// # Ok(())
/// # }
/// ```
pub fn extract_target(
    provider: &dyn ArchiveProvider,
    target: &Target,
    config: &ExtractConfig,
    progress: &mut dyn ProgressCallback,
    log: &mut dyn LogSink,
    cancel: &CancellationToken,
) -> Result<Outcome<Extraction>> {
    config.validate()?;
    if let Some(manifest) = store::load_manifest(&target.manifest_path())? {
        if manifest.complete {
            return Err(VfsxError::AlreadyExtracted {
                root: target.root.clone(),
            });
        }
        tracing::info!(
            name = %target.name,
            files = manifest.len(),
            "cleaning up interrupted extraction"
        );
        let cleanup = UndoEngine::new(config).undo(target, progress, log, cancel)?;
        if cleanup.is_cancelled() {
            return Ok(Outcome::Cancelled);
        }
    }

    ExtractionEngine::new(provider, config).extract(target, progress, log, cancel)
}

/// Undoes a target's extraction, complete or not.
///
/// # Errors
///
/// Returns [`VfsxError::ManifestMissing`] if the target holds no manifest,
/// and any other error of the undo engine.
pub fn undo_target(
    target: &Target,
    config: &ExtractConfig,
    progress: &mut dyn ProgressCallback,
    log: &mut dyn LogSink,
    cancel: &CancellationToken,
) -> Result<Outcome<UndoReport>> {
    UndoEngine::new(config).undo(target, progress, log, cancel)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::NoopProgress;
    use crate::store::Manifest;
    use crate::test_utils::MemoryArchive;
    use crate::test_utils::MemoryProvider;
    use crate::types::RelPath;
    use tempfile::TempDir;

    fn extract(provider: &MemoryProvider, target: &Target, config: &ExtractConfig) -> Result<Outcome<Extraction>> {
        extract_target(
            provider,
            target,
            config,
            &mut NoopProgress,
            &mut NoopProgress,
            &CancellationToken::new(),
        )
    }

    #[test]
    fn test_evaluate_state_follows_manifest() {
        let temp = TempDir::new().unwrap();
        let target = Target::new("t", temp.path());
        assert_eq!(evaluate_state(&target), TargetState::Ready);

        let mut manifest = Manifest::begin();
        store::save_manifest(&target.manifest_path(), &manifest).unwrap();
        assert_eq!(evaluate_state(&target), TargetState::Partial);

        manifest.finish();
        store::save_manifest(&target.manifest_path(), &manifest).unwrap();
        assert_eq!(evaluate_state(&target), TargetState::Extracted);

        std::fs::write(target.manifest_path(), b"garbage").unwrap();
        assert_eq!(evaluate_state(&target), TargetState::Error);
    }

    #[test]
    fn test_complete_target_is_rejected() {
        let temp = TempDir::new().unwrap();
        let target = Target::new("t", temp.path());
        let provider = MemoryProvider::new(MemoryArchive::new().file("data:sound/a", "x"));
        let config = ExtractConfig::new(["data:sound/"]);

        assert!(extract(&provider, &target, &config).is_ok());
        assert!(matches!(
            extract(&provider, &target, &config),
            Err(VfsxError::AlreadyExtracted { .. })
        ));
    }

    #[test]
    fn test_partial_target_is_cleaned_before_extracting() {
        let temp = TempDir::new().unwrap();
        let target = Target::new("t", temp.path());

        // Leftover of an interrupted run whose entry no longer matches.
        let stale = RelPath::parse("sound/stale.ogg").unwrap();
        std::fs::create_dir_all(temp.path().join("sound")).unwrap();
        std::fs::write(stale.resolve(temp.path()), b"old").unwrap();
        let mut manifest = Manifest::begin();
        manifest.record(&stale, 3);
        store::save_manifest(&target.manifest_path(), &manifest).unwrap();

        let provider = MemoryProvider::new(MemoryArchive::new().file("data:sound/fresh.ogg", "new"));
        let config = ExtractConfig::new(["data:sound/"]);
        let done = extract(&provider, &target, &config).unwrap().completed().unwrap();

        assert_eq!(done.manifest.files, vec!["sound/fresh.ogg"]);
        assert!(!stale.resolve(temp.path()).exists());
        assert_eq!(evaluate_state(&target), TargetState::Extracted);
    }

    #[test]
    fn test_undo_target_round_trip() {
        let temp = TempDir::new().unwrap();
        let target = Target::new("t", temp.path());
        let provider = MemoryProvider::new(MemoryArchive::new().file("data:sound/a/b.ogg", "x"));
        let config = ExtractConfig::new(["data:sound/"]);

        extract(&provider, &target, &config).unwrap();
        let report = undo_target(
            &target,
            &config,
            &mut NoopProgress,
            &mut NoopProgress,
            &CancellationToken::new(),
        )
        .unwrap()
        .completed()
        .unwrap();

        assert_eq!(report.files_deleted, 1);
        assert!(!temp.path().join("sound").exists());
        assert_eq!(evaluate_state(&target), TargetState::Ready);
    }
}
