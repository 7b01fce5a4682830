//! Manifest-driven reversal of an extraction.

use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::io::ErrorKind;
use std::path::Path;
use std::time::Instant;

use walkdir::WalkDir;

use crate::CancellationToken;
use crate::ExtractConfig;
use crate::LogLevel;
use crate::LogSink;
use crate::Outcome;
use crate::ProgressCallback;
use crate::Result;
use crate::UndoReport;
use crate::VfsxError;
use crate::report::Phase;
use crate::report::ProgressSnapshot;
use crate::store;
use crate::types::RelPath;
use crate::types::Target;

/// Deletes the files an extraction recorded and prunes the directories it
/// left empty.
///
/// Undo is idempotent: files already gone are counted as missing, not as
/// failures, so an interrupted undo can simply be run again.
pub struct UndoEngine<'a> {
    config: &'a ExtractConfig,
}

impl<'a> UndoEngine<'a> {
    /// Creates an engine pruning the managed roots of `config`.
    pub fn new(config: &'a ExtractConfig) -> Self {
        Self { config }
    }

    /// Undoes the extraction recorded in the target's manifest.
    ///
    /// Files are deleted in manifest order. A file that cannot be deleted
    /// is left in place with a warning. On cancellation the manifest stays on
    /// disk so a later undo resumes against the same list; otherwise empty
    /// directories are pruned and the manifest is deleted.
    ///
    /// # Errors
    ///
    /// Returns [`VfsxError::ManifestMissing`] if there is no manifest and
    /// [`VfsxError::ManifestCorrupt`] if it cannot be parsed.
    pub fn undo(
        &self,
        target: &Target,
        progress: &mut dyn ProgressCallback,
        log: &mut dyn LogSink,
        cancel: &CancellationToken,
    ) -> Result<Outcome<UndoReport>> {
        let started = Instant::now();
        let manifest_path = target.manifest_path();
        let manifest = store::load_manifest(&manifest_path)?.ok_or_else(|| VfsxError::ManifestMissing {
            path: manifest_path.clone(),
        })?;

        tracing::info!(
            name = %target.name,
            files = manifest.len(),
            complete = manifest.complete,
            "undo started"
        );
        log.log(LogLevel::Info, &format!("Removing extracted files from {}", target.name));

        let mut report = UndoReport::new();
        let mut parents = BTreeSet::new();
        let mut snapshot = ProgressSnapshot {
            total_files: manifest.len(),
            total_bytes: manifest.total_bytes,
            ..ProgressSnapshot::start(Phase::Deleting)
        };
        progress.on_progress(&snapshot);

        for (index, listed) in manifest.files.iter().enumerate() {
            if cancel.is_cancelled() {
                tracing::info!(
                    name = %target.name,
                    deleted = report.files_deleted,
                    remaining = manifest.len() - index,
                    "undo cancelled"
                );
                return Ok(Outcome::Cancelled);
            }

            match RelPath::parse(listed) {
                Ok(rel) => {
                    collect_parents(&rel, &mut parents);
                    let path = rel.resolve(&target.root);
                    match delete_file(&path) {
                        Ok(Some(bytes)) => {
                            report.files_deleted += 1;
                            snapshot.bytes_processed = snapshot.bytes_processed.saturating_add(bytes);
                        }
                        Ok(None) => report.files_missing += 1,
                        Err(e) => {
                            report.files_failed += 1;
                            warn(&mut report, log, format!("could not delete {}: {e}", path.display()));
                        }
                    }
                }
                Err(e) => {
                    report.files_failed += 1;
                    warn(&mut report, log, format!("ignored manifest entry: {e}"));
                }
            }

            snapshot.files_processed = index + 1;
            snapshot.current_path.clone_from(listed);
            progress.on_progress(&snapshot);
        }

        for root in self.config.managed_roots() {
            prune_tree(&root.resolve(&target.root), &mut report, log);
            prune_ancestors(&root, &target.root, &mut report, log);
        }
        for parent in parents.iter().rev() {
            prune_ancestors(parent, &target.root, &mut report, log);
        }

        store::remove_manifest(&manifest_path)?;
        report.duration = started.elapsed();

        tracing::info!(
            name = %target.name,
            deleted = report.files_deleted,
            missing = report.files_missing,
            failed = report.files_failed,
            directories = report.directories_removed,
            "undo finished"
        );
        log.log(
            LogLevel::Info,
            &format!("Removed {} files from {}", report.files_deleted, target.name),
        );

        Ok(Outcome::Completed(report))
    }
}

fn warn(report: &mut UndoReport, log: &mut dyn LogSink, message: String) {
    tracing::warn!("{message}");
    log.log(LogLevel::Warning, &message);
    report.add_warning(message);
}

/// Deletes a regular file or symlink, returning its size.
///
/// `Ok(None)` means the file was already gone. Directories are refused.
fn delete_file(path: &Path) -> io::Result<Option<u64>> {
    let meta = match fs::symlink_metadata(path) {
        Ok(meta) => meta,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e),
    };
    if meta.is_dir() {
        return Err(io::Error::other("path is a directory"));
    }
    match fs::remove_file(path) {
        Ok(()) => Ok(Some(meta.len())),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}

/// Records every directory a file lives in, below the target root.
fn collect_parents(rel: &RelPath, parents: &mut BTreeSet<RelPath>) {
    let mut dir = rel.as_str();
    while let Some((parent, _)) = dir.rsplit_once('/') {
        if let Ok(parent_rel) = RelPath::parse(parent) {
            parents.insert(parent_rel);
        }
        dir = parent;
    }
}

/// Removes `dir` if it exists and holds no entries.
fn remove_if_empty(dir: &Path) -> io::Result<bool> {
    match fs::read_dir(dir) {
        Ok(mut entries) => {
            if entries.next().is_some() {
                return Ok(false);
            }
        }
        Err(e) if matches!(e.kind(), ErrorKind::NotFound | ErrorKind::NotADirectory) => return Ok(false),
        Err(e) => return Err(e),
    }
    fs::remove_dir(dir).map(|()| true)
}

/// Removes every empty directory under `root`, including `root` itself,
/// deepest first.
fn prune_tree(root: &Path, report: &mut UndoReport, log: &mut dyn LogSink) {
    if !root.is_dir() {
        return;
    }
    for entry in WalkDir::new(root).follow_links(false).contents_first(true) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn(report, log, format!("could not scan {}: {e}", root.display()));
                continue;
            }
        };
        if !entry.file_type().is_dir() {
            continue;
        }
        remove_dir_counted(entry.path(), report, log);
    }
}

/// Removes `rel` and then each of its parents while they are empty or
/// already gone, stopping below the target root.
fn prune_ancestors(rel: &RelPath, target_root: &Path, report: &mut UndoReport, log: &mut dyn LogSink) {
    let mut current = rel.as_str();
    loop {
        let Ok(dir) = RelPath::parse(current) else {
            break;
        };
        let path = dir.resolve(target_root);
        if path.exists() && !remove_dir_counted(&path, report, log) {
            break;
        }
        match current.rsplit_once('/') {
            Some((parent, _)) => current = parent,
            None => break,
        }
    }
}

fn remove_dir_counted(dir: &Path, report: &mut UndoReport, log: &mut dyn LogSink) -> bool {
    match remove_if_empty(dir) {
        Ok(true) => {
            report.directories_removed += 1;
            true
        }
        Ok(false) => false,
        Err(e) => {
            warn(report, log, format!("could not remove directory {}: {e}", dir.display()));
            false
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::NoopProgress;
    use crate::store::Manifest;
    use crate::types::MANIFEST_FILE_NAME;
    use tempfile::TempDir;

    fn write_files(root: &Path, files: &[&str]) -> Manifest {
        let mut manifest = Manifest::begin();
        for file in files {
            let rel = RelPath::parse(file).unwrap();
            let path = rel.resolve(root);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(&path, file.as_bytes()).unwrap();
            manifest.record(&rel, file.len() as u64);
        }
        manifest.finish();
        store::save_manifest(&root.join(MANIFEST_FILE_NAME), &manifest).unwrap();
        manifest
    }

    fn undo(root: &Path, config: &ExtractConfig) -> Result<Outcome<UndoReport>> {
        UndoEngine::new(config).undo(
            &Target::new("t", root),
            &mut NoopProgress,
            &mut NoopProgress,
            &CancellationToken::new(),
        )
    }

    #[test]
    fn test_deletes_files_and_prunes_directories() {
        let temp = TempDir::new().unwrap();
        write_files(temp.path(), &["sound/music/a.ogg", "sound/b.ogg", "locale/enUS/c.txt"]);
        let config = ExtractConfig::new(["data:sound/", "data:locale/enUS/"]);

        let report = undo(temp.path(), &config).unwrap().completed().unwrap();
        assert_eq!(report.files_deleted, 3);
        assert_eq!(report.files_missing, 0);
        assert!(!temp.path().join("sound").exists());
        assert!(!temp.path().join("locale").exists());
        assert!(!temp.path().join(MANIFEST_FILE_NAME).exists());
        assert!(temp.path().exists());
    }

    #[test]
    fn test_keeps_foreign_files() {
        let temp = TempDir::new().unwrap();
        write_files(temp.path(), &["sound/a.ogg"]);
        fs::write(temp.path().join("sound/user.cfg"), b"keep").unwrap();
        let config = ExtractConfig::new(["data:sound/"]);

        let report = undo(temp.path(), &config).unwrap().completed().unwrap();
        assert_eq!(report.files_deleted, 1);
        assert!(temp.path().join("sound/user.cfg").exists());
    }

    #[test]
    fn test_missing_files_are_not_failures() {
        let temp = TempDir::new().unwrap();
        write_files(temp.path(), &["sound/a.ogg", "sound/b.ogg"]);
        fs::remove_file(temp.path().join("sound/a.ogg")).unwrap();

        let report = undo(temp.path(), &ExtractConfig::new(["data:sound/"]))
            .unwrap()
            .completed()
            .unwrap();
        assert_eq!(report.files_deleted, 1);
        assert_eq!(report.files_missing, 1);
        assert_eq!(report.files_failed, 0);
        assert!(!report.has_warnings());
    }

    #[test]
    fn test_missing_manifest() {
        let temp = TempDir::new().unwrap();
        let result = undo(temp.path(), &ExtractConfig::new(["data:sound/"]));
        assert!(matches!(result, Err(VfsxError::ManifestMissing { .. })));
    }

    #[test]
    fn test_unsafe_manifest_entry_is_ignored() {
        let temp = TempDir::new().unwrap();
        let outside = TempDir::new().unwrap();
        fs::write(outside.path().join("victim"), b"x").unwrap();

        let mut manifest = Manifest::begin();
        manifest.files.push("../victim".to_string());
        manifest.finish();
        store::save_manifest(&temp.path().join(MANIFEST_FILE_NAME), &manifest).unwrap();

        let report = undo(temp.path(), &ExtractConfig::new(["data:sound/"]))
            .unwrap()
            .completed()
            .unwrap();
        assert_eq!(report.files_failed, 1);
        assert!(outside.path().join("victim").exists());
    }

    #[test]
    fn test_directory_in_place_of_file_is_left() {
        let temp = TempDir::new().unwrap();
        write_files(temp.path(), &["sound/a.ogg"]);
        fs::remove_file(temp.path().join("sound/a.ogg")).unwrap();
        fs::create_dir_all(temp.path().join("sound/a.ogg/inner")).unwrap();
        fs::write(temp.path().join("sound/a.ogg/inner/f"), b"x").unwrap();

        let report = undo(temp.path(), &ExtractConfig::new(["data:sound/"]))
            .unwrap()
            .completed()
            .unwrap();
        assert_eq!(report.files_failed, 1);
        assert!(temp.path().join("sound/a.ogg/inner/f").exists());
    }

    #[test]
    fn test_cancel_keeps_manifest() {
        let temp = TempDir::new().unwrap();
        write_files(temp.path(), &["sound/a.ogg"]);
        let config = ExtractConfig::new(["data:sound/"]);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let outcome = UndoEngine::new(&config)
            .undo(&Target::new("t", temp.path()), &mut NoopProgress, &mut NoopProgress, &cancel)
            .unwrap();
        assert!(outcome.is_cancelled());
        assert!(temp.path().join("sound/a.ogg").exists());
        assert!(temp.path().join(MANIFEST_FILE_NAME).exists());
    }

    #[test]
    fn test_prunes_recorded_parents_outside_managed_roots() {
        let temp = TempDir::new().unwrap();
        write_files(temp.path(), &["extra/deep/file.bin"]);

        let report = undo(temp.path(), &ExtractConfig::new(["data:sound/"]))
            .unwrap()
            .completed()
            .unwrap();
        assert_eq!(report.directories_removed, 2);
        assert!(!temp.path().join("extra").exists());
    }
}
