//! Integration tests for vfsx-core.
//!
//! These tests run the engines end to end against real directories, using
//! ZIP fixtures and scripted in-memory archives.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::fs;
use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;

use tempfile::TempDir;
use vfsx_core::CancellationToken;
use vfsx_core::ExtractConfig;
use vfsx_core::LogLevel;
use vfsx_core::LogSink;
use vfsx_core::MANIFEST_FILE_NAME;
use vfsx_core::NoopProgress;
use vfsx_core::Outcome;
use vfsx_core::Phase;
use vfsx_core::ProgressCallback;
use vfsx_core::ProgressSnapshot;
use vfsx_core::ScanLimits;
use vfsx_core::ScanTermination;
use vfsx_core::Target;
use vfsx_core::TargetState;
use vfsx_core::VfsxError;
use vfsx_core::evaluate_state;
use vfsx_core::extract_target;
use vfsx_core::formats::ArchiveProvider;
use vfsx_core::formats::ZipProvider;
use vfsx_core::store;
use vfsx_core::store::Manifest;
use vfsx_core::test_utils::MemoryArchive;
use vfsx_core::test_utils::MemoryProvider;
use vfsx_core::test_utils::create_test_zip;
use vfsx_core::undo_target;

#[derive(Default)]
struct Collected {
    warnings: Vec<String>,
}

impl LogSink for Collected {
    fn log(&mut self, level: LogLevel, message: &str) {
        if level == LogLevel::Warning {
            self.warnings.push(message.to_string());
        }
    }
}

fn extract(
    provider: &dyn ArchiveProvider,
    root: &Path,
    config: &ExtractConfig,
) -> vfsx_core::Result<Outcome<vfsx_core::Extraction>> {
    extract_target(
        provider,
        &Target::new("test", root),
        config,
        &mut NoopProgress,
        &mut NoopProgress,
        &CancellationToken::new(),
    )
}

fn undo(root: &Path, config: &ExtractConfig) -> vfsx_core::Result<Outcome<vfsx_core::UndoReport>> {
    undo_target(
        &Target::new("test", root),
        config,
        &mut NoopProgress,
        &mut NoopProgress,
        &CancellationToken::new(),
    )
}

fn zip_root(entries: &[(&str, &str)]) -> TempDir {
    let temp = TempDir::new().unwrap();
    fs::write(temp.path().join("data.zip"), create_test_zip(entries)).unwrap();
    temp
}

#[test]
fn test_zip_round_trip_leaves_no_trace() {
    let temp = zip_root(&[
        ("sound/music/theme.ogg", "theme"),
        ("sound/click.wav", "click"),
        ("locale/enUS/strings.txt", "hello"),
        ("locale/deDE/strings.txt", "hallo"),
        ("video/intro.bik", "video"),
    ]);
    let config = ExtractConfig::new(["data:sound/", "data:locale/enUS/"]);

    let done = extract(&ZipProvider::default(), temp.path(), &config)
        .unwrap()
        .completed()
        .unwrap();
    assert_eq!(
        done.manifest.files,
        vec!["sound/music/theme.ogg", "sound/click.wav", "locale/enUS/strings.txt"]
    );
    assert_eq!(done.manifest.total_bytes, 15);
    assert!(done.manifest.complete);
    assert_eq!(fs::read_to_string(temp.path().join("sound/music/theme.ogg")).unwrap(), "theme");
    assert!(!temp.path().join("video").exists());
    assert!(!temp.path().join("locale/deDE").exists());

    let report = undo(temp.path(), &config).unwrap().completed().unwrap();
    assert_eq!(report.files_deleted, 3);
    assert!(!temp.path().join("sound").exists());
    assert!(!temp.path().join("locale").exists());
    assert!(!temp.path().join(MANIFEST_FILE_NAME).exists());
    assert!(temp.path().join("data.zip").exists());
}

#[test]
fn test_zip_members_with_backslashes_are_extracted() {
    let temp = zip_root(&[("sound\\music\\theme.ogg", "theme"), ("video\\intro.bik", "video")]);
    let config = ExtractConfig::new(["data:sound/"]);
    let mut log = Collected::default();

    let done = extract_target(
        &ZipProvider::default(),
        &Target::new("test", temp.path()),
        &config,
        &mut NoopProgress,
        &mut log,
        &CancellationToken::new(),
    )
    .unwrap()
    .completed()
    .unwrap();

    assert!(log.warnings.is_empty(), "{:?}", log.warnings);
    assert_eq!(done.manifest.files, vec!["sound/music/theme.ogg"]);
    assert_eq!(fs::read_to_string(temp.path().join("sound/music/theme.ogg")).unwrap(), "theme");
}

#[test]
fn test_three_entries_with_one_unreadable() {
    let temp = TempDir::new().unwrap();
    let provider = MemoryProvider::new(
        MemoryArchive::new()
            .file("data:a", "0123456789")
            .file("data:b", "")
            .broken("data:c", 7),
    );
    let config = ExtractConfig::new(["data:"]);
    let mut log = Collected::default();

    let done = extract_target(
        &provider,
        &Target::new("test", temp.path()),
        &config,
        &mut NoopProgress,
        &mut log,
        &CancellationToken::new(),
    )
    .unwrap()
    .completed()
    .unwrap();

    assert_eq!(done.manifest.files, vec!["a", "b"]);
    assert_eq!(done.manifest.total_bytes, 10);
    assert!(done.manifest.complete);
    assert_eq!(log.warnings.len(), 1);
    assert!(log.warnings[0].contains("data:c"));

    let on_disk = store::load_manifest(&temp.path().join(MANIFEST_FILE_NAME)).unwrap().unwrap();
    assert_eq!(on_disk, done.manifest);

    undo(temp.path(), &config).unwrap();
    assert!(!temp.path().join("a").exists());
    assert!(!temp.path().join("b").exists());
    assert!(!temp.path().join(MANIFEST_FILE_NAME).exists());
}

/// Records every manifest found on disk while the transfer runs, and
/// cancels after `cancel_after` entries if set.
struct CheckpointRecorder {
    manifest_path: PathBuf,
    seen: Vec<Manifest>,
    cancel_after: Option<(usize, CancellationToken)>,
}

impl ProgressCallback for CheckpointRecorder {
    fn on_progress(&mut self, snapshot: &ProgressSnapshot) {
        if snapshot.phase != Phase::Transferring || snapshot.files_processed == 0 {
            return;
        }
        if let Some(manifest) = store::load_manifest(&self.manifest_path).unwrap() {
            self.seen.push(manifest);
        }
        if let Some((after, token)) = &self.cancel_after {
            if snapshot.files_processed >= *after {
                token.cancel();
            }
        }
    }
}

fn recorder(root: &Path, cancel_after: Option<(usize, CancellationToken)>) -> CheckpointRecorder {
    CheckpointRecorder {
        manifest_path: root.join(MANIFEST_FILE_NAME),
        seen: Vec::new(),
        cancel_after,
    }
}

#[test]
fn test_checkpoints_are_prefixes_of_the_full_run() {
    let archive = MemoryArchive::new().files("data:sound/", 9);
    let provider = MemoryProvider::new(archive);
    let config = ExtractConfig::new(["data:sound/"]).with_checkpoint_interval(2);

    let full_root = TempDir::new().unwrap();
    let full = extract(&provider, full_root.path(), &config)
        .unwrap()
        .completed()
        .unwrap()
        .manifest;

    let temp = TempDir::new().unwrap();
    let mut progress = recorder(temp.path(), None);
    extract_target(
        &provider,
        &Target::new("test", temp.path()),
        &config,
        &mut progress,
        &mut NoopProgress,
        &CancellationToken::new(),
    )
    .unwrap();

    assert!(!progress.seen.is_empty());
    for checkpoint in &progress.seen {
        assert!(!checkpoint.complete);
        assert!(checkpoint.files.len() <= full.files.len());
        assert_eq!(checkpoint.files[..], full.files[..checkpoint.files.len()]);
    }
    let lengths: Vec<usize> = progress.seen.iter().map(Manifest::len).collect();
    assert!(lengths.windows(2).all(|w| w[0] <= w[1]), "checkpoints shrank: {lengths:?}");
}

/// Captures the on-disk state the first time the transfer phase reports.
struct FirstTransfer {
    manifest_path: PathBuf,
    stale: PathBuf,
    observed: Option<(Manifest, bool)>,
}

impl ProgressCallback for FirstTransfer {
    fn on_progress(&mut self, snapshot: &ProgressSnapshot) {
        if snapshot.phase != Phase::Transferring || self.observed.is_some() {
            return;
        }
        let manifest = store::load_manifest(&self.manifest_path).unwrap().unwrap();
        self.observed = Some((manifest, self.stale.exists()));
    }
}

#[test]
fn test_partial_target_starts_transfer_from_an_empty_manifest() {
    let temp = TempDir::new().unwrap();
    let target = Target::new("test", temp.path());
    let stale = temp.path().join("sound/old-run.ogg");
    fs::create_dir_all(stale.parent().unwrap()).unwrap();
    fs::write(&stale, b"stale").unwrap();
    let mut partial = Manifest::begin();
    partial.record(&vfsx_core::RelPath::parse("sound/old-run.ogg").unwrap(), 5);
    store::save_manifest(&target.manifest_path(), &partial).unwrap();
    assert_eq!(evaluate_state(&target), TargetState::Partial);

    let provider = MemoryProvider::new(MemoryArchive::new().files("data:sound/", 5));
    let config = ExtractConfig::new(["data:sound/"]).with_checkpoint_interval(2);
    let mut progress = FirstTransfer {
        manifest_path: target.manifest_path(),
        stale: stale.clone(),
        observed: None,
    };

    let done = extract_target(
        &provider,
        &target,
        &config,
        &mut progress,
        &mut NoopProgress,
        &CancellationToken::new(),
    )
    .unwrap()
    .completed()
    .unwrap();

    let (first, stale_present) = progress.observed.unwrap();
    assert!(first.files.is_empty(), "old and new runs merged: {:?}", first.files);
    assert!(!first.complete);
    assert!(!stale_present);

    assert_eq!(done.manifest.len(), 5);
    assert!(!done.manifest.files.iter().any(|f| f == "sound/old-run.ogg"));
    assert!(!stale.exists());
}

#[test]
fn test_cancelled_extraction_is_resumable_and_cleanable() {
    let provider = MemoryProvider::new(MemoryArchive::new().files("data:sound/", 10));
    let config = ExtractConfig::new(["data:sound/"]).with_checkpoint_interval(4);
    let temp = TempDir::new().unwrap();
    let target = Target::new("test", temp.path());
    let token = CancellationToken::new();
    let mut progress = recorder(temp.path(), Some((6, token.clone())));

    let outcome = extract_target(&provider, &target, &config, &mut progress, &mut NoopProgress, &token).unwrap();
    assert!(outcome.is_cancelled());

    let partial = store::load_manifest(&target.manifest_path()).unwrap().unwrap();
    assert!(!partial.complete);
    assert_eq!(partial.len(), 6);
    for file in &partial.files {
        assert!(temp.path().join(file).exists(), "{file} recorded but missing");
    }
    assert!(!temp.path().join("sound/6").exists());
    assert_eq!(evaluate_state(&target), TargetState::Partial);

    let done = extract(&provider, temp.path(), &config).unwrap().completed().unwrap();
    assert_eq!(done.manifest.len(), 10);
    assert_eq!(evaluate_state(&target), TargetState::Extracted);
}

#[test]
fn test_undo_twice_is_harmless() {
    let temp = TempDir::new().unwrap();
    let provider = MemoryProvider::new(MemoryArchive::new().files("data:sound/x/", 3));
    let config = ExtractConfig::new(["data:sound/"]);
    extract(&provider, temp.path(), &config).unwrap();

    let saved = fs::read(temp.path().join(MANIFEST_FILE_NAME)).unwrap();
    let first = undo(temp.path(), &config).unwrap().completed().unwrap();
    assert_eq!(first.files_deleted, 3);

    fs::write(temp.path().join(MANIFEST_FILE_NAME), saved).unwrap();
    let second = undo(temp.path(), &config).unwrap().completed().unwrap();
    assert_eq!(second.files_deleted, 0);
    assert_eq!(second.files_missing, 3);
    assert_eq!(second.files_failed, 0);

    assert!(matches!(undo(temp.path(), &config), Err(VfsxError::ManifestMissing { .. })));
}

#[test]
fn test_cancelled_undo_resumes() {
    let temp = TempDir::new().unwrap();
    let provider = MemoryProvider::new(MemoryArchive::new().files("data:sound/", 5));
    let config = ExtractConfig::new(["data:sound/"]);
    extract(&provider, temp.path(), &config).unwrap();

    struct CancelAt(usize, CancellationToken);
    impl ProgressCallback for CancelAt {
        fn on_progress(&mut self, snapshot: &ProgressSnapshot) {
            if snapshot.files_processed >= self.0 {
                self.1.cancel();
            }
        }
    }

    let token = CancellationToken::new();
    let outcome = undo_target(
        &Target::new("test", temp.path()),
        &config,
        &mut CancelAt(2, token.clone()),
        &mut NoopProgress,
        &token,
    )
    .unwrap();
    assert!(outcome.is_cancelled());
    assert!(!temp.path().join("sound/0").exists());
    assert!(!temp.path().join("sound/1").exists());
    assert!(temp.path().join("sound/2").exists());
    assert!(temp.path().join(MANIFEST_FILE_NAME).exists());

    let report = undo(temp.path(), &config).unwrap().completed().unwrap();
    assert_eq!(report.files_missing, 2);
    assert_eq!(report.files_deleted, 3);
    assert!(!temp.path().join("sound").exists());
}

#[test]
fn test_dry_spell_bounds_endless_listing() {
    let archive = MemoryArchive::new()
        .files("data:sound/", 3)
        .endless("data:video/filler");
    let provider = MemoryProvider::new(archive.clone());
    let config = ExtractConfig::new(["data:sound/"]).with_scan_limits(ScanLimits {
        dry_spell_threshold: 1_000,
        pre_match_cap: 1_000_000,
        progress_interval: Duration::from_millis(500),
    });
    let temp = TempDir::new().unwrap();

    let done = extract(&provider, temp.path(), &config).unwrap().completed().unwrap();
    assert_eq!(done.manifest.len(), 3);
    assert_eq!(done.report.scan_termination, Some(ScanTermination::DrySpell));
    assert_eq!(archive.pulled(), 3 + 1_000);
}

#[test]
fn test_pre_match_cap_bounds_endless_listing() {
    let archive = MemoryArchive::new().endless("data:video/filler");
    let provider = MemoryProvider::new(archive.clone());
    let config = ExtractConfig::new(["data:sound/"]).with_scan_limits(ScanLimits {
        dry_spell_threshold: 10,
        pre_match_cap: 5_000,
        progress_interval: Duration::from_millis(500),
    });
    let temp = TempDir::new().unwrap();

    let result = extract(&provider, temp.path(), &config);
    assert!(matches!(result, Err(VfsxError::NoMatchingEntries { scanned: 5_000 })));
    assert_eq!(archive.pulled(), 5_000);
    assert!(!temp.path().join(MANIFEST_FILE_NAME).exists());
}

#[test]
fn test_every_recorded_path_came_from_a_prefix() {
    let temp = zip_root(&[
        ("Sound/A.ogg", "1"),
        ("sound2/b.ogg", "2"),
        ("soundtrack.txt", "3"),
        ("sound/c.ogg", "4"),
    ]);
    let config = ExtractConfig::new(["data:sound/"]);
    let done = extract(&ZipProvider::default(), temp.path(), &config)
        .unwrap()
        .completed()
        .unwrap();
    assert_eq!(done.manifest.files, vec!["Sound/A.ogg", "sound/c.ogg"]);
}

#[test]
fn test_existing_files_are_overwritten() {
    let temp = zip_root(&[("sound/a.ogg", "fresh")]);
    fs::create_dir_all(temp.path().join("sound")).unwrap();
    fs::write(temp.path().join("sound/a.ogg"), "stale content").unwrap();

    extract(&ZipProvider::default(), temp.path(), &ExtractConfig::new(["data:sound/"])).unwrap();
    assert_eq!(fs::read_to_string(temp.path().join("sound/a.ogg")).unwrap(), "fresh");
}
