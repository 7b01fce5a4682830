//! Core extraction engine.

use std::fs;
use std::fs::File;
use std::path::Path;
use std::time::Instant;

use super::stream::CopyBuffer;
use super::stream::copy_entry;
use crate::CancellationToken;
use crate::ExtractConfig;
use crate::ExtractionReport;
use crate::LogLevel;
use crate::LogSink;
use crate::Outcome;
use crate::ProgressCallback;
use crate::Result;
use crate::VfsxError;
use crate::formats::ArchiveProvider;
use crate::formats::Storage;
use crate::report::Phase;
use crate::report::ProgressSnapshot;
use crate::scanner::EntryScanner;
use crate::scanner::MatchedEntry;
use crate::scanner::ScanTermination;
use crate::store;
use crate::store::Manifest;
use crate::types::MANIFEST_FILE_NAME;
use crate::types::RelPath;
use crate::types::Target;

/// A finished extraction: the manifest persisted on disk and the report.
#[derive(Debug, Clone)]
pub struct Extraction {
    /// The complete manifest as written.
    pub manifest: Manifest,
    /// Counters and warnings.
    pub report: ExtractionReport,
}

/// Streams matched archive entries into a target root.
///
/// The engine assumes a clean slate: a target holding an incomplete manifest
/// must be undone first.
///
/// # Examples
///
/// ```no_run
/// use vfsx_core::CancellationToken;
/// use vfsx_core::ExtractConfig;
/// use vfsx_core::NoopProgress;
/// use vfsx_core::Target;
/// use vfsx_core::extraction::ExtractionEngine;
/// use vfsx_core::formats::ZipProvider;
///
/// # fn main() -> vfsx_core::Result<()> {
/// let provider = ZipProvider::default();
/// let config = ExtractConfig::new(["data:sound/"]);
/// let engine = ExtractionEngine::new(&provider, &config);
///
/// let target = Target::new("one", "/games/one");
/// let outcome = engine.extract(
///     &target,
///     &mut NoopProgress,
///     &mut NoopProgress,
///     &CancellationToken::new(),
/// )?;
/// if let Some(done) = outcome.completed() {
///     println!("{} files", done.manifest.len());
/// }
/// # Ok(())
/// # }
/// ```
pub struct ExtractionEngine<'a> {
    provider: &'a dyn ArchiveProvider,
    config: &'a ExtractConfig,
}

impl<'a> ExtractionEngine<'a> {
    /// Creates an engine reading through `provider`.
    pub fn new(provider: &'a dyn ArchiveProvider, config: &'a ExtractConfig) -> Self {
        Self { provider, config }
    }

    /// Extracts every entry matching the configured prefixes into the
    /// target root.
    ///
    /// Per-entry open and path problems skip the entry with a warning.
    /// Cancellation is observed between entries and leaves a checkpointed,
    /// incomplete manifest describing exactly the files written.
    ///
    /// # Errors
    ///
    /// Fails with [`VfsxError::StorageOpenFailed`] or
    /// [`VfsxError::NoMatchingEntries`] before any file is written, and with
    /// [`VfsxError::Io`] if a destination file or the manifest cannot be
    /// written.
    pub fn extract(
        &self,
        target: &Target,
        progress: &mut dyn ProgressCallback,
        log: &mut dyn LogSink,
        cancel: &CancellationToken,
    ) -> Result<Outcome<Extraction>> {
        self.config.validate()?;
        let started = Instant::now();
        tracing::info!(name = %target.name, root = %target.root.display(), "extraction started");
        log.log(LogLevel::Info, &format!("Extracting {}", target.name));

        let mut storage = self.provider.open(&target.root)?;
        let mut report = ExtractionReport::new();

        let matched = {
            let raw = storage.entries()?;
            let mut scanner =
                EntryScanner::new(raw, &self.config.prefixes, self.config.scan, cancel, progress);
            let matched: Vec<MatchedEntry> = scanner.by_ref().collect();
            if let Some(summary) = scanner.summary() {
                report.entries_scanned = summary.scanned;
                report.scan_termination = Some(summary.termination);
                report.indexing_duration = summary.indexing;
            }
            matched
        };

        if report.scan_termination == Some(ScanTermination::Cancelled) {
            tracing::info!(name = %target.name, "extraction cancelled during enumeration");
            return Ok(Outcome::Cancelled);
        }
        if matched.is_empty() {
            return Err(VfsxError::NoMatchingEntries {
                scanned: report.entries_scanned,
            });
        }

        let total_bytes = matched.iter().map(|e| e.size).fold(0u64, u64::saturating_add);
        tracing::info!(
            name = %target.name,
            matched = matched.len(),
            total_bytes,
            scanned = report.entries_scanned,
            "enumeration finished"
        );

        let manifest_path = target.manifest_path();
        let mut manifest = Manifest::begin();
        store::save_manifest(&manifest_path, &manifest)?;

        let mut buffer = CopyBuffer::new(self.config.chunk_size);
        let mut snapshot = ProgressSnapshot {
            total_files: matched.len(),
            total_bytes,
            ..ProgressSnapshot::start(Phase::Transferring)
        };
        progress.on_progress(&snapshot);

        for (index, entry) in matched.iter().enumerate() {
            if cancel.is_cancelled() {
                checkpoint(&manifest_path, &mut manifest)?;
                tracing::info!(
                    name = %target.name,
                    files = manifest.len(),
                    "extraction cancelled"
                );
                return Ok(Outcome::Cancelled);
            }

            match transfer(storage.as_mut(), entry, &target.root, &mut buffer) {
                Ok((rel, written)) => {
                    manifest.record(&rel, written);
                    report.files_extracted += 1;
                    report.bytes_written += written;
                }
                Err(e) if e.is_recoverable() => {
                    let message = format!("skipped {}: {e}", entry.virtual_path);
                    tracing::warn!(entry = %entry.virtual_path, error = %e, "entry skipped");
                    log.log(LogLevel::Warning, &message);
                    report.files_skipped += 1;
                    report.add_warning(message);
                }
                Err(e) => {
                    if let Err(save) = checkpoint(&manifest_path, &mut manifest) {
                        tracing::error!(error = %save, "checkpoint after failure could not be written");
                    }
                    return Err(e);
                }
            }

            let processed = index + 1;
            snapshot.files_processed = processed;
            snapshot.bytes_processed = report.bytes_written;
            snapshot.current_path.clone_from(&entry.virtual_path);
            progress.on_progress(&snapshot);

            if processed % self.config.checkpoint_interval == 0 {
                checkpoint(&manifest_path, &mut manifest)?;
                tracing::debug!(files = manifest.len(), processed, "checkpoint written");
            }
        }

        manifest.finish();
        store::save_manifest(&manifest_path, &manifest)?;
        report.duration = started.elapsed();

        tracing::info!(
            name = %target.name,
            files = report.files_extracted,
            skipped = report.files_skipped,
            bytes = report.bytes_written,
            elapsed_ms = report.duration.as_millis(),
            "extraction finished"
        );
        log.log(
            LogLevel::Info,
            &format!(
                "Extracted {} files ({} bytes) into {}",
                report.files_extracted,
                report.bytes_written,
                target.root.display()
            ),
        );

        Ok(Outcome::Completed(Extraction { manifest, report }))
    }
}

fn checkpoint(path: &Path, manifest: &mut Manifest) -> Result<()> {
    manifest.touch();
    store::save_manifest(path, manifest)
}

/// Writes one entry to disk, returning its relative path and bytes written.
///
/// A destination that fails mid-write is removed before the error is
/// returned, so it never lingers unrecorded.
fn transfer(
    storage: &mut dyn Storage,
    entry: &MatchedEntry,
    root: &Path,
    buffer: &mut CopyBuffer,
) -> Result<(RelPath, u64)> {
    let rel = RelPath::from_virtual(&entry.virtual_path)?;
    if rel.as_str().eq_ignore_ascii_case(MANIFEST_FILE_NAME) {
        return Err(VfsxError::UnsafePath {
            path: rel.as_str().to_string(),
        });
    }

    let mut reader = storage.open_entry(&entry.virtual_path)?;
    let size = reader.size().map_err(|e| VfsxError::EntryOpenFailed {
        path: entry.virtual_path.clone(),
        reason: format!("size unavailable: {e}"),
    })?;

    let dest = rel.resolve(root);
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut file = File::create(&dest)?;

    match copy_entry(reader.as_mut(), &mut file, size, buffer) {
        Ok(written) => {
            if written < size {
                tracing::debug!(entry = %entry.virtual_path, size, written, "short entry");
            }
            Ok((rel, written))
        }
        Err(e) => {
            drop(file);
            let _ = fs::remove_file(&dest);
            Err(e.into())
        }
    }
}
