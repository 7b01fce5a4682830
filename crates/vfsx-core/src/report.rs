//! Operation outcomes, reports and progress reporting hooks.

use serde::Serialize;
use std::time::Duration;

use crate::scanner::ScanTermination;

/// Result of an operation that may be cancelled.
///
/// Cancellation is an expected outcome rather than an error, so callers can
/// tell "stopped on request" apart from "failed".
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome<T> {
    /// The operation ran to completion.
    Completed(T),
    /// The operation observed a cancellation request and stopped.
    Cancelled,
}

impl<T> Outcome<T> {
    /// Returns `true` for [`Outcome::Cancelled`].
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Returns the completed value, if any.
    pub fn completed(self) -> Option<T> {
        match self {
            Self::Completed(value) => Some(value),
            Self::Cancelled => None,
        }
    }
}

/// Phase of a running operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    /// The archive is building its index; no entries observed yet.
    Indexing,
    /// Raw entries are being enumerated and filtered.
    Enumerating,
    /// Matched entries are being copied to disk.
    Transferring,
    /// Extracted files are being deleted.
    Deleting,
}

/// Point-in-time view of an operation's progress.
///
/// `total_files` is 0 while enumerating, because the total is not known until
/// enumeration ends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProgressSnapshot {
    /// Current phase.
    pub phase: Phase,
    /// Entries or files processed so far.
    pub files_processed: usize,
    /// Total entries or files, or 0 if not yet known.
    pub total_files: usize,
    /// Path most recently observed or processed.
    pub current_path: String,
    /// Bytes processed so far.
    pub bytes_processed: u64,
    /// Total bytes, or 0 if not yet known.
    pub total_bytes: u64,
}

impl ProgressSnapshot {
    /// Snapshot for a phase with nothing processed yet.
    #[must_use]
    pub fn start(phase: Phase) -> Self {
        Self {
            phase,
            files_processed: 0,
            total_files: 0,
            current_path: String::new(),
            bytes_processed: 0,
            total_bytes: 0,
        }
    }
}

/// Callback trait for progress reporting during extraction and undo.
///
/// The trait requires `Send` so operations can run on a worker thread.
///
/// # Examples
///
/// ```
/// use vfsx_core::ProgressCallback;
/// use vfsx_core::ProgressSnapshot;
///
/// struct Printer;
///
/// impl ProgressCallback for Printer {
///     fn on_progress(&mut self, snapshot: &ProgressSnapshot) {
///         println!(
///             "{:?} {}/{} {}",
///             snapshot.phase, snapshot.files_processed, snapshot.total_files, snapshot.current_path
///         );
///     }
/// }
/// ```
pub trait ProgressCallback: Send {
    /// Called with a fresh snapshot whenever progress changes noticeably.
    fn on_progress(&mut self, snapshot: &ProgressSnapshot);

    /// Called once, when the archive yields its first raw entry, with the
    /// time spent waiting for the archive index.
    fn on_indexed(&mut self, _elapsed: Duration) {}
}

/// Severity of a message sent to a [`LogSink`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Informational milestone.
    Info,
    /// Recoverable problem; the operation carried on.
    Warning,
}

/// Receiver of human-readable messages from an operation.
///
/// Every message is also emitted as a `tracing` event; a sink exists so a
/// presentation layer can show them next to a specific target.
pub trait LogSink: Send {
    /// Records one message.
    fn log(&mut self, level: LogLevel, message: &str);
}

/// No-op implementation of [`ProgressCallback`] and [`LogSink`].
#[derive(Debug, Default)]
pub struct NoopProgress;

impl ProgressCallback for NoopProgress {
    fn on_progress(&mut self, _snapshot: &ProgressSnapshot) {}
}

impl LogSink for NoopProgress {
    fn log(&mut self, _level: LogLevel, _message: &str) {}
}

/// Report of a completed extraction.
#[derive(Debug, Clone, Default)]
pub struct ExtractionReport {
    /// Number of entries written to disk.
    pub files_extracted: usize,

    /// Number of matched entries skipped because they could not be read or
    /// mapped to a safe path.
    pub files_skipped: usize,

    /// Total bytes written to disk.
    pub bytes_written: u64,

    /// Raw entries observed during enumeration.
    pub entries_scanned: u64,

    /// Why enumeration stopped.
    pub scan_termination: Option<ScanTermination>,

    /// Time spent waiting for the archive index.
    pub indexing_duration: Option<Duration>,

    /// Duration of the whole extraction.
    pub duration: Duration,

    /// Warnings generated during extraction.
    pub warnings: Vec<String>,
}

impl ExtractionReport {
    /// Creates a new empty report.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a warning message to the report.
    pub fn add_warning(&mut self, message: String) {
        self.warnings.push(message);
    }

    /// Returns whether any warnings were generated.
    #[must_use]
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}

/// Report of a completed undo.
#[derive(Debug, Clone, Default)]
pub struct UndoReport {
    /// Files deleted.
    pub files_deleted: usize,

    /// Files listed in the manifest that were already gone.
    pub files_missing: usize,

    /// Files that could not be deleted and were left in place.
    pub files_failed: usize,

    /// Empty directories removed while pruning managed roots.
    pub directories_removed: usize,

    /// Duration of the whole undo.
    pub duration: Duration,

    /// Warnings generated during undo.
    pub warnings: Vec<String>,
}

impl UndoReport {
    /// Creates a new empty report.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a warning message to the report.
    pub fn add_warning(&mut self, message: String) {
        self.warnings.push(message);
    }

    /// Returns whether any warnings were generated.
    #[must_use]
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}
