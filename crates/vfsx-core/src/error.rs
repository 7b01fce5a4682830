//! Error types for extraction, undo and scheduling operations.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using `VfsxError`.
pub type Result<T> = std::result::Result<T, VfsxError>;

/// Errors that can occur while extracting, undoing or scheduling targets.
///
/// Cancellation is not an error: a cancelled operation completes with
/// [`Outcome::Cancelled`](crate::Outcome::Cancelled) instead of failing.
#[derive(Error, Debug)]
pub enum VfsxError {
    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The archive storage under a target root could not be opened.
    #[error("failed to open archive storage at {path}: {reason}")]
    StorageOpenFailed {
        /// Target root the storage was opened from.
        path: PathBuf,
        /// Underlying failure reported by the archive capability.
        reason: String,
    },

    /// A single archive entry could not be opened.
    #[error("failed to open archive entry {path}: {reason}")]
    EntryOpenFailed {
        /// Virtual path of the entry.
        path: String,
        /// Underlying failure reported by the archive capability.
        reason: String,
    },

    /// Enumeration finished without a single entry matching the prefixes.
    #[error("no archive entries matched the configured prefixes ({scanned} entries scanned)")]
    NoMatchingEntries {
        /// Number of raw entries observed before giving up.
        scanned: u64,
    },

    /// No manifest exists for the target, so there is nothing to undo.
    #[error("no extraction manifest found at {path}")]
    ManifestMissing {
        /// Expected manifest location.
        path: PathBuf,
    },

    /// The manifest exists but could not be parsed.
    #[error("corrupt extraction manifest at {path}: {source}")]
    ManifestCorrupt {
        /// Manifest location.
        path: PathBuf,
        /// Parse failure.
        source: serde_json::Error,
    },

    /// The persisted target list could not be parsed.
    #[error("corrupt target list at {path}: {source}")]
    TargetListCorrupt {
        /// Target list location.
        path: PathBuf,
        /// Parse failure.
        source: serde_json::Error,
    },

    /// The target already has a queued or running operation.
    #[error("target {root} is busy with another operation")]
    TargetBusy {
        /// Target root.
        root: PathBuf,
    },

    /// The target already holds a complete extraction.
    #[error("target {root} is already extracted")]
    AlreadyExtracted {
        /// Target root.
        root: PathBuf,
    },

    /// The target holds no manifest, so undo has nothing to do.
    #[error("target {root} has nothing to undo")]
    NothingToUndo {
        /// Target root.
        root: PathBuf,
    },

    /// The target is not registered with the scheduler.
    #[error("unknown target {root}")]
    UnknownTarget {
        /// Target root.
        root: PathBuf,
    },

    /// A target with the same root is already registered.
    #[error("target {root} is already registered")]
    DuplicateTarget {
        /// Target root.
        root: PathBuf,
    },

    /// A relative path would escape the target root.
    #[error("unsafe relative path: {path}")]
    UnsafePath {
        /// The rejected path.
        path: String,
    },

    /// Configuration failed validation.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The scheduler has been shut down and accepts no more work.
    #[error("scheduler is shut down")]
    SchedulerShutDown,

    /// An operation panicked on the worker thread.
    #[error("operation on {root} panicked: {message}")]
    OperationPanicked {
        /// Target root.
        root: PathBuf,
        /// Panic payload, if it was a string.
        message: String,
    },
}

impl VfsxError {
    /// Returns `true` if this error aborts a whole extraction or undo.
    ///
    /// # Examples
    ///
    /// ```
    /// use vfsx_core::VfsxError;
    ///
    /// let err = VfsxError::NoMatchingEntries { scanned: 10 };
    /// assert!(err.is_fatal());
    ///
    /// let err = VfsxError::UnsafePath { path: "../x".into() };
    /// assert!(!err.is_fatal());
    /// ```
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Io(_)
                | Self::StorageOpenFailed { .. }
                | Self::NoMatchingEntries { .. }
                | Self::ManifestMissing { .. }
                | Self::ManifestCorrupt { .. }
                | Self::TargetListCorrupt { .. }
                | Self::InvalidConfig(_)
                | Self::OperationPanicked { .. }
        )
    }

    /// Returns `true` if the scheduler rejected the request before any I/O.
    #[must_use]
    pub const fn is_rejection(&self) -> bool {
        matches!(
            self,
            Self::TargetBusy { .. }
                | Self::AlreadyExtracted { .. }
                | Self::NothingToUndo { .. }
                | Self::UnknownTarget { .. }
                | Self::DuplicateTarget { .. }
                | Self::SchedulerShutDown
        )
    }

    /// Returns `true` if the error concerns a single item and the surrounding
    /// operation skips it and carries on.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::EntryOpenFailed { .. } | Self::UnsafePath { .. })
    }
}
