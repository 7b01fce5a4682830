//! Managed targets and their lifecycle states.

use serde::Deserialize;
use serde::Serialize;
use std::fmt;
use std::path::Path;
use std::path::PathBuf;

/// File name of the extraction manifest, relative to a target root.
pub const MANIFEST_FILE_NAME: &str = ".vfsx-manifest.json";

/// One managed archive-backed location.
///
/// Identity is the root path compared case-insensitively; see [`TargetKey`].
/// This is also the record persisted in the target list file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Target {
    /// Display name.
    pub name: String,
    /// Absolute root directory holding the archive and the extracted files.
    pub root: PathBuf,
}

impl Target {
    /// Creates a new target.
    pub fn new(name: impl Into<String>, root: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            root: root.into(),
        }
    }

    /// Location of this target's manifest.
    #[must_use]
    pub fn manifest_path(&self) -> PathBuf {
        self.root.join(MANIFEST_FILE_NAME)
    }

    /// Identity key of this target.
    #[must_use]
    pub fn key(&self) -> TargetKey {
        TargetKey::new(&self.root)
    }
}

impl PartialEq for Target {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for Target {}

/// Case-insensitive identity of a target root.
///
/// # Examples
///
/// ```
/// use vfsx_core::TargetKey;
///
/// assert_eq!(TargetKey::new("C:/Games/One"), TargetKey::new("c:/games/one"));
/// assert_eq!(TargetKey::new("/games/one/"), TargetKey::new("/games/one"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TargetKey(String);

impl TargetKey {
    /// Builds the key for a root path.
    pub fn new(root: impl AsRef<Path>) -> Self {
        let text = root.as_ref().to_string_lossy().replace('\\', "/");
        let trimmed = text.trim_end_matches('/');
        let text = if trimmed.is_empty() { "/" } else { trimmed };
        Self(text.to_lowercase())
    }

    /// Returns the normalized key text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TargetKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lifecycle state of a target.
///
/// `Ready`, `Extracted` and `Partial` mirror the manifest on disk; `Queued`
/// and `Running` are scheduler states; `Cancelled` and `Error` record how the
/// last operation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetState {
    /// No manifest on disk.
    Ready,
    /// Waiting in the work queue.
    Queued,
    /// An extraction or undo is in progress.
    Running,
    /// A complete manifest is on disk.
    Extracted,
    /// An incomplete manifest is on disk.
    Partial,
    /// The last operation was cancelled.
    Cancelled,
    /// The last operation failed.
    Error,
}

impl TargetState {
    /// Returns `true` if an operation is queued or running.
    #[must_use]
    pub const fn is_busy(self) -> bool {
        matches!(self, Self::Queued | Self::Running)
    }

    /// Lower-case label used in CLI and JSON output.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Ready => "ready",
            Self::Queued => "queued",
            Self::Running => "running",
            Self::Extracted => "extracted",
            Self::Partial => "partial",
            Self::Cancelled => "cancelled",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for TargetState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
