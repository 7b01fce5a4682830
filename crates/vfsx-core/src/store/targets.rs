//! Persisted list of managed targets.

use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use std::path::PathBuf;

use super::atomic::write_json_atomic;
use crate::Result;
use crate::VfsxError;
use crate::types::Target;

/// JSON file holding the managed targets, as an array of
/// `{ "name": ..., "root": ... }` objects.
///
/// # Examples
///
/// ```
/// use vfsx_core::Target;
/// use vfsx_core::store::TargetList;
///
/// # fn main() -> vfsx_core::Result<()> {
/// let dir = tempfile::tempdir()?;
/// let list = TargetList::new(dir.path().join("targets.json"));
/// assert!(list.load()?.is_empty());
///
/// list.save(&[Target::new("one", "/games/one")])?;
/// assert_eq!(list.load()?.len(), 1);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct TargetList {
    path: PathBuf,
}

impl TargetList {
    /// Creates a handle for the list stored at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Location of the list file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the targets. A missing file is an empty list.
    ///
    /// # Errors
    ///
    /// Returns [`VfsxError::TargetListCorrupt`] if the file cannot be parsed.
    pub fn load(&self) -> Result<Vec<Target>> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        serde_json::from_slice(&bytes).map_err(|source| VfsxError::TargetListCorrupt {
            path: self.path.clone(),
            source,
        })
    }

    /// Atomically replaces the list with `targets`.
    ///
    /// # Errors
    ///
    /// Returns [`VfsxError::Io`] if the file cannot be written.
    pub fn save(&self, targets: &[Target]) -> Result<()> {
        write_json_atomic(&self.path, targets)
    }
}
