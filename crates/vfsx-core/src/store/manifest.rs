//! Per-target extraction manifest.

use chrono::DateTime;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use super::atomic::write_json_atomic;
use crate::Result;
use crate::VfsxError;
use crate::types::RelPath;

/// Record of exactly which files an extraction wrote.
///
/// While `complete` is `false` the file list is append-only and always a
/// prefix of what an uninterrupted run would record.
///
/// # Examples
///
/// ```
/// use vfsx_core::RelPath;
/// use vfsx_core::store::Manifest;
///
/// let mut manifest = Manifest::begin();
/// manifest.record(&RelPath::parse("sound/a.ogg").unwrap(), 10);
/// manifest.finish();
/// assert!(manifest.complete);
/// assert_eq!(manifest.total_bytes, 10);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    /// When the manifest was last written by a checkpoint or completion.
    pub timestamp: DateTime<Utc>,

    /// Relative paths in extraction order, `/`-separated.
    pub files: Vec<String>,

    /// Bytes written for the listed files.
    pub total_bytes: u64,

    /// Whether the extraction ran to completion. Manifests written before
    /// the flag existed are complete.
    #[serde(rename = "completion", default = "complete_by_default")]
    pub complete: bool,
}

const fn complete_by_default() -> bool {
    true
}

impl Manifest {
    /// Starts an empty, incomplete manifest.
    #[must_use]
    pub fn begin() -> Self {
        Self {
            timestamp: Utc::now(),
            files: Vec::new(),
            total_bytes: 0,
            complete: false,
        }
    }

    /// Appends a written file.
    pub fn record(&mut self, path: &RelPath, bytes: u64) {
        self.files.push(path.as_str().to_string());
        self.total_bytes = self.total_bytes.saturating_add(bytes);
    }

    /// Refreshes the timestamp before a checkpoint.
    pub fn touch(&mut self) {
        self.timestamp = Utc::now();
    }

    /// Marks the extraction complete.
    pub fn finish(&mut self) {
        self.complete = true;
        self.touch();
    }

    /// Number of recorded files.
    #[must_use]
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Returns `true` if no file was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

/// Loads the manifest at `path`.
///
/// Returns `Ok(None)` if no manifest exists.
///
/// # Errors
///
/// Returns [`VfsxError::ManifestCorrupt`] if the file is not a valid
/// manifest, or [`VfsxError::Io`] if it cannot be read.
pub fn load_manifest(path: &Path) -> Result<Option<Manifest>> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    serde_json::from_slice(&bytes)
        .map(Some)
        .map_err(|source| VfsxError::ManifestCorrupt {
            path: path.to_path_buf(),
            source,
        })
}

/// Atomically writes `manifest` to `path`.
///
/// # Errors
///
/// Returns [`VfsxError::Io`] if the file cannot be written.
pub fn save_manifest(path: &Path, manifest: &Manifest) -> Result<()> {
    write_json_atomic(path, manifest)
}

/// Deletes the manifest at `path`.
///
/// Returns `Ok(false)` if there was none.
///
/// # Errors
///
/// Returns [`VfsxError::Io`] if the file exists but cannot be deleted.
pub fn remove_manifest(path: &Path) -> Result<bool> {
    match fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_missing_is_none() {
        let temp = TempDir::new().unwrap();
        assert!(load_manifest(&temp.path().join("m.json")).unwrap().is_none());
    }

    #[test]
    fn test_save_then_load() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("m.json");

        let mut manifest = Manifest::begin();
        manifest.record(&RelPath::parse("sound/a.ogg").unwrap(), 10);
        manifest.record(&RelPath::parse("sound/b.ogg").unwrap(), 0);
        save_manifest(&path, &manifest).unwrap();

        let loaded = load_manifest(&path).unwrap().unwrap();
        assert_eq!(loaded, manifest);
        assert!(!loaded.complete);
        assert_eq!(loaded.files, vec!["sound/a.ogg", "sound/b.ogg"]);
    }

    #[test]
    fn test_json_field_names() {
        let mut manifest = Manifest::begin();
        manifest.record(&RelPath::parse("a").unwrap(), 10);
        manifest.finish();

        let value = serde_json::to_value(&manifest).unwrap();
        assert_eq!(value["files"], serde_json::json!(["a"]));
        assert_eq!(value["totalBytes"], 10);
        assert_eq!(value["completion"], true);
        assert!(value["timestamp"].as_str().unwrap().contains('T'));
    }

    #[test]
    fn test_missing_completion_defaults_to_complete() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("m.json");
        std::fs::write(
            &path,
            r#"{"timestamp":"2024-03-01T12:00:00Z","files":["a","b"],"totalBytes":10}"#,
        )
        .unwrap();

        let loaded = load_manifest(&path).unwrap().unwrap();
        assert!(loaded.complete);
        assert_eq!(loaded.len(), 2);
    }

    #[test]
    fn test_corrupt_manifest() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("m.json");
        std::fs::write(&path, b"{ not json").unwrap();
        assert!(matches!(
            load_manifest(&path),
            Err(VfsxError::ManifestCorrupt { .. })
        ));
    }

    #[test]
    fn test_remove_manifest() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("m.json");
        save_manifest(&path, &Manifest::begin()).unwrap();
        assert!(remove_manifest(&path).unwrap());
        assert!(!remove_manifest(&path).unwrap());
    }
}
