//! ZIP-backed archive capability.

use std::collections::HashMap;
use std::fs::File;
use std::io::ErrorKind;
use std::io::Read;
use std::path::Path;
use std::path::PathBuf;

use ::zip::ZipArchive;

use super::traits::ArchiveProvider;
use super::traits::EntryReader;
use super::traits::RawEntry;
use super::traits::Storage;
use crate::Result;
use crate::VfsxError;
use crate::types::virtual_path;

/// Default archive file name inside a target root.
pub const DEFAULT_ARCHIVE_NAME: &str = "data.zip";

/// Default namespace qualifier for ZIP members.
pub const DEFAULT_NAMESPACE: &str = "data";

/// Serves a ZIP file inside each target root as an archive storage.
///
/// Every member is exposed as `<namespace>:<member name>`. Directory members
/// are listed as unavailable, so they never match. Members are opened by the
/// index recorded while enumerating, so names written with `\` separators
/// resolve from their normalized virtual path.
///
/// # Examples
///
/// ```no_run
/// use std::path::Path;
/// use vfsx_core::formats::ArchiveProvider;
/// use vfsx_core::formats::ZipProvider;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let provider = ZipProvider::new("data.zip", "data");
/// let mut storage = provider.open(Path::new("/games/one"))?;
/// for entry in storage.entries()?.take(10) {
///     println!("{} ({} bytes)", entry.virtual_path, entry.size);
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct ZipProvider {
    archive_name: PathBuf,
    namespace: String,
}

impl ZipProvider {
    /// Creates a provider reading `<root>/<archive_name>` and qualifying
    /// members with `namespace`.
    pub fn new(archive_name: impl Into<PathBuf>, namespace: impl Into<String>) -> Self {
        Self {
            archive_name: archive_name.into(),
            namespace: namespace.into(),
        }
    }

    /// Namespace qualifier of this provider's members.
    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }
}

impl Default for ZipProvider {
    fn default() -> Self {
        Self::new(DEFAULT_ARCHIVE_NAME, DEFAULT_NAMESPACE)
    }
}

impl ArchiveProvider for ZipProvider {
    fn open(&self, root: &Path) -> Result<Box<dyn Storage>> {
        let archive_path = root.join(&self.archive_name);
        let open_failed = |reason: String| VfsxError::StorageOpenFailed {
            path: root.to_path_buf(),
            reason,
        };

        let file = File::open(&archive_path)
            .map_err(|e| open_failed(format!("{}: {e}", archive_path.display())))?;
        let archive = ZipArchive::new(file)
            .map_err(|e| open_failed(format!("failed to open ZIP archive: {e}")))?;

        Ok(Box::new(ZipStorage {
            archive,
            namespace: self.namespace.clone(),
            indices: HashMap::new(),
        }))
    }
}

struct ZipStorage {
    archive: ZipArchive<File>,
    namespace: String,
    /// Normalized virtual path to member index, filled during enumeration.
    indices: HashMap<String, usize>,
}

impl Storage for ZipStorage {
    fn entries(&mut self) -> Result<Box<dyn Iterator<Item = RawEntry> + '_>> {
        Ok(Box::new(ZipEntries {
            archive: &mut self.archive,
            namespace: &self.namespace,
            indices: &mut self.indices,
            index: 0,
        }))
    }

    fn open_entry(&mut self, path: &str) -> Result<Box<dyn EntryReader + '_>> {
        let normalized = virtual_path::normalize(path);
        let open_failed = |e: ::zip::result::ZipError| VfsxError::EntryOpenFailed {
            path: path.to_string(),
            reason: e.to_string(),
        };
        let file = match self.indices.get(normalized.as_ref()) {
            Some(&index) => self.archive.by_index(index).map_err(open_failed)?,
            None => self
                .archive
                .by_name(virtual_path::strip_namespace(&normalized))
                .map_err(open_failed)?,
        };

        Ok(Box::new(ZipEntry {
            size: file.size(),
            inner: file,
        }))
    }
}

struct ZipEntries<'a> {
    archive: &'a mut ZipArchive<File>,
    namespace: &'a str,
    indices: &'a mut HashMap<String, usize>,
    index: usize,
}

impl Iterator for ZipEntries<'_> {
    type Item = RawEntry;

    fn next(&mut self) -> Option<RawEntry> {
        if self.index >= self.archive.len() {
            return None;
        }
        let index = self.index;
        self.index += 1;

        let entry = match self.archive.by_index(index) {
            Ok(file) => {
                let virtual_path = format!("{}:{}", self.namespace, file.name());
                self.indices
                    .insert(virtual_path::normalize(&virtual_path).into_owned(), index);
                RawEntry {
                    virtual_path,
                    size: file.size(),
                    available: !file.is_dir(),
                }
            }
            Err(e) => {
                tracing::debug!(index, error = %e, "unreadable ZIP central directory record");
                RawEntry::unavailable(String::new(), 0)
            }
        };
        Some(entry)
    }
}

struct ZipEntry<R> {
    inner: R,
    size: u64,
}

impl<R: Read> EntryReader for ZipEntry<R> {
    fn size(&self) -> Result<u64> {
        Ok(self.size)
    }

    fn read_chunk(&mut self, buf: &mut [u8]) -> usize {
        loop {
            match self.inner.read(buf) {
                Ok(n) => return n,
                Err(e) if e.kind() == ErrorKind::Interrupted => {}
                Err(e) => {
                    tracing::debug!(error = %e, "ZIP entry read failed");
                    return 0;
                }
            }
        }
    }
}
