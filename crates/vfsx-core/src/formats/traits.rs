//! Archive capability consumed by the engines.
//!
//! The engines never parse an archive themselves. They open a [`Storage`]
//! through an [`ArchiveProvider`], enumerate [`RawEntry`] values and stream
//! entry contents through an [`EntryReader`]. Handles are released on drop,
//! so every exit path (success, error, cancellation) closes them the same
//! way.

use std::path::Path;

use crate::Result;

/// One entry as reported by the archive's enumeration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawEntry {
    /// Namespace-qualified virtual path, e.g. `data:sound/theme.ogg`.
    pub virtual_path: String,
    /// Size in bytes as reported by the listing.
    pub size: u64,
    /// Whether the entry's content is present locally.
    pub available: bool,
}

impl RawEntry {
    /// Creates an available entry.
    pub fn new(virtual_path: impl Into<String>, size: u64) -> Self {
        Self {
            virtual_path: virtual_path.into(),
            size,
            available: true,
        }
    }

    /// Creates an entry whose content is not present locally.
    pub fn unavailable(virtual_path: impl Into<String>, size: u64) -> Self {
        Self {
            virtual_path: virtual_path.into(),
            size,
            available: false,
        }
    }
}

/// Opens archive storages by target root.
///
/// Implementations are shared with the scheduler's worker thread, hence the
/// `Send + Sync` bound.
pub trait ArchiveProvider: Send + Sync {
    /// Opens the storage backing `root`.
    ///
    /// Failures are reported as [`VfsxError::StorageOpenFailed`](crate::VfsxError::StorageOpenFailed).
    fn open(&self, root: &Path) -> Result<Box<dyn Storage>>;
}

/// An opened archive storage.
pub trait Storage {
    /// Starts enumerating raw entries.
    ///
    /// The first call to `next()` may block for a long time while the
    /// archive builds its index. The iterator is not guaranteed to end at the
    /// true end of the archive's contents; callers bound it themselves.
    fn entries(&mut self) -> Result<Box<dyn Iterator<Item = RawEntry> + '_>>;

    /// Opens a single entry for reading.
    ///
    /// Failures are reported as [`VfsxError::EntryOpenFailed`](crate::VfsxError::EntryOpenFailed).
    fn open_entry(&mut self, virtual_path: &str) -> Result<Box<dyn EntryReader + '_>>;
}

/// An opened archive entry.
pub trait EntryReader {
    /// Size of the entry's content in bytes.
    fn size(&self) -> Result<u64>;

    /// Reads up to `buf.len()` bytes into `buf`.
    ///
    /// Returns 0 at end of data or on failure; callers treat both as "stop
    /// reading".
    fn read_chunk(&mut self, buf: &mut [u8]) -> usize;
}
