//! Test utilities for archive fixtures.
//!
//! This module provides an in-memory ZIP builder for the ZIP provider and a
//! scripted [`MemoryProvider`] for exercising the engines and the scheduler
//! without real archives.
//!
//! # Panics
//!
//! Functions in this module may panic on I/O errors since they are designed
//! for test use only where panics are acceptable.

#![allow(clippy::unwrap_used, clippy::missing_panics_doc)]

use std::collections::HashMap;
use std::io::Cursor;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::sync::Condvar;
use std::sync::Mutex;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;

use crate::Result;
use crate::VfsxError;
use crate::formats::ArchiveProvider;
use crate::formats::EntryReader;
use crate::formats::RawEntry;
use crate::formats::Storage;
use crate::types::virtual_path;

/// Creates an in-memory ZIP archive from a list of entries.
///
/// Each entry is a tuple of (member name, content). Files are stored
/// uncompressed with mode 0o644.
///
/// # Examples
///
/// ```
/// use vfsx_core::test_utils::create_test_zip;
///
/// let zip_data = create_test_zip(&[("sound/a.ogg", "hello"), ("locale/b.txt", "world")]);
/// assert!(!zip_data.is_empty());
/// ```
#[must_use]
pub fn create_test_zip<D: AsRef<[u8]>>(entries: &[(&str, D)]) -> Vec<u8> {
    use zip::write::SimpleFileOptions;
    use zip::write::ZipWriter;

    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));

    let options = SimpleFileOptions::default()
        .compression_method(zip::CompressionMethod::Stored)
        .unix_permissions(0o644);

    for (path, data) in entries {
        zip.start_file(*path, options).unwrap();
        zip.write_all(data.as_ref()).unwrap();
    }

    zip.finish().unwrap().into_inner()
}

/// One-shot gate that threads can wait on.
///
/// Cloning yields a handle to the same gate.
#[derive(Debug, Clone, Default)]
pub struct Latch {
    inner: Arc<(Mutex<bool>, Condvar)>,
}

impl Latch {
    /// Creates a closed latch.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens the latch and wakes every waiter.
    pub fn release(&self) {
        let (open, signal) = &*self.inner;
        *open.lock().unwrap() = true;
        signal.notify_all();
    }

    /// Blocks until the latch is open.
    pub fn wait(&self) {
        let (open, signal) = &*self.inner;
        let mut guard = open.lock().unwrap();
        while !*guard {
            guard = signal.wait(guard).unwrap();
        }
    }

    /// Returns `true` once the latch is open.
    #[must_use]
    pub fn is_released(&self) -> bool {
        *self.inner.0.lock().unwrap()
    }
}

#[derive(Debug, Clone)]
enum Content {
    Data(Vec<u8>),
    OpenFails,
    SizeFails,
    Panics,
}

#[derive(Debug, Clone)]
struct ScriptedEntry {
    raw: RawEntry,
    content: Content,
}

/// Scripted archive contents served by a [`MemoryProvider`].
///
/// Entries are listed in insertion order. An optional filler entry repeats
/// forever after them, which models an enumeration that never ends.
///
/// # Examples
///
/// ```
/// use vfsx_core::test_utils::MemoryArchive;
///
/// let archive = MemoryArchive::new()
///     .file("data:sound/a.ogg", "0123456789")
///     .broken("data:sound/c.ogg", 4)
///     .endless("data:other/filler");
/// assert_eq!(archive.pulled(), 0);
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryArchive {
    entries: Vec<ScriptedEntry>,
    filler: Option<String>,
    pulled: Arc<AtomicU64>,
    opened: Arc<AtomicU64>,
    entered: Option<Latch>,
    proceed: Option<Latch>,
}

impl MemoryArchive {
    /// Creates an empty archive.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an available entry with content.
    #[must_use]
    pub fn file(mut self, virtual_path: &str, data: impl AsRef<[u8]>) -> Self {
        let data = data.as_ref().to_vec();
        self.entries.push(ScriptedEntry {
            raw: RawEntry::new(virtual_path, data.len() as u64),
            content: Content::Data(data),
        });
        self
    }

    /// Adds an entry whose content is not present locally.
    #[must_use]
    pub fn unavailable(mut self, virtual_path: &str, size: u64) -> Self {
        self.entries.push(ScriptedEntry {
            raw: RawEntry::unavailable(virtual_path, size),
            content: Content::OpenFails,
        });
        self
    }

    /// Adds a listed, available entry that fails to open.
    #[must_use]
    pub fn broken(mut self, virtual_path: &str, size: u64) -> Self {
        self.entries.push(ScriptedEntry {
            raw: RawEntry::new(virtual_path, size),
            content: Content::OpenFails,
        });
        self
    }

    /// Adds an entry that opens but cannot report its size.
    #[must_use]
    pub fn size_fails(mut self, virtual_path: &str, size: u64) -> Self {
        self.entries.push(ScriptedEntry {
            raw: RawEntry::new(virtual_path, size),
            content: Content::SizeFails,
        });
        self
    }

    /// Adds an entry whose open panics.
    #[must_use]
    pub fn panics(mut self, virtual_path: &str) -> Self {
        self.entries.push(ScriptedEntry {
            raw: RawEntry::new(virtual_path, 1),
            content: Content::Panics,
        });
        self
    }

    /// Adds `count` available entries named `<prefix><index>`, each holding
    /// its own name as content.
    #[must_use]
    pub fn files(mut self, prefix: &str, count: usize) -> Self {
        for index in 0..count {
            let path = format!("{prefix}{index}");
            self = self.file(&path, path.clone());
        }
        self
    }

    /// Repeats an unmatched filler entry forever after the scripted entries.
    #[must_use]
    pub fn endless(mut self, filler: &str) -> Self {
        self.filler = Some(filler.to_string());
        self
    }

    /// Blocks every entry open until `proceed` is released, releasing
    /// `entered` first so a test knows the operation reached the transfer
    /// loop.
    #[must_use]
    pub fn gated(mut self, entered: Latch, proceed: Latch) -> Self {
        self.entered = Some(entered);
        self.proceed = Some(proceed);
        self
    }

    /// Raw entries pulled from enumerations so far.
    #[must_use]
    pub fn pulled(&self) -> u64 {
        self.pulled.load(Ordering::SeqCst)
    }

    /// Entries opened so far.
    #[must_use]
    pub fn opened(&self) -> u64 {
        self.opened.load(Ordering::SeqCst)
    }
}

/// Archive provider serving [`MemoryArchive`] contents.
///
/// Roots registered with [`with_root`](Self::with_root) get their own
/// archive; any other root gets the fallback archive, or fails to open if
/// there is none.
#[derive(Debug, Clone, Default)]
pub struct MemoryProvider {
    fallback: Option<MemoryArchive>,
    roots: HashMap<String, MemoryArchive>,
}

impl MemoryProvider {
    /// Serves `archive` for every root.
    #[must_use]
    pub fn new(archive: MemoryArchive) -> Self {
        Self {
            fallback: Some(archive),
            roots: HashMap::new(),
        }
    }

    /// A provider that fails to open any root.
    #[must_use]
    pub fn failing() -> Self {
        Self::default()
    }

    /// Serves `archive` for `root` only.
    #[must_use]
    pub fn with_root(mut self, root: &Path, archive: MemoryArchive) -> Self {
        self.roots.insert(root.to_string_lossy().into_owned(), archive);
        self
    }
}

impl ArchiveProvider for MemoryProvider {
    fn open(&self, root: &Path) -> Result<Box<dyn Storage>> {
        let archive = self
            .roots
            .get(root.to_string_lossy().as_ref())
            .or(self.fallback.as_ref())
            .ok_or_else(|| VfsxError::StorageOpenFailed {
                path: root.to_path_buf(),
                reason: "no archive registered".to_string(),
            })?;
        Ok(Box::new(archive.clone()))
    }
}

impl Storage for MemoryArchive {
    fn entries(&mut self) -> Result<Box<dyn Iterator<Item = RawEntry> + '_>> {
        let pulled = Arc::clone(&self.pulled);
        let scripted = self.entries.iter().map(|entry| entry.raw.clone());
        let filler = self
            .filler
            .iter()
            .flat_map(|path| std::iter::repeat_with(move || RawEntry::new(path.as_str(), 1)));
        Ok(Box::new(scripted.chain(filler).inspect(move |_| {
            pulled.fetch_add(1, Ordering::SeqCst);
        })))
    }

    fn open_entry(&mut self, path: &str) -> Result<Box<dyn EntryReader + '_>> {
        if let Some(entered) = &self.entered {
            entered.release();
        }
        if let Some(proceed) = &self.proceed {
            proceed.wait();
        }
        self.opened.fetch_add(1, Ordering::SeqCst);

        let normalized = virtual_path::normalize(path);
        let entry = self
            .entries
            .iter()
            .find(|entry| {
                entry.raw.available && virtual_path::normalize(&entry.raw.virtual_path) == normalized
            })
            .ok_or_else(|| VfsxError::EntryOpenFailed {
                path: path.to_string(),
                reason: "entry not found".to_string(),
            })?;

        match &entry.content {
            Content::Data(data) => Ok(Box::new(MemoryReader {
                data: data.as_slice(),
                size: Some(data.len() as u64),
            })),
            Content::SizeFails => Ok(Box::new(MemoryReader { data: &[], size: None })),
            Content::Panics => panic!("scripted panic opening {path}"),
            Content::OpenFails => Err(VfsxError::EntryOpenFailed {
                path: path.to_string(),
                reason: "content not available".to_string(),
            }),
        }
    }
}

struct MemoryReader<'a> {
    data: &'a [u8],
    size: Option<u64>,
}

impl EntryReader for MemoryReader<'_> {
    fn size(&self) -> Result<u64> {
        self.size.ok_or_else(|| VfsxError::EntryOpenFailed {
            path: String::new(),
            reason: "size unavailable".to_string(),
        })
    }

    fn read_chunk(&mut self, buf: &mut [u8]) -> usize {
        let n = buf.len().min(self.data.len());
        buf[..n].copy_from_slice(&self.data[..n]);
        self.data = &self.data[n..];
        n
    }
}
