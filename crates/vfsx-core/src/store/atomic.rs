//! Atomic JSON file replacement.

use serde::Serialize;
use std::io;
use std::io::Write;
use std::path::Path;

use crate::Result;

/// Serializes `value` as pretty JSON and atomically replaces `path` with it.
///
/// The document is written to a hidden temporary file in the same directory,
/// flushed to disk and renamed over `path`. Readers observe either the old
/// file or the new one.
///
/// # Errors
///
/// Returns [`VfsxError::Io`](crate::VfsxError::Io) if the temporary file
/// cannot be created, written or renamed. The temporary file is removed on
/// every failure path.
pub fn write_json_atomic<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let dir = path
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));

    let mut temp = tempfile::Builder::new()
        .prefix(".vfsx-")
        .suffix(".tmp")
        .tempfile_in(dir)?;

    serde_json::to_writer_pretty(&mut temp, value).map_err(io::Error::from)?;
    temp.write_all(b"\n")?;
    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|e| e.error)?;
    Ok(())
}
