//! Chunked copy from an archive entry to a writer.

use std::io;
use std::io::Write;

use crate::formats::EntryReader;

/// Reusable heap buffer for entry copies.
///
/// One buffer is allocated per extraction and shared by every entry, so the
/// chunk size only costs memory once.
#[derive(Debug)]
pub struct CopyBuffer {
    buf: Vec<u8>,
}

impl CopyBuffer {
    /// Allocates a zeroed buffer of `size` bytes.
    #[must_use]
    pub fn new(size: usize) -> Self {
        Self {
            buf: vec![0u8; size.max(1)],
        }
    }

    /// Returns the buffer size in bytes.
    #[inline]
    #[must_use]
    pub fn size(&self) -> usize {
        self.buf.len()
    }
}

/// Copies up to `expected` bytes from `reader` into `writer`.
///
/// Reading stops once `expected` bytes arrived or the reader returns 0. A
/// short entry is not an error: whatever was received is written and the
/// count is returned.
///
/// # Errors
///
/// Returns the writer's I/O error.
///
/// # Examples
///
/// ```
/// use vfsx_core::extraction::stream::CopyBuffer;
/// use vfsx_core::extraction::stream::copy_entry;
/// use vfsx_core::formats::EntryReader;
///
/// struct Bytes(&'static [u8]);
///
/// impl EntryReader for Bytes {
///     fn size(&self) -> vfsx_core::Result<u64> {
///         Ok(self.0.len() as u64)
///     }
///     fn read_chunk(&mut self, buf: &mut [u8]) -> usize {
///         let n = buf.len().min(self.0.len());
///         buf[..n].copy_from_slice(&self.0[..n]);
///         self.0 = &self.0[n..];
///         n
///     }
/// }
///
/// let mut out = Vec::new();
/// let mut buffer = CopyBuffer::new(4);
/// let copied = copy_entry(&mut Bytes(b"hello world"), &mut out, 11, &mut buffer).unwrap();
/// assert_eq!(copied, 11);
/// assert_eq!(out, b"hello world");
/// ```
pub fn copy_entry<W: Write + ?Sized>(
    reader: &mut dyn EntryReader,
    writer: &mut W,
    expected: u64,
    buffer: &mut CopyBuffer,
) -> io::Result<u64> {
    let mut total: u64 = 0;

    while total < expected {
        let remaining = expected - total;
        let want = usize::try_from(remaining).map_or(buffer.buf.len(), |r| r.min(buffer.buf.len()));
        let read = reader.read_chunk(&mut buffer.buf[..want]).min(want);
        if read == 0 {
            tracing::debug!(expected, received = total, "entry ended early");
            break;
        }
        writer.write_all(&buffer.buf[..read])?;
        total += read as u64;
    }

    Ok(total)
}
