//! Archive capability contract and its implementations.

pub mod traits;
pub mod zip;

// Re-export main types for convenience
pub use traits::ArchiveProvider;
pub use traits::EntryReader;
pub use traits::RawEntry;
pub use traits::Storage;
pub use self::zip::ZipProvider;
