//! Reversible extraction of archive-backed virtual file systems.
//!
//! `vfsx-core` copies the entries of an archive whose virtual paths match a
//! set of prefixes into a plain directory tree, records every written file in
//! a manifest, and can later undo the extraction from that manifest. The
//! archive's own enumeration is treated as unreliable: it may never signal
//! its end, so scanning is bounded by a dry-spell heuristic and a hard cap.
//!
//! A [`Scheduler`] runs extractions and undos over many targets on a worker
//! thread, at most one operation per target, with cooperative cancellation.
//!
//! # Examples
//!
//! ```no_run
//! use vfsx_core::CancellationToken;
//! use vfsx_core::ExtractConfig;
//! use vfsx_core::NoopProgress;
//! use vfsx_core::Target;
//! use vfsx_core::extract_target;
//! use vfsx_core::formats::ZipProvider;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ExtractConfig::new(["data:sound/", "data:locale/enUS/"]);
//! let target = Target::new("one", "/games/one");
//! let outcome = extract_target(
//!     &ZipProvider::default(),
//!     &target,
//!     &config,
//!     &mut NoopProgress,
//!     &mut NoopProgress,
//!     &CancellationToken::new(),
//! )?;
//! if let Some(done) = outcome.completed() {
//!     println!("Extracted {} files", done.report.files_extracted);
//! }
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod api;
pub mod cancel;
pub mod config;
pub mod error;
pub mod extraction;
pub mod formats;
pub mod report;
pub mod scanner;
pub mod scheduler;
pub mod store;
#[doc(hidden)]
pub mod test_utils;
pub mod types;
pub mod undo;

// Re-export main API types
pub use api::evaluate_state;
pub use api::extract_target;
pub use api::undo_target;
pub use cancel::CancellationToken;
pub use config::ExtractConfig;
pub use config::ScanLimits;
pub use error::Result;
pub use error::VfsxError;
pub use extraction::Extraction;
pub use extraction::ExtractionEngine;
pub use report::ExtractionReport;
pub use report::LogLevel;
pub use report::LogSink;
pub use report::NoopProgress;
pub use report::Outcome;
pub use report::Phase;
pub use report::ProgressCallback;
pub use report::ProgressSnapshot;
pub use report::UndoReport;
pub use scanner::ScanTermination;
pub use scheduler::JobKind;
pub use scheduler::JobResult;
pub use scheduler::Scheduler;
pub use scheduler::SchedulerEvent;
pub use scheduler::TargetStatus;
pub use undo::UndoEngine;

// Re-export types module for easier access
pub use types::MANIFEST_FILE_NAME;
pub use types::PrefixSet;
pub use types::RelPath;
pub use types::Target;
pub use types::TargetKey;
pub use types::TargetState;
