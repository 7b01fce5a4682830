//! Core value types shared by the engines and the scheduler.
//!
//! - [`Target`]: a managed archive-backed location and its lifecycle state
//! - [`RelPath`]: a relative path validated to stay under a target root
//! - [`PrefixSet`]: case-insensitive virtual-path prefix filter

pub mod rel_path;
pub mod target;
pub mod virtual_path;

pub use rel_path::RelPath;
pub use target::MANIFEST_FILE_NAME;
pub use target::Target;
pub use target::TargetKey;
pub use target::TargetState;
pub use virtual_path::PrefixSet;
