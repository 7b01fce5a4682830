//! On-disk state: per-target manifests and the target list.
//!
//! Both files are JSON and are replaced atomically, so a crash leaves either
//! the previous version or the new one, never a torn file.

pub mod atomic;
pub mod manifest;
pub mod targets;

pub use manifest::Manifest;
pub use manifest::load_manifest;
pub use manifest::remove_manifest;
pub use manifest::save_manifest;
pub use targets::TargetList;
