//! Validated relative path type for files written under a target root.

use std::fmt;
use std::path::Component;
use std::path::Path;
use std::path::PathBuf;

use super::virtual_path;
use crate::Result;
use crate::VfsxError;

/// A relative path that is safe to join onto a target root.
///
/// `RelPath` can only be built through validation. The stored form uses `/`
/// separators, has no empty or `.` components, and never contains:
/// - parent directory references (`..`)
/// - root or drive prefixes
/// - null bytes
///
/// This is the form recorded in manifests, so a manifest written on one
/// platform reads back on another.
///
/// # Examples
///
/// ```
/// use vfsx_core::RelPath;
///
/// let rel = RelPath::from_virtual(r"data:sound\music\theme.ogg").unwrap();
/// assert_eq!(rel.as_str(), "sound/music/theme.ogg");
///
/// assert!(RelPath::parse("../escape.txt").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RelPath(String);

impl RelPath {
    /// Validates a relative path such as one read back from a manifest.
    pub fn parse(path: &str) -> Result<Self> {
        let unsafe_path = || VfsxError::UnsafePath {
            path: path.to_string(),
        };

        if path.contains('\0') {
            return Err(unsafe_path());
        }

        let normalized = virtual_path::normalize(path);
        if normalized.starts_with('/') {
            return Err(unsafe_path());
        }

        let mut parts = Vec::new();
        for part in normalized.split('/') {
            match part {
                "" | "." => {}
                ".." => return Err(unsafe_path()),
                _ => {
                    // Catches drive prefixes and verbatim paths on Windows.
                    let mut components = Path::new(part).components();
                    match (components.next(), components.next()) {
                        (Some(Component::Normal(_)), None) => parts.push(part),
                        _ => return Err(unsafe_path()),
                    }
                }
            }
        }

        if parts.is_empty() {
            return Err(unsafe_path());
        }

        Ok(Self(parts.join("/")))
    }

    /// Derives the filesystem-relative path of a namespace-qualified virtual
    /// path by stripping the namespace qualifier.
    pub fn from_virtual(virtual_path: &str) -> Result<Self> {
        let normalized = virtual_path::normalize(virtual_path);
        Self::parse(virtual_path::strip_namespace(&normalized))
    }

    /// Returns the `/`-separated form.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Resolves this path under `root` using platform separators.
    #[must_use]
    pub fn resolve(&self, root: &Path) -> PathBuf {
        let mut resolved = root.to_path_buf();
        resolved.extend(self.0.split('/'));
        resolved
    }
}

impl fmt::Display for RelPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for RelPath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
