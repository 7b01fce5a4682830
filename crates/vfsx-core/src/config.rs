//! Extraction configuration.

use std::time::Duration;

use crate::Result;
use crate::VfsxError;
use crate::types::PrefixSet;
use crate::types::RelPath;
use crate::types::virtual_path;

/// Size of a single read from an archive entry (1 MiB).
pub const DEFAULT_CHUNK_SIZE: usize = 1024 * 1024;

/// Number of processed entries between manifest checkpoints.
pub const DEFAULT_CHECKPOINT_INTERVAL: usize = 500;

/// Consecutive misses after the last match that end enumeration.
pub const DEFAULT_DRY_SPELL_THRESHOLD: u64 = 100_000;

/// Raw entries scanned before giving up when nothing has matched yet.
pub const DEFAULT_PRE_MATCH_CAP: u64 = 3_000_000;

/// Minimum spacing between enumeration progress reports.
pub const DEFAULT_PROGRESS_INTERVAL: Duration = Duration::from_millis(500);

/// Limits that bound enumeration of an archive whose iterator may never end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanLimits {
    /// Consecutive non-matching raw entries, counted from the most recent
    /// match, after which enumeration stops.
    pub dry_spell_threshold: u64,

    /// Raw entries scanned before giving up if no entry has matched.
    pub pre_match_cap: u64,

    /// Minimum time between enumeration progress reports.
    pub progress_interval: Duration,
}

impl Default for ScanLimits {
    fn default() -> Self {
        Self {
            dry_spell_threshold: DEFAULT_DRY_SPELL_THRESHOLD,
            pre_match_cap: DEFAULT_PRE_MATCH_CAP,
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
        }
    }
}

/// Configuration shared by the extraction and undo engines.
///
/// # Examples
///
/// ```
/// use vfsx_core::ExtractConfig;
///
/// let config = ExtractConfig::new(["data:sound/", "data:locale/enUS/"])
///     .with_checkpoint_interval(100);
/// assert!(config.validate().is_ok());
/// assert_eq!(config.managed_roots().len(), 2);
/// ```
#[derive(Debug, Clone)]
pub struct ExtractConfig {
    /// Namespace-qualified virtual-path prefixes to extract.
    pub prefixes: PrefixSet,

    /// Bytes requested per read from an archive entry.
    pub chunk_size: usize,

    /// Processed entries between manifest checkpoints.
    pub checkpoint_interval: usize,

    /// Enumeration termination limits.
    pub scan: ScanLimits,
}

impl Default for ExtractConfig {
    /// Creates a configuration with no prefixes and default limits.
    ///
    /// Default values:
    /// - `chunk_size`: 1 MiB
    /// - `checkpoint_interval`: 500 entries
    /// - `scan.dry_spell_threshold`: 100,000 entries
    /// - `scan.pre_match_cap`: 3,000,000 entries
    /// - `scan.progress_interval`: 500 ms
    fn default() -> Self {
        Self {
            prefixes: PrefixSet::default(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            checkpoint_interval: DEFAULT_CHECKPOINT_INTERVAL,
            scan: ScanLimits::default(),
        }
    }
}

impl ExtractConfig {
    /// Creates a configuration for the given prefixes with default limits.
    pub fn new<I, S>(prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            prefixes: PrefixSet::new(prefixes),
            ..Default::default()
        }
    }

    /// Sets the read chunk size.
    #[must_use]
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    /// Sets the checkpoint interval.
    #[must_use]
    pub fn with_checkpoint_interval(mut self, interval: usize) -> Self {
        self.checkpoint_interval = interval;
        self
    }

    /// Sets the enumeration limits.
    #[must_use]
    pub fn with_scan_limits(mut self, scan: ScanLimits) -> Self {
        self.scan = scan;
        self
    }

    /// Checks the configuration for values the engines cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.prefixes.is_empty() {
            return Err(VfsxError::InvalidConfig(
                "at least one prefix is required".into(),
            ));
        }
        if let Some(bad) = self.prefixes.iter().find(|p| !virtual_path::has_namespace(p)) {
            return Err(VfsxError::InvalidConfig(format!(
                "prefix '{bad}' lacks a namespace qualifier (expected '<namespace>:<path>')"
            )));
        }
        if self.chunk_size == 0 {
            return Err(VfsxError::InvalidConfig("chunk size must be non-zero".into()));
        }
        if self.checkpoint_interval == 0 {
            return Err(VfsxError::InvalidConfig(
                "checkpoint interval must be non-zero".into(),
            ));
        }
        if self.scan.dry_spell_threshold == 0 || self.scan.pre_match_cap == 0 {
            return Err(VfsxError::InvalidConfig(
                "scan limits must be non-zero".into(),
            ));
        }
        Ok(())
    }

    /// Directories under a target root that extraction writes into.
    ///
    /// Each prefix contributes the directory part of its namespace-stripped
    /// path; a trailing partial file name is dropped. Duplicates and roots
    /// nested inside another root are collapsed. A prefix covering the whole
    /// namespace contributes nothing, since undo never prunes the target root
    /// itself.
    #[must_use]
    pub fn managed_roots(&self) -> Vec<RelPath> {
        let mut roots: Vec<RelPath> = Vec::new();
        for prefix in self.prefixes.iter() {
            let stripped = virtual_path::strip_namespace(prefix);
            let dir = stripped.rsplit_once('/').map_or("", |(dir, _)| dir);
            let Ok(root) = RelPath::parse(dir) else {
                continue;
            };
            if !roots.contains(&root) {
                roots.push(root);
            }
        }

        let all = roots.clone();
        roots.retain(|root| {
            !all.iter().any(|other| {
                other != root
                    && root
                        .as_str()
                        .strip_prefix(other.as_str())
                        .is_some_and(|rest| rest.starts_with('/'))
            })
        });
        roots
    }
}
