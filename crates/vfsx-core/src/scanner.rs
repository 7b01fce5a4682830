//! Bounded, filtered enumeration of an archive listing.
//!
//! The archive's enumeration may keep yielding entries after the true end of
//! its contents, so "end of iteration" is never trusted on its own. The
//! scanner stops on whichever comes first:
//!
//! - the raw iterator ends
//! - cancellation is requested (polled once per raw entry)
//! - no match yet and `pre_match_cap` raw entries have been scanned
//! - at least one match and `dry_spell_threshold` consecutive misses since
//!   the most recent match
//!
//! The dry-spell rule assumes matching entries are contiguous in the
//! listing. An archive that interleaves matching and non-matching entries
//! over a longer distance than the threshold would be under-extracted
//! without any error.

use serde::Serialize;
use std::time::Duration;
use std::time::Instant;

use crate::CancellationToken;
use crate::ProgressCallback;
use crate::config::ScanLimits;
use crate::formats::RawEntry;
use crate::report::Phase;
use crate::report::ProgressSnapshot;
use crate::types::PrefixSet;
use crate::types::virtual_path;

/// An archive entry that passed the prefix filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchedEntry {
    /// Normalized, namespace-qualified virtual path.
    pub virtual_path: String,
    /// Size reported by the listing.
    pub size: u64,
}

/// Why enumeration stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanTermination {
    /// The raw iterator ended.
    Exhausted,
    /// Too many consecutive misses after the most recent match.
    DrySpell,
    /// Nothing matched within the pre-match cap.
    PreMatchCap,
    /// Cancellation was requested.
    Cancelled,
}

/// Summary of a finished scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanSummary {
    /// Raw entries pulled from the archive.
    pub scanned: u64,
    /// Entries that matched.
    pub matched: usize,
    /// Sum of the listed sizes of matched entries.
    pub matched_bytes: u64,
    /// Why enumeration stopped.
    pub termination: ScanTermination,
    /// Time until the archive produced its first raw entry, if it did.
    pub indexing: Option<Duration>,
}

/// Lazy iterator of matched entries over an unbounded raw listing.
///
/// The raw iterator is dropped as soon as the scan terminates, which
/// releases the archive's enumeration handle even if the scanner itself is
/// kept around to read its [`summary`](Self::summary).
///
/// # Examples
///
/// ```
/// use vfsx_core::CancellationToken;
/// use vfsx_core::NoopProgress;
/// use vfsx_core::PrefixSet;
/// use vfsx_core::config::ScanLimits;
/// use vfsx_core::formats::RawEntry;
/// use vfsx_core::scanner::EntryScanner;
/// use vfsx_core::scanner::ScanTermination;
///
/// let raw = vec![
///     RawEntry::new("data:sound/a.ogg", 10),
///     RawEntry::new("data:video/b.bik", 20),
/// ];
/// let prefixes = PrefixSet::new(["data:sound/"]);
/// let cancel = CancellationToken::new();
/// let mut progress = NoopProgress;
///
/// let mut scanner = EntryScanner::new(
///     raw.into_iter(),
///     &prefixes,
///     ScanLimits::default(),
///     &cancel,
///     &mut progress,
/// );
/// let matched: Vec<_> = scanner.by_ref().collect();
/// assert_eq!(matched.len(), 1);
/// assert_eq!(scanner.summary().map(|s| s.termination), Some(ScanTermination::Exhausted));
/// ```
pub struct EntryScanner<'a, I> {
    raw: Option<I>,
    prefixes: &'a PrefixSet,
    limits: ScanLimits,
    cancel: &'a CancellationToken,
    progress: &'a mut dyn ProgressCallback,
    started: Instant,
    indexing: Option<Duration>,
    last_report: Option<Instant>,
    scanned: u64,
    matched: usize,
    matched_bytes: u64,
    misses_since_match: u64,
    termination: Option<ScanTermination>,
}

impl<'a, I> EntryScanner<'a, I>
where
    I: Iterator<Item = RawEntry>,
{
    /// Wraps a raw listing.
    ///
    /// Reports the indexing phase immediately, since the first pull from the
    /// raw iterator may block for minutes.
    pub fn new(
        raw: I,
        prefixes: &'a PrefixSet,
        limits: ScanLimits,
        cancel: &'a CancellationToken,
        progress: &'a mut dyn ProgressCallback,
    ) -> Self {
        progress.on_progress(&ProgressSnapshot::start(Phase::Indexing));
        Self {
            raw: Some(raw),
            prefixes,
            limits,
            cancel,
            progress,
            started: Instant::now(),
            indexing: None,
            last_report: None,
            scanned: 0,
            matched: 0,
            matched_bytes: 0,
            misses_since_match: 0,
            termination: None,
        }
    }

    /// Returns the summary once the scan has terminated.
    #[must_use]
    pub fn summary(&self) -> Option<ScanSummary> {
        self.termination.map(|termination| ScanSummary {
            scanned: self.scanned,
            matched: self.matched,
            matched_bytes: self.matched_bytes,
            termination,
            indexing: self.indexing,
        })
    }

    fn finish(&mut self, termination: ScanTermination) {
        self.raw = None;
        self.termination = Some(termination);
        tracing::debug!(
            scanned = self.scanned,
            matched = self.matched,
            ?termination,
            "enumeration stopped"
        );
    }

    fn report(&mut self, raw: &str) {
        let due = self
            .last_report
            .is_none_or(|at| at.elapsed() >= self.limits.progress_interval);
        if !due {
            return;
        }
        self.last_report = Some(Instant::now());
        self.progress.on_progress(&ProgressSnapshot {
            phase: Phase::Enumerating,
            files_processed: self.matched,
            total_files: 0,
            current_path: raw.to_string(),
            bytes_processed: self.matched_bytes,
            total_bytes: 0,
        });
    }
}

impl<I> Iterator for EntryScanner<'_, I>
where
    I: Iterator<Item = RawEntry>,
{
    type Item = MatchedEntry;

    fn next(&mut self) -> Option<MatchedEntry> {
        loop {
            if self.termination.is_some() {
                return None;
            }
            if self.cancel.is_cancelled() {
                self.finish(ScanTermination::Cancelled);
                return None;
            }
            if self.matched == 0 && self.scanned >= self.limits.pre_match_cap {
                self.finish(ScanTermination::PreMatchCap);
                return None;
            }

            let Some(entry) = self.raw.as_mut().and_then(Iterator::next) else {
                self.finish(ScanTermination::Exhausted);
                return None;
            };

            if self.indexing.is_none() {
                let elapsed = self.started.elapsed();
                self.indexing = Some(elapsed);
                self.progress.on_indexed(elapsed);
            }
            self.scanned += 1;

            let path = virtual_path::normalize(&entry.virtual_path);
            let is_match = entry.available && self.prefixes.matches(&path);

            if is_match {
                self.matched += 1;
                self.matched_bytes = self.matched_bytes.saturating_add(entry.size);
                self.misses_since_match = 0;
                self.report(&path);
                return Some(MatchedEntry {
                    virtual_path: path.into_owned(),
                    size: entry.size,
                });
            }

            self.report(&path);
            if self.matched > 0 {
                self.misses_since_match += 1;
                if self.misses_since_match >= self.limits.dry_spell_threshold {
                    self.finish(ScanTermination::DrySpell);
                    return None;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::NoopProgress;

    fn limits(dry_spell: u64, cap: u64) -> ScanLimits {
        ScanLimits {
            dry_spell_threshold: dry_spell,
            pre_match_cap: cap,
            progress_interval: Duration::ZERO,
        }
    }

    fn run(raw: Vec<RawEntry>, prefixes: &[&str], limits: ScanLimits) -> (Vec<MatchedEntry>, ScanSummary) {
        let prefixes = PrefixSet::new(prefixes);
        let cancel = CancellationToken::new();
        let mut progress = NoopProgress;
        let mut scanner = EntryScanner::new(raw.into_iter(), &prefixes, limits, &cancel, &mut progress);
        let matched: Vec<_> = scanner.by_ref().collect();
        let summary = scanner.summary().unwrap_or_else(|| panic!("scan did not terminate"));
        (matched, summary)
    }

    #[test]
    fn test_filters_by_prefix_and_availability() {
        let raw = vec![
            RawEntry::new("data:sound/a.ogg", 10),
            RawEntry::unavailable("data:sound/b.ogg", 5),
            RawEntry::new("data:video/c.bik", 7),
            RawEntry::new(r"DATA:Sound\d.ogg", 3),
        ];
        let (matched, summary) = run(raw, &["data:sound/"], limits(100, 100));
        let paths: Vec<_> = matched.iter().map(|m| m.virtual_path.as_str()).collect();
        assert_eq!(paths, vec!["data:sound/a.ogg", "DATA:Sound/d.ogg"]);
        assert_eq!(summary.matched_bytes, 13);
        assert_eq!(summary.scanned, 4);
        assert_eq!(summary.termination, ScanTermination::Exhausted);
    }

    #[test]
    fn test_dry_spell_stops_after_threshold_misses() {
        let mut raw = vec![RawEntry::new("data:a/1", 1)];
        raw.extend((0..10).map(|i| RawEntry::new(format!("data:z/{i}"), 1)));
        raw.push(RawEntry::new("data:a/late", 1));

        let (matched, summary) = run(raw, &["data:a/"], limits(3, 100));
        assert_eq!(matched.len(), 1);
        assert_eq!(summary.scanned, 4);
        assert_eq!(summary.termination, ScanTermination::DrySpell);
    }

    #[test]
    fn test_match_resets_dry_spell() {
        let raw = vec![
            RawEntry::new("data:a/1", 1),
            RawEntry::new("data:z/1", 1),
            RawEntry::new("data:z/2", 1),
            RawEntry::new("data:a/2", 1),
            RawEntry::new("data:z/3", 1),
            RawEntry::new("data:z/4", 1),
            RawEntry::new("data:a/3", 1),
        ];
        let (matched, summary) = run(raw, &["data:a/"], limits(3, 100));
        assert_eq!(matched.len(), 3);
        assert_eq!(summary.termination, ScanTermination::Exhausted);
    }

    #[test]
    fn test_pre_match_cap() {
        let raw: Vec<_> = (0..50).map(|i| RawEntry::new(format!("data:z/{i}"), 1)).collect();
        let (matched, summary) = run(raw, &["data:a/"], limits(3, 20));
        assert!(matched.is_empty());
        assert_eq!(summary.scanned, 20);
        assert_eq!(summary.termination, ScanTermination::PreMatchCap);
    }

    #[test]
    fn test_misses_before_first_match_do_not_count_as_dry_spell() {
        let mut raw: Vec<_> = (0..10).map(|i| RawEntry::new(format!("data:z/{i}"), 1)).collect();
        raw.push(RawEntry::new("data:a/1", 1));
        let (matched, _) = run(raw, &["data:a/"], limits(3, 100));
        assert_eq!(matched.len(), 1);
    }

    #[test]
    fn test_cancelled_before_start() {
        let prefixes = PrefixSet::new(["data:a/"]);
        let cancel = CancellationToken::new();
        cancel.cancel();
        let mut progress = NoopProgress;
        let raw = vec![RawEntry::new("data:a/1", 1)];
        let mut scanner = EntryScanner::new(raw.into_iter(), &prefixes, limits(3, 3), &cancel, &mut progress);
        assert_eq!(scanner.next(), None);
        assert_eq!(
            scanner.summary().map(|s| (s.scanned, s.termination)),
            Some((0, ScanTermination::Cancelled))
        );
    }

    #[test]
    fn test_indexing_reported_once() {
        #[derive(Default)]
        struct Recorder {
            indexed: u32,
            phases: Vec<Phase>,
        }
        impl ProgressCallback for Recorder {
            fn on_progress(&mut self, snapshot: &ProgressSnapshot) {
                self.phases.push(snapshot.phase);
            }
            fn on_indexed(&mut self, _elapsed: Duration) {
                self.indexed += 1;
            }
        }

        let mut recorder = Recorder::default();
        let prefixes = PrefixSet::new(["data:a/"]);
        let cancel = CancellationToken::new();
        let raw = vec![RawEntry::new("data:a/1", 1), RawEntry::new("data:a/2", 1)];
        let mut scanner = EntryScanner::new(raw.into_iter(), &prefixes, limits(3, 3), &cancel, &mut recorder);
        assert_eq!(scanner.by_ref().count(), 2);
        drop(scanner);

        assert_eq!(recorder.indexed, 1);
        assert_eq!(recorder.phases.first(), Some(&Phase::Indexing));
        assert!(recorder.phases[1..].iter().all(|p| *p == Phase::Enumerating));
    }
}
