//! Progress bar rendering for scheduler events.

use console::Term;
use indicatif::ProgressBar;
use indicatif::ProgressState;
use indicatif::ProgressStyle;
use std::fmt::Write;
use std::path::Path;
use std::time::Duration;
use vfsx_core::Phase;
use vfsx_core::ProgressSnapshot;

/// CLI progress display for the operation the scheduler is running.
///
/// Scanning phases show a spinner with the number of entries seen; transfer
/// and delete phases show a bar over the matched files with bytes, speed and
/// ETA. The bar is reset whenever the scheduler moves on to another target.
pub struct CliProgress {
    bar: ProgressBar,
    phase: Option<Phase>,
}

impl CliProgress {
    /// Creates a hidden progress display; it appears with the first snapshot.
    #[must_use]
    pub fn new() -> Self {
        Self {
            bar: ProgressBar::hidden(),
            phase: None,
        }
    }

    /// Checks if we should show progress (TTY detection).
    #[must_use]
    pub fn should_show() -> bool {
        Term::stderr().is_term()
    }

    /// Starts a fresh display for `root`.
    pub fn begin(&mut self, root: &Path, verb: &str) {
        self.bar.finish_and_clear();
        self.bar = ProgressBar::new_spinner();
        self.bar.set_style(spinner_style());
        self.bar.enable_steady_tick(Duration::from_millis(120));
        self.bar.set_prefix(format!("{verb} {}", root.display()));
        self.bar.set_message("opening archive");
        self.phase = None;
    }

    /// Applies one progress snapshot.
    pub fn update(&mut self, snapshot: &ProgressSnapshot) {
        if self.phase != Some(snapshot.phase) {
            self.switch_phase(snapshot.phase);
        }
        match snapshot.phase {
            Phase::Indexing => self.bar.set_message("building archive index"),
            Phase::Enumerating => self
                .bar
                .set_message(format!("scanning, {} entries seen", snapshot.files_processed)),
            Phase::Transferring | Phase::Deleting => {
                self.bar.set_length(snapshot.total_files as u64);
                self.bar.set_position(snapshot.files_processed as u64);
                self.bar.set_message(format!(
                    "{} / {}",
                    humanize_bytes(snapshot.bytes_processed),
                    humanize_bytes(snapshot.total_bytes)
                ));
            }
        }
    }

    /// Prints a line above the bar without tearing it.
    pub fn println(&self, line: &str) {
        if self.bar.is_hidden() {
            eprintln!("{line}");
        } else {
            self.bar.println(line);
        }
    }

    /// Removes the bar from the terminal.
    pub fn finish(&mut self) {
        self.bar.finish_and_clear();
        self.phase = None;
    }

    fn switch_phase(&mut self, phase: Phase) {
        self.phase = Some(phase);
        match phase {
            Phase::Indexing | Phase::Enumerating => self.bar.set_style(spinner_style()),
            Phase::Transferring | Phase::Deleting => {
                self.bar.disable_steady_tick();
                self.bar.set_style(bar_style());
                self.bar.reset_eta();
            }
        }
    }
}

impl Default for CliProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for CliProgress {
    fn drop(&mut self) {
        self.bar.finish_and_clear();
    }
}

fn spinner_style() -> ProgressStyle {
    ProgressStyle::default_spinner()
        .template("{spinner} {prefix} {msg} ({elapsed})")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
}

// Template: "Extracting /games/one [████████░░░░] 42/100 files (1.2 MB / 3.0 MB, 12s)"
fn bar_style() -> ProgressStyle {
    ProgressStyle::default_bar()
        .template("{prefix} [{bar:40.cyan/blue}] {pos}/{len} files ({msg}, {eta_human})")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .with_key("eta_human", |state: &ProgressState, w: &mut dyn Write| {
            write!(w, "{}", humanize_duration(state.eta())).unwrap_or(());
        })
        .progress_chars("█▓░")
}

/// Converts bytes to human-readable format (KB, MB, GB, TB).
pub fn humanize_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;
    const TB: u64 = GB * 1024;

    if bytes >= TB {
        format!("{:.1} TB", bytes as f64 / TB as f64)
    } else if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{bytes} B")
    }
}

/// Converts duration to human-readable format.
pub fn humanize_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    if secs >= 3600 {
        format!("{}h{}m", secs / 3600, (secs % 3600) / 60)
    } else if secs >= 60 {
        format!("{}m{}s", secs / 60, secs % 60)
    } else {
        format!("{secs}s")
    }
}
