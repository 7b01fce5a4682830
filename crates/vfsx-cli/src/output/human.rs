//! Human-readable output formatter with colors and styling.

use super::formatter::OutputFormatter;
use super::formatter::TargetRun;
use crate::error::convert_error;
use crate::progress::humanize_bytes;
use anyhow::Result;
use console::Term;
use console::style;
use std::path::Path;
use vfsx_core::ExtractionReport;
use vfsx_core::JobKind;
use vfsx_core::JobResult;
use vfsx_core::ScanTermination;
use vfsx_core::Target;
use vfsx_core::TargetState;
use vfsx_core::TargetStatus;
use vfsx_core::UndoReport;
use vfsx_core::store::Manifest;

pub struct HumanFormatter {
    verbose: bool,
    quiet: bool,
    use_colors: bool,
    term: Term,
}

impl HumanFormatter {
    pub fn new(verbose: bool, quiet: bool) -> Self {
        Self {
            verbose,
            quiet,
            use_colors: console::colors_enabled(),
            term: Term::stdout(),
        }
    }

    fn line(&self, text: &str) {
        let _ = self.term.write_line(text);
    }

    fn headline(&self, ok: bool, text: &str) {
        if !self.use_colors {
            self.line(text);
        } else if ok {
            self.line(&format!("{} {text}", style("✓").green().bold()));
        } else {
            self.line(&format!("{} {text}", style("✗").red().bold()));
        }
    }

    fn styled_state(&self, state: TargetState) -> String {
        let label = state.label();
        if !self.use_colors {
            return label.to_string();
        }
        match state {
            TargetState::Extracted => style(label).green().to_string(),
            TargetState::Partial | TargetState::Cancelled => style(label).yellow().to_string(),
            TargetState::Error => style(label).red().to_string(),
            TargetState::Queued | TargetState::Running => style(label).cyan().to_string(),
            TargetState::Ready => label.to_string(),
        }
    }

    fn format_number(n: usize) -> String {
        let s = n.to_string();
        let mut result = String::new();
        let mut count = 0;

        for c in s.chars().rev() {
            if count == 3 {
                result.push(',');
                count = 0;
            }
            result.push(c);
            count += 1;
        }

        result.chars().rev().collect()
    }

    fn extraction_details(&self, report: &ExtractionReport) {
        self.line(&format!(
            "  Files extracted: {}",
            Self::format_number(report.files_extracted)
        ));
        if report.files_skipped > 0 {
            self.line(&format!(
                "  Files skipped:   {}",
                Self::format_number(report.files_skipped)
            ));
        }
        self.line(&format!(
            "  Total size:      {}",
            humanize_bytes(report.bytes_written)
        ));

        if self.verbose {
            self.line(&format!(
                "  Entries scanned: {}",
                report.entries_scanned
            ));
            if let Some(termination) = report.scan_termination {
                self.line(&format!("  Scan ended by:   {}", termination_label(termination)));
            }
            if let Some(indexing) = report.indexing_duration {
                self.line(&format!("  Indexing:        {indexing:?}"));
            }
            self.line(&format!("  Duration:        {:?}", report.duration));
        }
    }

    fn undo_details(&self, report: &UndoReport) {
        self.line(&format!(
            "  Files deleted:   {}",
            Self::format_number(report.files_deleted)
        ));
        if report.files_missing > 0 {
            self.line(&format!(
                "  Already gone:    {}",
                Self::format_number(report.files_missing)
            ));
        }
        if report.files_failed > 0 {
            self.line(&format!(
                "  Left in place:   {}",
                Self::format_number(report.files_failed)
            ));
        }
        if self.verbose {
            self.line(&format!(
                "  Directories:     {}",
                report.directories_removed
            ));
            self.line(&format!("  Duration:        {:?}", report.duration));
        }
    }

    fn warnings(&self, warnings: &[String]) {
        if warnings.is_empty() {
            return;
        }
        if self.verbose {
            for warning in warnings {
                self.format_warning(warning);
            }
        } else {
            self.line(&format!("  Warnings:        {} (use -v to list)", warnings.len()));
        }
    }
}

const fn termination_label(termination: ScanTermination) -> &'static str {
    match termination {
        ScanTermination::Exhausted => "end of archive",
        ScanTermination::DrySpell => "dry spell after last match",
        ScanTermination::PreMatchCap => "no match before cap",
        ScanTermination::Cancelled => "cancellation",
    }
}

impl OutputFormatter for HumanFormatter {
    fn format_targets(&self, targets: &[TargetStatus]) -> Result<()> {
        if targets.is_empty() {
            if !self.quiet {
                self.line("No targets registered");
            }
            return Ok(());
        }

        let width = targets
            .iter()
            .map(|t| t.target.name.chars().count())
            .max()
            .unwrap_or(0);
        for status in targets {
            self.line(&format!(
                "{:<width$}  {:<9}  {}",
                status.target.name,
                self.styled_state(status.state),
                status.target.root.display()
            ));
        }
        Ok(())
    }

    fn format_target_added(&self, target: &Target, state: TargetState) -> Result<()> {
        if self.quiet {
            return Ok(());
        }
        self.headline(
            true,
            &format!(
                "Registered '{}' at {} ({})",
                target.name,
                target.root.display(),
                self.styled_state(state)
            ),
        );
        Ok(())
    }

    fn format_target_removed(&self, target: &Target) -> Result<()> {
        if self.quiet {
            return Ok(());
        }
        self.headline(
            true,
            &format!("Removed '{}' ({})", target.name, target.root.display()),
        );
        Ok(())
    }

    fn format_run(&self, kind: JobKind, runs: &[TargetRun]) -> Result<()> {
        if runs.is_empty() {
            if !self.quiet {
                self.line("Nothing to do");
            }
            return Ok(());
        }

        for run in runs {
            let root = run.root.display();
            match &run.result {
                JobResult::Extracted(report) => {
                    if self.quiet {
                        continue;
                    }
                    self.headline(true, &format!("Extraction complete: {root}"));
                    self.extraction_details(report);
                    self.warnings(&report.warnings);
                }
                JobResult::Undone(report) => {
                    if self.quiet {
                        continue;
                    }
                    self.headline(true, &format!("Undo complete: {root}"));
                    self.undo_details(report);
                    self.warnings(&report.warnings);
                }
                JobResult::Cancelled => {
                    if !self.quiet {
                        self.headline(false, &format!("Cancelled: {root}"));
                    }
                }
                JobResult::Failed(err) => {
                    let verb = match kind {
                        JobKind::Extract => "Extraction",
                        JobKind::Undo => "Undo",
                    };
                    let message = convert_error(err, &run.root);
                    let _ = Term::stderr().write_line(&format!("{verb} failed: {root}: {message:#}"));
                }
            }
        }
        Ok(())
    }

    fn format_status(
        &self,
        root: &Path,
        state: TargetState,
        manifest: Option<&Manifest>,
    ) -> Result<()> {
        self.line(&format!("{}: {}", root.display(), self.styled_state(state)));
        let Some(manifest) = manifest else {
            if !self.quiet {
                self.line("  No extraction manifest");
            }
            return Ok(());
        };
        self.line(&format!(
            "  Complete:        {}",
            if manifest.complete { "yes" } else { "no" }
        ));
        self.line(&format!(
            "  Files:           {}",
            Self::format_number(manifest.len())
        ));
        self.line(&format!(
            "  Total size:      {}",
            humanize_bytes(manifest.total_bytes)
        ));
        self.line(&format!(
            "  Last written:    {}",
            manifest.timestamp.to_rfc3339()
        ));
        if self.verbose {
            for file in &manifest.files {
                self.line(&format!("    {file}"));
            }
        }
        Ok(())
    }

    fn format_warning(&self, message: &str) {
        if self.quiet {
            return;
        }

        if self.use_colors {
            let _ = Term::stderr()
                .write_line(&format!("{} {}", style("⚠").yellow().bold(), message));
        } else {
            let _ = Term::stderr().write_line(&format!("Warning: {message}"));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_number() {
        assert_eq!(HumanFormatter::format_number(0), "0");
        assert_eq!(HumanFormatter::format_number(999), "999");
        assert_eq!(HumanFormatter::format_number(1000), "1,000");
        assert_eq!(HumanFormatter::format_number(1_234_567), "1,234,567");
    }

    #[test]
    fn test_termination_labels_are_distinct() {
        let labels = [
            ScanTermination::Exhausted,
            ScanTermination::DrySpell,
            ScanTermination::PreMatchCap,
            ScanTermination::Cancelled,
        ]
        .map(termination_label);
        for (i, a) in labels.iter().enumerate() {
            for b in &labels[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn test_plain_state_labels() {
        let formatter = HumanFormatter {
            verbose: false,
            quiet: false,
            use_colors: false,
            term: Term::stdout(),
        };
        assert_eq!(formatter.styled_state(TargetState::Partial), "partial");
        assert_eq!(formatter.styled_state(TargetState::Extracted), "extracted");
    }
}
