//! JSON output formatter for machine-readable results.

use super::formatter::JsonOutput;
use super::formatter::OutputFormatter;
use super::formatter::TargetRun;
use super::formatter::operation_name;
use crate::error::convert_error;
use anyhow::Result;
use serde::Serialize;
use std::io::Write;
use std::io::{self};
use std::path::Path;
use vfsx_core::JobKind;
use vfsx_core::JobResult;
use vfsx_core::ScanTermination;
use vfsx_core::Target;
use vfsx_core::TargetState;
use vfsx_core::TargetStatus;
use vfsx_core::store::Manifest;

pub struct JsonFormatter;

impl JsonFormatter {
    fn output<T: Serialize>(value: &T) -> Result<()> {
        let json = serde_json::to_string_pretty(value)?;
        writeln!(io::stdout(), "{json}")?;
        Ok(())
    }
}

#[derive(Serialize)]
struct TargetOutput<'a> {
    name: &'a str,
    root: String,
    state: TargetState,
}

impl<'a> TargetOutput<'a> {
    fn new(target: &'a Target, state: TargetState) -> Self {
        Self {
            name: &target.name,
            root: target.root.display().to_string(),
            state,
        }
    }
}

#[derive(Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
enum RunResultOutput<'a> {
    Extracted {
        files_extracted: usize,
        files_skipped: usize,
        bytes_written: u64,
        entries_scanned: u64,
        scan_termination: Option<ScanTermination>,
        indexing_ms: Option<u128>,
        duration_ms: u128,
        warnings: &'a [String],
    },
    Undone {
        files_deleted: usize,
        files_missing: usize,
        files_failed: usize,
        directories_removed: usize,
        duration_ms: u128,
        warnings: &'a [String],
    },
    Cancelled,
    Failed {
        message: String,
    },
}

#[derive(Serialize)]
struct RunOutput<'a> {
    root: String,
    #[serde(flatten)]
    result: RunResultOutput<'a>,
}

impl<'a> From<&'a TargetRun> for RunOutput<'a> {
    fn from(run: &'a TargetRun) -> Self {
        let result = match &run.result {
            JobResult::Extracted(report) => RunResultOutput::Extracted {
                files_extracted: report.files_extracted,
                files_skipped: report.files_skipped,
                bytes_written: report.bytes_written,
                entries_scanned: report.entries_scanned,
                scan_termination: report.scan_termination,
                indexing_ms: report.indexing_duration.map(|d| d.as_millis()),
                duration_ms: report.duration.as_millis(),
                warnings: &report.warnings,
            },
            JobResult::Undone(report) => RunResultOutput::Undone {
                files_deleted: report.files_deleted,
                files_missing: report.files_missing,
                files_failed: report.files_failed,
                directories_removed: report.directories_removed,
                duration_ms: report.duration.as_millis(),
                warnings: &report.warnings,
            },
            JobResult::Cancelled => RunResultOutput::Cancelled,
            JobResult::Failed(err) => RunResultOutput::Failed {
                message: format!("{:#}", convert_error(err, &run.root)),
            },
        };
        Self {
            root: run.root.display().to_string(),
            result,
        }
    }
}

impl OutputFormatter for JsonFormatter {
    fn format_targets(&self, targets: &[TargetStatus]) -> Result<()> {
        let data: Vec<TargetOutput<'_>> = targets
            .iter()
            .map(|status| TargetOutput::new(&status.target, status.state))
            .collect();
        Self::output(&JsonOutput::success("target list", data))
    }

    fn format_target_added(&self, target: &Target, state: TargetState) -> Result<()> {
        Self::output(&JsonOutput::success(
            "target add",
            TargetOutput::new(target, state),
        ))
    }

    fn format_target_removed(&self, target: &Target) -> Result<()> {
        #[derive(Serialize)]
        struct RemovedOutput<'a> {
            name: &'a str,
            root: String,
        }

        Self::output(&JsonOutput::success(
            "target remove",
            RemovedOutput {
                name: &target.name,
                root: target.root.display().to_string(),
            },
        ))
    }

    fn format_run(&self, kind: JobKind, runs: &[TargetRun]) -> Result<()> {
        let data: Vec<RunOutput<'_>> = runs.iter().map(RunOutput::from).collect();
        let failed = runs.iter().filter(|run| run.failed()).count();
        let output = if failed == 0 {
            JsonOutput::success(operation_name(kind), data)
        } else {
            JsonOutput::failure(
                operation_name(kind),
                data,
                format!("{failed} of {} targets failed", runs.len()),
            )
        };
        Self::output(&output)
    }

    fn format_status(
        &self,
        root: &Path,
        state: TargetState,
        manifest: Option<&Manifest>,
    ) -> Result<()> {
        #[derive(Serialize)]
        struct StatusOutput<'a> {
            root: String,
            state: TargetState,
            #[serde(skip_serializing_if = "Option::is_none")]
            manifest: Option<&'a Manifest>,
        }

        Self::output(&JsonOutput::success(
            "status",
            StatusOutput {
                root: root.display().to_string(),
                state,
                manifest,
            },
        ))
    }

    fn format_warning(&self, message: &str) {
        #[derive(Serialize)]
        struct WarningData {
            message: String,
        }

        let output = JsonOutput::success(
            "warning",
            WarningData {
                message: message.to_string(),
            },
        );
        let _ = Self::output(&output);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::sync::Arc;
    use vfsx_core::ExtractionReport;
    use vfsx_core::VfsxError;

    #[test]
    fn test_run_output_is_tagged() {
        let mut report = ExtractionReport::new();
        report.files_extracted = 2;
        report.scan_termination = Some(ScanTermination::DrySpell);
        let run = TargetRun {
            root: PathBuf::from("/games/one"),
            result: JobResult::Extracted(report),
        };

        let json = serde_json::to_value(RunOutput::from(&run)).unwrap();
        assert_eq!(json["root"], "/games/one");
        assert_eq!(json["result"], "extracted");
        assert_eq!(json["files_extracted"], 2);
        assert_eq!(json["scan_termination"], "dry_spell");
    }

    #[test]
    fn test_failed_run_carries_message() {
        let run = TargetRun {
            root: PathBuf::from("/games/one"),
            result: JobResult::Failed(Arc::new(VfsxError::NoMatchingEntries { scanned: 7 })),
        };
        let json = serde_json::to_value(RunOutput::from(&run)).unwrap();
        assert_eq!(json["result"], "failed");
        let message = json["message"].as_str().unwrap();
        assert!(message.contains("/games/one"));
        assert!(message.contains("7 scanned"));
        assert!(message.contains("HINT"));
    }
}
