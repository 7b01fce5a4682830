//! Output formatter trait for CLI results.

use anyhow::Result;
use serde::Serialize;
use std::path::Path;
use std::path::PathBuf;
use vfsx_core::JobKind;
use vfsx_core::JobResult;
use vfsx_core::Target;
use vfsx_core::TargetState;
use vfsx_core::TargetStatus;
use vfsx_core::store::Manifest;

/// How one target fared in an extract or undo run.
#[derive(Debug, Clone)]
pub struct TargetRun {
    pub root: PathBuf,
    pub result: JobResult,
}

impl TargetRun {
    pub const fn failed(&self) -> bool {
        matches!(self.result, JobResult::Failed(_))
    }
}

/// Common output formatter trait
pub trait OutputFormatter {
    /// Format the registered target list
    fn format_targets(&self, targets: &[TargetStatus]) -> Result<()>;

    /// Format a newly registered target
    fn format_target_added(&self, target: &Target, state: TargetState) -> Result<()>;

    /// Format an unregistered target
    fn format_target_removed(&self, target: &Target) -> Result<()>;

    /// Format the results of an extract or undo run
    fn format_run(&self, kind: JobKind, runs: &[TargetRun]) -> Result<()>;

    /// Format the manifest summary of a target root
    fn format_status(
        &self,
        root: &Path,
        state: TargetState,
        manifest: Option<&Manifest>,
    ) -> Result<()>;

    /// Format warning message
    fn format_warning(&self, message: &str);
}

/// Generic JSON output structure
#[derive(Debug, Serialize)]
pub struct JsonOutput<T> {
    pub operation: String,
    pub status: Status,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Success,
    Error,
}

impl<T: Serialize> JsonOutput<T> {
    pub fn success(operation: impl Into<String>, data: T) -> Self {
        Self {
            operation: operation.into(),
            status: Status::Success,
            data: Some(data),
            error: None,
        }
    }

    /// Output carrying data about a partially failed operation.
    pub fn failure(operation: impl Into<String>, data: T, error: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
            status: Status::Error,
            data: Some(data),
            error: Some(error.into()),
        }
    }
}

/// Operation name used in output for a job kind.
pub const fn operation_name(kind: JobKind) -> &'static str {
    match kind {
        JobKind::Extract => "extract",
        JobKind::Undo => "undo",
    }
}
