use crate::export::metadata::MetadataDescriptor;
use crate::export::ExportError;
use crate::types::PlatformTuple;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RunStatus {
    Done,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PassStatus {
    Succeeded,
    Failed { reason: String },
    TimedOut { timeout_secs: u64 },
}

impl PassStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, PassStatus::Succeeded)
    }

    pub fn is_failure(&self) -> bool {
        !self.is_success()
    }
}

impl From<&ExportError> for PassStatus {
    fn from(error: &ExportError) -> Self {
        match error {
            ExportError::Timeout { timeout_secs, .. } => PassStatus::TimedOut {
                timeout_secs: *timeout_secs,
            },
            other => PassStatus::Failed {
                reason: other.to_string(),
            },
        }
    }
}

/// Something that went wrong without failing the build it belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExportWarning {
    /// Repository metadata could not be attached; binaries are still built
    MetadataSkipped {
        target: Option<String>,
        reason: String,
    },
}

impl fmt::Display for ExportWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExportWarning::MetadataSkipped {
                target: Some(target),
                reason,
            } => write!(f, "Repository metadata skipped for {target}: {reason}"),
            ExportWarning::MetadataSkipped {
                target: None,
                reason,
            } => write!(f, "Repository metadata not published: {reason}"),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct UnitBuildRecord {
    pub unit: String,
    pub status: PassStatus,
    pub log_location: Option<PathBuf>,
    pub duration_ms: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct TargetOutcome {
    pub target: PlatformTuple,
    pub output_path: PathBuf,
    pub status: PassStatus,
    pub unit_builds: Vec<UnitBuildRecord>,
    pub warnings: Vec<ExportWarning>,
}

impl TargetOutcome {
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }
}

/// Outcome of one export run, one entry per target in the order the
/// targets were requested.
#[derive(Debug, Clone, Serialize)]
pub struct ExportResult {
    pub run_id: Uuid,
    pub per_target: Vec<TargetOutcome>,
    pub metadata: Option<MetadataDescriptor>,
    /// Run-level warnings; per-target ones live on each outcome
    pub warnings: Vec<ExportWarning>,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
}

impl ExportResult {
    pub fn status(&self) -> RunStatus {
        if self.per_target.iter().all(TargetOutcome::is_success) {
            RunStatus::Done
        } else {
            RunStatus::Failed
        }
    }

    pub fn is_success(&self) -> bool {
        self.status() == RunStatus::Done
    }

    pub fn succeeded(&self) -> usize {
        self.per_target.iter().filter(|o| o.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.per_target.len() - self.succeeded()
    }

    pub fn outcome_for(&self, target: &PlatformTuple) -> Option<&TargetOutcome> {
        self.per_target.iter().find(|o| &o.target == target)
    }

    /// Run-level warnings followed by every target's warnings
    pub fn all_warnings(&self) -> impl Iterator<Item = &ExportWarning> {
        self.warnings
            .iter()
            .chain(self.per_target.iter().flat_map(|o| o.warnings.iter()))
    }
}
