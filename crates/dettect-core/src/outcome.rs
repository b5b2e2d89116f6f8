//! Execution outcomes
//!
//! Precondition failures are values, not process exits: the dispatcher
//! returns `ExecutionOutcome::Aborted` and the command-line boundary turns
//! it into a one-line diagnostic.

use std::fmt;
use std::path::PathBuf;

use dettect_core_types::InvocationId;

use crate::errors::{DtError, DtErrorKind};
use crate::model::{ArtifactKind, ArtifactRef, Mode, Output, OverlayType};
use crate::plan::Step;

/// Why an invocation stopped before running any output
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AbortReason {
    /// A mandatory administration file was not supplied
    MissingRequiredArtifact {
        kind: ArtifactKind,
        /// Requested outputs that made the file mandatory (empty when the
        /// file is always mandatory for the mode)
        required_by: Vec<Output>,
    },
    /// An administration file failed validation or its health check
    FailedHealthCheck {
        kind: ArtifactKind,
        path: PathBuf,
        findings: Vec<String>,
    },
    /// The query filter matched zero records
    EmptyFilterResult { kind: ArtifactKind },
    /// A visibility/detection overlay was requested without an overlay file
    MissingOverlayArtifact { overlay_type: OverlayType },
    /// The request combines options the mode cannot satisfy
    UnsupportedCombination { detail: String },
}

impl AbortReason {
    /// Short stable name, used as the `abort_reason` log field
    pub fn name(&self) -> &'static str {
        match self {
            AbortReason::MissingRequiredArtifact { .. } => "MissingRequiredArtifact",
            AbortReason::FailedHealthCheck { .. } => "FailedHealthCheck",
            AbortReason::EmptyFilterResult { .. } => "EmptyFilterResult",
            AbortReason::MissingOverlayArtifact { .. } => "MissingOverlayArtifact",
            AbortReason::UnsupportedCombination { .. } => "UnsupportedCombination",
        }
    }

    /// Error kind this reason is classified as
    pub fn kind(&self) -> DtErrorKind {
        match self {
            AbortReason::MissingRequiredArtifact { .. }
            | AbortReason::MissingOverlayArtifact { .. } => DtErrorKind::MissingArgument,
            AbortReason::FailedHealthCheck { .. } => DtErrorKind::ValidationFailed,
            AbortReason::EmptyFilterResult { .. } => DtErrorKind::EmptyFilterResult,
            AbortReason::UnsupportedCombination { .. } => DtErrorKind::UnsupportedCombination,
        }
    }
}

impl fmt::Display for AbortReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AbortReason::MissingRequiredArtifact { kind, required_by } => {
                if required_by.is_empty() {
                    write!(f, "The {} ('{}') is required", kind.label(), kind.flag())
                } else {
                    let outputs: Vec<&str> = required_by.iter().map(|o| o.name()).collect();
                    write!(
                        f,
                        "Generating {} requires the {} ('{}')",
                        outputs.join(" or "),
                        kind.label(),
                        kind.flag()
                    )
                }
            }
            AbortReason::FailedHealthCheck {
                kind,
                path,
                findings,
            } => {
                write!(f, "The {} '{}' is not valid", kind.label(), path.display())?;
                if let Some(first) = findings.first() {
                    write!(f, ": {}", first)?;
                    if findings.len() > 1 {
                        write!(f, " (and {} more)", findings.len() - 1)?;
                    }
                }
                Ok(())
            }
            AbortReason::EmptyFilterResult { kind } => {
                write!(f, "The search returned 0 results from the {}", kind.label())
            }
            AbortReason::MissingOverlayArtifact { overlay_type } => write!(
                f,
                "A {} overlay requires a technique administration YAML file ('-o, --overlay')",
                overlay_type
            ),
            AbortReason::UnsupportedCombination { detail } => f.write_str(detail),
        }
    }
}

impl From<AbortReason> for DtError {
    fn from(reason: AbortReason) -> Self {
        let err = DtError::new(reason.kind())
            .with_op("dispatch")
            .with_message(reason.to_string());
        match reason {
            AbortReason::FailedHealthCheck { path, .. } => err.with_path(path),
            _ => err,
        }
    }
}

/// Result reported by one generator call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepStatus {
    /// Files written (created or overwritten wholesale)
    Written(Vec<PathBuf>),
    /// Report printed to the console
    Printed,
    /// The generator handled a problem itself and produced nothing; later
    /// steps still run
    Skipped(String),
}

/// One executed step
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepRecord {
    pub step: Step,
    pub status: StepStatus,
}

/// Summary of a successful invocation
#[derive(Debug, Clone)]
pub struct ExecutionReport {
    pub invocation_id: InvocationId,
    pub mode: Mode,
    /// Derived artifact shared by the steps, when a query was applied
    pub derived: Option<ArtifactRef>,
    pub steps: Vec<StepRecord>,
}

impl ExecutionReport {
    pub fn new(invocation_id: InvocationId, mode: Mode) -> Self {
        Self {
            invocation_id,
            mode,
            derived: None,
            steps: Vec::new(),
        }
    }

    /// Executed steps, in order
    pub fn executed(&self) -> Vec<Step> {
        self.steps.iter().map(|r| r.step).collect()
    }

    /// Every file written by the steps
    pub fn written_files(&self) -> Vec<&PathBuf> {
        self.steps
            .iter()
            .filter_map(|r| match &r.status {
                StepStatus::Written(paths) => Some(paths),
                _ => None,
            })
            .flatten()
            .collect()
    }
}

/// Outcome of one invocation
#[derive(Debug, Clone)]
pub enum ExecutionOutcome {
    Success(ExecutionReport),
    Aborted(AbortReason),
}

impl ExecutionOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ExecutionOutcome::Success(_))
    }

    pub fn abort_reason(&self) -> Option<&AbortReason> {
        match self {
            ExecutionOutcome::Aborted(reason) => Some(reason),
            ExecutionOutcome::Success(_) => None,
        }
    }

    pub fn report(&self) -> Option<&ExecutionReport> {
        match self {
            ExecutionOutcome::Success(report) => Some(report),
            ExecutionOutcome::Aborted(_) => None,
        }
    }
}
