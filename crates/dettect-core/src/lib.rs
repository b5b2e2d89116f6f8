//! DeTTECT Core - command-mode model and dispatch contracts
//!
//! This crate provides the vocabulary shared by the dispatcher and its
//! collaborators:
//! - Modes, outputs and the parsed `ModeRequest`
//! - Administration artifacts (supplied and derived)
//! - The precondition table and the per-mode execution plan
//! - Collaborator traits (validator, query filter, report generators)
//! - Execution outcomes, the error facility and the logging facility
//! - The process `Environment` (cache/output directories) and `Interrupt`

pub mod collaborators;
pub mod environment;
pub mod errors;
pub mod interrupt;
pub mod logging_facility;
pub mod model;
pub mod outcome;
pub mod plan;
pub mod preconditions;

pub use dettect_core_types;

// Re-export commonly used types
pub use collaborators::Collaborators;
pub use environment::Environment;
pub use errors::{DettectError, DtError, DtErrorKind, Result};
pub use interrupt::Interrupt;
pub use model::{
    AdministrationArtifact, ArtifactKind, ArtifactRef, Mode, ModeRequest, Output, QuerySet,
};
pub use outcome::{AbortReason, ExecutionOutcome, ExecutionReport, StepStatus};
pub use plan::Step;
