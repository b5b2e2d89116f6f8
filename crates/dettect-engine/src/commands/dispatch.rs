//! Command dispatch.
//!
//! ## Pipeline (in order):
//! 1. Environment check (cache and output directories exist)
//! 2. Unsupported outputs for the mode (hard stop)
//! 3. Resolve every required artifact path (missing path stops before any
//!    validation)
//! 4. Validate each artifact, with the health check when requested
//! 5. Group overlay file / Generic statistics selection
//! 6. Query filter, at most once; the derived artifact replaces its base
//! 7. Run the planned steps in order, checking the interrupt flag between
//!    steps
//!
//! Steps 2 to 6 end in `ExecutionOutcome::Aborted` without calling any
//! generator. A generator error is fatal and returned as `Err`.

use std::sync::Arc;
use std::time::Instant;

use dettect_core::collaborators::{
    Collaborators, FilterResult, GroupHeatMapRequest, GroupOutcome, PreconditionValidator,
    Validation,
};
use dettect_core::errors::{DtError, DtErrorKind, Result};
use dettect_core::model::{
    AdministrationArtifact, ArtifactKind, ArtifactRef, Mode, ModeRequest, QuerySet, Statistics,
};
use dettect_core::outcome::StepRecord;
use dettect_core::plan::{self, Step};
use dettect_core::preconditions;
use dettect_core::{
    log_op_abort, log_op_end, log_op_error, log_op_start, AbortReason, Environment,
    ExecutionOutcome, ExecutionReport, Interrupt, StepStatus,
};
use dettect_core_types::InvocationId;

/// Why dispatch stopped early
enum Halt {
    Abort(AbortReason),
    Fatal(DtError),
}

impl From<AbortReason> for Halt {
    fn from(reason: AbortReason) -> Self {
        Halt::Abort(reason)
    }
}

impl From<DtError> for Halt {
    fn from(err: DtError) -> Self {
        Halt::Fatal(err)
    }
}

/// Artifacts resolved for one invocation
#[derive(Debug, Default)]
struct Artifacts {
    file_ds: Option<ArtifactRef>,
    file_tech: Option<ArtifactRef>,
    /// Group mode visibility/detection overlay
    overlay: Option<ArtifactRef>,
}

impl Artifacts {
    fn slot(&mut self, kind: ArtifactKind) -> &mut Option<ArtifactRef> {
        match kind {
            ArtifactKind::DataSourceAdmin => &mut self.file_ds,
            ArtifactKind::TechniqueAdmin => &mut self.file_tech,
        }
    }

    fn get(&self, kind: ArtifactKind) -> Option<&ArtifactRef> {
        match kind {
            ArtifactKind::DataSourceAdmin => self.file_ds.as_ref(),
            ArtifactKind::TechniqueAdmin => self.file_tech.as_ref(),
        }
    }

    fn required(&self, kind: ArtifactKind) -> Result<&ArtifactRef> {
        self.get(kind).ok_or_else(|| {
            DtError::new(DtErrorKind::Internal)
                .with_op("dispatch")
                .with_message(format!("{} was not resolved", kind.label()))
        })
    }
}

/// Dispatch one request
///
/// Emits `start` and then `end`, `abort` or `end_error` for op `dispatch`,
/// and `start`/`end` for op `dispatch_step` around every generator call.
/// All events carry `invocation_id`.
///
/// # Errors
///
/// Returns an error when the environment is not ready, a collaborator
/// fails, or the interrupt flag is raised. Precondition failures are not
/// errors; they are returned as `ExecutionOutcome::Aborted`.
pub fn dispatch(
    invocation_id: &InvocationId,
    request: &ModeRequest,
    env: &Environment,
    collaborators: Collaborators<'_>,
    interrupt: &Interrupt,
) -> Result<ExecutionOutcome> {
    log_op_start!(
        "dispatch",
        invocation_id = %invocation_id,
        mode = request.mode.name(),
        outputs = request.outputs.len()
    );
    let start = Instant::now();

    let result = run(invocation_id, request, env, collaborators, interrupt);

    let duration_ms = start.elapsed().as_millis() as u64;
    match result {
        Ok(report) => {
            log_op_end!(
                "dispatch",
                duration_ms = duration_ms,
                invocation_id = %invocation_id,
                steps = report.steps.len()
            );
            Ok(ExecutionOutcome::Success(report))
        }
        Err(Halt::Abort(reason)) => {
            log_op_abort!(
                "dispatch",
                reason.name(),
                duration_ms = duration_ms,
                invocation_id = %invocation_id
            );
            Ok(ExecutionOutcome::Aborted(reason))
        }
        Err(Halt::Fatal(err)) => {
            log_op_error!(
                "dispatch",
                err.clone(),
                duration_ms = duration_ms,
                invocation_id = %invocation_id
            );
            Err(err)
        }
    }
}

fn run(
    invocation_id: &InvocationId,
    request: &ModeRequest,
    env: &Environment,
    collaborators: Collaborators<'_>,
    interrupt: &Interrupt,
) -> std::result::Result<ExecutionReport, Halt> {
    if !env.is_ready() {
        return Err(DtError::new(DtErrorKind::NotFound)
            .with_op("dispatch")
            .with_path(env.root())
            .with_message("cache or output directory is missing")
            .into());
    }

    let unsupported = plan::unsupported_outputs(request);
    if !unsupported.is_empty() {
        let names: Vec<&str> = unsupported.iter().map(|o| o.name()).collect();
        return Err(AbortReason::UnsupportedCombination {
            detail: format!("The {} mode does not support: {}", request.mode, names.join(", ")),
        }
        .into());
    }

    let mut artifacts = resolve(request)?;
    for kind in [ArtifactKind::DataSourceAdmin, ArtifactKind::TechniqueAdmin] {
        if let Some(artifact) = artifacts.get(kind) {
            interrupt.check("validate")?;
            validate(collaborators.validator, artifact, request.health())?;
        }
    }

    match request.mode {
        Mode::Group => {
            artifacts.overlay = group_overlay(request, collaborators.validator)?;
        }
        Mode::Generic => {
            if request.statistics.is_none() {
                return Err(AbortReason::UnsupportedCombination {
                    detail: "Select one of the statistics: data sources, mitigations or updates"
                        .to_string(),
                }
                .into());
            }
        }
        _ => {}
    }

    let mut report = ExecutionReport::new(invocation_id.clone(), request.mode);
    report.derived = apply_filter(request, &mut artifacts, collaborators, interrupt)?;

    for step in plan::steps_for(request) {
        interrupt.check(step.name())?;
        let status = run_step(invocation_id, step, request, &artifacts, collaborators)?;
        report.steps.push(StepRecord { step, status });
    }
    Ok(report)
}

/// Resolve the paths of every applicable precondition row
///
/// All rows are resolved before anything is validated.
fn resolve(request: &ModeRequest) -> std::result::Result<Artifacts, Halt> {
    let mut artifacts = Artifacts::default();
    for requirement in preconditions::requirements(request.mode)
        .iter()
        .filter(|r| r.applies(&request.outputs))
    {
        let path = request
            .path_for(requirement.kind)
            .ok_or_else(|| AbortReason::MissingRequiredArtifact {
                kind: requirement.kind,
                required_by: requirement.triggered_by(&request.outputs),
            })?;
        *artifacts.slot(requirement.kind) = Some(Arc::new(AdministrationArtifact::supplied(
            path,
            requirement.kind,
        )));
    }
    Ok(artifacts)
}

fn validate(
    validator: &dyn PreconditionValidator,
    artifact: &ArtifactRef,
    health: bool,
) -> std::result::Result<(), Halt> {
    match validator.validate(artifact, health)? {
        Validation::Passed => Ok(()),
        Validation::Failed { findings } => Err(AbortReason::FailedHealthCheck {
            kind: artifact.kind(),
            path: artifact.path().to_path_buf(),
            findings,
        }
        .into()),
    }
}

/// Validated overlay file for visibility/detection overlays
fn group_overlay(
    request: &ModeRequest,
    validator: &dyn PreconditionValidator,
) -> std::result::Result<Option<ArtifactRef>, Halt> {
    let Some(kind) = preconditions::overlay_requirement(request.group.overlay_type) else {
        return Ok(None);
    };
    let path = request
        .group
        .overlay
        .as_deref()
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .ok_or(AbortReason::MissingOverlayArtifact {
            overlay_type: request.group.overlay_type,
        })?;
    let artifact = Arc::new(AdministrationArtifact::supplied(path, kind));
    validate(validator, &artifact, request.health())?;
    Ok(Some(artifact))
}

/// Kind a mode's queries apply to, when the mode pre-filters
fn filter_target(mode: Mode, queries: &QuerySet) -> Option<ArtifactKind> {
    match (mode, queries) {
        (Mode::DataSource, QuerySet::Single(_)) => Some(ArtifactKind::DataSourceAdmin),
        (Mode::Visibility | Mode::Detection, QuerySet::Pair { .. }) => {
            Some(ArtifactKind::TechniqueAdmin)
        }
        _ => None,
    }
}

/// Filter once; the derived artifact supersedes its base for every step
fn apply_filter(
    request: &ModeRequest,
    artifacts: &mut Artifacts,
    collaborators: Collaborators<'_>,
    interrupt: &Interrupt,
) -> std::result::Result<Option<ArtifactRef>, Halt> {
    let Some(queries) = &request.queries else {
        return Ok(None);
    };
    // Group queries travel inside the combined group call
    if request.mode == Mode::Group {
        return Ok(None);
    }
    let kind = filter_target(request.mode, queries).ok_or_else(|| {
        AbortReason::UnsupportedCombination {
            detail: format!("The {} mode does not accept these queries", request.mode),
        }
    })?;

    interrupt.check("filter")?;
    let base = artifacts.required(kind)?.clone();
    match collaborators.filter.filter(&base, queries)? {
        FilterResult::Derived(derived) => {
            *artifacts.slot(kind) = Some(derived.clone());
            Ok(Some(derived))
        }
        FilterResult::NoResults => Err(AbortReason::EmptyFilterResult { kind }.into()),
    }
}

fn run_step(
    invocation_id: &InvocationId,
    step: Step,
    request: &ModeRequest,
    artifacts: &Artifacts,
    collaborators: Collaborators<'_>,
) -> std::result::Result<StepStatus, Halt> {
    log_op_start!("dispatch_step", invocation_id = %invocation_id, step = step.name());
    let start = Instant::now();

    let result = call(step, request, artifacts, collaborators);

    let duration_ms = start.elapsed().as_millis() as u64;
    match &result {
        Ok(status) => {
            log_op_end!(
                "dispatch_step",
                duration_ms = duration_ms,
                invocation_id = %invocation_id,
                step = step.name(),
                status = ?status
            );
        }
        Err(Halt::Abort(reason)) => {
            log_op_abort!(
                "dispatch_step",
                reason.name(),
                duration_ms = duration_ms,
                invocation_id = %invocation_id,
                step = step.name()
            );
        }
        Err(Halt::Fatal(err)) => {
            log_op_error!(
                "dispatch_step",
                err.clone(),
                duration_ms = duration_ms,
                invocation_id = %invocation_id,
                step = step.name()
            );
        }
    }
    result
}

fn call(
    step: Step,
    request: &ModeRequest,
    artifacts: &Artifacts,
    c: Collaborators<'_>,
) -> std::result::Result<StepStatus, Halt> {
    let file_ds = || artifacts.required(ArtifactKind::DataSourceAdmin);
    let file_tech = || artifacts.required(ArtifactKind::TechniqueAdmin);
    let dimension = || {
        request.mode.dimension().ok_or_else(|| {
            DtError::new(DtErrorKind::Internal)
                .with_op("dispatch")
                .with_message(format!("{} has no score dimension", request.mode))
        })
    };

    let status = match step {
        Step::UpdateTechniqueAdmin => c.updater.update_technique_admin(file_ds()?, file_tech()?)?,
        Step::DataSourceLayer => c.layers.data_source_layer(file_ds()?)?,
        Step::DataSourceExcel => c.spreadsheets.export_data_sources(file_ds()?)?,
        Step::DataSourceGraph => c.graphs.plot_data_sources(file_ds()?)?,
        Step::TechniqueAdminYaml => c.synthesizer.synthesize_technique_admin(file_ds()?)?,
        Step::TechniqueLayer { overlay } => c.layers.technique_layer(
            dimension()?,
            file_tech()?,
            artifacts.file_ds.as_ref(),
            overlay,
        )?,
        Step::TechniqueGraph => c.graphs.plot_techniques(dimension()?, file_tech()?)?,
        Step::TechniqueExcel => c.spreadsheets.export_techniques(file_tech()?)?,
        Step::GroupHeatMap => {
            let group_request = GroupHeatMapRequest {
                options: request.group.clone(),
                overlay_artifact: artifacts.overlay.clone(),
                queries: request.queries.clone(),
                health: request.health(),
            };
            match c.groups.group_heat_map(&group_request, c.filter)? {
                GroupOutcome::Completed(status) => status,
                GroupOutcome::NoResults => {
                    return Err(AbortReason::EmptyFilterResult {
                        kind: ArtifactKind::TechniqueAdmin,
                    }
                    .into())
                }
            }
        }
        Step::Statistics => match request.statistics {
            Some(Statistics::DataSources) => c.statistics.data_source_coverage()?,
            Some(Statistics::Mitigations(domain)) => c.statistics.mitigation_coverage(domain)?,
            Some(Statistics::Updates { kind, sort }) => c.statistics.updates(kind, sort)?,
            None => {
                return Err(DtError::new(DtErrorKind::Internal)
                    .with_op("dispatch")
                    .with_message("no statistics selected")
                    .into())
            }
        },
    };
    Ok(status)
}
