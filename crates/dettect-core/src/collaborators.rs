//! Collaborator traits
//!
//! The dispatcher only sequences calls; validation, filtering and report
//! generation are injected through these traits. Filesystem-backed
//! implementations live in `dettect-store` and `dettect-reports`.

use crate::errors::Result;
use crate::model::{
    AdministrationArtifact, ArtifactRef, GroupOptions, MitigationDomain, QuerySet,
    ScoreDimension, SortKey, UpdateKind,
};
use crate::outcome::StepStatus;

/// Result of validating one administration file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Validation {
    Passed,
    Failed { findings: Vec<String> },
}

impl Validation {
    pub fn passed(&self) -> bool {
        matches!(self, Validation::Passed)
    }
}

/// Checks an administration file against its declared kind
pub trait PreconditionValidator {
    /// Validate `artifact`; with `health`, also check its content
    ///
    /// # Errors
    ///
    /// Returns an error only when validation itself cannot run; an invalid
    /// file is reported as `Validation::Failed`.
    fn validate(&self, artifact: &AdministrationArtifact, health: bool) -> Result<Validation>;
}

/// Result of applying queries to an administration file
#[derive(Debug, Clone)]
pub enum FilterResult {
    /// Filtered copy; supersedes the base artifact for the whole invocation
    Derived(ArtifactRef),
    /// Nothing matched
    NoResults,
}

/// Narrows an administration file to the records matching the queries
pub trait QueryFilter {
    /// # Errors
    ///
    /// Returns `InvalidQuery` for unparsable queries and `Io` when the
    /// derived file cannot be written.
    fn filter(&self, artifact: &ArtifactRef, queries: &QuerySet) -> Result<FilterResult>;
}

/// Builds ATT&CK Navigator layers
pub trait LayerBuilder {
    /// # Errors
    ///
    /// Returns an error when the layer cannot be built or written.
    fn data_source_layer(&self, file_ds: &ArtifactRef) -> Result<StepStatus>;

    /// Visibility or detection layer; `overlay` combines both dimensions
    ///
    /// # Errors
    ///
    /// Returns an error when the layer cannot be built or written.
    fn technique_layer(
        &self,
        dimension: ScoreDimension,
        file_tech: &ArtifactRef,
        file_ds: Option<&ArtifactRef>,
        overlay: bool,
    ) -> Result<StepStatus>;
}

/// Exports administration files as spreadsheets
pub trait SpreadsheetExporter {
    /// # Errors
    ///
    /// Returns an error when the spreadsheet cannot be written.
    fn export_data_sources(&self, file_ds: &ArtifactRef) -> Result<StepStatus>;

    /// # Errors
    ///
    /// Returns an error when the spreadsheet cannot be written.
    fn export_techniques(&self, file_tech: &ArtifactRef) -> Result<StepStatus>;
}

/// Plots coverage growth over time
pub trait GraphPlotter {
    /// # Errors
    ///
    /// Returns an error when the graph cannot be written.
    fn plot_data_sources(&self, file_ds: &ArtifactRef) -> Result<StepStatus>;

    /// # Errors
    ///
    /// Returns an error when the graph cannot be written.
    fn plot_techniques(&self, dimension: ScoreDimension, file_tech: &ArtifactRef)
        -> Result<StepStatus>;
}

/// Generates a technique administration file from data sources
pub trait AdminFileSynthesizer {
    /// # Errors
    ///
    /// Returns an error when the file cannot be generated or written.
    fn synthesize_technique_admin(&self, file_ds: &ArtifactRef) -> Result<StepStatus>;
}

/// Refreshes visibility scores of a technique administration file in place
pub trait AdminFileUpdater {
    /// # Errors
    ///
    /// Returns an error when the file cannot be read, backed up or rewritten.
    fn update_technique_admin(
        &self,
        file_ds: &ArtifactRef,
        file_tech: &ArtifactRef,
    ) -> Result<StepStatus>;
}

/// Input of the combined group call
#[derive(Debug, Clone)]
pub struct GroupHeatMapRequest {
    pub options: GroupOptions,
    /// Validated overlay file for visibility/detection overlays
    pub overlay_artifact: Option<ArtifactRef>,
    /// Applied inside the call, jointly with group resolution
    pub queries: Option<QuerySet>,
    pub health: bool,
}

/// Result of the combined group call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GroupOutcome {
    Completed(StepStatus),
    /// The forwarded queries matched nothing
    NoResults,
}

/// Builds group heat maps, resolving and filtering in one call
pub trait GroupHeatMapper {
    /// # Errors
    ///
    /// Returns an error when groups cannot be resolved or the layer cannot
    /// be written.
    fn group_heat_map(
        &self,
        request: &GroupHeatMapRequest,
        filter: &dyn QueryFilter,
    ) -> Result<GroupOutcome>;
}

/// Prints statistics from the ATT&CK knowledge base
pub trait StatisticsReporter {
    /// # Errors
    ///
    /// Returns an error when the knowledge base cannot be loaded.
    fn data_source_coverage(&self) -> Result<StepStatus>;

    /// # Errors
    ///
    /// Returns an error when the knowledge base cannot be loaded.
    fn mitigation_coverage(&self, domain: MitigationDomain) -> Result<StepStatus>;

    /// # Errors
    ///
    /// Returns an error when the knowledge base cannot be loaded.
    fn updates(&self, kind: UpdateKind, sort: SortKey) -> Result<StepStatus>;
}

/// Everything the dispatcher calls out to
#[derive(Clone, Copy)]
pub struct Collaborators<'a> {
    pub validator: &'a dyn PreconditionValidator,
    pub filter: &'a dyn QueryFilter,
    pub layers: &'a dyn LayerBuilder,
    pub spreadsheets: &'a dyn SpreadsheetExporter,
    pub graphs: &'a dyn GraphPlotter,
    pub synthesizer: &'a dyn AdminFileSynthesizer,
    pub updater: &'a dyn AdminFileUpdater,
    pub groups: &'a dyn GroupHeatMapper,
    pub statistics: &'a dyn StatisticsReporter,
}
