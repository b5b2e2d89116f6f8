//! Command-mode domain model
//!
//! A `ModeRequest` is the parsed form of one invocation: the selected mode,
//! the requested outputs, the administration file paths, the query strings
//! and the mode-specific options. Administration artifacts are shared
//! between steps as `ArtifactRef` so every generator in one invocation sees
//! the same instance.

use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use crate::errors::{DtError, DtErrorKind};

/// Declared kind of an administration file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ArtifactKind {
    DataSourceAdmin,
    TechniqueAdmin,
}

impl ArtifactKind {
    /// Value of the `file_type` key the file must carry
    pub fn file_type(&self) -> &'static str {
        match self {
            ArtifactKind::DataSourceAdmin => "data-source-administration",
            ArtifactKind::TechniqueAdmin => "technique-administration",
        }
    }

    /// Human-readable name used in console diagnostics
    pub fn label(&self) -> &'static str {
        match self {
            ArtifactKind::DataSourceAdmin => "data source administration YAML file",
            ArtifactKind::TechniqueAdmin => "technique administration YAML file",
        }
    }

    /// Command-line flag that supplies a file of this kind
    pub fn flag(&self) -> &'static str {
        match self {
            ArtifactKind::DataSourceAdmin => "--file-ds",
            ArtifactKind::TechniqueAdmin => "--file-tech",
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.file_type())
    }
}

/// Where an artifact came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArtifactOrigin {
    /// Supplied by the operator on the command line
    Supplied,
    /// Produced by the query filter from `base`
    Derived { base: PathBuf, digest: String },
}

/// Reference to an on-disk administration dataset
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdministrationArtifact {
    path: PathBuf,
    kind: ArtifactKind,
    origin: ArtifactOrigin,
}

/// Shared handle; all steps of one invocation receive clones of one `Arc`
pub type ArtifactRef = Arc<AdministrationArtifact>;

impl AdministrationArtifact {
    /// An artifact supplied by the operator
    pub fn supplied(path: impl Into<PathBuf>, kind: ArtifactKind) -> Self {
        Self {
            path: path.into(),
            kind,
            origin: ArtifactOrigin::Supplied,
        }
    }

    /// An artifact derived from `base` by the query filter
    pub fn derived(
        path: impl Into<PathBuf>,
        base: &AdministrationArtifact,
        digest: impl Into<String>,
    ) -> Self {
        Self {
            path: path.into(),
            kind: base.kind,
            origin: ArtifactOrigin::Derived {
                base: base.path.clone(),
                digest: digest.into(),
            },
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn kind(&self) -> ArtifactKind {
        self.kind
    }

    pub fn origin(&self) -> &ArtifactOrigin {
        &self.origin
    }

    pub fn is_derived(&self) -> bool {
        matches!(self.origin, ArtifactOrigin::Derived { .. })
    }

    /// File stem used to name generated reports
    pub fn stem(&self) -> String {
        self.path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "unnamed".to_string())
    }
}

/// Top-level analysis category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    DataSource,
    Visibility,
    Detection,
    Group,
    Generic,
}

impl Mode {
    pub fn name(&self) -> &'static str {
        match self {
            Mode::DataSource => "datasource",
            Mode::Visibility => "visibility",
            Mode::Detection => "detection",
            Mode::Group => "group",
            Mode::Generic => "generic",
        }
    }

    /// Score dimension for the technique-scoring modes
    pub fn dimension(&self) -> Option<ScoreDimension> {
        match self {
            Mode::Visibility => Some(ScoreDimension::Visibility),
            Mode::Detection => Some(ScoreDimension::Detection),
            _ => None,
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Requested output of an invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Output {
    Layer,
    Excel,
    Graph,
    Yaml,
    Update,
    Overlay,
    Health,
}

impl Output {
    pub fn name(&self) -> &'static str {
        match self {
            Output::Layer => "layer",
            Output::Excel => "excel",
            Output::Graph => "graph",
            Output::Yaml => "yaml",
            Output::Update => "update",
            Output::Overlay => "overlay",
            Output::Health => "health",
        }
    }
}

impl fmt::Display for Output {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Scored dimension of a technique administration file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScoreDimension {
    Visibility,
    Detection,
}

impl ScoreDimension {
    pub fn name(&self) -> &'static str {
        match self {
            ScoreDimension::Visibility => "visibility",
            ScoreDimension::Detection => "detection",
        }
    }

    /// The other dimension, used when overlaying
    pub fn other(&self) -> ScoreDimension {
        match self {
            ScoreDimension::Visibility => ScoreDimension::Detection,
            ScoreDimension::Detection => ScoreDimension::Visibility,
        }
    }
}

/// Query strings of an invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuerySet {
    /// DataSource mode: one query over data source records
    Single(String),
    /// Technique modes: visibility and detection queries, combined with AND
    Pair {
        visibility: Option<String>,
        detection: Option<String>,
        all_scores: bool,
    },
}

impl QuerySet {
    /// Build a single query; `None` when no query was given
    pub fn single(query: Option<String>) -> Option<Self> {
        query.filter(|q| !q.trim().is_empty()).map(QuerySet::Single)
    }

    /// Build a query pair; `None` when neither query was given
    pub fn pair(
        visibility: Option<String>,
        detection: Option<String>,
        all_scores: bool,
    ) -> Option<Self> {
        let visibility = visibility.filter(|q| !q.trim().is_empty());
        let detection = detection.filter(|q| !q.trim().is_empty());
        if visibility.is_none() && detection.is_none() {
            return None;
        }
        Some(QuerySet::Pair {
            visibility,
            detection,
            all_scores,
        })
    }
}

macro_rules! choice_enum {
    (
        $(#[$meta:meta])*
        $name:ident { $($variant:ident => $text:expr),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            /// Every accepted value, in declaration order
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn name(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.name())
            }
        }

        impl FromStr for $name {
            type Err = DtError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                $name::ALL
                    .iter()
                    .copied()
                    .find(|v| v.name().eq_ignore_ascii_case(s))
                    .ok_or_else(|| {
                        let allowed: Vec<&str> = $name::ALL.iter().map(|v| v.name()).collect();
                        DtError::new(DtErrorKind::InvalidInput).with_message(format!(
                            "invalid {} '{}' (choose from: {})",
                            stringify!($name),
                            s,
                            allowed.join(", ")
                        ))
                    })
            }
        }
    };
}

choice_enum! {
    /// ATT&CK platform filter for group heat maps
    Platform {
        All => "all",
        Windows => "Windows",
        Linux => "Linux",
        MacOs => "macOS",
        Office365 => "Office 365",
        AzureAd => "Azure AD",
        GoogleWorkspace => "Google Workspace",
        SaaS => "SaaS",
        IaaS => "IaaS",
        Network => "Network",
        Containers => "Containers",
        Pre => "PRE",
    }
}

choice_enum! {
    /// Kill-chain stage for group heat maps
    Stage {
        Attack => "attack",
        PreAttack => "pre-attack",
    }
}

choice_enum! {
    /// What a group heat map is overlaid with
    OverlayType {
        Group => "group",
        Visibility => "visibility",
        Detection => "detection",
    }
}

choice_enum! {
    /// ATT&CK domain for mitigation statistics
    MitigationDomain {
        Enterprise => "enterprise",
        Mobile => "mobile",
    }
}

choice_enum! {
    /// Object family listed by the updates report
    UpdateKind {
        Techniques => "techniques",
        Groups => "groups",
        Software => "software",
    }
}

choice_enum! {
    /// Date field the updates report is sorted on
    SortKey {
        Modified => "modified",
        Created => "created",
    }
}

/// Group mode options
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupOptions {
    /// `all`, a comma-separated list of IDs/names/aliases, or a group YAML path
    pub groups: String,
    /// Overlay groups, or a technique administration path for
    /// visibility/detection overlays
    pub overlay: Option<String>,
    pub overlay_type: OverlayType,
    pub software_group: bool,
    pub platform: Platform,
    pub stage: Stage,
}

impl Default for GroupOptions {
    fn default() -> Self {
        Self {
            groups: "all".to_string(),
            overlay: None,
            overlay_type: OverlayType::Group,
            software_group: false,
            platform: Platform::Windows,
            stage: Stage::Attack,
        }
    }
}

/// Generic mode: which statistics reporter runs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Statistics {
    /// Technique count per ATT&CK data source
    DataSources,
    /// Technique count per mitigation for one ATT&CK domain
    Mitigations(MitigationDomain),
    /// Release dates of techniques, groups or software
    Updates { kind: UpdateKind, sort: SortKey },
}

/// Parsed invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModeRequest {
    pub mode: Mode,
    pub outputs: BTreeSet<Output>,
    pub file_ds: Option<PathBuf>,
    pub file_tech: Option<PathBuf>,
    pub queries: Option<QuerySet>,
    pub group: GroupOptions,
    pub statistics: Option<Statistics>,
}

impl ModeRequest {
    pub fn new(mode: Mode) -> Self {
        Self {
            mode,
            outputs: BTreeSet::new(),
            file_ds: None,
            file_tech: None,
            queries: None,
            group: GroupOptions::default(),
            statistics: None,
        }
    }

    pub fn with_output(mut self, output: Output) -> Self {
        self.outputs.insert(output);
        self
    }

    pub fn with_outputs(mut self, outputs: impl IntoIterator<Item = Output>) -> Self {
        self.outputs.extend(outputs);
        self
    }

    pub fn with_file_ds(mut self, path: impl Into<PathBuf>) -> Self {
        self.file_ds = Some(path.into());
        self
    }

    pub fn with_file_tech(mut self, path: impl Into<PathBuf>) -> Self {
        self.file_tech = Some(path.into());
        self
    }

    pub fn with_queries(mut self, queries: Option<QuerySet>) -> Self {
        self.queries = queries;
        self
    }

    pub fn with_group(mut self, group: GroupOptions) -> Self {
        self.group = group;
        self
    }

    pub fn with_statistics(mut self, statistics: Statistics) -> Self {
        self.statistics = Some(statistics);
        self
    }

    pub fn requests(&self, output: Output) -> bool {
        self.outputs.contains(&output)
    }

    /// Whether the health check runs alongside validation
    pub fn health(&self) -> bool {
        self.requests(Output::Health)
    }

    /// Supplied path for an artifact kind
    pub fn path_for(&self, kind: ArtifactKind) -> Option<&Path> {
        match kind {
            ArtifactKind::DataSourceAdmin => self.file_ds.as_deref(),
            ArtifactKind::TechniqueAdmin => self.file_tech.as_deref(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_choice_enum_parses_case_insensitively() {
        assert_eq!("windows".parse::<Platform>().unwrap(), Platform::Windows);
        assert_eq!("Azure AD".parse::<Platform>().unwrap(), Platform::AzureAd);
        assert_eq!("PRE-ATTACK".parse::<Stage>().unwrap(), Stage::PreAttack);
    }

    #[test]
    fn test_choice_enum_rejects_unknown_value() {
        let err = "solaris".parse::<Platform>().unwrap_err();
        assert_eq!(err.kind(), DtErrorKind::InvalidInput);
        assert!(err.message().contains("Windows"));
    }

    #[test]
    fn test_query_pair_is_none_without_queries() {
        assert_eq!(QuerySet::pair(None, Some("  ".to_string()), true), None);
        assert!(QuerySet::pair(Some("score == 1".to_string()), None, false).is_some());
        assert_eq!(QuerySet::single(Some(String::new())), None);
    }

    #[test]
    fn test_derived_artifact_keeps_kind_and_base() {
        let base = AdministrationArtifact::supplied("tech.yaml", ArtifactKind::TechniqueAdmin);
        let derived = AdministrationArtifact::derived("cache/tech_filtered.yaml", &base, "abc");

        assert_eq!(derived.kind(), ArtifactKind::TechniqueAdmin);
        assert!(derived.is_derived());
        assert_eq!(
            derived.origin(),
            &ArtifactOrigin::Derived {
                base: PathBuf::from("tech.yaml"),
                digest: "abc".to_string()
            }
        );
        assert_eq!(base.stem(), "tech");
    }

    #[test]
    fn test_request_path_for_kind() {
        let request = ModeRequest::new(Mode::Visibility)
            .with_file_tech("t.yaml")
            .with_output(Output::Health);

        assert_eq!(
            request.path_for(ArtifactKind::TechniqueAdmin),
            Some(Path::new("t.yaml"))
        );
        assert_eq!(request.path_for(ArtifactKind::DataSourceAdmin), None);
        assert!(request.health());
    }

    #[test]
    fn test_mode_dimension() {
        assert_eq!(Mode::Detection.dimension(), Some(ScoreDimension::Detection));
        assert_eq!(Mode::Group.dimension(), None);
        assert_eq!(ScoreDimension::Visibility.other(), ScoreDimension::Detection);
    }
}
