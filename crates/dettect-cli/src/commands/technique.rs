//! Visibility and detection modes
//!
//! Both modes share one argument set; the subcommand picks the score
//! dimension.

use clap::Args;
use std::path::PathBuf;

use dettect_core::model::{Mode, ModeRequest, Output, QuerySet};

use super::selected;

#[derive(Debug, Args)]
pub struct TechniqueArgs {
    /// Path to the technique administration YAML file
    #[arg(long, visible_alias = "ft")]
    pub file_tech: Option<PathBuf>,

    /// Path to the data source administration YAML file
    #[arg(long, visible_alias = "fd")]
    pub file_ds: Option<PathBuf>,

    /// Only include detection objects which match the provided query
    #[arg(long, visible_alias = "sd")]
    pub search_detection: Option<String>,

    /// Only include visibility objects which match the provided query
    #[arg(long, visible_alias = "sv")]
    pub search_visibility: Option<String>,

    /// Search against all scores within the score logbook instead of only
    /// the most recent one
    #[arg(long)]
    pub all_scores: bool,

    /// Generate a layer for the ATT&CK Navigator
    #[arg(short, long)]
    pub layer: bool,

    /// Generate a spreadsheet (CSV) with all administrated techniques
    #[arg(short, long)]
    pub excel: bool,

    /// Generate a layer overlaying visibility and detection
    #[arg(short, long)]
    pub overlay: bool,

    /// Generate a graph with the number of scored techniques through time
    #[arg(short, long)]
    pub graph: bool,

    /// Check the YAML file(s) for errors
    #[arg(long)]
    pub health: bool,
}

impl TechniqueArgs {
    pub fn into_request(self, mode: Mode) -> ModeRequest {
        let mut request = ModeRequest::new(mode)
            .with_outputs(selected(&[
                (self.layer, Output::Layer),
                (self.excel, Output::Excel),
                (self.overlay, Output::Overlay),
                (self.graph, Output::Graph),
                (self.health, Output::Health),
            ]))
            .with_queries(QuerySet::pair(
                self.search_visibility,
                self.search_detection,
                self.all_scores,
            ));
        request.file_tech = self.file_tech;
        request.file_ds = self.file_ds;
        request
    }
}
