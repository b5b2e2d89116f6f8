//! Data source mode
//!
//! Usage: dettect datasource --file-ds <FILE> [-l] [-e] [-g] [-y] [-u --file-tech <FILE>]

use clap::Args;
use std::path::PathBuf;

use dettect_core::model::{Mode, ModeRequest, Output, QuerySet};

use super::selected;

#[derive(Debug, Args)]
pub struct DataSourceArgs {
    /// Path to the data source administration YAML file
    #[arg(long, visible_alias = "fd")]
    pub file_ds: Option<PathBuf>,

    /// Path to the technique administration YAML file (used to update
    /// visibility scores)
    #[arg(long, visible_alias = "ft")]
    pub file_tech: Option<PathBuf>,

    /// Only include data sources which match the provided query
    #[arg(short, long)]
    pub search: Option<String>,

    /// Generate a data source layer for the ATT&CK Navigator
    #[arg(short, long)]
    pub layer: bool,

    /// Generate a spreadsheet (CSV) with all data sources
    #[arg(short, long)]
    pub excel: bool,

    /// Generate a graph with data sources added through time
    #[arg(short, long)]
    pub graph: bool,

    /// Generate a technique administration YAML file with visibility scores
    /// based on the number of available data sources
    #[arg(short, long)]
    pub yaml: bool,

    /// Update visibility scores within a technique administration YAML file
    /// based on changes within any of the data sources
    #[arg(short, long)]
    pub update: bool,

    /// Check the YAML file(s) for errors
    #[arg(long)]
    pub health: bool,
}

impl DataSourceArgs {
    pub fn into_request(self) -> ModeRequest {
        let mut request = ModeRequest::new(Mode::DataSource)
            .with_outputs(selected(&[
                (self.layer, Output::Layer),
                (self.excel, Output::Excel),
                (self.graph, Output::Graph),
                (self.yaml, Output::Yaml),
                (self.update, Output::Update),
                (self.health, Output::Health),
            ]))
            .with_queries(QuerySet::single(self.search));
        request.file_ds = self.file_ds;
        request.file_tech = self.file_tech;
        request
    }
}
