//! Command-line surface

use clap::{Parser, Subcommand};

use dettect_core::model::{Mode, ModeRequest};

use crate::commands::{datasource, generic, group, technique, GlobalArgs};

#[derive(Debug, Parser)]
#[command(name = "dettect", version)]
#[command(
    about = "DeTTECT - Detect Tactics, Techniques & Combat Threats",
    long_about = None
)]
pub struct Cli {
    /// Launch the interactive session, which supports all modes
    #[arg(short, long)]
    pub interactive: bool,

    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Data source mapping and quality
    #[command(name = "datasource", visible_alias = "ds")]
    DataSource(datasource::DataSourceArgs),
    /// Visibility coverage mapping based on techniques and data sources
    #[command(visible_alias = "v")]
    Visibility(technique::TechniqueArgs),
    /// Detection coverage mapping based on techniques
    #[command(visible_alias = "d")]
    Detection(technique::TechniqueArgs),
    /// Threat actor group mapping
    #[command(visible_alias = "g")]
    Group(group::GroupArgs),
    /// Generic functions which will output to stdout
    #[command(visible_alias = "ge")]
    Generic(generic::GenericArgs),
}

impl Commands {
    pub fn into_request(self) -> ModeRequest {
        match self {
            Commands::DataSource(args) => args.into_request(),
            Commands::Visibility(args) => args.into_request(Mode::Visibility),
            Commands::Detection(args) => args.into_request(Mode::Detection),
            Commands::Group(args) => args.into_request(),
            Commands::Generic(args) => args.into_request(),
        }
    }
}
