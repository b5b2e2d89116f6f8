//! Subcommand arguments and the session that runs them

pub mod datasource;
pub mod generic;
pub mod group;
pub mod interactive;
pub mod session;
pub mod technique;

use std::path::PathBuf;
use std::str::FromStr;

use clap::{Args, ValueEnum};

use dettect_core::logging_facility::Profile;
use dettect_core::model::Output;
use dettect_core::DtError;

/// Options shared by every subcommand
#[derive(Debug, Clone, Args)]
pub struct GlobalArgs {
    /// Directory holding `cache/` and `output/`
    #[arg(long, global = true, env = "DETTECT_ROOT", default_value = ".")]
    pub root: PathBuf,

    /// Directory holding the ATT&CK STIX bundles (default: <root>/cache)
    #[arg(long, global = true, env = "DETTECT_KB_DIR")]
    pub knowledge_base: Option<PathBuf>,

    /// Log output format
    #[arg(
        long,
        global = true,
        env = "DETTECT_LOG_FORMAT",
        value_enum,
        default_value = "pretty"
    )]
    pub log_format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Pretty,
    Json,
}

impl LogFormat {
    pub fn profile(&self) -> Profile {
        match self {
            LogFormat::Pretty => Profile::Console,
            LogFormat::Json => Profile::Production,
        }
    }
}

/// Outputs whose flag was set
fn selected(flags: &[(bool, Output)]) -> Vec<Output> {
    flags
        .iter()
        .filter(|(on, _)| *on)
        .map(|(_, output)| *output)
        .collect()
}

/// clap value parser for the choice enums of the model
fn parse_choice<T>(s: &str) -> Result<T, String>
where
    T: FromStr<Err = DtError>,
{
    s.parse::<T>().map_err(|e| e.message().to_string())
}
