//! Generic mode: statistics printed to stdout

use clap::{ArgGroup, Args};

use dettect_core::model::{
    MitigationDomain, Mode, ModeRequest, SortKey, Statistics, UpdateKind,
};

use super::parse_choice;

#[derive(Debug, Args)]
#[command(group(
    ArgGroup::new("statistics")
        .args(["datasources", "mitigations", "updates"])
        .multiple(false)
))]
pub struct GenericArgs {
    /// Number of techniques per data source
    #[arg(long, visible_alias = "ds")]
    pub datasources: bool,

    /// Number of techniques per mitigation for an ATT&CK domain
    #[arg(short, long, value_parser = parse_choice::<MitigationDomain>)]
    pub mitigations: Option<MitigationDomain>,

    /// Release dates of techniques, groups or software
    #[arg(short, long, value_parser = parse_choice::<UpdateKind>)]
    pub updates: Option<UpdateKind>,

    /// Date field the updates are sorted on
    #[arg(long, default_value = "modified", value_parser = parse_choice::<SortKey>)]
    pub sort: SortKey,
}

impl GenericArgs {
    pub fn into_request(self) -> ModeRequest {
        let request = ModeRequest::new(Mode::Generic);
        let statistics = if self.datasources {
            Some(Statistics::DataSources)
        } else if let Some(domain) = self.mitigations {
            Some(Statistics::Mitigations(domain))
        } else {
            self.updates.map(|kind| Statistics::Updates {
                kind,
                sort: self.sort,
            })
        };

        match statistics {
            Some(statistics) => request.with_statistics(statistics),
            None => request,
        }
    }
}
