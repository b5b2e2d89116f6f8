//! Threat actor group mode

use clap::Args;

use dettect_core::model::{
    GroupOptions, Mode, ModeRequest, Output, OverlayType, Platform, QuerySet, Stage,
};

use super::{parse_choice, selected};

#[derive(Debug, Args)]
pub struct GroupArgs {
    /// Groups to include: 'all', a comma-separated list of group IDs, names
    /// or aliases, or a group administration YAML file
    #[arg(short, long, default_value = "all")]
    pub groups: String,

    /// Groups to overlay, or a technique administration YAML file for a
    /// visibility or detection overlay
    #[arg(short, long)]
    pub overlay: Option<String>,

    /// What the groups are overlaid with
    #[arg(
        short = 't',
        long,
        default_value = "group",
        value_parser = parse_choice::<OverlayType>
    )]
    pub overlay_type: OverlayType,

    /// Platform to include techniques for
    #[arg(short, long, default_value = "Windows", value_parser = parse_choice::<Platform>)]
    pub platform: Platform,

    /// Kill-chain stage to include techniques for
    #[arg(short, long, default_value = "attack", value_parser = parse_choice::<Stage>)]
    pub stage: Stage,

    /// Add techniques of the software used by a group
    #[arg(long)]
    pub software_group: bool,

    /// Only include detection objects of the overlay which match the query
    #[arg(long, visible_alias = "sd")]
    pub search_detection: Option<String>,

    /// Only include visibility objects of the overlay which match the query
    #[arg(long, visible_alias = "sv")]
    pub search_visibility: Option<String>,

    /// Search against all scores within the score logbook
    #[arg(long)]
    pub all_scores: bool,

    /// Check the YAML file for errors
    #[arg(long)]
    pub health: bool,
}

impl GroupArgs {
    pub fn into_request(self) -> ModeRequest {
        ModeRequest::new(Mode::Group)
            .with_outputs(selected(&[(self.health, Output::Health)]))
            .with_group(GroupOptions {
                groups: self.groups,
                overlay: self.overlay,
                overlay_type: self.overlay_type,
                software_group: self.software_group,
                platform: self.platform,
                stage: self.stage,
            })
            .with_queries(QuerySet::pair(
                self.search_visibility,
                self.search_detection,
                self.all_scores,
            ))
    }
}
