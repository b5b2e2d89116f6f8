//! Output Execution Plan
//!
//! Each mode declares an ordered list of candidate steps, each gated by the
//! output that requests it. Only requested steps run, always in declared
//! order. Group and Generic modes run exactly one step regardless of the
//! boolean outputs.

use std::fmt;

use crate::model::{Mode, ModeRequest, Output};

/// One generator call scheduled by the dispatcher
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Step {
    /// Refresh visibility scores of the technique administration file
    UpdateTechniqueAdmin,
    DataSourceLayer,
    DataSourceExcel,
    DataSourceGraph,
    /// Synthesize a technique administration file from data sources
    TechniqueAdminYaml,
    /// Visibility/detection layer; `overlay` combines both dimensions
    TechniqueLayer { overlay: bool },
    TechniqueGraph,
    TechniqueExcel,
    /// Combined group call; filtering happens inside it
    GroupHeatMap,
    Statistics,
}

impl Step {
    pub fn name(&self) -> &'static str {
        match self {
            Step::UpdateTechniqueAdmin => "update_technique_admin",
            Step::DataSourceLayer => "data_source_layer",
            Step::DataSourceExcel => "data_source_excel",
            Step::DataSourceGraph => "data_source_graph",
            Step::TechniqueAdminYaml => "technique_admin_yaml",
            Step::TechniqueLayer { overlay: false } => "technique_layer",
            Step::TechniqueLayer { overlay: true } => "technique_overlay",
            Step::TechniqueGraph => "technique_graph",
            Step::TechniqueExcel => "technique_excel",
            Step::GroupHeatMap => "group_heat_map",
            Step::Statistics => "statistics",
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Update runs first so the remaining steps see the refreshed scores.
const DATA_SOURCE_PLAN: &[(Output, Step)] = &[
    (Output::Update, Step::UpdateTechniqueAdmin),
    (Output::Layer, Step::DataSourceLayer),
    (Output::Excel, Step::DataSourceExcel),
    (Output::Graph, Step::DataSourceGraph),
    (Output::Yaml, Step::TechniqueAdminYaml),
];

const TECHNIQUE_PLAN: &[(Output, Step)] = &[
    (Output::Layer, Step::TechniqueLayer { overlay: false }),
    (Output::Overlay, Step::TechniqueLayer { overlay: true }),
    (Output::Graph, Step::TechniqueGraph),
    (Output::Excel, Step::TechniqueExcel),
];

/// Ordered candidate steps of a mode, each with its gating output
///
/// Empty for Group and Generic, whose single step is not output-gated.
pub fn candidates(mode: Mode) -> &'static [(Output, Step)] {
    match mode {
        Mode::DataSource => DATA_SOURCE_PLAN,
        Mode::Visibility | Mode::Detection => TECHNIQUE_PLAN,
        Mode::Group | Mode::Generic => &[],
    }
}

/// Outputs a mode accepts; `Health` is accepted by every mode
pub fn accepts(mode: Mode, output: Output) -> bool {
    output == Output::Health || candidates(mode).iter().any(|(o, _)| *o == output)
}

/// Requested outputs the mode has no step for, in output order
pub fn unsupported_outputs(request: &ModeRequest) -> Vec<Output> {
    request
        .outputs
        .iter()
        .copied()
        .filter(|o| !accepts(request.mode, *o))
        .collect()
}

/// Steps to run for a request, in execution order
pub fn steps_for(request: &ModeRequest) -> Vec<Step> {
    match request.mode {
        Mode::Group => vec![Step::GroupHeatMap],
        Mode::Generic => vec![Step::Statistics],
        mode => candidates(mode)
            .iter()
            .filter(|(output, _)| request.requests(*output))
            .map(|(_, step)| *step)
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn all_outputs() -> Vec<Output> {
        vec![
            Output::Layer,
            Output::Excel,
            Output::Graph,
            Output::Yaml,
            Output::Update,
            Output::Overlay,
            Output::Health,
        ]
    }

    #[test]
    fn test_data_source_update_runs_first() {
        let request = ModeRequest::new(Mode::DataSource)
            .with_outputs([Output::Yaml, Output::Layer, Output::Update]);

        assert_eq!(
            steps_for(&request),
            vec![
                Step::UpdateTechniqueAdmin,
                Step::DataSourceLayer,
                Step::TechniqueAdminYaml
            ]
        );
    }

    #[test]
    fn test_technique_plan_layer_before_overlay() {
        let request = ModeRequest::new(Mode::Detection).with_outputs([
            Output::Excel,
            Output::Overlay,
            Output::Layer,
            Output::Graph,
        ]);

        assert_eq!(
            steps_for(&request),
            vec![
                Step::TechniqueLayer { overlay: false },
                Step::TechniqueLayer { overlay: true },
                Step::TechniqueGraph,
                Step::TechniqueExcel
            ]
        );
    }

    #[test]
    fn test_health_alone_schedules_nothing() {
        let request = ModeRequest::new(Mode::Visibility).with_output(Output::Health);
        assert!(steps_for(&request).is_empty());
        assert!(unsupported_outputs(&request).is_empty());
    }

    #[test]
    fn test_group_and_generic_single_step() {
        assert_eq!(
            steps_for(&ModeRequest::new(Mode::Group)),
            vec![Step::GroupHeatMap]
        );
        assert_eq!(
            steps_for(&ModeRequest::new(Mode::Generic)),
            vec![Step::Statistics]
        );
    }

    #[test]
    fn test_unsupported_outputs_per_mode() {
        let request =
            ModeRequest::new(Mode::Visibility).with_outputs([Output::Yaml, Output::Layer]);
        assert_eq!(unsupported_outputs(&request), vec![Output::Yaml]);

        let request = ModeRequest::new(Mode::DataSource).with_output(Output::Overlay);
        assert_eq!(unsupported_outputs(&request), vec![Output::Overlay]);

        let request = ModeRequest::new(Mode::Group).with_output(Output::Layer);
        assert_eq!(unsupported_outputs(&request), vec![Output::Layer]);
    }

    proptest! {
        #[test]
        fn prop_steps_follow_declared_order(mask in 0u8..128) {
            let outputs: Vec<Output> = all_outputs()
                .into_iter()
                .enumerate()
                .filter(|(i, _)| mask & (1 << i) != 0)
                .map(|(_, o)| o)
                .collect();

            for mode in [Mode::DataSource, Mode::Visibility, Mode::Detection] {
                let request = ModeRequest::new(mode).with_outputs(outputs.clone());
                let steps = steps_for(&request);
                let declared: Vec<Step> = candidates(mode).iter().map(|(_, s)| *s).collect();

                // Steps form a subsequence of the declared order
                let mut cursor = declared.iter();
                for step in &steps {
                    prop_assert!(cursor.any(|d| d == step));
                }
                // Exactly the requested candidates are scheduled
                let expected = candidates(mode)
                    .iter()
                    .filter(|(o, _)| outputs.contains(o))
                    .count();
                prop_assert_eq!(steps.len(), expected);
            }
        }
    }
}
