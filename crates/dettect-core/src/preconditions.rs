//! Precondition table
//!
//! Maps each mode to the administration files it needs and the outputs
//! that make them mandatory. Rows are checked in declared order; the
//! dispatcher resolves every row's path before it validates anything.

use std::collections::BTreeSet;

use crate::model::{ArtifactKind, Mode, Output, OverlayType};

/// When a requirement applies
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// Whenever the mode runs
    Always,
    /// Only when one of these outputs is requested
    AnyOf(&'static [Output]),
}

/// One row of the precondition table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Requirement {
    pub kind: ArtifactKind,
    pub trigger: Trigger,
}

impl Requirement {
    /// Whether this row applies to the requested outputs
    pub fn applies(&self, outputs: &BTreeSet<Output>) -> bool {
        match self.trigger {
            Trigger::Always => true,
            Trigger::AnyOf(triggers) => triggers.iter().any(|o| outputs.contains(o)),
        }
    }

    /// Requested outputs that triggered this row (empty for `Always`)
    pub fn triggered_by(&self, outputs: &BTreeSet<Output>) -> Vec<Output> {
        match self.trigger {
            Trigger::Always => Vec::new(),
            Trigger::AnyOf(triggers) => triggers
                .iter()
                .copied()
                .filter(|o| outputs.contains(o))
                .collect(),
        }
    }
}

const DATA_SOURCE_REQUIREMENTS: &[Requirement] = &[
    Requirement {
        kind: ArtifactKind::DataSourceAdmin,
        trigger: Trigger::Always,
    },
    Requirement {
        kind: ArtifactKind::TechniqueAdmin,
        trigger: Trigger::AnyOf(&[Output::Update]),
    },
];

/// The data source file comes first: when a layer or overlay needs it and
/// it is missing, nothing else is looked at.
const TECHNIQUE_REQUIREMENTS: &[Requirement] = &[
    Requirement {
        kind: ArtifactKind::DataSourceAdmin,
        trigger: Trigger::AnyOf(&[Output::Layer, Output::Overlay]),
    },
    Requirement {
        kind: ArtifactKind::TechniqueAdmin,
        trigger: Trigger::Always,
    },
];

/// Precondition rows of a mode
///
/// Group mode has no rows; its overlay file is covered by
/// [`overlay_requirement`]. Generic mode reads only the knowledge base.
pub fn requirements(mode: Mode) -> &'static [Requirement] {
    match mode {
        Mode::DataSource => DATA_SOURCE_REQUIREMENTS,
        Mode::Visibility | Mode::Detection => TECHNIQUE_REQUIREMENTS,
        Mode::Group | Mode::Generic => &[],
    }
}

/// Kind the group overlay file must validate as, if any
pub fn overlay_requirement(overlay_type: OverlayType) -> Option<ArtifactKind> {
    match overlay_type {
        OverlayType::Group => None,
        OverlayType::Visibility | OverlayType::Detection => Some(ArtifactKind::TechniqueAdmin),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outputs(list: &[Output]) -> BTreeSet<Output> {
        list.iter().copied().collect()
    }

    fn applicable(mode: Mode, list: &[Output]) -> Vec<ArtifactKind> {
        let requested = outputs(list);
        requirements(mode)
            .iter()
            .filter(|r| r.applies(&requested))
            .map(|r| r.kind)
            .collect()
    }

    #[test]
    fn test_data_source_mode() {
        assert_eq!(
            applicable(Mode::DataSource, &[Output::Layer]),
            vec![ArtifactKind::DataSourceAdmin]
        );
        assert_eq!(
            applicable(Mode::DataSource, &[Output::Update]),
            vec![ArtifactKind::DataSourceAdmin, ArtifactKind::TechniqueAdmin]
        );
    }

    #[test]
    fn test_technique_modes() {
        for mode in [Mode::Visibility, Mode::Detection] {
            assert_eq!(
                applicable(mode, &[Output::Graph, Output::Excel]),
                vec![ArtifactKind::TechniqueAdmin]
            );
            assert_eq!(
                applicable(mode, &[Output::Overlay]),
                vec![ArtifactKind::DataSourceAdmin, ArtifactKind::TechniqueAdmin]
            );
        }
    }

    #[test]
    fn test_group_and_generic_have_no_rows() {
        assert!(requirements(Mode::Group).is_empty());
        assert!(requirements(Mode::Generic).is_empty());
        assert_eq!(overlay_requirement(OverlayType::Group), None);
        assert_eq!(
            overlay_requirement(OverlayType::Detection),
            Some(ArtifactKind::TechniqueAdmin)
        );
    }

    #[test]
    fn test_triggered_by_lists_requested_triggers_only() {
        let row = TECHNIQUE_REQUIREMENTS[0];
        assert_eq!(
            row.triggered_by(&outputs(&[Output::Overlay, Output::Graph])),
            vec![Output::Overlay]
        );
        assert!(DATA_SOURCE_REQUIREMENTS[0]
            .triggered_by(&outputs(&[Output::Layer]))
            .is_empty());
    }
}
