//! Group heat maps
//!
//! Scores each technique by the number of selected groups using it. The
//! overlay marks techniques of other groups, or techniques scored in a
//! technique administration file.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use serde::Deserialize;

use dettect_core::errors::DettectError;
use dettect_core::model::{GroupOptions, OverlayType, ScoreDimension};
use dettect_store::admin::{parse_value, read_text, TechniqueAdministration};
use dettect_store::errors::{yaml_error, Result};
use dettect_store::knowledge::{AttackObject, KnowledgeBase};

use crate::layer::{Gradient, Layer, LayerTechnique};

pub const GROUP_ADMIN_FILE_TYPE: &str = "group-administration";

const GRADIENT: [&str; 2] = ["#ffcece", "#ff0000"];
const OVERLAY_COLOR: &str = "#1f77b4";
const BOTH_COLOR: &str = "#9467bd";

/// Group administration file: custom groups with their own techniques
#[derive(Debug, Clone, Deserialize)]
pub struct GroupAdministration {
    pub file_type: String,
    #[serde(default)]
    pub groups: Vec<CustomGroup>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CustomGroup {
    pub group_name: String,
    #[serde(default)]
    pub technique_id: Vec<String>,
    #[serde(default)]
    pub software_id: Vec<String>,
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
}

fn enabled_by_default() -> bool {
    true
}

/// Techniques of one selected group
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupTechniques {
    pub name: String,
    pub techniques: BTreeSet<String>,
}

fn is_group_file(selector: &str) -> bool {
    let lower = selector.trim().to_ascii_lowercase();
    (lower.ends_with(".yaml") || lower.ends_with(".yml")) && Path::new(selector.trim()).is_file()
}

fn load_group_file(
    path: &Path,
    kb: &KnowledgeBase,
    software_group: bool,
) -> Result<Vec<GroupTechniques>> {
    let text = read_text(path)?;
    let raw = parse_value(path, &text)?;
    let admin: GroupAdministration = serde_yaml::from_value(raw).map_err(|e| yaml_error(path, e))?;
    if admin.file_type != GROUP_ADMIN_FILE_TYPE {
        return Err(DettectError::FileTypeMismatch {
            path: path.to_path_buf(),
            expected: GROUP_ADMIN_FILE_TYPE.to_string(),
            found: admin.file_type,
        }
        .into());
    }

    Ok(admin
        .groups
        .into_iter()
        .filter(|g| g.enabled)
        .map(|g| {
            let mut techniques: BTreeSet<String> =
                g.technique_id.iter().map(|t| t.to_uppercase()).collect();
            if software_group {
                for software_id in &g.software_id {
                    if let Some(software) = kb
                        .objects(dettect_store::knowledge::ObjectKind::Software)
                        .find(|s| s.is_known_as(software_id))
                    {
                        techniques.extend(kb.techniques_used_by(software));
                    }
                }
            }
            GroupTechniques {
                name: g.group_name,
                techniques,
            }
        })
        .collect())
}

fn group_techniques(
    kb: &KnowledgeBase,
    group: &AttackObject,
    software_group: bool,
) -> GroupTechniques {
    let mut techniques = kb.techniques_used_by(group);
    if software_group {
        for software in kb.software_used_by(group) {
            techniques.extend(kb.techniques_used_by(software));
        }
    }
    GroupTechniques {
        name: group.name.clone(),
        techniques,
    }
}

/// Resolve a selector (`all`, a list of IDs/names/aliases, or a group file)
///
/// # Errors
///
/// Returns `InvalidInput` for unknown groups and validation errors for a
/// malformed group file.
pub fn select_groups(
    kb: &KnowledgeBase,
    selector: &str,
    software_group: bool,
) -> Result<Vec<GroupTechniques>> {
    if is_group_file(selector) {
        return load_group_file(Path::new(selector.trim()), kb, software_group);
    }
    Ok(kb
        .resolve_groups(selector)?
        .into_iter()
        .map(|g| group_techniques(kb, g, software_group))
        .collect())
}

/// Techniques of the overlay: another group selection, or the techniques
/// scored above zero in a technique administration file
pub enum Overlay<'a> {
    None,
    Groups(Vec<GroupTechniques>),
    Scores(ScoreDimension, &'a TechniqueAdministration),
}

impl Overlay<'_> {
    fn techniques(&self) -> BTreeSet<String> {
        match self {
            Overlay::None => BTreeSet::new(),
            Overlay::Groups(groups) => groups
                .iter()
                .flat_map(|g| g.techniques.iter().cloned())
                .collect(),
            Overlay::Scores(dimension, admin) => admin
                .techniques
                .iter()
                .filter(|t| t.max_score(*dimension).is_some_and(|s| s > 0))
                .map(|t| t.technique_id.to_uppercase())
                .collect(),
        }
    }
}

/// Dimension scored by a visibility/detection overlay
pub fn overlay_dimension(overlay_type: OverlayType) -> Option<ScoreDimension> {
    match overlay_type {
        OverlayType::Group => None,
        OverlayType::Visibility => Some(ScoreDimension::Visibility),
        OverlayType::Detection => Some(ScoreDimension::Detection),
    }
}

/// File-safe name derived from the group selector
pub fn file_safe(selector: &str) -> String {
    let stem = Path::new(selector.trim())
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let base = if is_group_file(selector) { stem } else { selector.trim().to_string() };
    let mut safe: String = base
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '_' })
        .collect();
    while safe.contains("__") {
        safe = safe.replace("__", "_");
    }
    let safe = safe.trim_matches('_').to_string();
    if safe.is_empty() {
        "groups".to_string()
    } else {
        safe
    }
}

/// Build the heat map layer
pub fn heat_map(
    kb: &KnowledgeBase,
    options: &GroupOptions,
    groups: &[GroupTechniques],
    overlay: &Overlay<'_>,
) -> Layer {
    let in_scope = |technique_id: &str| {
        kb.technique(technique_id).map_or(true, |t| {
            t.on_platform(options.platform) && t.in_stage(options.stage)
        })
    };

    let mut users: BTreeMap<String, Vec<&str>> = BTreeMap::new();
    for group in groups {
        for technique in group.techniques.iter().filter(|t| in_scope(t)) {
            users.entry(technique.clone()).or_default().push(&group.name);
        }
    }
    let overlay_techniques: BTreeSet<String> = overlay
        .techniques()
        .into_iter()
        .filter(|t| in_scope(t))
        .collect();

    let names: Vec<&str> = groups.iter().map(|g| g.name.as_str()).collect();
    let mut layer = Layer::new(
        format!("Groups {}", options.groups.trim()),
        format!(
            "Techniques used by {} ({}, {})",
            names.join(", "),
            options.platform,
            options.stage
        ),
    );
    if options.platform != dettect_core::model::Platform::All {
        layer = layer.with_platforms(vec![options.platform.name().to_string()]);
    }
    let max = users.values().map(Vec::len).max().unwrap_or(0) as i64;
    layer.gradient = Some(Gradient {
        colors: GRADIENT.iter().map(|c| c.to_string()).collect(),
        min_value: 0,
        max_value: max.max(1),
    });
    if !matches!(overlay, Overlay::None) {
        layer = layer
            .legend("Overlay", OVERLAY_COLOR)
            .legend("Groups and overlay", BOTH_COLOR);
    }

    for (technique_id, group_names) in &users {
        let mut entry = LayerTechnique::new(technique_id)
            .with_score(group_names.len() as i64)
            .with_metadata("Groups", group_names.join(", "));
        if overlay_techniques.contains(technique_id) {
            entry = entry.with_color(BOTH_COLOR);
        }
        layer.techniques.push(entry);
    }
    for technique_id in overlay_techniques.iter().filter(|t| !users.contains_key(*t)) {
        layer
            .techniques
            .push(LayerTechnique::new(technique_id).with_color(OVERLAY_COLOR));
    }
    layer
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_safe_names() {
        assert_eq!(file_safe("all"), "all");
        assert_eq!(file_safe("APT28, G0016"), "apt28_g0016");
        assert_eq!(file_safe(" , "), "groups");
    }

    #[test]
    fn test_overlay_dimension() {
        assert_eq!(overlay_dimension(OverlayType::Group), None);
        assert_eq!(
            overlay_dimension(OverlayType::Detection),
            Some(ScoreDimension::Detection)
        );
    }

    #[test]
    fn test_heat_map_counts_groups_and_marks_overlay() {
        let kb = KnowledgeBase::default();
        let groups = vec![
            GroupTechniques {
                name: "A".into(),
                techniques: BTreeSet::from(["T1003".to_string(), "T1055".to_string()]),
            },
            GroupTechniques {
                name: "B".into(),
                techniques: BTreeSet::from(["T1003".to_string()]),
            },
        ];
        let overlay = Overlay::Groups(vec![GroupTechniques {
            name: "C".into(),
            techniques: BTreeSet::from(["T1055".to_string(), "T1592".to_string()]),
        }]);

        let layer = heat_map(&kb, &GroupOptions::default(), &groups, &overlay);

        let by_id: BTreeMap<&str, &LayerTechnique> = layer
            .techniques
            .iter()
            .map(|t| (t.technique_id.as_str(), t))
            .collect();
        assert_eq!(by_id["T1003"].score, Some(2));
        assert_eq!(by_id["T1055"].color, BOTH_COLOR);
        assert_eq!(by_id["T1592"].color, OVERLAY_COLOR);
        assert_eq!(by_id["T1592"].score, None);
        assert_eq!(layer.gradient.as_ref().unwrap().max_value, 2);
    }
}
