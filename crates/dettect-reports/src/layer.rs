//! ATT&CK Navigator layers
//!
//! Serde model of the Navigator layer format and the builders for the data
//! source, visibility/detection and overlay layers.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Serialize;

use dettect_core::model::ScoreDimension;
use dettect_store::admin::{TechniqueAdministration, TechniqueEntry};
use dettect_store::atomic::atomic_write;
use dettect_store::errors::{serialize_error, Result};

use crate::scoring::TechniqueCoverage;

const ATTACK_VERSION: &str = "10";
const NAVIGATOR_VERSION: &str = "4.5.5";
const LAYER_VERSION: &str = "4.3";
const DOMAIN: &str = "enterprise-attack";

const DATA_SOURCE_COLORS: [&str; 5] = ["", "#d9e6f2", "#9ecae1", "#4292c6", "#08519c"];
const VISIBILITY_COLORS: [&str; 5] = ["", "#c7e9c0", "#74c476", "#31a354", "#006d2c"];
const DETECTION_COLORS: [&str; 6] = [
    "#d9d9d9", "#fcc5c0", "#fa9fb5", "#f768a1", "#c51b8a", "#7a0177",
];

pub const OVERLAY_VISIBILITY_ONLY: &str = "#3182bd";
pub const OVERLAY_DETECTION_ONLY: &str = "#e6550d";
pub const OVERLAY_BOTH: &str = "#31a354";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Versions {
    pub attack: String,
    pub navigator: String,
    pub layer: String,
}

impl Default for Versions {
    fn default() -> Self {
        Self {
            attack: ATTACK_VERSION.to_string(),
            navigator: NAVIGATOR_VERSION.to_string(),
            layer: LAYER_VERSION.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Metadata {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LayerTechnique {
    #[serde(rename = "techniqueID")]
    pub technique_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<i64>,
    pub color: String,
    pub comment: String,
    pub enabled: bool,
    pub metadata: Vec<Metadata>,
}

impl LayerTechnique {
    pub fn new(technique_id: impl Into<String>) -> Self {
        Self {
            technique_id: technique_id.into(),
            score: None,
            color: String::new(),
            comment: String::new(),
            enabled: true,
            metadata: Vec::new(),
        }
    }

    pub fn with_score(mut self, score: i64) -> Self {
        self.score = Some(score);
        self
    }

    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = color.into();
        self
    }

    pub fn with_metadata(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.push(Metadata {
            name: name.into(),
            value: value.into(),
        });
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LegendItem {
    pub label: String,
    pub color: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Gradient {
    pub colors: Vec<String>,
    #[serde(rename = "minValue")]
    pub min_value: i64,
    #[serde(rename = "maxValue")]
    pub max_value: i64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Filters {
    pub platforms: Vec<String>,
}

/// A Navigator layer file
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Layer {
    pub name: String,
    pub versions: Versions,
    pub domain: String,
    pub description: String,
    pub filters: Filters,
    pub techniques: Vec<LayerTechnique>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gradient: Option<Gradient>,
    pub legend_items: Vec<LegendItem>,
    pub hide_disabled: bool,
}

impl Layer {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            versions: Versions::default(),
            domain: DOMAIN.to_string(),
            description: description.into(),
            filters: Filters::default(),
            techniques: Vec::new(),
            gradient: None,
            legend_items: Vec::new(),
            hide_disabled: false,
        }
    }

    pub fn with_platforms(mut self, platforms: Vec<String>) -> Self {
        self.filters.platforms = platforms;
        self
    }

    pub fn legend(mut self, label: impl Into<String>, color: impl Into<String>) -> Self {
        self.legend_items.push(LegendItem {
            label: label.into(),
            color: color.into(),
        });
        self
    }

    /// Write the layer as pretty JSON
    ///
    /// # Errors
    ///
    /// Returns `Serialization` or `Io` errors.
    pub fn write(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_vec_pretty(self).map_err(|e| serialize_error(path, e))?;
        atomic_write(path, &json)
    }
}

/// Platforms declared in an administration file (`platform` key)
pub fn declared_platforms(value: &serde_yaml::Value) -> Vec<String> {
    match value {
        serde_yaml::Value::String(single) => vec![single.clone()],
        serde_yaml::Value::Sequence(items) => items
            .iter()
            .filter_map(|v| v.as_str().map(str::to_string))
            .collect(),
        _ => Vec::new(),
    }
}

fn color(palette: &[&str], index: i64) -> String {
    usize::try_from(index)
        .ok()
        .and_then(|i| palette.get(i))
        .map(|c| c.to_string())
        .unwrap_or_default()
}

/// Colour for a score of one dimension
pub fn score_color(dimension: ScoreDimension, score: i64) -> String {
    match dimension {
        ScoreDimension::Visibility => color(&VISIBILITY_COLORS, score),
        ScoreDimension::Detection => color(&DETECTION_COLORS, score),
    }
}

/// Layer of data source coverage per technique
pub fn data_source_layer(
    name: &str,
    platforms: Vec<String>,
    coverage: &BTreeMap<String, TechniqueCoverage>,
) -> Layer {
    let mut layer = Layer::new(
        format!("Data sources {}", name),
        "Technique coverage by the data sources available for analytics",
    )
    .with_platforms(platforms);
    for (label, score) in [
        ("1-49% of data sources available", 1),
        ("50-74%", 2),
        ("75-99%", 3),
        ("100%", 4),
    ] {
        layer = layer.legend(label, color(&DATA_SOURCE_COLORS, score));
    }

    layer.techniques = coverage
        .values()
        .filter(|c| !c.available.is_empty())
        .map(|c| {
            LayerTechnique::new(&c.technique_id)
                .with_score(c.score())
                .with_color(color(&DATA_SOURCE_COLORS, c.score()))
                .with_metadata("Available data sources", c.available.join(", "))
                .with_metadata(
                    "Coverage",
                    format!("{}/{} ({}%)", c.available.len(), c.total, c.percentage()),
                )
        })
        .collect();
    layer
}

fn comments(technique: &TechniqueEntry, dimension: ScoreDimension) -> String {
    technique
        .objects(dimension)
        .iter()
        .filter_map(|o| o.comment.as_deref())
        .filter(|c| !c.trim().is_empty())
        .collect::<Vec<_>>()
        .join(" | ")
}

fn applicable_to(technique: &TechniqueEntry, dimension: ScoreDimension) -> String {
    technique
        .objects(dimension)
        .iter()
        .map(|o| o.applicable_to.join(", "))
        .collect::<Vec<_>>()
        .join(" | ")
}

fn with_data_sources(
    technique: LayerTechnique,
    coverage: Option<&BTreeMap<String, TechniqueCoverage>>,
) -> LayerTechnique {
    match coverage.and_then(|c| c.get(&technique.technique_id)) {
        Some(c) => technique.with_metadata("Available data sources", c.available.join(", ")),
        None => technique,
    }
}

/// Visibility or detection layer from the latest logbook scores
pub fn technique_layer(
    dimension: ScoreDimension,
    admin: &TechniqueAdministration,
    coverage: Option<&BTreeMap<String, TechniqueCoverage>>,
) -> Layer {
    let title = match dimension {
        ScoreDimension::Visibility => "Visibility",
        ScoreDimension::Detection => "Detection",
    };
    let mut layer = Layer::new(
        format!("{} {}", title, admin.name),
        format!("{} scores from the technique administration file", title),
    )
    .with_platforms(declared_platforms(&admin.platform));
    let scores: &[i64] = match dimension {
        ScoreDimension::Visibility => &[1, 2, 3, 4],
        ScoreDimension::Detection => &[0, 1, 2, 3, 4, 5],
    };
    for score in scores {
        layer = layer.legend(format!("{} score {}", title, score), score_color(dimension, *score));
    }

    for technique in &admin.techniques {
        let Some(score) = technique.max_score(dimension).filter(|s| *s >= 0) else {
            continue;
        };
        let entry = LayerTechnique::new(&technique.technique_id)
            .with_score(score)
            .with_color(score_color(dimension, score))
            .with_metadata("Applicable to", applicable_to(technique, dimension));
        let mut entry = with_data_sources(entry, coverage);
        entry.comment = comments(technique, dimension);
        layer.techniques.push(entry);
    }
    layer
}

/// Visibility and detection combined: colour shows which dimension scores
pub fn overlay_layer(
    admin: &TechniqueAdministration,
    coverage: Option<&BTreeMap<String, TechniqueCoverage>>,
) -> Layer {
    let mut layer = Layer::new(
        format!("Visibility and detection {}", admin.name),
        "Visibility and detection scores combined",
    )
    .with_platforms(declared_platforms(&admin.platform))
    .legend("Visibility only", OVERLAY_VISIBILITY_ONLY)
    .legend("Detection only", OVERLAY_DETECTION_ONLY)
    .legend("Visibility and detection", OVERLAY_BOTH);

    for technique in &admin.techniques {
        let visibility = technique
            .max_score(ScoreDimension::Visibility)
            .unwrap_or(0);
        let detection = technique.max_score(ScoreDimension::Detection).unwrap_or(-1);
        let color = match (visibility > 0, detection > 0) {
            (true, true) => OVERLAY_BOTH,
            (true, false) => OVERLAY_VISIBILITY_ONLY,
            (false, true) => OVERLAY_DETECTION_ONLY,
            (false, false) => continue,
        };
        let entry = LayerTechnique::new(&technique.technique_id)
            .with_color(color)
            .with_metadata("Visibility score", visibility.to_string())
            .with_metadata("Detection score", detection.to_string());
        layer.techniques.push(with_data_sources(entry, coverage));
    }
    layer
}
