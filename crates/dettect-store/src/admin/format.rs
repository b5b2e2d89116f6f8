//! Administration file formats
//!
//! Typed views over the technique and data source administration YAML
//! files. Unknown keys are kept in `extra` so rewriting a file (the
//! updater) does not drop operator-maintained fields.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};
use serde_yaml::Value;

/// Treat an explicit YAML `null` like an absent key
fn null_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

/// Accept either a single mapping or a list of mappings
fn one_or_many<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(match Option::<OneOrMany<T>>::deserialize(deserializer)? {
        None => Vec::new(),
        Some(OneOrMany::One(item)) => vec![item],
        Some(OneOrMany::Many(items)) => items,
    })
}

/// Parse a `YYYY-MM-DD` date as written in administration files
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").ok()
}

/// Data source administration file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataSourceAdministration {
    pub version: Value,
    pub file_type: String,
    #[serde(default, deserialize_with = "null_default")]
    pub name: String,
    #[serde(default)]
    pub platform: Value,
    #[serde(default, deserialize_with = "null_default")]
    pub data_sources: Vec<DataSourceEntry>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl DataSourceAdministration {
    /// Entries available for data analytics
    pub fn available(&self) -> impl Iterator<Item = &DataSourceEntry> {
        self.data_sources
            .iter()
            .filter(|ds| ds.available_for_data_analytics)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataSourceEntry {
    pub data_source_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_registered: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_connected: Option<String>,
    #[serde(default, deserialize_with = "null_default")]
    pub products: Vec<String>,
    #[serde(default, deserialize_with = "null_default")]
    pub available_for_data_analytics: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(default, deserialize_with = "null_default")]
    pub data_quality: DataQuality,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl DataSourceEntry {
    /// Connection date, falling back to the registration date
    pub fn connected_on(&self) -> Option<NaiveDate> {
        self.date_connected
            .as_deref()
            .and_then(parse_date)
            .or_else(|| self.date_registered.as_deref().and_then(parse_date))
    }
}

/// Data quality dimensions, each scored 0..=5
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataQuality {
    #[serde(default, deserialize_with = "null_default")]
    pub device_completeness: u8,
    #[serde(default, deserialize_with = "null_default")]
    pub data_field_completeness: u8,
    #[serde(default, deserialize_with = "null_default")]
    pub timeliness: u8,
    #[serde(default, deserialize_with = "null_default")]
    pub consistency: u8,
    #[serde(default, deserialize_with = "null_default")]
    pub retention: u8,
}

impl DataQuality {
    pub const DIMENSIONS: [&'static str; 5] = [
        "device_completeness",
        "data_field_completeness",
        "timeliness",
        "consistency",
        "retention",
    ];

    /// Average over the dimensions, or 0 when none is scored
    pub fn average(&self) -> f64 {
        let scores = [
            self.device_completeness,
            self.data_field_completeness,
            self.timeliness,
            self.consistency,
            self.retention,
        ];
        let scored: Vec<f64> = scores.iter().filter(|s| **s > 0).map(|s| *s as f64).collect();
        if scored.is_empty() {
            0.0
        } else {
            scored.iter().sum::<f64>() / scored.len() as f64
        }
    }
}

/// Technique administration file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TechniqueAdministration {
    pub version: Value,
    pub file_type: String,
    #[serde(default, deserialize_with = "null_default")]
    pub name: String,
    #[serde(default)]
    pub platform: Value,
    #[serde(default, deserialize_with = "null_default")]
    pub techniques: Vec<TechniqueEntry>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TechniqueEntry {
    pub technique_id: String,
    #[serde(default, deserialize_with = "null_default")]
    pub technique_name: String,
    #[serde(default, deserialize_with = "one_or_many")]
    pub detection: Vec<ScoreObject>,
    #[serde(default, deserialize_with = "one_or_many")]
    pub visibility: Vec<ScoreObject>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl TechniqueEntry {
    pub fn objects(&self, dimension: dettect_core::model::ScoreDimension) -> &[ScoreObject] {
        match dimension {
            dettect_core::model::ScoreDimension::Visibility => &self.visibility,
            dettect_core::model::ScoreDimension::Detection => &self.detection,
        }
    }

    /// Highest latest score across the objects of one dimension
    pub fn max_score(&self, dimension: dettect_core::model::ScoreDimension) -> Option<i64> {
        self.objects(dimension)
            .iter()
            .filter_map(|o| o.latest().and_then(|e| e.score))
            .max()
    }
}

/// One visibility or detection object
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreObject {
    #[serde(default, deserialize_with = "null_default")]
    pub applicable_to: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(default, deserialize_with = "null_default")]
    pub score_logbook: Vec<ScoreEntry>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl ScoreObject {
    /// Most recent logbook entry (by date; undated entries lose)
    pub fn latest(&self) -> Option<&ScoreEntry> {
        let mut best: Option<&ScoreEntry> = None;
        for entry in &self.score_logbook {
            best = match best {
                None => Some(entry),
                Some(current) if entry.parsed_date() > current.parsed_date() => Some(entry),
                keep => keep,
            };
        }
        best
    }
}

/// One entry of a `score_logbook`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_generated: Option<bool>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl ScoreEntry {
    pub fn parsed_date(&self) -> Option<NaiveDate> {
        self.date.as_deref().and_then(parse_date)
    }

    pub fn is_auto_generated(&self) -> bool {
        self.auto_generated.unwrap_or(false)
    }
}
