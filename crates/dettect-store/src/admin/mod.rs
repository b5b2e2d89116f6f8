//! Administration files
//!
//! Loading and saving of the data source and technique administration
//! YAML files, and their validation.

pub mod format;
pub mod validation;

use std::fs;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Serialize;

use dettect_core::errors::{DettectError, DtError};
use dettect_core::model::ArtifactKind;

use crate::atomic::atomic_write;
use crate::errors::{serialize_error, yaml_error, Result};

pub use format::{
    DataQuality, DataSourceAdministration, DataSourceEntry, ScoreEntry, ScoreObject,
    TechniqueAdministration, TechniqueEntry,
};

/// Read a file as text
///
/// # Errors
///
/// Returns `NotFound` when the file cannot be read.
pub fn read_text(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|e| {
        DtError::from(DettectError::FileUnreadable {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
        .with_op("read_admin_file")
    })
}

/// Parse text as a raw YAML document
///
/// # Errors
///
/// Returns `ValidationFailed` for malformed YAML.
pub fn parse_value(path: &Path, text: &str) -> Result<serde_yaml::Value> {
    serde_yaml::from_str(text).map_err(|e| yaml_error(path, e))
}

fn load<T: DeserializeOwned>(path: &Path, kind: ArtifactKind) -> Result<T> {
    let text = read_text(path)?;
    let raw = parse_value(path, &text)?;
    let found = raw
        .get("file_type")
        .and_then(|v| v.as_str())
        .unwrap_or_default();
    if found != kind.file_type() {
        return Err(DettectError::FileTypeMismatch {
            path: path.to_path_buf(),
            expected: kind.file_type().to_string(),
            found: found.to_string(),
        }
        .into());
    }
    serde_yaml::from_value(raw).map_err(|e| yaml_error(path, e))
}

/// Load a data source administration file
///
/// # Errors
///
/// Returns an error when the file is unreadable, malformed or of another
/// type.
pub fn load_data_sources(path: &Path) -> Result<DataSourceAdministration> {
    load(path, ArtifactKind::DataSourceAdmin)
}

/// Load a technique administration file
///
/// # Errors
///
/// Returns an error when the file is unreadable, malformed or of another
/// type.
pub fn load_techniques(path: &Path) -> Result<TechniqueAdministration> {
    load(path, ArtifactKind::TechniqueAdmin)
}

/// Visibility or detection objects of a raw technique entry
///
/// A single mapping and a list of mappings are both accepted.
pub(crate) fn score_objects(value: Option<&serde_yaml::Value>) -> Vec<&serde_yaml::Value> {
    match value {
        Some(serde_yaml::Value::Sequence(items)) => items.iter().collect(),
        Some(serde_yaml::Value::Mapping(_)) => value.into_iter().collect(),
        _ => Vec::new(),
    }
}

/// Serialize a document to YAML and write it atomically
///
/// # Errors
///
/// Returns `Serialization` or `Io` errors.
pub fn save<T: Serialize>(path: &Path, document: &T) -> Result<()> {
    let text = serde_yaml::to_string(document).map_err(|e| serialize_error(path, e))?;
    atomic_write(path, text.as_bytes())
}
