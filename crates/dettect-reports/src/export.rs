//! Spreadsheet export (CSV)

use std::path::Path;

use dettect_core::model::ScoreDimension;
use dettect_core::Interrupt;
use dettect_store::admin::{DataSourceAdministration, ScoreObject, TechniqueAdministration};
use dettect_store::atomic::atomic_write;
use dettect_store::errors::{serialize_error, Result};

fn finish(path: &Path, writer: csv::Writer<Vec<u8>>) -> Result<()> {
    let bytes = writer
        .into_inner()
        .map_err(|e| serialize_error(path, e.error()))?;
    atomic_write(path, &bytes)
}

/// One row per data source
///
/// # Errors
///
/// Returns `Serialization`, `Io` or `Interrupted` errors.
pub fn export_data_sources(
    path: &Path,
    admin: &DataSourceAdministration,
    interrupt: &Interrupt,
) -> Result<usize> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer
        .write_record([
            "Data source name",
            "Date registered",
            "Date connected",
            "Products",
            "Comment",
            "Available for data analytics",
            "Device completeness",
            "Data field completeness",
            "Timeliness",
            "Consistency",
            "Retention",
        ])
        .map_err(|e| serialize_error(path, e))?;

    for ds in &admin.data_sources {
        interrupt.check("export_data_sources")?;
        let quality = &ds.data_quality;
        writer
            .write_record([
                ds.data_source_name.clone(),
                ds.date_registered.clone().unwrap_or_default(),
                ds.date_connected.clone().unwrap_or_default(),
                ds.products.join(", "),
                ds.comment.clone().unwrap_or_default(),
                ds.available_for_data_analytics.to_string(),
                quality.device_completeness.to_string(),
                quality.data_field_completeness.to_string(),
                quality.timeliness.to_string(),
                quality.consistency.to_string(),
                quality.retention.to_string(),
            ])
            .map_err(|e| serialize_error(path, e))?;
    }

    finish(path, writer)?;
    Ok(admin.data_sources.len())
}

fn latest_fields(object: &ScoreObject) -> [String; 3] {
    match object.latest() {
        Some(entry) => [
            entry.score.map(|s| s.to_string()).unwrap_or_default(),
            entry.date.clone().unwrap_or_default(),
            entry.is_auto_generated().to_string(),
        ],
        None => Default::default(),
    }
}

/// One row per visibility/detection object of each technique
///
/// # Errors
///
/// Returns `Serialization`, `Io` or `Interrupted` errors.
pub fn export_techniques(
    path: &Path,
    admin: &TechniqueAdministration,
    interrupt: &Interrupt,
) -> Result<usize> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer
        .write_record([
            "Technique ID",
            "Technique name",
            "Dimension",
            "Applicable to",
            "Score",
            "Date",
            "Auto generated",
            "Comment",
        ])
        .map_err(|e| serialize_error(path, e))?;

    let mut rows = 0;
    for technique in &admin.techniques {
        interrupt.check("export_techniques")?;
        for dimension in [ScoreDimension::Visibility, ScoreDimension::Detection] {
            for object in technique.objects(dimension) {
                let [score, date, auto] = latest_fields(object);
                writer
                    .write_record([
                        technique.technique_id.clone(),
                        technique.technique_name.clone(),
                        dimension.name().to_string(),
                        object.applicable_to.join(", "),
                        score,
                        date,
                        auto,
                        object.comment.clone().unwrap_or_default(),
                    ])
                    .map_err(|e| serialize_error(path, e))?;
                rows += 1;
            }
        }
    }

    finish(path, writer)?;
    Ok(rows)
}
