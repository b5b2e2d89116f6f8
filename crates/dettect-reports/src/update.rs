//! In-place refresh of visibility scores
//!
//! Visibility objects whose latest logbook entry is auto-generated get a new
//! auto-generated entry when the coverage score changed. Manually scored
//! objects are reported and left alone. Techniques with coverage that the
//! file does not list yet are appended.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;

use dettect_core::Interrupt;
use dettect_store::admin::TechniqueAdministration;
use dettect_store::errors::{io_error, Result};

use crate::scoring::TechniqueCoverage;
use crate::synthesize::{auto_entry, technique_entry};

/// What an update changed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateSummary {
    /// Techniques that received a new auto-generated entry
    pub updated: Vec<String>,
    /// Manually scored techniques whose score differs from coverage
    pub manual: Vec<(String, i64, i64)>,
    /// Techniques appended to the file
    pub added: Vec<String>,
}

impl UpdateSummary {
    pub fn is_unchanged(&self) -> bool {
        self.updated.is_empty() && self.added.is_empty()
    }
}

/// Apply coverage scores to a loaded technique administration
///
/// # Errors
///
/// Returns `Interrupted` when the interrupt flag is raised.
pub fn apply(
    admin: &mut TechniqueAdministration,
    coverage: &BTreeMap<String, TechniqueCoverage>,
    today: NaiveDate,
    interrupt: &Interrupt,
) -> Result<UpdateSummary> {
    let mut summary = UpdateSummary::default();

    for technique in &mut admin.techniques {
        interrupt.check("update_technique_admin")?;
        let new_score = coverage
            .get(&technique.technique_id.to_uppercase())
            .map_or(0, TechniqueCoverage::score);

        let mut changed = false;
        for object in &mut technique.visibility {
            let latest = object
                .latest()
                .map(|e| (e.is_auto_generated(), e.score.unwrap_or(0)));
            match latest {
                Some((_, current)) if current == new_score => {}
                Some((true, _)) | None => {
                    object.score_logbook.push(auto_entry(new_score, today));
                    changed = true;
                }
                Some((false, current)) => summary
                    .manual
                    .push((technique.technique_id.clone(), current, new_score)),
            }
        }
        if changed {
            summary.updated.push(technique.technique_id.clone());
        }
    }

    for (technique_id, technique_coverage) in coverage {
        if technique_coverage.score() == 0
            || admin
                .techniques
                .iter()
                .any(|t| t.technique_id.eq_ignore_ascii_case(technique_id))
        {
            continue;
        }
        admin
            .techniques
            .push(technique_entry(technique_coverage, today));
        summary.added.push(technique_id.clone());
    }

    Ok(summary)
}

/// Backup path next to the file: `<stem>_backup_<stamp>.<ext>`
pub fn backup_path(path: &Path, stamp: &str) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let extension = path
        .extension()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "yaml".to_string());
    path.with_file_name(format!("{}_backup_{}.{}", stem, stamp, extension))
}

/// Copy the file to its backup path
///
/// # Errors
///
/// Returns `Io` when the copy fails.
pub fn backup(path: &Path, stamp: &str) -> Result<PathBuf> {
    let target = backup_path(path, stamp);
    fs::copy(path, &target).map_err(|e| io_error("backup_technique_admin", path, e))?;
    Ok(target)
}
