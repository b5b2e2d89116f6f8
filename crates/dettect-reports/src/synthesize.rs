//! Technique administration synthesis
//!
//! Builds a technique administration file whose visibility scores come from
//! data source coverage. Detection is left unscored (`-1`).

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde_yaml::Value;

use dettect_store::admin::{
    DataSourceAdministration, ScoreEntry, ScoreObject, TechniqueAdministration, TechniqueEntry,
};

use crate::scoring::TechniqueCoverage;

pub const TECHNIQUE_ADMIN_VERSION: f64 = 1.2;
pub const AUTO_GENERATED_COMMENT: &str = "Generated from data source coverage";

/// Auto-generated visibility entry for a coverage score
pub fn auto_entry(score: i64, today: NaiveDate) -> ScoreEntry {
    ScoreEntry {
        date: Some(today.format("%Y-%m-%d").to_string()),
        score: Some(score),
        comment: Some(AUTO_GENERATED_COMMENT.to_string()),
        auto_generated: Some(true),
        ..ScoreEntry::default()
    }
}

/// New technique entry scored from coverage
pub fn technique_entry(coverage: &TechniqueCoverage, today: NaiveDate) -> TechniqueEntry {
    let all = vec!["all".to_string()];
    TechniqueEntry {
        technique_id: coverage.technique_id.clone(),
        technique_name: coverage.technique_name.clone(),
        detection: vec![ScoreObject {
            applicable_to: all.clone(),
            score_logbook: vec![ScoreEntry {
                date: None,
                score: Some(-1),
                ..ScoreEntry::default()
            }],
            ..ScoreObject::default()
        }],
        visibility: vec![ScoreObject {
            applicable_to: all,
            comment: Some(format!("Data sources: {}", coverage.available.join(", "))),
            score_logbook: vec![auto_entry(coverage.score(), today)],
            ..ScoreObject::default()
        }],
        extra: BTreeMap::new(),
    }
}

/// Technique administration for every technique with some coverage
pub fn synthesize(
    source: &DataSourceAdministration,
    coverage: &BTreeMap<String, TechniqueCoverage>,
    today: NaiveDate,
) -> TechniqueAdministration {
    TechniqueAdministration {
        version: Value::from(TECHNIQUE_ADMIN_VERSION),
        file_type: dettect_core::ArtifactKind::TechniqueAdmin
            .file_type()
            .to_string(),
        name: source.name.clone(),
        platform: source.platform.clone(),
        techniques: coverage
            .values()
            .filter(|c| c.score() > 0)
            .map(|c| technique_entry(c, today))
            .collect(),
        extra: BTreeMap::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dettect_core::model::ScoreDimension;

    fn coverage(id: &str, available: &[&str], total: usize) -> TechniqueCoverage {
        TechniqueCoverage {
            technique_id: id.to_string(),
            technique_name: format!("{} name", id),
            available: available.iter().map(|s| s.to_string()).collect(),
            total,
        }
    }

    #[test]
    fn test_only_covered_techniques_are_synthesized() {
        let source: DataSourceAdministration = serde_yaml::from_str(
            "version: 1.1\nfile_type: data-source-administration\nname: lab\nplatform: [Windows]\n",
        )
        .unwrap();
        let mut map = BTreeMap::new();
        map.insert("T1003".to_string(), coverage("T1003", &["Process Access"], 2));
        map.insert("T1055".to_string(), coverage("T1055", &[], 1));
        let today = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();

        let admin = synthesize(&source, &map, today);

        assert_eq!(admin.file_type, "technique-administration");
        assert_eq!(admin.techniques.len(), 1);
        let technique = &admin.techniques[0];
        assert_eq!(technique.max_score(ScoreDimension::Visibility), Some(2));
        assert_eq!(technique.max_score(ScoreDimension::Detection), Some(-1));
        let entry = technique.visibility[0].latest().unwrap();
        assert!(entry.is_auto_generated());
        assert_eq!(entry.date.as_deref(), Some("2024-05-01"));
    }
}
