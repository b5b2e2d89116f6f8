//! Data source coverage
//!
//! A technique's coverage is the share of its ATT&CK data sources that the
//! data source administration file marks as available for analytics. The
//! share is bucketed into a visibility score of 0..=4.

use std::collections::{BTreeMap, BTreeSet};

use dettect_store::admin::DataSourceAdministration;
use dettect_store::knowledge::KnowledgeBase;

/// Bucket a coverage percentage: 0 → 0, 1–49 → 1, 50–74 → 2, 75–99 → 3,
/// 100 → 4
pub fn coverage_score(percentage: u32) -> i64 {
    match percentage {
        0 => 0,
        1..=49 => 1,
        50..=74 => 2,
        75..=99 => 3,
        _ => 4,
    }
}

/// Coverage of one technique
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TechniqueCoverage {
    pub technique_id: String,
    pub technique_name: String,
    /// Data sources of the technique that are available, in ATT&CK order
    pub available: Vec<String>,
    pub total: usize,
}

impl TechniqueCoverage {
    pub fn percentage(&self) -> u32 {
        if self.total == 0 {
            return 0;
        }
        ((self.available.len() * 100) / self.total) as u32
    }

    pub fn score(&self) -> i64 {
        coverage_score(self.percentage())
    }
}

/// Lower-cased names of the data sources available for analytics
pub fn available_data_sources(admin: &DataSourceAdministration) -> BTreeSet<String> {
    admin
        .available()
        .map(|ds| ds.data_source_name.trim().to_lowercase())
        .collect()
}

/// Coverage of every technique that lists at least one data source
pub fn technique_coverage(
    kb: &KnowledgeBase,
    admin: &DataSourceAdministration,
) -> BTreeMap<String, TechniqueCoverage> {
    let available = available_data_sources(admin);
    let mut coverage = BTreeMap::new();
    for technique in kb.techniques() {
        let names: Vec<&str> = technique.data_source_names().collect();
        if names.is_empty() {
            continue;
        }
        coverage.insert(
            technique.attack_id.clone(),
            TechniqueCoverage {
                technique_id: technique.attack_id.clone(),
                technique_name: technique.name.clone(),
                available: names
                    .iter()
                    .filter(|n| available.contains(&n.to_lowercase()))
                    .map(|n| n.to_string())
                    .collect(),
                total: names.len(),
            },
        );
    }
    coverage
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coverage_buckets() {
        assert_eq!(coverage_score(0), 0);
        assert_eq!(coverage_score(1), 1);
        assert_eq!(coverage_score(49), 1);
        assert_eq!(coverage_score(50), 2);
        assert_eq!(coverage_score(74), 2);
        assert_eq!(coverage_score(75), 3);
        assert_eq!(coverage_score(99), 3);
        assert_eq!(coverage_score(100), 4);
    }

    #[test]
    fn test_percentage_rounds_down() {
        let coverage = TechniqueCoverage {
            technique_id: "T1003".into(),
            technique_name: "OS Credential Dumping".into(),
            available: vec!["Process Access".into()],
            total: 3,
        };
        assert_eq!(coverage.percentage(), 33);
        assert_eq!(coverage.score(), 1);
    }
}
