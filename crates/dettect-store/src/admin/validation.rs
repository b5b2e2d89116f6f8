//! Filesystem validator and health check
//!
//! Validation never fails with an error for a bad file: unreadable,
//! malformed or inconsistent files come back as `Validation::Failed` with
//! one finding per problem.

use std::collections::HashSet;
use std::path::Path;

use serde_yaml::Value;

use dettect_core::collaborators::{PreconditionValidator, Validation};
use dettect_core::model::{AdministrationArtifact, ArtifactKind};
use dettect_core::{log_op_end, log_op_start};

use super::format::{parse_date, DataQuality};
use super::{parse_value, read_text, score_objects};
use crate::errors::Result;

const VISIBILITY_RANGE: (i64, i64) = (0, 4);
const DETECTION_RANGE: (i64, i64) = (-1, 5);
const QUALITY_MAX: i64 = 5;

/// Validates administration files on disk
#[derive(Debug, Clone, Copy, Default)]
pub struct FsValidator;

impl FsValidator {
    pub fn new() -> Self {
        Self
    }

    /// Collect findings for one file
    pub fn findings(&self, path: &Path, kind: ArtifactKind, health: bool) -> Vec<String> {
        let text = match read_text(path) {
            Ok(text) => text,
            Err(err) => return vec![err.message().to_string()],
        };
        let document = match parse_value(path, &text) {
            Ok(doc) => doc,
            Err(err) => return vec![err.message().to_string()],
        };
        if !document.is_mapping() {
            return vec![format!("'{}' is not a YAML mapping", path.display())];
        }

        let mut findings = Vec::new();
        if document.get("version").map_or(true, Value::is_null) {
            findings.push("missing key 'version'".to_string());
        }
        match document.get("file_type").and_then(Value::as_str) {
            Some(found) if found == kind.file_type() => {}
            Some(found) => findings.push(format!(
                "file_type is '{}', expected '{}'",
                found,
                kind.file_type()
            )),
            None => findings.push("missing key 'file_type'".to_string()),
        }
        if !findings.is_empty() || !health {
            return findings;
        }

        match kind {
            ArtifactKind::DataSourceAdmin => check_data_sources(&document, &mut findings),
            ArtifactKind::TechniqueAdmin => check_techniques(&document, &mut findings),
        }
        findings
    }
}

impl PreconditionValidator for FsValidator {
    fn validate(&self, artifact: &AdministrationArtifact, health: bool) -> Result<Validation> {
        log_op_start!("validate", artifact_path = %artifact.path().display(), health = health);
        let start = std::time::Instant::now();

        let findings = self.findings(artifact.path(), artifact.kind(), health);
        for finding in &findings {
            tracing::debug!(artifact_path = %artifact.path().display(), "{}", finding);
            println!("[!] {}", finding);
        }

        log_op_end!(
            "validate",
            duration_ms = start.elapsed().as_millis() as u64,
            findings = findings.len()
        );
        Ok(if findings.is_empty() {
            Validation::Passed
        } else {
            Validation::Failed { findings }
        })
    }
}

fn sequence<'a>(value: Option<&'a Value>) -> &'a [Value] {
    value
        .and_then(Value::as_sequence)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

fn text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Dates may be absent or null; anything else must be `YYYY-MM-DD`
fn check_date(value: Option<&Value>, context: &str, findings: &mut Vec<String>) {
    match value {
        None | Some(Value::Null) => {}
        Some(Value::String(raw)) if parse_date(raw).is_some() => {}
        Some(other) => findings.push(format!(
            "{}: invalid date {:?} (expected YYYY-MM-DD)",
            context, other
        )),
    }
}

fn check_data_sources(document: &Value, findings: &mut Vec<String>) {
    let mut seen = HashSet::new();
    for (index, entry) in sequence(document.get("data_sources")).iter().enumerate() {
        let name = text(entry.get("data_source_name")).unwrap_or_default();
        let context = if name.trim().is_empty() {
            findings.push(format!("data source #{} has no data_source_name", index + 1));
            format!("data source #{}", index + 1)
        } else {
            if !seen.insert(name.to_lowercase()) {
                findings.push(format!("data source '{}' is listed more than once", name));
            }
            format!("data source '{}'", name)
        };

        check_date(entry.get("date_registered"), &context, findings);
        check_date(entry.get("date_connected"), &context, findings);

        let quality = entry.get("data_quality");
        for dimension in DataQuality::DIMENSIONS {
            match quality.and_then(|q| q.get(dimension)) {
                None | Some(Value::Null) => {}
                Some(value) => match value.as_i64() {
                    Some(score) if (0..=QUALITY_MAX).contains(&score) => {}
                    _ => findings.push(format!(
                        "{}: data_quality.{} must be between 0 and {}",
                        context, dimension, QUALITY_MAX
                    )),
                },
            }
        }
    }
}

fn is_technique_id(id: &str) -> bool {
    let bytes = id.as_bytes();
    let digits = |range: &[u8]| range.iter().all(u8::is_ascii_digit);
    match bytes.len() {
        5 => bytes[0] == b'T' && digits(&bytes[1..5]),
        9 => bytes[0] == b'T' && digits(&bytes[1..5]) && bytes[5] == b'.' && digits(&bytes[6..]),
        _ => false,
    }
}

fn check_techniques(document: &Value, findings: &mut Vec<String>) {
    let mut seen = HashSet::new();
    for entry in sequence(document.get("techniques")) {
        let id = text(entry.get("technique_id")).unwrap_or_default();
        if !is_technique_id(&id) {
            findings.push(format!("invalid technique_id '{}'", id));
            continue;
        }
        if !seen.insert(id.clone()) {
            findings.push(format!("technique {} is listed more than once", id));
        }

        let ranges = [("visibility", VISIBILITY_RANGE), ("detection", DETECTION_RANGE)];
        for (dimension, (low, high)) in ranges {
            for object in score_objects(entry.get(dimension)) {
                let context = format!("{} {}", id, dimension);
                if sequence(object.get("applicable_to")).is_empty() {
                    findings.push(format!("{}: empty applicable_to", context));
                }
                let logbook = sequence(object.get("score_logbook"));
                if logbook.is_empty() {
                    findings.push(format!("{}: empty score_logbook", context));
                }
                for score_entry in logbook {
                    check_date(score_entry.get("date"), &context, findings);
                    match score_entry.get("score") {
                        None | Some(Value::Null) => {}
                        Some(value) => match value.as_i64() {
                            Some(score) if (low..=high).contains(&score) => {}
                            _ => findings.push(format!(
                                "{}: score must be between {} and {}",
                                context, low, high
                            )),
                        },
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, body: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn test_technique_id_shape() {
        assert!(is_technique_id("T1003"));
        assert!(is_technique_id("T1003.001"));
        assert!(!is_technique_id("T103"));
        assert!(!is_technique_id("t1003"));
        assert!(!is_technique_id("T1003-001"));
    }

    #[test]
    fn test_missing_file_fails_without_error() {
        let dir = TempDir::new().unwrap();
        let artifact = AdministrationArtifact::supplied(
            dir.path().join("absent.yaml"),
            ArtifactKind::TechniqueAdmin,
        );
        let result = FsValidator::new().validate(&artifact, false).unwrap();
        assert!(!result.passed());
    }

    #[test]
    fn test_wrong_file_type_is_a_finding() {
        let dir = TempDir::new().unwrap();
        let path = write(
            &dir,
            "ds.yaml",
            "version: 1.1\nfile_type: data-source-administration\n",
        );
        let findings = FsValidator::new().findings(&path, ArtifactKind::TechniqueAdmin, false);
        assert_eq!(findings.len(), 1);
        assert!(findings[0].contains("expected 'technique-administration'"));
    }

    #[test]
    fn test_health_check_only_runs_when_requested() {
        let dir = TempDir::new().unwrap();
        let path = write(
            &dir,
            "t.yaml",
            r#"
version: 1.2
file_type: technique-administration
techniques:
  - technique_id: T1003
    visibility:
      applicable_to: []
      score_logbook:
        - date: 2020-13-45
          score: 9
"#,
        );
        let validator = FsValidator::new();
        assert!(validator
            .findings(&path, ArtifactKind::TechniqueAdmin, false)
            .is_empty());

        let findings = validator.findings(&path, ArtifactKind::TechniqueAdmin, true);
        assert_eq!(findings.len(), 3);
        assert!(findings.iter().any(|f| f.contains("applicable_to")));
        assert!(findings.iter().any(|f| f.contains("invalid date")));
        assert!(findings.iter().any(|f| f.contains("between 0 and 4")));
    }

    #[test]
    fn test_detection_allows_minus_one() {
        let dir = TempDir::new().unwrap();
        let path = write(
            &dir,
            "t.yaml",
            r#"
version: 1.2
file_type: technique-administration
techniques:
  - technique_id: T1055.012
    detection:
      - applicable_to: [all]
        score_logbook:
          - date:
            score: -1
"#,
        );
        assert!(FsValidator::new()
            .findings(&path, ArtifactKind::TechniqueAdmin, true)
            .is_empty());
    }

    #[test]
    fn test_data_source_health() {
        let dir = TempDir::new().unwrap();
        let path = write(
            &dir,
            "ds.yaml",
            r#"
version: 1.1
file_type: data-source-administration
data_sources:
  - data_source_name: Process monitoring
    date_registered: 2019-01-01
    data_quality:
      device_completeness: 6
  - data_source_name: process monitoring
  - data_source_name: ""
"#,
        );
        let findings = FsValidator::new().findings(&path, ArtifactKind::DataSourceAdmin, true);
        assert_eq!(findings.len(), 3);
        assert!(findings[0].contains("device_completeness"));
        assert!(findings[1].contains("more than once"));
        assert!(findings[2].contains("no data_source_name"));
    }
}
