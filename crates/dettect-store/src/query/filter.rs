//! Filesystem query filter
//!
//! Applies parsed queries to an administration file and writes the kept
//! records to `cache/<stem>_filtered_<digest12>.yaml`. The digest covers
//! the base file content and the queries, so an identical request reuses
//! the file already in the cache.

use std::fs;
use std::sync::Arc;

use serde_yaml::{Mapping, Value};
use sha2::{Digest, Sha256};

use dettect_core::collaborators::{FilterResult, QueryFilter};
use dettect_core::environment::Environment;
use dettect_core::model::{AdministrationArtifact, ArtifactKind, ArtifactRef, QuerySet};
use dettect_core::{log_op_end, log_op_start};

use super::eval::{evaluate, Scope};
use super::parser::{parse, Expr};
use crate::admin::format::parse_date;
use crate::admin::{parse_value, read_text, score_objects};
use crate::atomic::atomic_write;
use crate::errors::{query_mismatch, serialize_error, Result};

const DIGEST_PREFIX_LEN: usize = 12;

/// Query filter writing derived files into the cache directory
#[derive(Debug, Clone)]
pub struct FsQueryFilter {
    env: Environment,
}

impl FsQueryFilter {
    pub fn new(env: Environment) -> Self {
        Self { env }
    }
}

/// Stable text form of a query set, hashed together with the base content
fn canonical_queries(queries: &QuerySet) -> String {
    match queries {
        QuerySet::Single(query) => format!("single\n{}", query.trim()),
        QuerySet::Pair {
            visibility,
            detection,
            all_scores,
        } => format!(
            "pair\nvisibility={}\ndetection={}\nall_scores={}",
            visibility.as_deref().unwrap_or("").trim(),
            detection.as_deref().unwrap_or("").trim(),
            all_scores
        ),
    }
}

fn compute_digest(base: &str, queries: &QuerySet) -> String {
    let mut hasher = Sha256::new();
    hasher.update(base.as_bytes());
    hasher.update([0u8]);
    hasher.update(canonical_queries(queries).as_bytes());
    hex::encode(hasher.finalize())
}

fn parse_optional(query: Option<&str>) -> Result<Option<Expr>> {
    query.map(parse).transpose()
}

/// Keep the data source entries matching `expr`
fn filter_data_sources(document: &Value, expr: &Expr) -> Vec<Value> {
    records(document, "data_sources")
        .iter()
        .filter(|entry| evaluate(expr, Scope::new(entry, document)))
        .cloned()
        .collect()
}

fn records<'a>(document: &'a Value, key: &str) -> &'a [Value] {
    document
        .get(key)
        .and_then(Value::as_sequence)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

/// Score entries a query is evaluated against
fn selected_entries(object: &Value, all_scores: bool) -> Vec<Option<&Value>> {
    let logbook = records(object, "score_logbook");
    if logbook.is_empty() {
        return vec![None];
    }
    if all_scores {
        return logbook.iter().map(Some).collect();
    }
    let date = |entry: &Value| entry.get("date").and_then(Value::as_str).and_then(parse_date);
    let mut latest = &logbook[0];
    for entry in &logbook[1..] {
        if date(entry) > date(latest) {
            latest = entry;
        }
    }
    vec![Some(latest)]
}

/// Flat record for one score entry of one visibility/detection object
fn score_record(technique: &Value, object: &Value, entry: Option<&Value>) -> Value {
    let mut record = object.as_mapping().cloned().unwrap_or_default();
    record.remove("score_logbook");
    for key in ["technique_id", "technique_name"] {
        if let Some(value) = technique.get(key) {
            record.insert(Value::from(key), value.clone());
        }
    }
    for key in ["score", "date", "auto_generated"] {
        let value = entry.and_then(|e| e.get(key)).cloned().unwrap_or(Value::Null);
        record.insert(Value::from(key), value);
    }
    Value::Mapping(record)
}

fn dimension_matches(
    document: &Value,
    technique: &Value,
    dimension: &str,
    expr: Option<&Expr>,
    all_scores: bool,
) -> bool {
    let Some(expr) = expr else {
        return true;
    };
    score_objects(technique.get(dimension)).into_iter().any(|object| {
        selected_entries(object, all_scores).into_iter().any(|entry| {
            let record = score_record(technique, object, entry);
            evaluate(expr, Scope::new(&record, document))
        })
    })
}

/// Keep the techniques matching both queries
fn filter_techniques(
    document: &Value,
    visibility: Option<&Expr>,
    detection: Option<&Expr>,
    all_scores: bool,
) -> Vec<Value> {
    records(document, "techniques")
        .iter()
        .filter(|technique| {
            dimension_matches(document, technique, "visibility", visibility, all_scores)
                && dimension_matches(document, technique, "detection", detection, all_scores)
        })
        .cloned()
        .collect()
}

impl QueryFilter for FsQueryFilter {
    fn filter(&self, artifact: &ArtifactRef, queries: &QuerySet) -> Result<FilterResult> {
        log_op_start!("filter", artifact_path = %artifact.path().display());
        let start = std::time::Instant::now();

        let base = read_text(artifact.path())?;
        let document = parse_value(artifact.path(), &base)?;

        let (key, kept) = match (artifact.kind(), queries) {
            (ArtifactKind::DataSourceAdmin, QuerySet::Single(query)) => {
                let expr = parse(query)?;
                ("data_sources", filter_data_sources(&document, &expr))
            }
            (
                ArtifactKind::TechniqueAdmin,
                QuerySet::Pair {
                    visibility,
                    detection,
                    all_scores,
                },
            ) => {
                let visibility = parse_optional(visibility.as_deref())?;
                let detection = parse_optional(detection.as_deref())?;
                (
                    "techniques",
                    filter_techniques(
                        &document,
                        visibility.as_ref(),
                        detection.as_ref(),
                        *all_scores,
                    ),
                )
            }
            (kind, _) => {
                return Err(query_mismatch(&format!(
                    "these queries cannot be applied to a {}",
                    kind.label()
                )))
            }
        };

        if kept.is_empty() {
            log_op_end!(
                "filter",
                duration_ms = start.elapsed().as_millis() as u64,
                kept = 0usize
            );
            return Ok(FilterResult::NoResults);
        }
        let kept_count = kept.len();

        let mut filtered: Mapping = document.as_mapping().cloned().unwrap_or_default();
        filtered.insert(Value::from(key), Value::Sequence(kept));

        let digest = compute_digest(&base, queries);
        let file_name = format!(
            "{}_filtered_{}.yaml",
            artifact.stem(),
            &digest[..DIGEST_PREFIX_LEN]
        );
        let target = self.env.cache_path(&file_name);
        let content = serde_yaml::to_string(&Value::Mapping(filtered))
            .map_err(|e| serialize_error(&target, e))?;

        let reusable = fs::read(&target).map(|existing| existing == content.as_bytes());
        if matches!(reusable, Ok(true)) {
            tracing::debug!(path = %target.display(), "reusing derived file");
        } else {
            atomic_write(&target, content.as_bytes())?;
        }

        log_op_end!(
            "filter",
            duration_ms = start.elapsed().as_millis() as u64,
            kept = kept_count,
            artifact_path = %target.display()
        );
        Ok(FilterResult::Derived(Arc::new(AdministrationArtifact::derived(
            target, artifact, digest,
        ))))
    }
}
