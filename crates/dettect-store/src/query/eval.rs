//! Query evaluation over YAML records

use serde_yaml::Value;

use super::parser::{CmpOp, Expr, Literal};

static NULL: Value = Value::Null;

/// A record and the document it belongs to
///
/// Paths that do not resolve on the record are looked up on the document,
/// so document-level keys such as `platform` can be queried.
#[derive(Debug, Clone, Copy)]
pub struct Scope<'a> {
    pub record: &'a Value,
    pub document: &'a Value,
}

impl<'a> Scope<'a> {
    pub fn new(record: &'a Value, document: &'a Value) -> Self {
        Self { record, document }
    }

    /// Leaf values at `path`; a missing path resolves to `null`
    fn resolve(&self, path: &[String]) -> Vec<&'a Value> {
        let mut leaves = Vec::new();
        if collect(self.record, path, &mut leaves) {
            return leaves;
        }
        if collect(self.document, path, &mut leaves) {
            return leaves;
        }
        vec![&NULL]
    }
}

/// Walk `path`, fanning out over sequences. Returns whether the path exists.
fn collect<'a>(value: &'a Value, path: &[String], out: &mut Vec<&'a Value>) -> bool {
    match (path.split_first(), value) {
        (None, Value::Sequence(items)) => {
            out.extend(items.iter());
            true
        }
        (None, leaf) => {
            out.push(leaf);
            true
        }
        (Some((head, rest)), Value::Mapping(_)) => match value.get(head.as_str()) {
            Some(child) => collect(child, rest, out),
            None => false,
        },
        (Some(_), Value::Sequence(items)) => {
            let mut found = false;
            for item in items {
                found |= collect(item, path, out);
            }
            found
        }
        _ => false,
    }
}

fn matches(value: &Value, literal: &Literal) -> bool {
    match (literal, value) {
        (Literal::Null, Value::Null) => true,
        (Literal::Null, _) | (_, Value::Null) => false,
        (Literal::Text(expected), Value::String(actual)) => expected.eq_ignore_ascii_case(actual),
        (Literal::Text(expected), Value::Number(actual)) => actual.to_string() == *expected,
        (Literal::Text(expected), Value::Bool(actual)) => {
            expected.eq_ignore_ascii_case(if *actual { "true" } else { "false" })
        }
        (Literal::Number(expected), Value::Number(actual)) => {
            actual.as_f64().is_some_and(|n| n == *expected)
        }
        (Literal::Number(expected), Value::String(actual)) => {
            actual.trim().parse::<f64>().is_ok_and(|n| n == *expected)
        }
        (Literal::Bool(expected), Value::Bool(actual)) => expected == actual,
        _ => false,
    }
}

/// Evaluate `expr` against one record
pub fn evaluate(expr: &Expr, scope: Scope<'_>) -> bool {
    match expr {
        Expr::Or(terms) => terms.iter().any(|t| evaluate(t, scope)),
        Expr::And(terms) => terms.iter().all(|t| evaluate(t, scope)),
        Expr::Cmp { path, op, value } => {
            let any = scope.resolve(path).iter().any(|v| matches(v, value));
            match op {
                CmpOp::Eq => any,
                CmpOp::Ne => !any,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::parser::parse;

    fn yaml(text: &str) -> Value {
        serde_yaml::from_str(text).unwrap()
    }

    fn eval(query: &str, record: &Value, document: &Value) -> bool {
        evaluate(&parse(query).unwrap(), Scope::new(record, document))
    }

    #[test]
    fn test_sequence_matches_any_element() {
        let record = yaml("products: [Sysmon, Defender]\n");
        let document = yaml("{}");

        assert!(eval("products == 'sysmon'", &record, &document));
        assert!(!eval("products != 'Defender'", &record, &document));
        assert!(eval("products != 'Splunk'", &record, &document));
    }

    #[test]
    fn test_nested_paths_and_numbers() {
        let record = yaml("data_quality:\n  timeliness: 3\n  retention: 0\n");
        let document = yaml("{}");

        assert!(eval("data_quality.timeliness == 3", &record, &document));
        assert!(eval("data_quality.retention == '0'", &record, &document));
        assert!(!eval(
            "data_quality.timeliness == 2 or data_quality.retention == 1",
            &record,
            &document
        ));
    }

    #[test]
    fn test_falls_back_to_document_keys() {
        let record = yaml("score: 2\n");
        let document = yaml("platform: [Windows, Linux]\n");

        assert!(eval("platform == 'linux' and score == 2", &record, &document));
    }

    #[test]
    fn test_missing_path_is_null() {
        let record = yaml("comment: ''\n");
        let document = yaml("{}");

        assert!(eval("location == null", &record, &document));
        assert!(eval("comment != null", &record, &document));
    }
}
