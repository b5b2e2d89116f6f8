use std::path::{Path, PathBuf};

use dettect_core::errors::{DettectError, DtError, DtErrorKind};
use dettect_core::model::{ArtifactKind, OverlayType};
use dettect_core::outcome::AbortReason;

#[test]
fn test_file_type_mismatch_is_validation_failure() {
    let err = DettectError::FileTypeMismatch {
        path: PathBuf::from("ds.yaml"),
        expected: "technique-administration".to_string(),
        found: "data-source-administration".to_string(),
    };

    let dt_err: DtError = err.into();

    assert_eq!(dt_err.kind(), DtErrorKind::ValidationFailed);
    assert_eq!(dt_err.code(), "ERR_VALIDATION_FAILED");
    assert_eq!(dt_err.path(), Some(Path::new("ds.yaml")));
    assert!(dt_err.message().contains("technique-administration"));
}

#[test]
fn test_unreadable_file_is_not_found() {
    let err = DettectError::FileUnreadable {
        path: PathBuf::from("missing.yaml"),
        reason: "No such file or directory".to_string(),
    };

    let dt_err: DtError = err.into();

    assert_eq!(dt_err.kind(), DtErrorKind::NotFound);
    assert_eq!(dt_err.path(), Some(Path::new("missing.yaml")));
}

#[test]
fn test_query_parse_error_keeps_position() {
    let err = DettectError::QueryParse {
        query: "score ==".to_string(),
        position: 8,
        reason: "expected a value".to_string(),
    };

    let dt_err: DtError = err.into();

    assert_eq!(dt_err.kind(), DtErrorKind::InvalidQuery);
    assert!(dt_err.message().contains("position 8"));
}

#[test]
fn test_knowledge_base_errors_share_kind() {
    let missing: DtError = DettectError::KnowledgeBaseMissing {
        path: PathBuf::from("cache/enterprise-attack.json"),
    }
    .into();
    let malformed: DtError = DettectError::KnowledgeBaseMalformed {
        path: PathBuf::from("cache/enterprise-attack.json"),
        reason: "expected value".to_string(),
    }
    .into();

    assert_eq!(missing.kind(), DtErrorKind::KnowledgeBase);
    assert_eq!(malformed.kind(), DtErrorKind::KnowledgeBase);
}

#[test]
fn test_error_kind_code_mapping() {
    let kinds = vec![
        (DtErrorKind::MissingArgument, "ERR_MISSING_ARGUMENT"),
        (DtErrorKind::ValidationFailed, "ERR_VALIDATION_FAILED"),
        (DtErrorKind::EmptyFilterResult, "ERR_EMPTY_FILTER_RESULT"),
        (
            DtErrorKind::UnsupportedCombination,
            "ERR_UNSUPPORTED_COMBINATION",
        ),
        (DtErrorKind::Interrupted, "ERR_INTERRUPTED"),
    ];

    for (kind, expected_code) in kinds {
        assert_eq!(kind.code(), expected_code);
    }
}

#[test]
fn test_abort_reasons_map_to_kinds() {
    let cases = vec![
        (
            AbortReason::MissingRequiredArtifact {
                kind: ArtifactKind::TechniqueAdmin,
                required_by: vec![],
            },
            DtErrorKind::MissingArgument,
        ),
        (
            AbortReason::MissingOverlayArtifact {
                overlay_type: OverlayType::Visibility,
            },
            DtErrorKind::MissingArgument,
        ),
        (
            AbortReason::EmptyFilterResult {
                kind: ArtifactKind::DataSourceAdmin,
            },
            DtErrorKind::EmptyFilterResult,
        ),
        (
            AbortReason::UnsupportedCombination {
                detail: "no statistics selected".to_string(),
            },
            DtErrorKind::UnsupportedCombination,
        ),
    ];

    for (reason, kind) in cases {
        let dt_err: DtError = reason.clone().into();
        assert_eq!(dt_err.kind(), kind, "{}", reason.name());
        assert_eq!(dt_err.op(), Some("dispatch"));
    }
}
