#![allow(clippy::unwrap_used, clippy::expect_used)]

use dettect_core::errors::{DettectError, DtErrorKind};
use dettect_core::logging_facility::test_capture::init_test_capture;
use dettect_core::{log_op_abort, log_op_end, log_op_error, log_op_start};
use dettect_core_types::schema::{EVENT_ABORT, EVENT_END, EVENT_END_ERROR, EVENT_START};

#[test]
fn test_log_op_start_macro() {
    let capture = init_test_capture();
    let op_name = "test_log_op_start_unique_1";

    log_op_start!(op_name, mode = "visibility");

    let events = capture.events();
    let start = events
        .iter()
        .find(|e| e.op.as_deref() == Some(op_name) && e.event.as_deref() == Some(EVENT_START))
        .expect("start event");
    assert_eq!(start.field("mode"), Some("visibility"));
}

#[test]
fn test_log_op_end_macro() {
    let capture = init_test_capture();
    let op_name = "test_log_op_end_unique_2";

    log_op_end!(op_name, duration_ms = 42);

    let events = capture.events();
    let end_events: Vec<_> = events
        .iter()
        .filter(|e| e.op.as_deref() == Some(op_name) && e.event.as_deref() == Some(EVENT_END))
        .collect();

    assert_eq!(end_events.len(), 1, "Should have exactly one end event");
    assert_eq!(end_events[0].field("duration_ms"), Some("42"));
}

#[test]
fn test_log_op_error_includes_kind() {
    let capture = init_test_capture();
    let op_name = "test_log_op_error_unique_3";

    let err = DettectError::UnknownGroup {
        group: "APT99".to_string(),
    };
    log_op_error!(op_name, err, duration_ms = 10);

    let events = capture.events();
    let error_event = events
        .iter()
        .find(|e| e.op.as_deref() == Some(op_name) && e.event.as_deref() == Some(EVENT_END_ERROR))
        .expect("error event");

    assert_eq!(
        error_event.field("err_kind"),
        Some(format!("{:?}", DtErrorKind::InvalidInput).as_str())
    );
    assert_eq!(error_event.field("err_code"), Some("ERR_INVALID_INPUT"));
}

#[test]
fn test_log_op_abort_records_reason() {
    let capture = init_test_capture();
    let op_name = "test_log_op_abort_unique_4";

    log_op_abort!(op_name, "EmptyFilterResult", duration_ms = 1);

    let count = capture.count_events(|e| {
        e.op.as_deref() == Some(op_name)
            && e.event.as_deref() == Some(EVENT_ABORT)
            && e.field("abort_reason") == Some("EmptyFilterResult")
            && e.level == tracing::Level::INFO
    });
    assert_eq!(count, 1);
}
