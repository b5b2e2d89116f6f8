//! Canonical logging macros
//!
//! These macros provide a structured, consistent way to log operations.

/// Log the start of an operation
///
/// # Example
///
/// ```
/// # use dettect_core::log_op_start;
/// log_op_start!("dispatch");
/// log_op_start!("dispatch", mode = "visibility");
/// ```
#[macro_export]
macro_rules! log_op_start {
    ($op:expr) => {
        tracing::info!(
            component = module_path!(),
            op = $op,
            event = $crate::dettect_core_types::schema::EVENT_START,
        );
    };
    ($op:expr, $($field:tt)*) => {
        tracing::info!(
            component = module_path!(),
            op = $op,
            event = $crate::dettect_core_types::schema::EVENT_START,
            $($field)*
        );
    };
}

/// Log the successful end of an operation
///
/// # Example
///
/// ```
/// # use dettect_core::log_op_end;
/// log_op_end!("dispatch", duration_ms = 42);
/// ```
#[macro_export]
macro_rules! log_op_end {
    ($op:expr, duration_ms = $duration:expr) => {
        tracing::info!(
            component = module_path!(),
            op = $op,
            event = $crate::dettect_core_types::schema::EVENT_END,
            duration_ms = $duration,
        );
    };
    ($op:expr, duration_ms = $duration:expr, $($field:tt)*) => {
        tracing::info!(
            component = module_path!(),
            op = $op,
            event = $crate::dettect_core_types::schema::EVENT_END,
            duration_ms = $duration,
            $($field)*
        );
    };
}

/// Log an operation error
///
/// # Example
///
/// ```
/// # use dettect_core::log_op_error;
/// # use dettect_core::errors::{DtError, DtErrorKind};
/// let err = DtError::new(DtErrorKind::Io).with_message("disk full");
/// log_op_error!("write_layer", err, duration_ms = 10);
/// ```
#[macro_export]
macro_rules! log_op_error {
    ($op:expr, $err:expr, duration_ms = $duration:expr) => {{
        use $crate::errors::DtError;
        let dt_err: DtError = $err.into();
        tracing::error!(
            component = module_path!(),
            op = $op,
            event = $crate::dettect_core_types::schema::EVENT_END_ERROR,
            duration_ms = $duration,
            err_kind = ?dt_err.kind(),
            err_code = dt_err.code(),
        );
    }};
    ($op:expr, $err:expr, duration_ms = $duration:expr, $($field:tt)*) => {{
        use $crate::errors::DtError;
        let dt_err: DtError = $err.into();
        tracing::error!(
            component = module_path!(),
            op = $op,
            event = $crate::dettect_core_types::schema::EVENT_END_ERROR,
            duration_ms = $duration,
            err_kind = ?dt_err.kind(),
            err_code = dt_err.code(),
            $($field)*
        );
    }};
}

/// Log an aborted operation (a precondition stopped it before any output ran)
///
/// Logged at `info`: the caller reports the abort reason to the user.
///
/// # Example
///
/// ```
/// # use dettect_core::log_op_abort;
/// log_op_abort!("dispatch", "EmptyFilterResult", duration_ms = 3);
/// ```
#[macro_export]
macro_rules! log_op_abort {
    ($op:expr, $reason:expr, duration_ms = $duration:expr) => {
        tracing::info!(
            component = module_path!(),
            op = $op,
            event = $crate::dettect_core_types::schema::EVENT_ABORT,
            duration_ms = $duration,
            abort_reason = $reason,
        );
    };
    ($op:expr, $reason:expr, duration_ms = $duration:expr, $($field:tt)*) => {
        tracing::info!(
            component = module_path!(),
            op = $op,
            event = $crate::dettect_core_types::schema::EVENT_ABORT,
            duration_ms = $duration,
            abort_reason = $reason,
            $($field)*
        );
    };
}
