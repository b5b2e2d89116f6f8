//! Error handling for dettect-store
//!
//! Wraps dettect-core DtError with store-specific helpers

use std::path::Path;

use dettect_core::errors::{DettectError, DtError, DtErrorKind};

pub use dettect_core::errors::io_error;

/// Result type alias using DtError
pub type Result<T> = std::result::Result<T, DtError>;

/// Create a YAML parse error
pub fn yaml_error(path: &Path, err: serde_yaml::Error) -> DtError {
    DettectError::MalformedFile {
        path: path.to_path_buf(),
        reason: err.to_string(),
    }
    .into()
}

/// Create a serialization error for a file about to be written
pub fn serialize_error(path: &Path, reason: impl std::fmt::Display) -> DtError {
    DtError::new(DtErrorKind::Serialization)
        .with_op("serialize")
        .with_path(path)
        .with_message(reason.to_string())
}

/// Create an error for a query set that does not fit the artifact kind
pub fn query_mismatch(reason: &str) -> DtError {
    DtError::new(DtErrorKind::UnsupportedCombination)
        .with_op("filter")
        .with_message(reason.to_string())
}
