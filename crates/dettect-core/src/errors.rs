use std::path::{Path, PathBuf};
use thiserror::Error;

/// Result type alias using DtError
pub type Result<T> = std::result::Result<T, DtError>;

// ========== Error Facility ==========

/// Canonical error kind taxonomy
///
/// Each kind maps to a stable error code that can be used for programmatic
/// error handling and testing. Abort reasons of the dispatcher map onto the
/// first four kinds; the rest classify fatal failures of collaborators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DtErrorKind {
    // Dispatch preconditions
    MissingArgument,
    ValidationFailed,
    EmptyFilterResult,
    UnsupportedCombination,

    // Input
    InvalidInput,
    InvalidQuery,
    NotFound,

    // Knowledge base
    KnowledgeBase,

    // Integration/IO
    Io,
    Serialization,

    // Process
    Interrupted,

    // Internal
    Internal,
}

impl DtErrorKind {
    /// Get the stable error code for this kind
    pub fn code(&self) -> &'static str {
        match self {
            DtErrorKind::MissingArgument => "ERR_MISSING_ARGUMENT",
            DtErrorKind::ValidationFailed => "ERR_VALIDATION_FAILED",
            DtErrorKind::EmptyFilterResult => "ERR_EMPTY_FILTER_RESULT",
            DtErrorKind::UnsupportedCombination => "ERR_UNSUPPORTED_COMBINATION",
            DtErrorKind::InvalidInput => "ERR_INVALID_INPUT",
            DtErrorKind::InvalidQuery => "ERR_INVALID_QUERY",
            DtErrorKind::NotFound => "ERR_NOT_FOUND",
            DtErrorKind::KnowledgeBase => "ERR_KNOWLEDGE_BASE",
            DtErrorKind::Io => "ERR_IO",
            DtErrorKind::Serialization => "ERR_SERIALIZATION",
            DtErrorKind::Interrupted => "ERR_INTERRUPTED",
            DtErrorKind::Internal => "ERR_INTERNAL",
        }
    }
}

/// Canonical structured error type
///
/// Carries classification fields for programmatic handling and context
/// (operation, file path) for the one-line console diagnostic.
#[derive(Debug, Clone)]
pub struct DtError {
    kind: DtErrorKind,
    op: Option<String>,
    path: Option<PathBuf>,
    message: String,
    source: Option<Box<DtError>>,
}

impl DtError {
    /// Create a new error with the specified kind
    pub fn new(kind: DtErrorKind) -> Self {
        Self {
            kind,
            op: None,
            path: None,
            message: String::new(),
            source: None,
        }
    }

    /// Add operation context
    pub fn with_op(mut self, op: impl Into<String>) -> Self {
        self.op = Some(op.into());
        self
    }

    /// Add file path context
    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Add custom message
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Add source error
    pub fn with_source(mut self, source: DtError) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Get the error kind
    pub fn kind(&self) -> DtErrorKind {
        self.kind
    }

    /// Get the stable error code
    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    /// Get the operation context, if any
    pub fn op(&self) -> Option<&str> {
        self.op.as_deref()
    }

    /// Get the file path context, if any
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Get the error message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Get the source error, if any
    pub fn source_error(&self) -> Option<&DtError> {
        self.source.as_deref()
    }
}

impl std::fmt::Display for DtError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]", self.code())?;
        if let Some(op) = &self.op {
            write!(f, " in operation '{}'", op)?;
        }
        if !self.message.is_empty() {
            write!(f, ": {}", self.message)?;
        }
        if let Some(path) = &self.path {
            write!(f, " (path: {})", path.display())?;
        }
        if let Some(source) = &self.source {
            write!(f, " <- {}", source)?;
        }
        Ok(())
    }
}

impl std::error::Error for DtError {}

/// Create an IO error
pub fn io_error(op: &str, path: &Path, err: std::io::Error) -> DtError {
    DtError::new(DtErrorKind::Io)
        .with_op(op)
        .with_path(path)
        .with_message(err.to_string())
}

// ========== End Error Facility ==========

/// Domain error taxonomy for administration files, queries and the
/// knowledge base
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DettectError {
    /// Administration file could not be read
    #[error("Unable to read '{path}': {reason}")]
    FileUnreadable { path: PathBuf, reason: String },

    /// Administration file is not valid YAML or has the wrong shape
    #[error("Malformed YAML in '{path}': {reason}")]
    MalformedFile { path: PathBuf, reason: String },

    /// Administration file declares a different file type
    #[error("File '{path}' is of type '{found}', expected '{expected}'")]
    FileTypeMismatch {
        path: PathBuf,
        expected: String,
        found: String,
    },

    /// Query string could not be parsed
    #[error("Invalid query '{query}' at position {position}: {reason}")]
    QueryParse {
        query: String,
        position: usize,
        reason: String,
    },

    /// ATT&CK knowledge base bundle is missing
    #[error("ATT&CK knowledge base not found at '{path}'")]
    KnowledgeBaseMissing { path: PathBuf },

    /// ATT&CK knowledge base bundle could not be parsed
    #[error("ATT&CK knowledge base '{path}' is malformed: {reason}")]
    KnowledgeBaseMalformed { path: PathBuf, reason: String },

    /// Group name, ID or alias did not resolve
    #[error("Unknown group: {group}")]
    UnknownGroup { group: String },

    /// Serialization failure while writing a report
    #[error("Serialization error: {message}")]
    Serialization { message: String },
}

/// Conversion from DettectError to DtError
impl From<DettectError> for DtError {
    fn from(err: DettectError) -> Self {
        let message = err.to_string();
        match err {
            DettectError::FileUnreadable { path, .. } => DtError::new(DtErrorKind::NotFound)
                .with_path(path)
                .with_message(message),
            DettectError::MalformedFile { path, .. }
            | DettectError::FileTypeMismatch { path, .. } => {
                DtError::new(DtErrorKind::ValidationFailed)
                    .with_path(path)
                    .with_message(message)
            }
            DettectError::QueryParse { .. } => {
                DtError::new(DtErrorKind::InvalidQuery).with_message(message)
            }
            DettectError::KnowledgeBaseMissing { path }
            | DettectError::KnowledgeBaseMalformed { path, .. } => {
                DtError::new(DtErrorKind::KnowledgeBase)
                    .with_path(path)
                    .with_message(message)
            }
            DettectError::UnknownGroup { .. } => {
                DtError::new(DtErrorKind::InvalidInput).with_message(message)
            }
            DettectError::Serialization { .. } => {
                DtError::new(DtErrorKind::Serialization).with_message(message)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_code_op_and_path() {
        let err = DtError::new(DtErrorKind::Io)
            .with_op("write_layer")
            .with_path("output/layer.json")
            .with_message("disk full");

        let rendered = err.to_string();
        assert!(rendered.starts_with("[ERR_IO]"));
        assert!(rendered.contains("write_layer"));
        assert!(rendered.contains("disk full"));
        assert!(rendered.contains("output/layer.json"));
    }

    #[test]
    fn test_source_chain_is_rendered() {
        let inner = DtError::new(DtErrorKind::NotFound).with_message("no such file");
        let outer = DtError::new(DtErrorKind::Internal).with_source(inner);

        assert_eq!(
            outer.source_error().map(|e| e.kind()),
            Some(DtErrorKind::NotFound)
        );
        assert!(outer.to_string().contains("no such file"));
    }

    #[test]
    fn test_io_error_helper() {
        let err = io_error(
            "create_dir",
            Path::new("cache"),
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        assert_eq!(err.kind(), DtErrorKind::Io);
        assert_eq!(err.op(), Some("create_dir"));
        assert_eq!(err.path(), Some(Path::new("cache")));
    }
}
