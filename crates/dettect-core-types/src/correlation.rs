//! Correlation types for invocation tracking
//!
//! Every command-line invocation (and every command typed into an
//! interactive session) gets its own `InvocationId`, carried on all log
//! events emitted while it is dispatched.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a single dispatched invocation
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InvocationId(String);

impl InvocationId {
    /// Generate a new InvocationId using UUIDv7
    pub fn new() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    /// Get the string representation
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Create from an existing string (for deserialization)
    pub fn from_string(s: String) -> Self {
        Self(s)
    }
}

impl Default for InvocationId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for InvocationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invocation_id_generation() {
        let id1 = InvocationId::new();
        let id2 = InvocationId::new();

        assert_ne!(id1, id2);
        assert!(!id1.as_str().is_empty());
    }

    #[test]
    fn test_invocation_id_display() {
        let id = InvocationId::new();
        assert_eq!(format!("{}", id), id.as_str());
    }

    #[test]
    fn test_serialization() {
        let id = InvocationId::from_string("inv-1".to_string());
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"inv-1\"");
        let deserialized: InvocationId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, deserialized);
    }
}
