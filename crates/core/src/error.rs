//! Error types for the treestore datastore
//!
//! This module defines all error types used throughout the system.
//! We use `thiserror` for automatic `Display` and `Error` trait implementations.

use thiserror::Error;

/// Result type alias for treestore operations
pub type Result<T> = std::result::Result<T, StoreError>;

/// Error types for the treestore datastore
#[derive(Debug, Error)]
pub enum StoreError {
    /// A value's shape does not match the declared schema at a path:
    /// unresolvable choice/case, unknown child, missing key field.
    #[error("schema mismatch: {0}")]
    SchemaMismatch(String),

    /// Malformed serialized document content (encode/decode failure)
    #[error("codec error: {0}")]
    Codec(String),

    /// Session/transaction lifecycle error (wrong state, commit failure)
    #[error("transaction error: {0}")]
    Transaction(String),

    /// Backing document engine error
    #[error("storage error: {0}")]
    Storage(String),

    /// Operation or path shape not supported by this datastore
    #[error("unsupported: {0}")]
    Unsupported(String),
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Codec(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_schema_mismatch() {
        let err = StoreError::SchemaMismatch("no child named foo".to_string());
        let msg = err.to_string();
        assert!(msg.contains("schema mismatch"));
        assert!(msg.contains("foo"));
    }

    #[test]
    fn test_error_display_codec() {
        let err = StoreError::Codec("unexpected token".to_string());
        assert!(err.to_string().contains("codec error"));
    }

    #[test]
    fn test_error_display_transaction() {
        let err = StoreError::Transaction("session not active".to_string());
        assert!(err.to_string().contains("transaction error"));
    }

    #[test]
    fn test_error_from_serde_json() {
        let result: std::result::Result<serde_json::Value, _> = serde_json::from_str("{not json");
        let err: StoreError = result.unwrap_err().into();
        assert!(matches!(err, StoreError::Codec(_)));
    }

    #[test]
    fn test_result_type_alias() {
        fn returns_result() -> Result<i32> {
            Ok(42)
        }

        assert_eq!(returns_result().unwrap(), 42);
    }
}
