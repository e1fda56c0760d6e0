//! # Store Error Types
//!
//! Error types for document store operations.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Propagation                                    │
//! │                                                                         │
//! │  SQLite Error (sqlx::Error) / JSON Error (serde_json::Error)           │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  StoreError (this module) ← Adds context and categorization            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  LedgerError (in stockbook-ledger) ← Wrapped as Storage                │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Caller decides: retry, surface, or degrade                            │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

/// Document store operation errors.
///
/// These errors wrap sqlx and serde_json errors and provide additional
/// context for debugging and caller decisions.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Document not found in the store.
    ///
    /// ## When This Occurs
    /// - A typed read requires a document that does not exist
    /// - An Update op targets a missing document (the whole batch aborts)
    #[error("{collection}/{id} not found")]
    NotFound { collection: String, id: String },

    /// A version precondition did not hold at commit time.
    ///
    /// ## When This Occurs
    /// - Another writer committed the document between read and commit
    /// - Callers are expected to re-read and retry
    #[error("version conflict on {collection}/{id}: expected v{expected}, found v{actual}")]
    VersionConflict {
        collection: String,
        id: String,
        expected: u64,
        actual: u64,
    },

    /// A stored document body could not be interpreted.
    ///
    /// ## When This Occurs
    /// - Body is not valid JSON or not a JSON object
    /// - An Increment targets a non-integer field
    #[error("corrupted document {collection}/{id}: {reason}")]
    Corrupted {
        collection: String,
        id: String,
        reason: String,
    },

    /// JSON serialization or deserialization failed.
    #[error("serialization failed: {0}")]
    Serialization(String),

    /// Database connection failed.
    ///
    /// ## When This Occurs
    /// - Database file doesn't exist and can't be created
    /// - File permissions issue
    /// - Disk full
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// Migration failed.
    #[error("migration failed: {0}")]
    MigrationFailed(String),

    /// Query execution failed.
    #[error("query failed: {0}")]
    QueryFailed(String),

    /// Pool exhausted (all connections in use).
    #[error("connection pool exhausted")]
    PoolExhausted,

    /// Internal store error.
    #[error("internal store error: {0}")]
    Internal(String),
}

impl StoreError {
    /// Creates a NotFound error for a given collection and document ID.
    pub fn not_found(collection: impl Into<String>, id: impl Into<String>) -> Self {
        StoreError::NotFound {
            collection: collection.into(),
            id: id.into(),
        }
    }

    /// Creates a Corrupted error with a reason.
    pub fn corrupted(
        collection: impl Into<String>,
        id: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        StoreError::Corrupted {
            collection: collection.into(),
            id: id.into(),
            reason: reason.into(),
        }
    }

    /// True when a commit failed only because another writer got there first.
    ///
    /// Retryable: re-read the documents and rebuild the batch.
    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::VersionConflict { .. })
    }
}

/// Convert sqlx errors to StoreError.
///
/// ## Error Mapping
/// ```text
/// sqlx::Error::RowNotFound    → StoreError::NotFound
/// sqlx::Error::Database       → StoreError::QueryFailed
/// sqlx::Error::PoolTimedOut   → StoreError::PoolExhausted
/// Other                       → StoreError::Internal
/// ```
impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => StoreError::NotFound {
                collection: "unknown".to_string(),
                id: "unknown".to_string(),
            },

            sqlx::Error::Database(db_err) => StoreError::QueryFailed(db_err.message().to_string()),

            sqlx::Error::PoolTimedOut => StoreError::PoolExhausted,

            sqlx::Error::PoolClosed => StoreError::ConnectionFailed("pool is closed".to_string()),

            _ => StoreError::Internal(err.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for StoreError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        StoreError::MigrationFailed(err.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Serialization(err.to_string())
    }
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = StoreError::not_found("products", "p-1");
        assert_eq!(err.to_string(), "products/p-1 not found");

        let err = StoreError::VersionConflict {
            collection: "products".to_string(),
            id: "p-1".to_string(),
            expected: 3,
            actual: 4,
        };
        assert_eq!(
            err.to_string(),
            "version conflict on products/p-1: expected v3, found v4"
        );
    }

    #[test]
    fn test_conflict_detection() {
        let conflict = StoreError::VersionConflict {
            collection: "products".to_string(),
            id: "p-1".to_string(),
            expected: 1,
            actual: 2,
        };
        assert!(conflict.is_conflict());
        assert!(!StoreError::PoolExhausted.is_conflict());
    }

    #[test]
    fn test_serde_error_conversion() {
        let bad: Result<i64, _> = serde_json::from_str("not json");
        let err: StoreError = bad.unwrap_err().into();
        assert!(matches!(err, StoreError::Serialization(_)));
    }
}
