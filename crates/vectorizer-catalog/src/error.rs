//! Structured error handling for the catalog/database layer
//!
//! One rich `CatalogError` enum carrying an operation-context value and an
//! optional correlation ID on every database-facing variant, rather than
//! a bag of bare `sqlx::Error` conversions.

use std::fmt;
use thiserror::Error;

/// Result type alias for catalog operations
pub type CatalogResult<T> = std::result::Result<T, CatalogError>;

/// Which catalog/queue operation was being attempted when a database
/// error occurred. Mirrors the Queue Protocol operations of §4.A plus
/// the catalog/tracking reads and writes of §4.F/§4.G.
#[derive(Debug, Clone)]
pub enum CatalogOperation {
    Claim { vectorizer_id: i64, batch_size: i64 },
    RequeueWithBackoff { vectorizer_id: i64 },
    Succeed { vectorizer_id: i64, count: usize },
    PendingCount { vectorizer_id: i64 },
    DeleteEmbeddings { vectorizer_id: i64 },
    BulkInsertEmbeddings { vectorizer_id: i64, count: usize },
    InsertErrorRecord { vectorizer_id: i64 },
    Heartbeat { worker_id: uuid::Uuid },
    LoadVectorizer { vectorizer_id: i64 },
    ListVectorizers,
    Query { description: String },
    Transaction { description: String },
    Migration { version: i64 },
}

impl fmt::Display for CatalogOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Claim {
                vectorizer_id,
                batch_size,
            } => write!(f, "claim(vectorizer={vectorizer_id}, batch_size={batch_size})"),
            Self::RequeueWithBackoff { vectorizer_id } => {
                write!(f, "requeue_with_backoff(vectorizer={vectorizer_id})")
            }
            Self::Succeed { vectorizer_id, count } => {
                write!(f, "succeed(vectorizer={vectorizer_id}, count={count})")
            }
            Self::PendingCount { vectorizer_id } => {
                write!(f, "pending_count(vectorizer={vectorizer_id})")
            }
            Self::DeleteEmbeddings { vectorizer_id } => {
                write!(f, "delete_embeddings(vectorizer={vectorizer_id})")
            }
            Self::BulkInsertEmbeddings { vectorizer_id, count } => write!(
                f,
                "bulk_insert_embeddings(vectorizer={vectorizer_id}, count={count})"
            ),
            Self::InsertErrorRecord { vectorizer_id } => {
                write!(f, "insert_error_record(vectorizer={vectorizer_id})")
            }
            Self::Heartbeat { worker_id } => write!(f, "heartbeat(worker={worker_id})"),
            Self::LoadVectorizer { vectorizer_id } => {
                write!(f, "load_vectorizer(vectorizer={vectorizer_id})")
            }
            Self::ListVectorizers => write!(f, "list_vectorizers()"),
            Self::Query { description } => write!(f, "query({description})"),
            Self::Transaction { description } => write!(f, "transaction({description})"),
            Self::Migration { version } => write!(f, "migration(version={version})"),
        }
    }
}

/// Comprehensive database error with full operation context
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("connection pool exhausted (max={max_connections}, timeout={timeout_secs}s)")]
    ConnectionPoolExhausted { max_connections: u32, timeout_secs: u64 },

    #[error("failed to create connection pool: {message}")]
    PoolCreationFailed {
        message: String,
        #[source]
        source: sqlx::Error,
    },

    #[error("database connection failed: {message}")]
    ConnectionFailed {
        message: String,
        #[source]
        source: sqlx::Error,
    },

    #[error("query timeout for operation '{operation}' (timeout={timeout_secs}s)")]
    QueryTimeout {
        operation: Box<CatalogOperation>,
        timeout_secs: u64,
        #[source]
        source: sqlx::Error,
    },

    #[error("query failed for operation '{operation}': {message}")]
    QueryFailed {
        operation: Box<CatalogOperation>,
        message: String,
        #[source]
        source: sqlx::Error,
    },

    #[error("constraint violation in table '{table}': {constraint} (operation='{operation}')")]
    ConstraintViolation {
        table: String,
        constraint: String,
        operation: Box<CatalogOperation>,
        #[source]
        source: sqlx::Error,
    },

    #[error("transaction rolled back for operation '{operation}': {reason}")]
    TransactionRollback {
        operation: Box<CatalogOperation>,
        reason: String,
        #[source]
        source: Option<sqlx::Error>,
    },

    #[error("data integrity error: {message} (operation='{operation}')")]
    DataIntegrityError {
        operation: Box<CatalogOperation>,
        message: String,
    },

    #[error("database migration failed at version {version}: {message}")]
    MigrationFailed {
        version: i64,
        message: String,
        #[source]
        source: sqlx::migrate::MigrateError,
    },

    #[error("catalog configuration error: {message}")]
    ConfigurationError { message: String },

    #[error("unexpected database state for operation '{operation}': {message}")]
    UnexpectedState {
        operation: Box<CatalogOperation>,
        message: String,
    },
}

impl CatalogError {
    /// Build a `QueryFailed` from a raw `sqlx::Error` plus operation context.
    #[must_use]
    pub fn query_failed(operation: CatalogOperation, source: sqlx::Error) -> Self {
        Self::QueryFailed {
            operation: Box::new(operation),
            message: source.to_string(),
            source,
        }
    }
}

/// Extension trait for converting `sqlx::Error` with operation context
pub trait CatalogErrorExt<T> {
    /// Convert to `CatalogError` with operation context
    ///
    /// # Errors
    /// Returns `CatalogError::QueryFailed` wrapping the underlying `sqlx::Error`.
    fn map_catalog_err(self, operation: CatalogOperation) -> CatalogResult<T>;
}

impl<T> CatalogErrorExt<T> for std::result::Result<T, sqlx::Error> {
    fn map_catalog_err(self, operation: CatalogOperation) -> CatalogResult<T> {
        self.map_err(|e| CatalogError::query_failed(operation, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operation_display_is_stable() {
        let op = CatalogOperation::Claim {
            vectorizer_id: 7,
            batch_size: 50,
        };
        assert_eq!(op.to_string(), "claim(vectorizer=7, batch_size=50)");
    }
}
