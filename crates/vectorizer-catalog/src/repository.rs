//! Catalog reads: the set of configured vectorizers and their full config
//! (§3, §4.F "all" discovery).

use crate::error::{CatalogError, CatalogErrorExt, CatalogOperation, CatalogResult};
use crate::models::{PkColumn, Vectorizer};
use async_trait::async_trait;
use sqlx::{PgPool, Row};

/// Catalog reads needed by the Supervisor (§4.F) to discover and load
/// vectorizers. Object-safe so the Supervisor can hold an
/// `Arc<dyn CatalogRepository>`.
#[async_trait]
pub trait CatalogRepository: Send + Sync {
    /// IDs of every non-disabled vectorizer (§4.F "all" mode).
    async fn list_vectorizer_ids(&self) -> CatalogResult<Vec<i64>>;

    /// Load one vectorizer's full catalog entry, or `None` if it no
    /// longer exists (deleted between discovery and dispatch).
    async fn load_vectorizer(&self, vectorizer_id: i64) -> CatalogResult<Option<Vectorizer>>;

    /// Whether this installation has Worker Tracking (§4.G) turned on.
    /// Defaults to `false` when the setting row is absent.
    async fn worker_tracking_enabled(&self) -> CatalogResult<bool>;
}

/// `ai.vectorizer` reads against a real Postgres catalog.
pub struct PostgresCatalogRepository {
    pool: PgPool,
}

impl PostgresCatalogRepository {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CatalogRepository for PostgresCatalogRepository {
    async fn list_vectorizer_ids(&self) -> CatalogResult<Vec<i64>> {
        let operation = CatalogOperation::ListVectorizers;
        let rows = sqlx::query("SELECT id FROM ai.vectorizer WHERE NOT disabled")
            .fetch_all(&self.pool)
            .await
            .map_catalog_err(operation)?;
        Ok(rows.iter().map(|row| row.get::<i64, _>("id")).collect())
    }

    async fn load_vectorizer(&self, vectorizer_id: i64) -> CatalogResult<Option<Vectorizer>> {
        let operation = CatalogOperation::LoadVectorizer { vectorizer_id };
        let row = sqlx::query(
            "SELECT id, source_schema, source_table, payload_column, pk_columns, \
             queue_schema, queue_table, dlq_schema, dlq_table, \
             target_schema, target_table, trigger_name, config, disabled \
             FROM ai.vectorizer WHERE id = $1",
        )
        .bind(vectorizer_id)
        .fetch_optional(&self.pool)
        .await
        .map_catalog_err(operation)?;

        let Some(row) = row else {
            return Ok(None);
        };

        let pk_columns: Vec<PkColumn> = serde_json::from_value(row.get("pk_columns"))
            .map_err(|e| integrity_error(vectorizer_id, "pk_columns", &e))?;
        let config = serde_json::from_value(row.get("config"))
            .map_err(|e| integrity_error(vectorizer_id, "config", &e))?;

        Ok(Some(Vectorizer {
            id: row.get("id"),
            source_schema: row.get("source_schema"),
            source_table: row.get("source_table"),
            pk_columns,
            payload_column: row.get("payload_column"),
            queue_schema: row.get("queue_schema"),
            queue_table: row.get("queue_table"),
            dlq_schema: row.get("dlq_schema"),
            dlq_table: row.get("dlq_table"),
            target_schema: row.get("target_schema"),
            target_table: row.get("target_table"),
            trigger_name: row.get("trigger_name"),
            config,
            disabled: row.get("disabled"),
        }))
    }

    async fn worker_tracking_enabled(&self) -> CatalogResult<bool> {
        let operation = CatalogOperation::Query {
            description: "worker_tracking_enabled".to_string(),
        };
        let row = sqlx::query(
            "SELECT value::boolean AS enabled FROM ai.vectorizer_settings WHERE key = 'worker_tracking_enabled'",
        )
        .fetch_optional(&self.pool)
        .await
        .map_catalog_err(operation)?;
        Ok(row.map_or(false, |row| row.get::<bool, _>("enabled")))
    }
}

fn integrity_error(vectorizer_id: i64, column: &str, source: &serde_json::Error) -> CatalogError {
    CatalogError::DataIntegrityError {
        operation: Box::new(CatalogOperation::LoadVectorizer { vectorizer_id }),
        message: format!("malformed {column}: {source}"),
    }
}
