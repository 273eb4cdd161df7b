//! `PostgresQueue`: the only real-world `QueueProtocol` implementation.
//!
//! SQL shape grounded on the original vectorizer's `fetch_work_query` CTE
//! (candidate rows under `FOR UPDATE SKIP LOCKED`, then a per-PK
//! `pg_try_advisory_xact_lock`, then delete-and-left-join), generalized from
//! a single fixed table to the dynamic per-vectorizer queue/source/dlq
//! tables named in the catalog (§4.A).

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{PgConnection, Row};
use std::collections::HashMap;
use vectorizer_catalog::{
    CatalogError, CatalogErrorExt, CatalogOperation, CatalogResult, ClaimedItem, ErrorDetails,
    FailureStep, PkValues, Vectorizer,
};
use vectorizer_config::RetryConfig;

use crate::backoff::backoff_duration_default;
use crate::ident;
use crate::protocol::QueueProtocol;

const ERRORS_SCHEMA: &str = "ai";
const ERRORS_TABLE: &str = "vectorizer_errors";

/// Canonical text key for a PK tuple, used as an in-process `HashMap` key
/// (`serde_json::Value` has no `Eq`/`Hash` because of its float variant).
/// Never compared against Postgres' own jsonb text rendering - its
/// canonical form differs from this one (see the jsonb-vs-text note on
/// `claim`'s matching predicates below).
fn pk_key(pk: &PkValues) -> String {
    serde_json::Value::Array(pk.clone()).to_string()
}

fn pk_columns_sql(vectorizer: &Vectorizer) -> String {
    let names: Vec<&str> = vectorizer
        .pk_columns
        .iter()
        .map(|c| c.attname.as_str())
        .collect();
    ident::column_list(&names)
}

/// `PostgreSQL` implementation of [`QueueProtocol`], one instance shared by
/// every Worker/Executor in the process.
#[derive(Debug, Clone, Copy, Default)]
pub struct PostgresQueue;

impl PostgresQueue {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    async fn insert_error_record(
        conn: &mut PgConnection,
        vectorizer: &Vectorizer,
        name: &str,
        message: &str,
        details: &ErrorDetails,
    ) -> CatalogResult<()> {
        let table = ident::qualified(ERRORS_SCHEMA, ERRORS_TABLE);
        let details_json = serde_json::to_value(details).unwrap_or(serde_json::Value::Null);

        let sql = format!(
            "INSERT INTO {table} (id, recorded_at, name, message, details) VALUES ($1, $2, $3, $4, $5)"
        );
        sqlx::query(&sql)
            .bind(vectorizer.id)
            .bind(Utc::now())
            .bind(name)
            .bind(message)
            .bind(details_json)
            .execute(conn)
            .await
            .map_catalog_err(CatalogOperation::InsertErrorRecord {
                vectorizer_id: vectorizer.id,
            })?;
        Ok(())
    }
}

#[async_trait]
impl QueueProtocol for PostgresQueue {
    async fn claim(
        &self,
        conn: &mut PgConnection,
        vectorizer: &Vectorizer,
        batch_size: i64,
    ) -> CatalogResult<Vec<ClaimedItem>> {
        let operation = CatalogOperation::Claim {
            vectorizer_id: vectorizer.id,
            batch_size,
        };
        let queue_table = ident::qualified(&vectorizer.queue_schema, &vectorizer.queue_table);
        let pk_cols = pk_columns_sql(vectorizer);

        let candidates_sql = format!(
            "SELECT jsonb_build_array({pk_cols}) AS pk, attempts \
             FROM {queue_table} \
             WHERE retry_after IS NULL OR retry_after <= now() \
             ORDER BY queued_at \
             LIMIT $1 \
             FOR UPDATE SKIP LOCKED"
        );
        let candidate_rows = sqlx::query(&candidates_sql)
            .bind(batch_size)
            .fetch_all(&mut *conn)
            .await
            .map_catalog_err(operation.clone())?;

        // Dedup PKs (multiple queue rows may debounce the same PK) and track
        // the highest attempts count seen among the duplicates.
        let mut max_attempts: HashMap<String, (PkValues, i32)> = HashMap::new();
        for row in &candidate_rows {
            let pk: serde_json::Value = row.try_get("pk").map_err(|e| {
                CatalogError::query_failed(operation.clone(), e)
            })?;
            let attempts: i32 = row.try_get("attempts").map_err(|e| {
                CatalogError::query_failed(operation.clone(), e)
            })?;
            let pk_values = pk.as_array().cloned().unwrap_or_default();
            let key = pk_key(&pk_values);
            max_attempts
                .entry(key)
                .and_modify(|(_, a)| *a = (*a).max(attempts))
                .or_insert((pk_values, attempts));
        }

        if max_attempts.is_empty() {
            return Ok(Vec::new());
        }

        // Attempt a transaction-scoped advisory lock per distinct PK.
        let mut locked: HashMap<String, (PkValues, i32)> = HashMap::new();
        for (key, (pk_values, attempts)) in &max_attempts {
            let lock_sql =
                "SELECT pg_try_advisory_xact_lock($1, hashtext($2)) AS got_lock".to_string();
            let row = sqlx::query(&lock_sql)
                .bind(vectorizer.id as i32)
                .bind(key.as_str())
                .fetch_one(&mut *conn)
                .await
                .map_catalog_err(operation.clone())?;
            let got_lock: bool = row.try_get("got_lock").map_err(|e| {
                CatalogError::query_failed(operation.clone(), e)
            })?;
            if got_lock {
                locked.insert(key.clone(), (pk_values.clone(), *attempts));
            }
        }

        if locked.is_empty() {
            return Ok(Vec::new());
        }

        // Bound as `jsonb[]`, not text: Postgres' canonical jsonb text
        // rendering (`[1, "a"]`, space after the comma) doesn't match
        // `serde_json`'s compact rendering (`[1,"a"]`) for composite PKs,
        // so comparing as text silently drops every multi-column PK.
        let locked_values: Vec<serde_json::Value> = locked
            .values()
            .map(|(pk_values, _)| serde_json::Value::Array(pk_values.clone()))
            .collect();

        // Collapse duplicate queue entries for the locked PKs.
        let delete_sql =
            format!("DELETE FROM {queue_table} WHERE jsonb_build_array({pk_cols}) = ANY($1::jsonb[])");
        sqlx::query(&delete_sql)
            .bind(&locked_values)
            .execute(&mut *conn)
            .await
            .map_catalog_err(operation.clone())?;

        // Left-join to the source table: rows missing here are tombstones.
        let source_table = ident::qualified(&vectorizer.source_schema, &vectorizer.source_table);
        let fetch_sql = format!(
            "SELECT jsonb_build_array({pk_cols}) AS pk, to_jsonb({source_table}) AS row \
             FROM {source_table} \
             WHERE jsonb_build_array({pk_cols}) = ANY($1::jsonb[])"
        );
        let source_rows = sqlx::query(&fetch_sql)
            .bind(&locked_values)
            .fetch_all(&mut *conn)
            .await
            .map_catalog_err(operation.clone())?;

        let mut found_rows: HashMap<String, serde_json::Value> = HashMap::new();
        for row in &source_rows {
            let pk: serde_json::Value = row.try_get("pk").map_err(|e| {
                CatalogError::query_failed(operation.clone(), e)
            })?;
            let data: serde_json::Value = row.try_get("row").map_err(|e| {
                CatalogError::query_failed(operation.clone(), e)
            })?;
            found_rows.insert(pk.to_string(), data);
        }

        let mut items: Vec<ClaimedItem> = locked
            .into_iter()
            .map(|(key, (pk_values, attempts))| {
                let pk_json = serde_json::Value::Array(pk_values.clone()).to_string();
                ClaimedItem {
                    pk: pk_values,
                    attempts: attempts + 1,
                    row: found_rows.get(&pk_json).or_else(|| found_rows.get(&key)).cloned(),
                }
            })
            .collect();
        items.sort_by(|a, b| pk_key(&a.pk).cmp(&pk_key(&b.pk)));

        Ok(items)
    }

    async fn requeue_with_backoff(
        &self,
        conn: &mut PgConnection,
        vectorizer: &Vectorizer,
        retry: &RetryConfig,
        pk: &PkValues,
        attempts: i32,
        failure_step: FailureStep,
        error: &str,
    ) -> CatalogResult<()> {
        let operation = CatalogOperation::RequeueWithBackoff {
            vectorizer_id: vectorizer.id,
        };
        let details = ErrorDetails {
            step: Some(failure_step),
            pk: Some(pk.clone()),
            error_reason: Some(error.to_string()),
            ..ErrorDetails::default()
        };

        if attempts < i32::try_from(retry.max_attempts).unwrap_or(i32::MAX) {
            let retry_after = Utc::now() + backoff_duration_default(attempts.max(0) as u32, retry);
            let queue_table = ident::qualified(&vectorizer.queue_schema, &vectorizer.queue_table);

            // `claim` already deleted this PK's queue row(s) as part of
            // collapsing duplicates, so retrying means re-inserting one
            // with the carried-forward attempt count, not updating a row
            // that's no longer there.
            let pk_cols = pk_columns_sql(vectorizer);
            let cast_columns: Vec<String> = vectorizer
                .pk_columns
                .iter()
                .enumerate()
                .map(|(index, column)| format!("(pk_json->>{index})::{}", column.typname))
                .collect();
            let sql = format!(
                "INSERT INTO {queue_table} ({pk_cols}, attempts, retry_after, queued_at) \
                 SELECT {columns}, $2, $3, now() FROM (SELECT $1::jsonb AS pk_json) AS src",
                columns = cast_columns.join(", ")
            );
            sqlx::query(&sql)
                .bind(serde_json::Value::Array(pk.clone()))
                .bind(attempts)
                .bind(retry_after)
                .execute(&mut *conn)
                .await
                .map_catalog_err(operation.clone())?;

            Self::insert_error_record(
                conn,
                vectorizer,
                "chunk processing failed, retrying",
                error,
                &details,
            )
            .await?;
        } else {
            let dlq_table = ident::qualified(&vectorizer.dlq_schema, &vectorizer.dlq_table);
            let pk_cols = pk_columns_sql(vectorizer);
            let cast_columns: Vec<String> = vectorizer
                .pk_columns
                .iter()
                .enumerate()
                .map(|(index, column)| format!("(pk_json->>{index})::{}", column.typname))
                .collect();
            let insert_sql = format!(
                "INSERT INTO {dlq_table} ({pk_cols}, attempts, failure_step, created_at, error) \
                 SELECT {columns}, $2, $3, $4, $5 FROM (SELECT $1::jsonb AS pk_json) AS src",
                columns = cast_columns.join(", ")
            );
            sqlx::query(&insert_sql)
                .bind(serde_json::Value::Array(pk.clone()))
                .bind(attempts)
                .bind(failure_step.to_string())
                .bind(Utc::now())
                .bind(error)
                .execute(&mut *conn)
                .await
                .map_catalog_err(operation.clone())?;

            // No queue row to delete here: `claim` already removed it when
            // it collapsed this PK's duplicates, and the retry branch above
            // is the only path that re-inserts one.
            Self::insert_error_record(
                conn,
                vectorizer,
                "chunk processing failed, dead-lettered",
                error,
                &details,
            )
            .await?;
        }

        Ok(())
    }

    async fn succeed(
        &self,
        conn: &mut PgConnection,
        vectorizer: &Vectorizer,
        pks: &[PkValues],
    ) -> CatalogResult<()> {
        if pks.is_empty() {
            return Ok(());
        }
        let operation = CatalogOperation::Succeed {
            vectorizer_id: vectorizer.id,
            count: pks.len(),
        };
        let values: Vec<serde_json::Value> = pks.iter().map(|pk| serde_json::Value::Array(pk.clone())).collect();
        let pk_cols = pk_columns_sql(vectorizer);
        let queue_table = ident::qualified(&vectorizer.queue_schema, &vectorizer.queue_table);
        let sql = format!(
            "DELETE FROM {queue_table} WHERE jsonb_build_array({pk_cols}) = ANY($1::jsonb[]) AND attempts >= 1"
        );
        sqlx::query(&sql)
            .bind(&values)
            .execute(conn)
            .await
            .map_catalog_err(operation)?;
        Ok(())
    }

    async fn pending_count(
        &self,
        conn: &mut PgConnection,
        vectorizer: &Vectorizer,
        exact: bool,
    ) -> CatalogResult<i64> {
        let operation = CatalogOperation::PendingCount {
            vectorizer_id: vectorizer.id,
        };
        let queue_table = ident::qualified(&vectorizer.queue_schema, &vectorizer.queue_table);

        let sql = if exact {
            format!("SELECT COUNT(*) AS count FROM {queue_table}")
        } else {
            // A fast lower-bound estimate via catalog statistics, falling
            // back to 0 rows estimated means "unknown, assume some work".
            format!(
                "SELECT COALESCE(reltuples, 0)::bigint AS count FROM pg_class \
                 WHERE oid = to_regclass('{queue_table}')"
            )
        };
        let row = sqlx::query(&sql)
            .fetch_one(conn)
            .await
            .map_catalog_err(operation.clone())?;
        let count: i64 = row
            .try_get("count")
            .map_err(|e| CatalogError::query_failed(operation, e))?;
        Ok(count.max(0))
    }
}
