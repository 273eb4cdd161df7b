//! The Executor (§4.D): one claimed batch, start to finish, inside a
//! single transaction.

use crate::error::{ExecutorError, ExecutorResult};
use async_trait::async_trait;
use sqlx::PgPool;
use std::fmt::Write as _;
use std::sync::Arc;
use uuid::Uuid;
use vectorizer_catalog::{
    CatalogError, CatalogErrorExt, CatalogOperation, ErrorDetails, FailureStep, PkValues,
    Vectorizer,
};
use vectorizer_chunking::{ChunkerExt, FormatterExt};
use vectorizer_config::RetryConfig;
use vectorizer_embeddings::{batch_and_embed, Embedder};
use vectorizer_queue::{ident, QueueProtocol};

/// Runs one batch at a time for a single vectorizer. `&self`-based so many
/// tokio tasks can share one `Arc<Executor>` (§4.E spawns `concurrency`
/// tasks calling `run_once` on the same shared resources).
///
/// The Executor is a thin orchestrator over independently-owned Queue/Embedder
/// abstractions, not a monolith that reimplements either.
pub struct Executor {
    pool: PgPool,
    vectorizer: Vectorizer,
    queue: Arc<dyn QueueProtocol>,
    embedder: Arc<dyn Embedder>,
    retry: RetryConfig,
    batch_size: i64,
}

/// Trait seam for the Worker run loop (§4.E), so retry/backoff/shutdown
/// behavior can be unit-tested against a scripted double instead of a real
/// `Executor` (which always needs a live Postgres connection).
#[async_trait]
pub trait ExecutorLike: Send + Sync {
    async fn run_once(&self) -> ExecutorResult<usize>;
}

#[async_trait]
impl ExecutorLike for Executor {
    async fn run_once(&self) -> ExecutorResult<usize> {
        self.run_once().await
    }
}

/// One chunk awaiting embedding, keyed back to its originating row.
struct PendingRecord {
    pk: PkValues,
    chunk_seq: i32,
    chunk: String,
}

impl Executor {
    #[must_use]
    pub fn new(
        pool: PgPool,
        vectorizer: Vectorizer,
        queue: Arc<dyn QueueProtocol>,
        embedder: Arc<dyn Embedder>,
        retry: RetryConfig,
        batch_size: i64,
    ) -> Self {
        Self {
            pool,
            vectorizer,
            queue,
            embedder,
            retry,
            batch_size,
        }
    }

    /// Run one batch (§4.D steps 1-9). Returns the number of source rows
    /// (not chunks) successfully embedded in this batch.
    pub async fn run_once(&self) -> ExecutorResult<usize> {
        let mut tx = self.pool.begin().await.map_err(|e| {
            ExecutorError::Catalog(CatalogError::query_failed(
                CatalogOperation::Transaction {
                    description: "begin batch".to_string(),
                },
                e,
            ))
        })?;

        let items = self
            .queue
            .claim(&mut tx, &self.vectorizer, self.batch_size)
            .await?;
        if items.is_empty() {
            tx.commit().await.map_err(|e| {
                ExecutorError::Catalog(CatalogError::query_failed(
                    CatalogOperation::Transaction {
                        description: "commit empty batch".to_string(),
                    },
                    e,
                ))
            })?;
            return Ok(0);
        }

        let (alive, tombstones): (Vec<_>, Vec<_>) =
            items.into_iter().partition(|item| item.row.is_some());

        if !tombstones.is_empty() {
            let pks: Vec<PkValues> = tombstones.iter().map(|item| item.pk.clone()).collect();
            self.delete_embeddings(&mut tx, &pks).await?;
        }

        let mut pending = Vec::new();
        let mut per_chunk_errors: Vec<(PkValues, FailureStep, String)> = Vec::new();
        let mut alive_items = Vec::with_capacity(alive.len());

        for item in &alive {
            alive_items.push((item.pk.clone(), item.attempts));
            let Some(row) = item.row.as_ref() else {
                continue;
            };
            match self.chunk_and_format_row(row) {
                Ok(chunks) => {
                    for (seq, chunk) in chunks.into_iter().enumerate() {
                        pending.push(PendingRecord {
                            pk: item.pk.clone(),
                            chunk_seq: i32::try_from(seq).unwrap_or(i32::MAX),
                            chunk,
                        });
                    }
                }
                Err(err) => {
                    per_chunk_errors.push((item.pk.clone(), err.step(), err.to_string()));
                }
            }
        }

        let mut final_rows = Vec::with_capacity(pending.len());
        // Whole-batch embedding failure (§4.E steps 4/5): a retryable
        // failure here means none of this batch's chunks embedded, so
        // every alive pk goes back to the queue with backoff rather than
        // failing the whole run. A fatal failure (auth, etc.) propagates
        // and aborts the transaction, leaving the batch claimed for the
        // Worker to record and stop.
        let mut batch_retry: Option<(FailureStep, String)> = None;
        if !pending.is_empty() {
            let documents: Vec<String> = pending.iter().map(|p| p.chunk.clone()).collect();
            let token_counter = self.embedder.token_counter();
            match batch_and_embed(&self.embedder, &documents, token_counter.as_ref()).await {
                Ok(results) => {
                    for (record, result) in pending.into_iter().zip(results.into_iter()) {
                        match result {
                            Ok(vector) => {
                                final_rows.push((record.pk, record.chunk_seq, record.chunk, vector));
                            }
                            Err(reason) => {
                                per_chunk_errors.push((record.pk, FailureStep::Embedding, reason));
                            }
                        }
                    }
                }
                Err(err) => {
                    if err.disposition() == vectorizer_common::Disposition::Fatal {
                        return Err(ExecutorError::Embedding(err));
                    }
                    batch_retry = Some((FailureStep::Embedding, err.to_string()));
                }
            }
        }

        let alive_pks: Vec<PkValues> = alive_items.iter().map(|(pk, _)| pk.clone()).collect();
        // A batch-level retry means none of these rows got new embeddings
        // this pass; leave whatever's already stored for them untouched
        // rather than deleting it ahead of a write that isn't happening.
        if batch_retry.is_none() && !alive_pks.is_empty() {
            self.delete_embeddings(&mut tx, &alive_pks).await?;
        }
        if !final_rows.is_empty() {
            self.bulk_copy_embeddings(&mut tx, &final_rows).await?;
        }

        for (pk, step, message) in &per_chunk_errors {
            self.insert_chunk_error(&mut tx, pk, *step, message).await?;
        }

        let succeeded_count = if let Some((step, message)) = &batch_retry {
            for (pk, attempts) in &alive_items {
                self.queue
                    .requeue_with_backoff(&mut tx, &self.vectorizer, &self.retry, pk, *attempts, *step, message)
                    .await?;
            }
            0
        } else {
            alive_pks.len()
        };

        let mut succeeded_pks = if batch_retry.is_some() {
            Vec::new()
        } else {
            alive_pks
        };
        succeeded_pks.extend(tombstones.iter().map(|item| item.pk.clone()));
        if !succeeded_pks.is_empty() {
            self.queue.succeed(&mut tx, &self.vectorizer, &succeeded_pks).await?;
        }

        tx.commit().await.map_err(|e| {
            ExecutorError::Catalog(CatalogError::query_failed(
                CatalogOperation::Transaction {
                    description: "commit batch".to_string(),
                },
                e,
            ))
        })?;

        Ok(succeeded_count)
    }

    /// Run `Chunker` then `Formatter` over one source row, per the
    /// vectorizer's config (§4.B).
    fn chunk_and_format_row(&self, row: &serde_json::Value) -> Result<Vec<String>, crate::error::ExecutorError> {
        let object = row.as_object().ok_or_else(|| ExecutorError::MalformedRow {
            pk: String::new(),
            message: "source row is not a JSON object".to_string(),
        })?;

        let payload = object
            .get(&self.vectorizer.payload_column)
            .and_then(serde_json::Value::as_str)
            .unwrap_or_default();

        let raw_chunks = self.vectorizer.config.chunking.implementation.apply(payload)?;

        let mut formatted = Vec::with_capacity(raw_chunks.len());
        for chunk in raw_chunks {
            let value = self.vectorizer.config.formatting.implementation.format(&chunk, object)?;
            formatted.push(value);
        }
        Ok(formatted)
    }

    async fn delete_embeddings(&self, tx: &mut sqlx::PgConnection, pks: &[PkValues]) -> ExecutorResult<()> {
        if pks.is_empty() {
            return Ok(());
        }
        let operation = CatalogOperation::DeleteEmbeddings {
            vectorizer_id: self.vectorizer.id,
        };
        let table = ident::qualified(&self.vectorizer.target_schema, &self.vectorizer.target_table);
        let pk_cols: Vec<&str> = self
            .vectorizer
            .pk_columns
            .iter()
            .map(|c| c.attname.as_str())
            .collect();
        let pk_list = pk_cols.iter().map(|c| ident::quote(c)).collect::<Vec<_>>().join(", ");
        // Bound as `jsonb[]`, not text: Postgres' canonical jsonb text
        // rendering doesn't match `serde_json`'s compact rendering for
        // composite PKs, so a text comparison silently drops them.
        let values: Vec<serde_json::Value> = pks.iter().map(|pk| serde_json::Value::Array(pk.clone())).collect();

        let sql = format!("DELETE FROM {table} WHERE jsonb_build_array({pk_list}) = ANY($1::jsonb[])");
        sqlx::query(&sql)
            .bind(&values)
            .execute(tx)
            .await
            .map_catalog_err(operation)?;
        Ok(())
    }

    async fn bulk_copy_embeddings(
        &self,
        conn: &mut sqlx::PgConnection,
        rows: &[(PkValues, i32, String, Vec<f32>)],
    ) -> ExecutorResult<()> {
        let operation = CatalogOperation::BulkInsertEmbeddings {
            vectorizer_id: self.vectorizer.id,
            count: rows.len(),
        };
        let table = ident::qualified(&self.vectorizer.target_schema, &self.vectorizer.target_table);
        let pk_cols: Vec<&str> = self
            .vectorizer
            .pk_columns
            .iter()
            .map(|c| c.attname.as_str())
            .collect();
        let pk_list = pk_cols.iter().map(|c| ident::quote(c)).collect::<Vec<_>>().join(", ");

        let copy_sql =
            format!("COPY {table} (embedding_uuid, {pk_list}, chunk_seq, chunk, embedding) FROM STDIN WITH (FORMAT text)");

        let mut copy = conn
            .copy_in_raw(&copy_sql)
            .await
            .map_err(|e| CatalogError::query_failed(operation.clone(), e))?;

        let mut buffer = String::new();
        for (pk, chunk_seq, chunk, vector) in rows {
            write!(buffer, "{}", Uuid::new_v4()).ok();
            for value in pk {
                buffer.push('\t');
                write_copy_field(&mut buffer, &json_scalar_to_text(value));
            }
            buffer.push('\t');
            write!(buffer, "{chunk_seq}").ok();
            buffer.push('\t');
            write_copy_field(&mut buffer, chunk);
            buffer.push('\t');
            write_copy_field(&mut buffer, &vector_literal(vector));
            buffer.push('\n');
        }

        copy.send(buffer.into_bytes())
            .await
            .map_err(|e| CatalogError::query_failed(operation.clone(), e))?;
        copy.finish().await.map_err(|e| CatalogError::query_failed(operation, e))?;
        Ok(())
    }

    async fn insert_chunk_error(
        &self,
        tx: &mut sqlx::PgConnection,
        pk: &PkValues,
        step: FailureStep,
        message: &str,
    ) -> ExecutorResult<()> {
        let operation = CatalogOperation::InsertErrorRecord {
            vectorizer_id: self.vectorizer.id,
        };
        let details = ErrorDetails {
            step: Some(step),
            pk: Some(pk.clone()),
            error_reason: Some(message.to_string()),
            ..ErrorDetails::default()
        };
        let details_json = serde_json::to_value(&details).unwrap_or(serde_json::Value::Null);

        let sql = "INSERT INTO ai.vectorizer_errors (id, recorded_at, name, message, details) VALUES ($1, $2, $3, $4, $5)";
        sqlx::query(sql)
            .bind(self.vectorizer.id)
            .bind(chrono::Utc::now())
            .bind("chunk embedding failed")
            .bind(message)
            .bind(details_json)
            .execute(tx)
            .await
            .map_catalog_err(operation)?;
        Ok(())
    }
}

fn write_copy_field(buffer: &mut String, value: &str) {
    for ch in value.chars() {
        match ch {
            '\\' => buffer.push_str("\\\\"),
            '\t' => buffer.push_str("\\t"),
            '\n' => buffer.push_str("\\n"),
            '\r' => buffer.push_str("\\r"),
            other => buffer.push(other),
        }
    }
}

fn json_scalar_to_text(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn vector_literal(vector: &[f32]) -> String {
    let mut out = String::from("[");
    for (index, value) in vector.iter().enumerate() {
        if index > 0 {
            out.push(',');
        }
        let _ = write!(out, "{value}");
    }
    out.push(']');
    out
}
