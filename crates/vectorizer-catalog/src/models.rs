//! Domain models for catalog/queue/tracking entities (§3 Data Model)

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use vectorizer_config::VectorizerConfig;

/// A primary key value of a source row. Columns are ordered and typed
/// according to the vectorizer's `pk_columns` descriptor; we keep them
/// as JSON values here since the PK shape is per-vectorizer and only
/// known at runtime.
pub type PkValues = Vec<serde_json::Value>;

/// The catalog entry binding a source table to a configuration (§3).
/// Immutable for the lifetime of a worker run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vectorizer {
    pub id: i64,
    pub source_schema: String,
    pub source_table: String,
    pub pk_columns: Vec<PkColumn>,
    /// Name of the source column the Chunker consumes as `payload_text`
    /// (§4.B). Resolved once at creation time; not re-validated per row.
    pub payload_column: String,
    pub queue_schema: String,
    pub queue_table: String,
    pub dlq_schema: String,
    pub dlq_table: String,
    pub target_schema: String,
    pub target_table: String,
    pub trigger_name: String,
    pub config: VectorizerConfig,
    pub disabled: bool,
}

/// One column of a (possibly composite) primary key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PkColumn {
    pub attname: String,
    pub typname: String,
}

/// A row of the per-vectorizer work queue (§3 Queue entry).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueEntry {
    pub pk: PkValues,
    pub queued_at: DateTime<Utc>,
    pub attempts: i32,
    pub retry_after: Option<DateTime<Utc>>,
}

/// A claimed queue entry left-joined to its current source row. `row` is
/// `None` when the source row was deleted concurrently (tombstone, §4.A
/// Edge cases).
#[derive(Debug, Clone)]
pub struct ClaimedItem {
    pub pk: PkValues,
    pub attempts: i32,
    pub row: Option<serde_json::Value>,
}

/// A row of the dead-letter table (§3 Dead-letter entry).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeadLetterEntry {
    pub pk: PkValues,
    pub attempts: i32,
    pub failure_step: FailureStep,
    pub created_at: DateTime<Utc>,
    pub error: String,
}

/// Step labels used for error attribution (§4.D, §7).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureStep {
    Loading,
    Parsing,
    Chunking,
    Formatting,
    Embedding,
    Writing,
}

impl std::fmt::Display for FailureStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Loading => "loading",
            Self::Parsing => "parsing",
            Self::Chunking => "chunking",
            Self::Formatting => "formatting",
            Self::Embedding => "embedding",
            Self::Writing => "writing",
        };
        write!(f, "{s}")
    }
}

/// A persisted chunk in the embedding store (§3 Embedding store row).
/// Unique by `(pk, chunk_seq)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingStoreRow {
    pub embedding_uuid: Uuid,
    pub pk: PkValues,
    pub chunk_seq: i32,
    pub chunk: String,
    pub embedding: Vec<f32>,
}

/// An append-only errors-table row (§3 Error record).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorRecord {
    pub vectorizer_id: i64,
    pub recorded_at: DateTime<Utc>,
    pub name: String,
    pub message: String,
    pub details: ErrorDetails,
}

/// Structured `details` payload for an [`ErrorRecord`] (§3).
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ErrorDetails {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step: Option<FailureStep>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pk: Option<PkValues>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chunk_id: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chunk: Option<String>,
}

/// A worker-liveness row (§3 Worker liveness, §4.G Worker Tracking).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerLiveness {
    pub worker_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub last_heartbeat_at: DateTime<Utc>,
    pub heartbeat_count: i64,
    pub success_count: i64,
    pub error_count: i64,
    pub last_error_at: Option<DateTime<Utc>>,
    pub last_error_message: Option<String>,
}

impl WorkerLiveness {
    /// A freshly-started worker, not yet heartbeat.
    #[must_use]
    pub fn new(worker_id: Uuid, started_at: DateTime<Utc>) -> Self {
        Self {
            worker_id,
            started_at,
            last_heartbeat_at: started_at,
            heartbeat_count: 0,
            success_count: 0,
            error_count: 0,
            last_error_at: None,
            last_error_message: None,
        }
    }
}
