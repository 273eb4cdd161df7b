//! Catalog, queue-row, and worker-tracking models plus database pooling
//!
//! Owns the vocabulary of database failure modes (`CatalogError`) shared
//! by the Queue Protocol, Executor, and Worker Tracking crates, and the
//! `#[derive(Serialize, Deserialize)]` row models of §3.

pub mod error;
pub mod models;
pub mod pool;
pub mod repository;

pub use error::{CatalogError, CatalogErrorExt, CatalogOperation, CatalogResult};
pub use models::{
    ClaimedItem, DeadLetterEntry, EmbeddingStoreRow, ErrorDetails, ErrorRecord, FailureStep,
    PkColumn, PkValues, QueueEntry, Vectorizer, WorkerLiveness,
};
pub use pool::create_pool;
pub use repository::{CatalogRepository, PostgresCatalogRepository};
