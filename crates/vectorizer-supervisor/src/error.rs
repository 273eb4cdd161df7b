//! Supervisor-level error type (§4.F).

use thiserror::Error;
use vectorizer_catalog::CatalogError;
use vectorizer_worker::WorkerError;

pub type SupervisorResult<T> = Result<T, SupervisorError>;

#[derive(Debug, Error)]
pub enum SupervisorError {
    #[error("catalog unavailable: {0}")]
    Catalog(#[from] CatalogError),

    #[error("worker for vectorizer {vectorizer_id} failed fatally: {source}")]
    Worker {
        vectorizer_id: i64,
        #[source]
        source: WorkerError,
    },
}
