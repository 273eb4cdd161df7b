//! The `QueueProtocol` trait (§4.A): claim, requeue, succeed, pending_count.
//!
//! Implementations participate in the caller's transaction rather than
//! opening their own, since the Executor (§4.D) must hold the claim's
//! advisory locks for the lifetime of the whole batch.

use async_trait::async_trait;
use sqlx::PgConnection;
use vectorizer_catalog::{CatalogResult, ClaimedItem, FailureStep, PkValues, Vectorizer};
use vectorizer_config::RetryConfig;

/// Queue operations available to an Executor (§4.A).
///
/// Object-safe so a single `Arc<dyn QueueProtocol>` can be shared across all
/// Executors of a Worker, real or mocked.
#[async_trait]
pub trait QueueProtocol: Send + Sync {
    /// Claim up to `batch_size` queue entries, left-joined to their current
    /// source rows. Must run inside `conn`'s transaction: the advisory locks
    /// taken here are released only when that transaction ends.
    async fn claim(
        &self,
        conn: &mut PgConnection,
        vectorizer: &Vectorizer,
        batch_size: i64,
    ) -> CatalogResult<Vec<ClaimedItem>>;

    /// Schedule a retry for `pk`, or dead-letter it if `attempts` already
    /// reached `retry.max_attempts`.
    async fn requeue_with_backoff(
        &self,
        conn: &mut PgConnection,
        vectorizer: &Vectorizer,
        retry: &RetryConfig,
        pk: &PkValues,
        attempts: i32,
        failure_step: FailureStep,
        error: &str,
    ) -> CatalogResult<()>;

    /// Remove claimed, successfully-processed PKs from the queue.
    async fn succeed(
        &self,
        conn: &mut PgConnection,
        vectorizer: &Vectorizer,
        pks: &[PkValues],
    ) -> CatalogResult<()>;

    /// Queue depth. `exact = false` permits a fast lower-bound estimate.
    async fn pending_count(
        &self,
        conn: &mut PgConnection,
        vectorizer: &Vectorizer,
        exact: bool,
    ) -> CatalogResult<i64>;
}
