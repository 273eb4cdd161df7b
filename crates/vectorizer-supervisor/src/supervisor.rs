//! The outermost loop (§4.F): one vectorizer ID at a time, forever or once.
//!
//! An `Arc<AtomicBool>` shutdown signal checked between passes, with the
//! sleep itself interruptible so shutdown doesn't wait out a full
//! `poll_interval`.

use crate::error::{SupervisorError, SupervisorResult};
use crate::tracking::{NoopWorkerTracking, PostgresWorkerTracking, ProgressEvent, WorkerTracking};
use rand::seq::SliceRandom;
use sqlx::PgPool;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use uuid::Uuid;
use vectorizer_catalog::CatalogRepository;
use vectorizer_config::ProcessConfig;
use vectorizer_embeddings::{SecretResolver, build_embedder};
use vectorizer_executor::Executor;
use vectorizer_queue::{PostgresQueue, QueueProtocol};
use vectorizer_worker::Worker;

/// Backoff applied between retries when the catalog or its connection is
/// unavailable (§4.F). Independent of the per-row `RetryConfig` used by
/// the Queue Protocol, since there's no PK to attach a schedule to here.
const CATALOG_RETRY_BACKOFF: Duration = Duration::from_secs(5);

/// Progress channel capacity; bounded so a stalled tracking task applies
/// backpressure to Executors rather than growing without limit, but large
/// enough that a burst of batch completions doesn't block on it.
const PROGRESS_CHANNEL_CAPACITY: usize = 256;

pub struct Supervisor {
    pool: PgPool,
    catalog: Arc<dyn CatalogRepository>,
    queue: Arc<dyn QueueProtocol>,
    secrets: SecretResolver,
    config: ProcessConfig,
    tracking: Arc<dyn WorkerTracking>,
    shutdown: Arc<AtomicBool>,
}

impl Supervisor {
    /// Builds the Supervisor, including the Worker Tracking feature-flag
    /// read (§4.G): Postgres-backed if the installation has opted in,
    /// no-op otherwise.
    ///
    /// # Errors
    /// Returns an error if the feature-flag lookup fails.
    pub async fn new(
        pool: PgPool,
        catalog: Arc<dyn CatalogRepository>,
        config: ProcessConfig,
    ) -> SupervisorResult<Self> {
        let tracking: Arc<dyn WorkerTracking> = if catalog.worker_tracking_enabled().await? {
            Arc::new(PostgresWorkerTracking::new(pool.clone()))
        } else {
            Arc::new(NoopWorkerTracking)
        };

        Ok(Self {
            pool,
            catalog,
            queue: Arc::new(PostgresQueue::new()),
            secrets: SecretResolver::new(),
            config,
            tracking,
            shutdown: Arc::new(AtomicBool::new(false)),
        })
    }

    /// A handle the binary's signal handler can use to request cooperative
    /// shutdown.
    #[must_use]
    pub fn shutdown_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.shutdown)
    }

    /// Run until shutdown (continuous mode) or one pass over every
    /// vectorizer ID (`once`). Returns an error only when `exit_on_error`
    /// is set and a vectorizer's Worker fails fatally, or the catalog
    /// stays unavailable past that same policy.
    ///
    /// # Errors
    /// See above.
    pub async fn run(&self) -> SupervisorResult<()> {
        let worker_id = self.tracking.register().await?;
        let (progress_tx, progress_rx) = mpsc::channel(PROGRESS_CHANNEL_CAPACITY);
        let tracking = Arc::clone(&self.tracking);
        let tracking_shutdown = Arc::clone(&self.shutdown);
        let poll_interval = self.config.poll_interval;
        let tracking_task = tokio::spawn(async move {
            tracking.run(worker_id, poll_interval, progress_rx, tracking_shutdown).await;
        });

        let mut seen_ids: std::collections::HashSet<i64> = std::collections::HashSet::new();
        let result = self.run_passes(worker_id, &progress_tx, &mut seen_ids).await;

        drop(progress_tx);
        if tracking_task.await.is_err() {
            warn!("worker tracking task panicked");
        }
        result
    }

    async fn run_passes(
        &self,
        worker_id: Uuid,
        progress_tx: &mpsc::Sender<ProgressEvent>,
        seen_ids: &mut std::collections::HashSet<i64>,
    ) -> SupervisorResult<()> {
        loop {
            if self.shutdown.load(Ordering::Relaxed) {
                info!("supervisor: shutdown requested");
                return Ok(());
            }

            let ids = match self.resolve_vectorizer_ids().await {
                Ok(ids) => ids,
                Err(err) => {
                    error!(error = %err, "catalog unavailable");
                    if self.config.exit_on_error {
                        return Err(err.into());
                    }
                    self.interruptible_sleep(CATALOG_RETRY_BACKOFF).await;
                    continue;
                }
            };

            for id in &ids {
                if self.shutdown.load(Ordering::Relaxed) {
                    return Ok(());
                }
                if seen_ids.insert(*id) {
                    info!(vectorizer_id = id, "picked up new vectorizer");
                }
                if let Err(err) = self.run_vectorizer(*id, worker_id, progress_tx).await {
                    error!(vectorizer_id = id, error = %err, "worker failed fatally");
                    if self.config.exit_on_error {
                        return Err(err);
                    }
                }
            }

            if self.config.once {
                return Ok(());
            }

            self.interruptible_sleep(self.config.poll_interval).await;
        }
    }

    async fn resolve_vectorizer_ids(&self) -> Result<Vec<i64>, vectorizer_catalog::CatalogError> {
        if let Some(ids) = &self.config.vectorizer_ids {
            return Ok(ids.clone());
        }
        let mut ids = self.catalog.list_vectorizer_ids().await?;
        ids.shuffle(&mut rand::thread_rng());
        Ok(ids)
    }

    async fn run_vectorizer(
        &self,
        vectorizer_id: i64,
        worker_id: Uuid,
        progress_tx: &mpsc::Sender<ProgressEvent>,
    ) -> SupervisorResult<()> {
        let Some(vectorizer) = self.catalog.load_vectorizer(vectorizer_id).await? else {
            warn!(vectorizer_id, "vectorizer disappeared between discovery and dispatch");
            return Ok(());
        };

        let embedder = build_embedder(&vectorizer.config.embedding.implementation, &self.secrets)
            .await
            .map_err(|err| SupervisorError::Worker {
                vectorizer_id,
                source: vectorizer_executor::ExecutorError::Embedding(err).into(),
            })?;

        let executor = Arc::new(Executor::new(
            self.pool.clone(),
            vectorizer,
            Arc::clone(&self.queue),
            embedder,
            self.config.retry.clone(),
            self.config.batch_size as i64,
        ));

        let (worker_progress_tx, mut worker_progress_rx) = mpsc::channel(PROGRESS_CHANNEL_CAPACITY);
        let worker = Worker::new(executor, self.config.concurrency, self.config.poll_interval)
            .with_progress_events(worker_progress_tx);
        let worker_shutdown = worker.shutdown_handle();

        let forward_progress_tx = progress_tx.clone();
        let forward_task = tokio::spawn(async move {
            while let Some(event) = worker_progress_rx.recv().await {
                let progress = ProgressEvent {
                    worker_id,
                    vectorizer_id,
                    success_count: event.success_count as i64,
                    error_message: event.error,
                };
                if forward_progress_tx.try_send(progress).is_err() {
                    warn!(vectorizer_id, "dropped progress event: tracking channel full or closed");
                }
            }
        });

        // Forward the Supervisor's shutdown flag into the Worker's own,
        // so a long-running pass still stops promptly on shutdown rather
        // than only being checked between vectorizer IDs.
        let supervisor_shutdown = Arc::clone(&self.shutdown);
        let propagate_task = tokio::spawn(async move {
            while !supervisor_shutdown.load(Ordering::Relaxed) {
                if worker_shutdown.load(Ordering::Relaxed) {
                    return;
                }
                tokio::time::sleep(Duration::from_millis(50)).await;
            }
            worker_shutdown.store(true, Ordering::Relaxed);
        });

        let run_result = worker.run().await;
        propagate_task.abort();
        drop(worker);
        let _ = forward_task.await;

        match run_result {
            Ok(total) => {
                info!(vectorizer_id, total, "worker pass complete");
                Ok(())
            }
            Err(err) => Err(SupervisorError::Worker { vectorizer_id, source: err }),
        }
    }

    async fn watch_shutdown(shutdown: &Arc<AtomicBool>) {
        while !shutdown.load(Ordering::Relaxed) {
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    }

    async fn interruptible_sleep(&self, duration: Duration) {
        tokio::select! {
            () = tokio::time::sleep(duration) => {}
            () = Self::watch_shutdown(&self.shutdown) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use vectorizer_catalog::{CatalogResult, Vectorizer};
    use vectorizer_config::{DatabaseConfig, RetryConfig};

    struct PanicsIfCalledCatalog;

    #[async_trait]
    impl CatalogRepository for PanicsIfCalledCatalog {
        async fn list_vectorizer_ids(&self) -> CatalogResult<Vec<i64>> {
            panic!("list_vectorizer_ids should not run when explicit ids are configured");
        }

        async fn load_vectorizer(&self, _vectorizer_id: i64) -> CatalogResult<Option<Vectorizer>> {
            panic!("load_vectorizer should not run in this test");
        }

        async fn worker_tracking_enabled(&self) -> CatalogResult<bool> {
            Ok(false)
        }
    }

    fn test_config(vectorizer_ids: Option<Vec<i64>>) -> ProcessConfig {
        ProcessConfig {
            database: DatabaseConfig::from_env(),
            retry: RetryConfig::default(),
            vectorizer_ids,
            poll_interval: Duration::from_millis(10),
            concurrency: 1,
            batch_size: 10,
            log_level: "info".to_string(),
            once: true,
            exit_on_error: true,
            tokenizer_cache_dir: None,
        }
    }

    #[tokio::test]
    async fn explicit_vectorizer_ids_bypass_catalog_discovery() {
        let pool = sqlx::PgPool::connect_lazy("postgres://localhost/nonexistent")
            .expect("lazy pool construction never touches the network");
        let supervisor = Supervisor::new(
            pool,
            Arc::new(PanicsIfCalledCatalog),
            test_config(Some(vec![1, 2, 3])),
        )
        .await
        .expect("construction");

        let ids = supervisor.resolve_vectorizer_ids().await.expect("resolve");
        assert_eq!(ids, vec![1, 2, 3]);
    }
}
