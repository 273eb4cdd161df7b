//! Worker liveness tracking (§4.G): a heartbeat loop plus a fan-in channel
//! for per-batch progress events, feature-gated by a catalog flag.
//!
//! The channel fan-in (many cloned `mpsc::Sender`s, one task draining the
//! `Receiver`) is the same channel wiring a fan-out dispatcher would use,
//! turned around: fan-in-from-workers instead of fan-out-to-workers.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::warn;
use uuid::Uuid;
use vectorizer_catalog::{CatalogErrorExt, CatalogOperation, CatalogResult};

/// One batch's outcome, reported by a Worker/Executor to the tracking task.
#[derive(Debug, Clone)]
pub struct ProgressEvent {
    pub worker_id: Uuid,
    pub vectorizer_id: i64,
    pub success_count: i64,
    pub error_message: Option<String>,
}

/// Worker-liveness tracking, selected by a per-installation catalog flag
/// (§4.G). Object-safe so the Supervisor can hold an
/// `Arc<dyn WorkerTracking>` regardless of which is active.
#[async_trait]
pub trait WorkerTracking: Send + Sync {
    /// Register a freshly-started worker and return its id.
    async fn register(&self) -> CatalogResult<Uuid>;

    /// Run the heartbeat + progress-draining loop until `shutdown` fires.
    /// Consumes `events` so callers can `tokio::spawn` this directly.
    async fn run(
        &self,
        worker_id: Uuid,
        poll_interval: Duration,
        events: mpsc::Receiver<ProgressEvent>,
        shutdown: Arc<AtomicBool>,
    );
}

/// Writes worker-liveness rows to `ai.vectorizer_worker` (§3 Worker
/// liveness). Stops heartbeating (but not the worker) after 3 consecutive
/// failures, per §4.G.
pub struct PostgresWorkerTracking {
    pool: PgPool,
}

impl PostgresWorkerTracking {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn insert_worker(&self, worker_id: Uuid, started_at: chrono::DateTime<Utc>) -> CatalogResult<()> {
        let operation = CatalogOperation::Heartbeat { worker_id };
        sqlx::query(
            "INSERT INTO ai.vectorizer_worker \
             (worker_id, started_at, last_heartbeat_at, heartbeat_count, success_count, error_count) \
             VALUES ($1, $2, $2, 0, 0, 0)",
        )
        .bind(worker_id)
        .bind(started_at)
        .execute(&self.pool)
        .await
        .map_catalog_err(operation)?;
        Ok(())
    }

    async fn heartbeat(
        &self,
        worker_id: Uuid,
        success_delta: i64,
        error_delta: i64,
        last_error: Option<&str>,
    ) -> CatalogResult<()> {
        let operation = CatalogOperation::Heartbeat { worker_id };
        sqlx::query(
            "UPDATE ai.vectorizer_worker SET \
             last_heartbeat_at = $2, \
             heartbeat_count = heartbeat_count + 1, \
             success_count = success_count + $3, \
             error_count = error_count + $4, \
             last_error_at = CASE WHEN $5::text IS NOT NULL THEN $2 ELSE last_error_at END, \
             last_error_message = COALESCE($5, last_error_message) \
             WHERE worker_id = $1",
        )
        .bind(worker_id)
        .bind(Utc::now())
        .bind(success_delta)
        .bind(error_delta)
        .bind(last_error)
        .execute(&self.pool)
        .await
        .map_catalog_err(operation)?;
        Ok(())
    }
}

#[async_trait]
impl WorkerTracking for PostgresWorkerTracking {
    async fn register(&self) -> CatalogResult<Uuid> {
        let worker_id = Uuid::new_v4();
        self.insert_worker(worker_id, Utc::now()).await?;
        Ok(worker_id)
    }

    async fn run(
        &self,
        worker_id: Uuid,
        poll_interval: Duration,
        mut events: mpsc::Receiver<ProgressEvent>,
        shutdown: Arc<AtomicBool>,
    ) {
        let mut consecutive_failures = 0_u32;
        let mut success_delta = 0_i64;
        let mut error_delta = 0_i64;
        let mut last_error: Option<String> = None;

        loop {
            if shutdown.load(Ordering::Relaxed) {
                return;
            }

            tokio::select! {
                event = events.recv() => {
                    match event {
                        Some(event) => {
                            success_delta += event.success_count;
                            if let Some(message) = event.error_message {
                                error_delta += 1;
                                last_error = Some(message);
                            }
                        }
                        None => return,
                    }
                }
                () = tokio::time::sleep(poll_interval) => {
                    if consecutive_failures >= 3 {
                        continue;
                    }
                    match self
                        .heartbeat(worker_id, success_delta, error_delta, last_error.as_deref())
                        .await
                    {
                        Ok(()) => {
                            consecutive_failures = 0;
                            success_delta = 0;
                            error_delta = 0;
                            last_error = None;
                        }
                        Err(err) => {
                            consecutive_failures += 1;
                            warn!(worker_id = %worker_id, error = %err, consecutive_failures, "heartbeat failed");
                        }
                    }
                }
            }
        }
    }
}

/// No-op tracking for installations that haven't enabled worker liveness
/// (§4.G's feature flag). `register` returns a fresh id with no database
/// write; `run` just drains the channel until shutdown so senders never
/// block on a full channel.
#[derive(Default)]
pub struct NoopWorkerTracking;

#[async_trait]
impl WorkerTracking for NoopWorkerTracking {
    async fn register(&self) -> CatalogResult<Uuid> {
        Ok(Uuid::new_v4())
    }

    async fn run(
        &self,
        _worker_id: Uuid,
        poll_interval: Duration,
        mut events: mpsc::Receiver<ProgressEvent>,
        shutdown: Arc<AtomicBool>,
    ) {
        loop {
            if shutdown.load(Ordering::Relaxed) {
                return;
            }
            tokio::select! {
                event = events.recv() => {
                    if event.is_none() {
                        return;
                    }
                }
                () = tokio::time::sleep(poll_interval) => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn noop_tracking_drains_events_until_shutdown() {
        let tracking = NoopWorkerTracking;
        let (tx, rx) = mpsc::channel(4);
        let shutdown = Arc::new(AtomicBool::new(false));
        let worker_id = Uuid::new_v4();

        let run_shutdown = Arc::clone(&shutdown);
        let run = tokio::spawn(async move {
            tracking
                .run(worker_id, Duration::from_millis(5), rx, run_shutdown)
                .await;
        });

        tx.send(ProgressEvent {
            worker_id,
            vectorizer_id: 1,
            success_count: 3,
            error_message: None,
        })
        .await
        .expect("send progress event");

        tokio::time::sleep(Duration::from_millis(20)).await;
        shutdown.store(true, Ordering::Relaxed);
        run.await.expect("tracking task join");
    }

    #[tokio::test]
    async fn noop_tracking_stops_when_sender_drops() {
        let tracking = NoopWorkerTracking;
        let (tx, rx) = mpsc::channel(4);
        let shutdown = Arc::new(AtomicBool::new(false));

        drop(tx);
        tokio::time::timeout(
            Duration::from_millis(100),
            tracking.run(Uuid::new_v4(), Duration::from_millis(5), rx, shutdown),
        )
        .await
        .expect("tracking task should stop once the sender side is gone");
    }
}
