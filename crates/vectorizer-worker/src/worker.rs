//! The Worker run loop (§4.E): spawn `concurrency` tasks, each repeatedly
//! calling `Executor::run_once` until the queue is dry, shutdown is
//! requested, or a fatal error surfaces.
//!
//! A `JoinSet` of homogeneous worker tasks sharing one `Arc<AtomicBool>`
//! shutdown signal, joined at the end of `run`.

use crate::error::WorkerError;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio::time::sleep;
use tracing::{error, info, warn};
use vectorizer_common::Disposition;
use vectorizer_executor::{ExecutorError, ExecutorLike};

/// Default cap on concurrent Executors per Worker (§4.H).
pub const MAX_CONCURRENCY: usize = 10;

/// One batch's outcome, reported upstream to Worker Tracking (§4.G) if the
/// Supervisor wired a sender via [`Worker::with_progress_events`].
#[derive(Debug, Clone)]
pub struct WorkerEvent {
    pub success_count: usize,
    pub error: Option<String>,
}

/// Runs one vectorizer: `concurrency` tasks, each looping its own
/// `run_once` calls against a shared `Arc<dyn ExecutorLike>`.
pub struct Worker {
    executor: Arc<dyn ExecutorLike>,
    concurrency: usize,
    idle_poll_interval: Duration,
    shutdown_signal: Arc<AtomicBool>,
    progress_events: Option<mpsc::Sender<WorkerEvent>>,
}

impl Worker {
    /// `concurrency` is clamped to `[1, MAX_CONCURRENCY]` (§4.H).
    #[must_use]
    pub fn new(executor: Arc<dyn ExecutorLike>, concurrency: usize, idle_poll_interval: Duration) -> Self {
        Self {
            executor,
            concurrency: concurrency.clamp(1, MAX_CONCURRENCY),
            idle_poll_interval,
            shutdown_signal: Arc::new(AtomicBool::new(false)),
            progress_events: None,
        }
    }

    /// Feed every batch outcome to `sender` (§4.G Worker Tracking fan-in).
    #[must_use]
    pub fn with_progress_events(mut self, sender: mpsc::Sender<WorkerEvent>) -> Self {
        self.progress_events = Some(sender);
        self
    }

    /// A handle the Supervisor can use to request cooperative shutdown.
    #[must_use]
    pub fn shutdown_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.shutdown_signal)
    }

    /// Run until the queue is dry, shutdown is requested, or a fatal
    /// error surfaces. Returns the total number of source rows embedded
    /// across every task this run.
    pub async fn run(&self) -> Result<u64, WorkerError> {
        let mut join_set = JoinSet::new();

        for task_id in 0..self.concurrency {
            let executor = Arc::clone(&self.executor);
            let shutdown = Arc::clone(&self.shutdown_signal);
            let idle_poll_interval = self.idle_poll_interval;
            let progress_events = self.progress_events.clone();
            join_set.spawn(async move {
                run_task(task_id, executor, shutdown, idle_poll_interval, progress_events).await
            });
        }

        let mut total = 0_u64;
        let mut fatal: Option<ExecutorError> = None;
        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok(Ok(count)) => total += count,
                Ok(Err(err)) => {
                    error!(error = %err, "executor task stopped on a fatal error");
                    self.shutdown_signal.store(true, Ordering::Relaxed);
                    fatal = Some(err);
                }
                Err(join_err) => {
                    error!(error = %join_err, "executor task panicked");
                }
            }
        }

        if let Some(err) = fatal {
            return Err(WorkerError::Executor(err));
        }
        Ok(total)
    }
}

/// One Executor's loop: claim-and-process batches until empty, shut down,
/// or a fatal error (§4.E steps 3-5).
async fn run_task(
    task_id: usize,
    executor: Arc<dyn ExecutorLike>,
    shutdown: Arc<AtomicBool>,
    idle_poll_interval: Duration,
    progress_events: Option<mpsc::Sender<WorkerEvent>>,
) -> Result<u64, ExecutorError> {
    let mut total = 0_u64;
    loop {
        if shutdown.load(Ordering::Relaxed) {
            info!(task_id, "executor task: shutdown requested");
            return Ok(total);
        }

        match executor.run_once().await {
            Ok(0) => {
                sleep(idle_poll_interval).await;
            }
            Ok(count) => {
                total += count as u64;
                send_progress(&progress_events, count, None);
            }
            Err(err) => match crate::error::classify(&err) {
                Disposition::Fatal => return Err(err),
                // Retryable/contained failures are handled by the
                // Executor itself (per-pk requeue, per-chunk error
                // records); surfacing here would only be a programming
                // error in the Executor, so keep the task alive but log.
                Disposition::RetryablePerBatch | Disposition::ContainedPerChunk => {
                    warn!(task_id, error = %err, "batch reported a non-fatal error; continuing");
                    send_progress(&progress_events, 0, Some(err.to_string()));
                }
            },
        }
    }
}

/// Best-effort: a full or closed channel just means Worker Tracking is
/// behind or disabled, never a reason to stall the Executor loop.
fn send_progress(progress_events: &Option<mpsc::Sender<WorkerEvent>>, success_count: usize, error: Option<String>) {
    if let Some(sender) = progress_events {
        let event = WorkerEvent { success_count, error };
        if let Err(err) = sender.try_send(event) {
            warn!(error = %err, "dropped worker tracking progress event");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vectorizer_test_utils::MockExecutor;

    #[tokio::test]
    async fn stops_when_executor_reports_zero_work() {
        let executor = Arc::new(MockExecutor::new(vec![Ok(3), Ok(2), Ok(0)]));
        let worker = Worker::new(executor.clone(), 1, Duration::from_millis(1));
        // The mock repeats its last scripted Ok(0) forever, so give the
        // task a moment to drain the script, then request shutdown.
        let handle = worker.shutdown_handle();
        let run = tokio::spawn(async move { worker.run().await });
        tokio::time::sleep(Duration::from_millis(20)).await;
        handle.store(true, Ordering::Relaxed);
        let total = run.await.expect("task join").expect("worker run");
        assert_eq!(total, 5);
    }

    #[tokio::test]
    async fn fatal_error_stops_the_worker() {
        let fatal_executor = Arc::new(MockExecutor::new(vec![Err(executor_auth_failure())]));
        let worker = Worker::new(fatal_executor, 2, Duration::from_millis(1));
        let result = worker.run().await;
        assert!(result.is_err());
    }

    fn executor_auth_failure() -> ExecutorError {
        use vectorizer_embeddings::EmbeddingError;
        ExecutorError::Embedding(EmbeddingError::ProviderAuth {
            provider: "mock".to_string(),
            message: "invalid key".to_string(),
        })
    }

    #[tokio::test]
    async fn progress_events_are_forwarded_per_batch() {
        let executor = Arc::new(MockExecutor::new(vec![Ok(4), Ok(0)]));
        let (tx, mut rx) = mpsc::channel(8);
        let worker = Worker::new(executor, 1, Duration::from_millis(1)).with_progress_events(tx);
        let handle = worker.shutdown_handle();

        let run = tokio::spawn(async move { worker.run().await });
        let event = rx.recv().await.expect("progress event");
        assert_eq!(event.success_count, 4);
        assert!(event.error.is_none());

        tokio::time::sleep(Duration::from_millis(20)).await;
        handle.store(true, Ordering::Relaxed);
        run.await.expect("task join").expect("worker run");
    }
}
