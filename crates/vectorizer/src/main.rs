//! Entry point for the `vectorizer` worker process.
//!
//! A `clap::Parser` `Args` struct and dual stderr+file-appender logging
//! combined with `MakeWriterExt::and`. Shutdown follows the cooperative
//! `Arc<AtomicBool>` idiom the rest of this workspace already uses, fed by
//! `tokio::signal::ctrl_c()` and, on unix, a `signal-hook-tokio` SIGTERM
//! stream.

use clap::Parser;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use tracing::{error, info};
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::writer::MakeWriterExt;
use vectorizer_catalog::PostgresCatalogRepository;
use vectorizer_config::{ProcessConfig, Validate};
use vectorizer_supervisor::Supervisor;

/// The `vectorizer` worker: continuously embeds rows queued by the
/// catalog's triggers into their configured destination tables.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Database connection string (falls back to `DATABASE_URL`/`VECTORIZER_DATABASE_URL`).
    #[arg(long)]
    database_url: Option<String>,

    /// Maximum pool connections.
    #[arg(long)]
    db_max_connections: Option<u32>,

    /// Minimum pool connections kept warm.
    #[arg(long)]
    db_min_connections: Option<u32>,

    /// Comma-separated vectorizer IDs to run; omit to discover all enabled ones.
    #[arg(long, value_delimiter = ',')]
    vectorizer_id: Option<Vec<i64>>,

    /// Seconds to wait between passes over the vectorizer list.
    #[arg(long)]
    poll_interval_seconds: Option<u64>,

    /// Concurrent Executor tasks per vectorizer.
    #[arg(long)]
    concurrency: Option<usize>,

    /// Rows claimed per Executor batch.
    #[arg(long)]
    batch_size: Option<usize>,

    /// Run one pass over every vectorizer, then exit.
    #[arg(long)]
    once: bool,

    /// Exit with a nonzero status on the first fatal worker or catalog error,
    /// instead of logging and retrying. Defaults to true when `--once` is set.
    #[arg(long)]
    exit_on_error: bool,

    /// `RUST_LOG`-style filter; falls back to `RUST_LOG` then "info".
    #[arg(long)]
    log_level: Option<String>,

    /// Directory for rotating JSON log files. Omit for stderr-only logging.
    #[arg(long)]
    log_dir: Option<String>,
}

type BoxError = Box<dyn std::error::Error>;

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    let mut config = ProcessConfig::from_env();
    if let Some(database_url) = args.database_url {
        config.database.url = database_url;
    }
    if let Some(max_connections) = args.db_max_connections {
        config.database.max_connections = max_connections;
    }
    if let Some(min_connections) = args.db_min_connections {
        config.database.min_connections = min_connections;
    }
    if let Some(ids) = args.vectorizer_id {
        config.vectorizer_ids = Some(ids);
    }
    if let Some(seconds) = args.poll_interval_seconds {
        config.poll_interval = std::time::Duration::from_secs(seconds);
    }
    if let Some(concurrency) = args.concurrency {
        config.concurrency = concurrency;
    }
    if let Some(batch_size) = args.batch_size {
        config.batch_size = batch_size;
    }
    if args.once {
        config.once = true;
    }
    if args.exit_on_error {
        config.exit_on_error = true;
    }
    if let Some(log_level) = args.log_level {
        config.log_level = log_level;
    }

    let _guards = init_logging(&config.log_level, args.log_dir.as_deref());
    config.validate().map_err(|e| format!("invalid configuration: {e}"))?;

    info!(database = %config.database.safe_connection_string(), "starting vectorizer");

    let pool = config.database.create_pool().await.map_err(|e| format!("database pool: {e}"))?;
    let catalog = Arc::new(PostgresCatalogRepository::new(pool.clone()));
    let supervisor = Supervisor::new(pool, catalog, config).await?;
    let shutdown = supervisor.shutdown_handle();

    let signals_task = spawn_signal_watcher(Arc::clone(&shutdown))?;
    let ctrlc_task = {
        let shutdown = Arc::clone(&shutdown);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("received Ctrl-C, shutting down");
                shutdown.store(true, Ordering::Relaxed);
            }
        })
    };

    let result = supervisor.run().await;
    shutdown.store(true, Ordering::Relaxed);
    ctrlc_task.abort();
    let _ = ctrlc_task.await;
    if let Some(task) = signals_task {
        task.abort();
        let _ = task.await;
    }

    match result {
        Ok(()) => {
            info!("vectorizer exited cleanly");
            Ok(())
        }
        Err(err) => {
            error!(error = %err, "vectorizer exited with a fatal error");
            std::process::exit(1);
        }
    }
}

/// Forwards SIGTERM into `shutdown` so a process manager's stop signal gets
/// the same cooperative shutdown as Ctrl-C. No-op on non-unix targets,
/// where `tokio::signal::ctrl_c()` (awaited directly in `main`, not shown
/// here) is the only shutdown trigger available.
#[cfg(unix)]
fn spawn_signal_watcher(
    shutdown: Arc<std::sync::atomic::AtomicBool>,
) -> Result<Option<tokio::task::JoinHandle<()>>, BoxError> {
    use futures::stream::StreamExt;
    use signal_hook::consts::signal::SIGTERM;
    use signal_hook_tokio::Signals;

    let mut signals = Signals::new([SIGTERM])?;
    let task = tokio::spawn(async move {
        if signals.next().await.is_some() {
            info!("received SIGTERM, shutting down");
            shutdown.store(true, Ordering::Relaxed);
        }
    });
    Ok(Some(task))
}

#[cfg(not(unix))]
fn spawn_signal_watcher(
    _shutdown: Arc<std::sync::atomic::AtomicBool>,
) -> Result<Option<tokio::task::JoinHandle<()>>, BoxError> {
    Ok(None)
}

/// Dual stderr+file logging built from `RollingFileAppender` +
/// `non_blocking` + `MakeWriterExt::and`. File logging only activates
/// when `log_dir` is given; otherwise this is stderr-only.
///
/// The returned guards must be held for the life of `main` or buffered log
/// lines are dropped on exit.
fn init_logging(log_level: &str, log_dir: Option<&str>) -> Vec<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    let (stderr_writer, stderr_guard): (NonBlocking, WorkerGuard) =
        tracing_appender::non_blocking(std::io::stderr());

    let Some(log_dir) = log_dir.map(std::path::PathBuf::from).or_else(default_log_dir) else {
        tracing_subscriber::fmt().json().with_writer(stderr_writer).with_env_filter(filter).init();
        return vec![stderr_guard];
    };

    if std::fs::create_dir_all(&log_dir).is_err() {
        tracing_subscriber::fmt().json().with_writer(stderr_writer).with_env_filter(filter).init();
        return vec![stderr_guard];
    }

    let file_appender = RollingFileAppender::new(Rotation::DAILY, &log_dir, "vectorizer.log");
    let (file_writer, file_guard): (NonBlocking, WorkerGuard) =
        tracing_appender::non_blocking(file_appender);
    let multi_writer = file_writer.and(stderr_writer);

    tracing_subscriber::fmt().json().with_writer(multi_writer).with_env_filter(filter).init();
    vec![file_guard, stderr_guard]
}

/// No OS-specific default: this worker has no UI-adjacent install location
/// to assume. Only used when `--log-dir` is not given and
/// `VECTORIZER_LOG_DIR` is unset; stderr-only is just as valid a default
/// for a process typically run under a process supervisor.
fn default_log_dir() -> Option<std::path::PathBuf> {
    std::env::var("VECTORIZER_LOG_DIR").ok().map(std::path::PathBuf::from)
}
