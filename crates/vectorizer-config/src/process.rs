//! Process-level configuration: how the `vectorizer` binary itself runs,
//! as opposed to what each vectorizer's pipeline looks like (`vectorizer.rs`).

use crate::validation::{self, Validate};
use crate::{ConfigError, ConfigResult};
use sqlx::postgres::{PgConnectOptions, PgPoolOptions, PgSslMode};
use sqlx::PgPool;
use std::time::Duration;

const DEFAULT_DATABASE_URL: &str = "postgres://localhost:5432/postgres";
const DEFAULT_MAX_CONNECTIONS: u32 = 5;
const DEFAULT_MIN_CONNECTIONS: u32 = 1;
const DEFAULT_ACQUIRE_TIMEOUT_SECONDS: u64 = 30;
const DEFAULT_IDLE_TIMEOUT_SECONDS: u64 = 300;
const DEFAULT_SSL_MODE: &str = "prefer";

const DEFAULT_POLL_INTERVAL_SECONDS: u64 = 5;
const DEFAULT_CONCURRENCY: usize = 1;
const MAX_CONCURRENCY: usize = 10;
const DEFAULT_BATCH_SIZE: usize = 50;
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_MAX_ATTEMPTS: u32 = 6;
const DEFAULT_BACKOFF_BASE_SECONDS: u64 = 30;
const DEFAULT_BACKOFF_CAP_SECONDS: u64 = 1800;

/// Database connection configuration: a raw URL (used for logging-safe
/// display and as the `sqlx` connect source) plus structured pool tuning.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout_seconds: u64,
    pub idle_timeout_seconds: u64,
    pub ssl_mode: String,
}

impl DatabaseConfig {
    /// Load configuration from environment variables with safe defaults.
    #[must_use]
    pub fn from_env() -> Self {
        let url = std::env::var("VECTORIZER_DATABASE_URL")
            .or_else(|_| std::env::var("DATABASE_URL"))
            .unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string());

        let max_connections = std::env::var("VECTORIZER_DB_MAX_CONNECTIONS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_MAX_CONNECTIONS);

        let min_connections = std::env::var("VECTORIZER_DB_MIN_CONNECTIONS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_MIN_CONNECTIONS);

        let acquire_timeout_seconds = std::env::var("VECTORIZER_DB_ACQUIRE_TIMEOUT_SECONDS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_ACQUIRE_TIMEOUT_SECONDS);

        let idle_timeout_seconds = std::env::var("VECTORIZER_DB_IDLE_TIMEOUT_SECONDS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_IDLE_TIMEOUT_SECONDS);

        let ssl_mode = std::env::var("VECTORIZER_DB_SSL_MODE")
            .unwrap_or_else(|_| DEFAULT_SSL_MODE.to_string());

        Self {
            url,
            max_connections,
            min_connections,
            acquire_timeout_seconds,
            idle_timeout_seconds,
            ssl_mode,
        }
    }

    fn parse_ssl_mode(&self) -> PgSslMode {
        match self.ssl_mode.as_str() {
            "disable" => PgSslMode::Disable,
            "require" => PgSslMode::Require,
            _ => PgSslMode::Prefer,
        }
    }

    /// Build connect options from the URL, overriding SSL mode from config.
    ///
    /// # Errors
    /// Returns an error if the configured URL cannot be parsed.
    pub fn connect_options(&self) -> ConfigResult<PgConnectOptions> {
        let options: PgConnectOptions =
            self.url
                .parse()
                .map_err(|e: sqlx::Error| ConfigError::Generic {
                    message: format!("invalid database url: {e}"),
                })?;
        Ok(options.ssl_mode(self.parse_ssl_mode()))
    }

    /// Create a connection pool using the configured pool tuning.
    ///
    /// # Errors
    /// Returns an error if connecting to the database fails.
    pub async fn create_pool(&self) -> ConfigResult<PgPool> {
        let options = self.connect_options()?;
        PgPoolOptions::new()
            .max_connections(self.max_connections)
            .min_connections(self.min_connections)
            .acquire_timeout(Duration::from_secs(self.acquire_timeout_seconds))
            .idle_timeout(Duration::from_secs(self.idle_timeout_seconds))
            .connect_with(options)
            .await
            .map_err(|e| ConfigError::Generic {
                message: format!("failed to create pool: {e}"),
            })
    }

    /// Connection info safe for logs: no credentials.
    #[must_use]
    pub fn safe_connection_string(&self) -> String {
        self.connect_options().map_or_else(
            |_| "<invalid database url>".to_string(),
            |opts| format!("{}:{} ssl={:?}", opts.get_host(), opts.get_port(), self.ssl_mode),
        )
    }
}

impl Validate for DatabaseConfig {
    fn validate(&self) -> ConfigResult<()> {
        validation::validate_non_empty(&self.url, "url")?;
        validation::validate_url(&self.url, "url")?;
        validation::validate_range(u64::from(self.max_connections), 1, 1000, "max_connections")?;
        validation::validate_range(self.acquire_timeout_seconds, 1, 3600, "acquire_timeout_seconds")?;
        Ok(())
    }
}

/// Retry/backoff policy shared by the Queue Protocol (§4.A) across all
/// vectorizers; the per-vectorizer config does not override it.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub backoff_base_seconds: u64,
    pub backoff_cap_seconds: u64,
}

impl RetryConfig {
    #[must_use]
    pub fn from_env() -> Self {
        let max_attempts = std::env::var("VECTORIZER_MAX_ATTEMPTS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_MAX_ATTEMPTS);
        let backoff_base_seconds = std::env::var("VECTORIZER_BACKOFF_BASE_SECONDS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_BACKOFF_BASE_SECONDS);
        let backoff_cap_seconds = std::env::var("VECTORIZER_BACKOFF_CAP_SECONDS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_BACKOFF_CAP_SECONDS);

        Self {
            max_attempts,
            backoff_base_seconds,
            backoff_cap_seconds,
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff_base_seconds: DEFAULT_BACKOFF_BASE_SECONDS,
            backoff_cap_seconds: DEFAULT_BACKOFF_CAP_SECONDS,
        }
    }
}

/// Top-level process configuration: everything the `vectorizer` binary
/// needs before it can start the Supervisor (§6 Process surface).
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ProcessConfig {
    pub database: DatabaseConfig,
    pub retry: RetryConfig,

    /// Explicit vectorizer IDs to run; `None` means "all" (§4.F).
    pub vectorizer_ids: Option<Vec<i64>>,

    pub poll_interval: Duration,
    pub concurrency: usize,
    pub batch_size: usize,
    pub log_level: String,
    pub once: bool,
    pub exit_on_error: bool,
    pub tokenizer_cache_dir: Option<std::path::PathBuf>,
}

impl ProcessConfig {
    /// Load configuration from environment variables with safe defaults.
    #[must_use]
    pub fn from_env() -> Self {
        let poll_interval_seconds = std::env::var("VECTORIZER_POLL_INTERVAL_SECONDS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_POLL_INTERVAL_SECONDS);

        let concurrency = std::env::var("VECTORIZER_CONCURRENCY")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_CONCURRENCY);

        let batch_size = std::env::var("VECTORIZER_BATCH_SIZE")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_BATCH_SIZE);

        let log_level =
            std::env::var("VECTORIZER_LOG_LEVEL").unwrap_or_else(|_| DEFAULT_LOG_LEVEL.to_string());

        let once = std::env::var("VECTORIZER_ONCE")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(false);

        let exit_on_error = std::env::var("VECTORIZER_EXIT_ON_ERROR")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(once);

        let vectorizer_ids = std::env::var("VECTORIZER_IDS").ok().map(|s| {
            s.split(',')
                .filter_map(|id| id.trim().parse().ok())
                .collect()
        });

        let tokenizer_cache_dir = std::env::var("VECTORIZER_TOKENIZER_CACHE_DIR")
            .ok()
            .map(std::path::PathBuf::from);

        Self {
            database: DatabaseConfig::from_env(),
            retry: RetryConfig::from_env(),
            vectorizer_ids,
            poll_interval: Duration::from_secs(poll_interval_seconds),
            concurrency,
            batch_size,
            log_level,
            once,
            exit_on_error,
            tokenizer_cache_dir,
        }
    }
}

impl Validate for ProcessConfig {
    fn validate(&self) -> ConfigResult<()> {
        self.database.validate()?;
        validation::validate_range(self.concurrency as u64, 1, MAX_CONCURRENCY as u64, "concurrency")?;
        validation::validate_range(self.batch_size as u64, 1, 10_000, "batch_size")?;
        validation::validate_range(self.retry.max_attempts as u64, 1, 100, "retry.max_attempts")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_concurrency_is_valid() {
        let config = ProcessConfig {
            database: DatabaseConfig::from_env(),
            retry: RetryConfig::default(),
            vectorizer_ids: None,
            poll_interval: Duration::from_secs(5),
            concurrency: DEFAULT_CONCURRENCY,
            batch_size: DEFAULT_BATCH_SIZE,
            log_level: "info".to_string(),
            once: false,
            exit_on_error: false,
            tokenizer_cache_dir: None,
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_concurrency_above_cap() {
        let mut config = ProcessConfig {
            database: DatabaseConfig::from_env(),
            retry: RetryConfig::default(),
            vectorizer_ids: None,
            poll_interval: Duration::from_secs(5),
            concurrency: DEFAULT_CONCURRENCY,
            batch_size: DEFAULT_BATCH_SIZE,
            log_level: "info".to_string(),
            once: false,
            exit_on_error: false,
            tokenizer_cache_dir: None,
        };
        config.concurrency = MAX_CONCURRENCY + 1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn once_mode_implies_exit_on_error_by_default() {
        // SAFETY: tests run single-threaded enough in practice here, but
        // avoid clobbering other tests' env by scoping the var locally.
        std::env::set_var("VECTORIZER_ONCE", "true");
        std::env::remove_var("VECTORIZER_EXIT_ON_ERROR");
        let config = ProcessConfig::from_env();
        assert!(config.once);
        assert!(config.exit_on_error);
        std::env::remove_var("VECTORIZER_ONCE");
    }
}
