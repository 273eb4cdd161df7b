//! Centralized configuration for the vectorizer process and its vectorizers
//!
//! Two layers, mirroring §4.H:
//! - [`process`]: how the `vectorizer` binary runs (DB pool, polling,
//!   concurrency, logging, retry policy).
//! - [`vectorizer`]: the per-vectorizer discriminated config tree read
//!   out of the catalog's `config` JSONB column.
//!
//! Both follow the same hierarchy: safe defaults, environment variable
//! overrides, runtime validation via the [`validation::Validate`] trait.

pub mod error;
pub mod process;
pub mod validation;
pub mod vectorizer;

pub use error::{ConfigError, ConfigResult};
pub use process::{DatabaseConfig, ProcessConfig, RetryConfig};
pub use validation::Validate;
pub use vectorizer::{
    Chunker, ChunkingConfig, EmbedderSpec, EmbeddingConfig, Formatter, FormattingConfig,
    IndexingConfig, ProcessingConfig, SchedulingConfig, TextIndexingConfig, VectorizerConfig,
};
