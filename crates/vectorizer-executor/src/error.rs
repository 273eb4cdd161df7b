//! Executor error taxonomy (§7) with step attribution (§4.D).

use thiserror::Error;
use vectorizer_catalog::{CatalogError, FailureStep};
use vectorizer_chunking::{ChunkingError, FormattingError};
use vectorizer_common::Disposition;
use vectorizer_embeddings::EmbeddingError;

/// Result type alias for executor operations.
pub type ExecutorResult<T> = Result<T, ExecutorError>;

/// What went wrong while executing one batch (§7).
#[derive(Debug, Error)]
pub enum ExecutorError {
    #[error("queue operation failed: {0}")]
    Catalog(#[from] CatalogError),

    #[error("chunking failed: {0}")]
    Chunking(#[from] ChunkingError),

    #[error("formatting failed: {0}")]
    Formatting(#[from] FormattingError),

    #[error("embedding failed: {0}")]
    Embedding(#[from] EmbeddingError),

    #[error("unexpected row shape for pk {pk}: {message}")]
    MalformedRow { pk: String, message: String },
}

impl ExecutorError {
    /// Classify this error for the Worker run loop (§4.E step 4/5).
    #[must_use]
    pub fn disposition(&self) -> Disposition {
        match self {
            Self::Catalog(_) => Disposition::Fatal,
            Self::Chunking(_) | Self::Formatting(_) | Self::MalformedRow { .. } => {
                Disposition::ContainedPerChunk
            }
            Self::Embedding(err) => err.disposition(),
        }
    }

    /// The step label to attach to an error record (§4.D, §7).
    #[must_use]
    pub const fn step(&self) -> FailureStep {
        match self {
            Self::Catalog(_) => FailureStep::Loading,
            Self::Chunking(_) => FailureStep::Chunking,
            Self::Formatting(_) => FailureStep::Formatting,
            Self::Embedding(_) => FailureStep::Embedding,
            Self::MalformedRow { .. } => FailureStep::Parsing,
        }
    }
}

/// An [`ExecutorError`] tagged with the step it occurred in, for callers
/// that need the pairing without re-deriving it from the error variant
/// (e.g. per-chunk error records where the step is known up front).
#[derive(Debug, Error)]
#[error("{step}: {source}")]
pub struct StepError {
    pub step: FailureStep,
    #[source]
    pub source: ExecutorError,
}

impl StepError {
    #[must_use]
    pub const fn new(step: FailureStep, source: ExecutorError) -> Self {
        Self { step, source }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_errors_are_fatal() {
        let err = ExecutorError::MalformedRow {
            pk: "[1]".to_string(),
            message: "not an object".to_string(),
        };
        assert_eq!(err.disposition(), Disposition::ContainedPerChunk);
        assert_eq!(err.step(), FailureStep::Parsing);
    }
}
