//! Error taxonomy for the embedding adapters (§7).

use thiserror::Error;
use vectorizer_common::Disposition;

/// Result type alias for embedding operations.
pub type EmbeddingResult<T> = Result<T, EmbeddingError>;

/// Comprehensive error type for provider calls and the shared batching
/// algorithm. Each variant corresponds to one row of §7's error table.
#[derive(Debug, Error)]
pub enum EmbeddingError {
    /// The configured secret name could not be resolved from the
    /// environment or the database reveal-secret call. Fatal to the
    /// vectorizer (§7).
    #[error("api key '{secret_name}' not found for provider '{provider}'")]
    ApiKeyNotFound {
        provider: String,
        secret_name: String,
    },

    /// 401/403 from the provider: the key itself is rejected. Fatal to the
    /// vectorizer (§7).
    #[error("provider '{provider}' rejected credentials: {message}")]
    ProviderAuth { provider: String, message: String },

    /// 408/429/5xx or a network error: retryable at the batch level.
    #[error("provider '{provider}' transient failure: {message}")]
    ProviderTransient { provider: String, message: String },

    /// A single document exceeds `max_tokens_per_batch` on its own; no
    /// batch size could ever contain it.
    #[error("document of {token_count} tokens exceeds provider batch limit of {limit} tokens")]
    Batching { token_count: usize, limit: usize },

    /// Per-chunk embedding failure contained to one document among many.
    #[error("chunk embedding failed at index {index}: {reason}")]
    ChunkEmbedding {
        index: usize,
        reason: String,
    },

    /// Malformed or unexpected provider response shape.
    #[error("provider '{provider}' returned an unexpected response: {message}")]
    UnexpectedResponse { provider: String, message: String },

    /// A token-aware provider's tokenizer could not be constructed (e.g.
    /// the `cl100k_base` encoding table failed to load). Fatal: no batch
    /// from this provider can be sized correctly without it.
    #[error("provider '{provider}' tokenizer could not be initialized: {message}")]
    TokenizerInit { provider: String, message: String },
}

impl EmbeddingError {
    /// Classify this error for the Worker run loop (§9 Open Question
    /// resolution: explicit `Disposition` classifier).
    #[must_use]
    pub fn disposition(&self) -> Disposition {
        match self {
            Self::ApiKeyNotFound { .. } | Self::ProviderAuth { .. } | Self::TokenizerInit { .. } => {
                Disposition::Fatal
            }
            Self::ProviderTransient { .. } | Self::Batching { .. } | Self::UnexpectedResponse { .. } => {
                Disposition::RetryablePerBatch
            }
            Self::ChunkEmbedding { .. } => Disposition::ContainedPerChunk,
        }
    }
}
