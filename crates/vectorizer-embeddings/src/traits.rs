//! The `Embedder` trait: one implementation per provider.

use crate::error::EmbeddingResult;
use crate::limits::ProviderLimits;
use crate::token_counter::TokenCounterRef;
use async_trait::async_trait;

/// The outcome of embedding one document: either a vector, or a contained
/// per-chunk failure (§4.C, §7 `ChunkEmbeddingError`).
pub type ChunkResult = Result<Vec<f32>, String>;

/// A provider-specific embedding adapter.
///
/// This trait is the provider-facing half (`embed_batch`, limits, model
/// identity, readiness), while [`crate::batching::batch_and_embed`] is the
/// shared, provider-agnostic batching algorithm built on top of it.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed one batch of documents, already sized to fit this provider's
    /// limits. Returns one [`ChunkResult`] per input document, aligned by
    /// index.
    async fn embed_batch(&self, documents: &[String]) -> EmbeddingResult<Vec<ChunkResult>>;

    /// This provider's batch-size limits (§4.C registry).
    fn limits(&self) -> ProviderLimits;

    /// The configured model name, for logging and error context.
    fn model_name(&self) -> &str;

    /// Vector dimensionality this provider is configured to produce.
    fn dimensions(&self) -> usize;

    /// The token counter to use when this provider's `limits()` set
    /// `max_tokens_per_batch`. Providers with no token-based limit return
    /// `None`, in which case batching falls back to chunk-count alone.
    fn token_counter(&self) -> Option<TokenCounterRef> {
        None
    }

    /// Best-effort readiness check (e.g. ensure an Ollama model is pulled).
    /// Providers with nothing to prepare return `Ok(())` immediately.
    async fn ensure_ready(&self) -> EmbeddingResult<()> {
        Ok(())
    }
}
