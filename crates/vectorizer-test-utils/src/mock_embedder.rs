//! A scriptable [`Embedder`] double (§4.L): "fail N times then succeed",
//! for backoff/retry tests that don't want a real HTTP provider.

use async_trait::async_trait;
use std::sync::Mutex;
use vectorizer_embeddings::limits::ProviderLimits;
use vectorizer_embeddings::{ChunkResult, Embedder, EmbeddingError, EmbeddingResult};

/// Fails whole-batch with [`EmbeddingError::ProviderTransient`] for the
/// first `fail_times` calls to `embed_batch`, then returns a fixed-size
/// zero vector per document.
pub struct MockEmbedder {
    dimensions: usize,
    model_name: String,
    limits: ProviderLimits,
    remaining_failures: Mutex<u32>,
    calls: Mutex<usize>,
}

impl MockEmbedder {
    #[must_use]
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions,
            model_name: "mock-embedder".to_string(),
            limits: ProviderLimits {
                max_chunks_per_batch: 100,
                max_tokens_per_batch: None,
            },
            remaining_failures: Mutex::new(0),
            calls: Mutex::new(0),
        }
    }

    #[must_use]
    pub fn failing_n_times(dimensions: usize, fail_times: u32) -> Self {
        Self {
            remaining_failures: Mutex::new(fail_times),
            ..Self::new(dimensions)
        }
    }

    #[must_use]
    pub fn with_limits(mut self, limits: ProviderLimits) -> Self {
        self.limits = limits;
        self
    }

    #[must_use]
    pub fn call_count(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

#[async_trait]
impl Embedder for MockEmbedder {
    async fn embed_batch(&self, documents: &[String]) -> EmbeddingResult<Vec<ChunkResult>> {
        *self.calls.lock().unwrap() += 1;
        let mut remaining = self.remaining_failures.lock().unwrap();
        if *remaining > 0 {
            *remaining -= 1;
            return Err(EmbeddingError::ProviderTransient {
                provider: "mock".to_string(),
                message: "mock embedder: scripted failure".to_string(),
            });
        }
        Ok(documents
            .iter()
            .map(|_| Ok(vec![0.0_f32; self.dimensions]))
            .collect())
    }

    fn limits(&self) -> ProviderLimits {
        self.limits
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}
