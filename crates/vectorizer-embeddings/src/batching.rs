//! The provider-agnostic batching algorithm (§4.C "Batching algorithm").
//!
//! Implemented once against any [`Embedder`], rather than duplicated per
//! provider: a shared batching algorithm layered on top of a thin
//! provider trait.

use crate::error::{EmbeddingError, EmbeddingResult};
use crate::token_counter::TokenCounterRef;
use crate::traits::{ChunkResult, Embedder};
use std::sync::Arc;

/// Walk `documents` left to right, building batches that respect the
/// embedder's `max_chunks_per_batch` and (if a counter is supplied)
/// `max_tokens_per_batch`, calling the provider once per batch in sequence
/// and concatenating results in the original order.
///
/// A single document whose own token count exceeds `max_tokens_per_batch`
/// is reported as [`EmbeddingError::Batching`] rather than silently split;
/// callers that need splitting (e.g. an OpenAI "maximum context length"
/// response) handle it at the provider layer, since the limit that trips
/// there is the provider's actual limit, not this estimate.
pub async fn batch_and_embed(
    embedder: &Arc<dyn Embedder>,
    documents: &[String],
    token_counter: Option<&TokenCounterRef>,
) -> EmbeddingResult<Vec<ChunkResult>> {
    if documents.is_empty() {
        return Ok(Vec::new());
    }

    let limits = embedder.limits();
    let mut results = Vec::with_capacity(documents.len());

    let mut batch_start = 0usize;
    while batch_start < documents.len() {
        let batch_end = next_batch_end(documents, batch_start, limits.max_chunks_per_batch, limits.max_tokens_per_batch, token_counter)?;
        let batch = &documents[batch_start..batch_end];
        let batch_results = embedder.embed_batch(batch).await?;
        if batch_results.len() != batch.len() {
            return Err(EmbeddingError::UnexpectedResponse {
                provider: embedder.model_name().to_string(),
                message: format!(
                    "provider returned {} results for a batch of {}",
                    batch_results.len(),
                    batch.len()
                ),
            });
        }
        results.extend(batch_results);
        batch_start = batch_end;
    }

    Ok(results)
}

/// Find the exclusive end index of the next batch starting at `start`.
fn next_batch_end(
    documents: &[String],
    start: usize,
    max_chunks_per_batch: usize,
    max_tokens_per_batch: Option<usize>,
    token_counter: Option<&TokenCounterRef>,
) -> EmbeddingResult<usize> {
    let Some(max_tokens) = max_tokens_per_batch else {
        let end = (start + max_chunks_per_batch).min(documents.len());
        return Ok(end.max(start + 1));
    };

    let Some(counter) = token_counter else {
        let end = (start + max_chunks_per_batch).min(documents.len());
        return Ok(end.max(start + 1));
    };

    let first_tokens = counter.count(&documents[start]);
    if first_tokens > max_tokens {
        return Err(EmbeddingError::Batching {
            token_count: first_tokens,
            limit: max_tokens,
        });
    }

    let mut end = start + 1;
    let mut running_tokens = first_tokens;
    while end < documents.len() && end - start < max_chunks_per_batch {
        let next_tokens = counter.count(&documents[end]);
        if running_tokens + next_tokens > max_tokens {
            break;
        }
        running_tokens += next_tokens;
        end += 1;
    }

    Ok(end)
}
