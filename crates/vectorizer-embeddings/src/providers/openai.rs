//! OpenAI embeddings provider (§4.C), including the oversize-chunk
//! recovery path: when the API rejects a batch because one input exceeds
//! its context window, split the batch and retry the valid half while
//! recording contained failures for the rest, preserving index alignment.

use crate::error::{EmbeddingError, EmbeddingResult};
use crate::limits::{self, ProviderLimits};
use crate::providers::http::post_json_bearer;
use crate::token_counter::TokenCounterRef;
use crate::traits::{ChunkResult, Embedder};
use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

const BASE_URL: &str = "https://api.openai.com/v1/embeddings";

pub struct OpenAiEmbedder {
    client: reqwest::Client,
    api_key: String,
    model: String,
    dimensions: usize,
    base_url: String,
    token_counter: Option<TokenCounterRef>,
}

impl OpenAiEmbedder {
    #[must_use]
    pub fn new(api_key: String, model: String, dimensions: usize) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            model,
            dimensions,
            base_url: BASE_URL.to_string(),
            token_counter: None,
        }
    }

    /// Override the API base URL (custom deployments, Azure OpenAI-style
    /// gateways, or test doubles).
    #[must_use]
    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }

    /// Attach the token counter used to enforce `max_tokens_per_batch`.
    #[must_use]
    pub fn with_token_counter(mut self, counter: TokenCounterRef) -> Self {
        self.token_counter = Some(counter);
        self
    }

    async fn call(&self, inputs: &[String]) -> EmbeddingResult<Value> {
        #[derive(Serialize)]
        struct Request<'a> {
            model: &'a str,
            input: &'a [String],
        }

        post_json_bearer(
            &self.client,
            "openai",
            &self.base_url,
            &self.api_key,
            &Request {
                model: &self.model,
                input: inputs,
            },
        )
        .await
    }
}

#[derive(Deserialize)]
struct EmbeddingDatum {
    embedding: Vec<f32>,
    index: usize,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingDatum>,
}

/// Parses "... maximum context length is 8191 tokens ..." out of an
/// OpenAI error message, per §4.C's oversize-chunk recovery note.
fn parse_max_context_length(message: &str) -> Option<usize> {
    let re = Regex::new(r"maximum context length is (\d+) tokens").ok()?;
    re.captures(message)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

#[async_trait]
impl Embedder for OpenAiEmbedder {
    async fn embed_batch(&self, documents: &[String]) -> EmbeddingResult<Vec<ChunkResult>> {
        if documents.is_empty() {
            return Ok(Vec::new());
        }

        match self.call(documents).await {
            Ok(body) => {
                let parsed: EmbeddingResponse = serde_json::from_value(body).map_err(|err| {
                    EmbeddingError::UnexpectedResponse {
                        provider: "openai".to_string(),
                        message: err.to_string(),
                    }
                })?;

                let mut results: Vec<ChunkResult> = vec![Err(String::new()); documents.len()];
                for datum in parsed.data {
                    if let Some(slot) = results.get_mut(datum.index) {
                        *slot = Ok(datum.embedding);
                    }
                }
                Ok(results)
            }
            Err(EmbeddingError::ProviderTransient { message, .. }) if parse_max_context_length(&message).is_some() => {
                self.recover_from_oversize_chunks(documents).await
            }
            Err(other) => Err(other),
        }
    }

    fn limits(&self) -> ProviderLimits {
        limits::for_provider("openai")
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn token_counter(&self) -> Option<TokenCounterRef> {
        self.token_counter.clone()
    }
}

impl OpenAiEmbedder {
    /// Bisect `documents` by size until every surviving sub-batch embeds
    /// cleanly, marking any document that fails on its own as a contained
    /// `ChunkEmbedding` error rather than failing the whole batch.
    async fn recover_from_oversize_chunks(&self, documents: &[String]) -> EmbeddingResult<Vec<ChunkResult>> {
        if documents.len() == 1 {
            return Ok(vec![Err(format!(
                "document at original batch position exceeds OpenAI's model context length: {}",
                documents[0].chars().take(80).collect::<String>()
            ))]);
        }

        let mid = documents.len() / 2;
        let (left, right) = documents.split_at(mid);

        let left_results = Box::pin(self.embed_batch(left)).await?;
        let right_results = Box::pin(self.embed_batch(right)).await?;

        let mut combined = left_results;
        combined.extend(right_results);
        Ok(combined)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn parses_context_length_from_error_message() {
        let message = "This model's maximum context length is 8191 tokens, however you requested 9000 tokens.";
        assert_eq!(parse_max_context_length(message), Some(8191));
    }

    #[tokio::test]
    async fn embeds_a_batch_and_preserves_index_order() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": [
                    {"embedding": [0.2, 0.2], "index": 1},
                    {"embedding": [0.1, 0.1], "index": 0},
                ]
            })))
            .mount(&server)
            .await;

        let embedder =
            OpenAiEmbedder::new("test-key".to_string(), "text-embedding-3-small".to_string(), 2)
                .with_base_url(server.uri());

        let results = embedder
            .embed_batch(&["first".to_string(), "second".to_string()])
            .await
            .unwrap();

        assert_eq!(results[0].as_ref().unwrap(), &vec![0.1, 0.1]);
        assert_eq!(results[1].as_ref().unwrap(), &vec![0.2, 0.2]);
    }

    #[tokio::test]
    async fn auth_failure_surfaces_as_provider_auth_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
                "error": {"message": "Incorrect API key provided"}
            })))
            .mount(&server)
            .await;

        let embedder = OpenAiEmbedder::new("bad-key".to_string(), "text-embedding-3-small".to_string(), 2)
            .with_base_url(server.uri());

        let err = embedder.embed_batch(&["doc".to_string()]).await.unwrap_err();
        assert!(matches!(err, EmbeddingError::ProviderAuth { .. }));
    }
}
