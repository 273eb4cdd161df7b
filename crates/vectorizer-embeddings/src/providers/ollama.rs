//! Ollama embeddings provider (§4.C): a local server, no API key, and a
//! batch-size cap that is configurable via environment rather than fixed,
//! since it depends on the operator's hardware and pulled model.

use crate::error::{EmbeddingError, EmbeddingResult};
use crate::limits::{self, ProviderLimits};
use crate::traits::{ChunkResult, Embedder};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use vectorizer_common::Disposition;

const MAX_BATCH_ENV_VAR: &str = "OLLAMA_MAX_BATCH_SIZE";

pub struct OllamaEmbedder {
    client: reqwest::Client,
    model: String,
    dimensions: usize,
    base_url: String,
    max_chunks_per_batch: usize,
}

impl OllamaEmbedder {
    /// `server_base_url` is the Ollama server root (e.g.
    /// `http://localhost:11434`), as configured per-vectorizer; `/api/embed`
    /// and `/api/tags` are appended here.
    #[must_use]
    pub fn new(server_base_url: &str, model: String, dimensions: usize) -> Self {
        let max_chunks_per_batch = std::env::var(MAX_BATCH_ENV_VAR)
            .ok()
            .and_then(|value| value.parse().ok())
            .unwrap_or_else(|| limits::for_provider("ollama").max_chunks_per_batch);

        Self {
            client: reqwest::Client::new(),
            model,
            dimensions,
            base_url: format!("{}/api/embed", server_base_url.trim_end_matches('/')),
            max_chunks_per_batch,
        }
    }

    #[cfg(test)]
    fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }
}

#[derive(Serialize)]
struct Request<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct Response {
    embeddings: Vec<Vec<f32>>,
}

#[async_trait]
impl Embedder for OllamaEmbedder {
    async fn embed_batch(&self, documents: &[String]) -> EmbeddingResult<Vec<ChunkResult>> {
        if documents.is_empty() {
            return Ok(Vec::new());
        }

        let response = self
            .client
            .post(&self.base_url)
            .json(&Request {
                model: &self.model,
                input: documents,
            })
            .send()
            .await
            .map_err(|err| EmbeddingError::ProviderTransient {
                provider: "ollama".to_string(),
                message: err.to_string(),
            })?;

        let status = response.status();
        let bytes = response.bytes().await.map_err(|err| EmbeddingError::ProviderTransient {
            provider: "ollama".to_string(),
            message: err.to_string(),
        })?;

        if !status.is_success() {
            let message = String::from_utf8_lossy(&bytes).to_string();
            return Err(match vectorizer_common::classify_http_status(status.as_u16()) {
                Disposition::Fatal => EmbeddingError::ProviderAuth {
                    provider: "ollama".to_string(),
                    message,
                },
                _ => EmbeddingError::ProviderTransient {
                    provider: "ollama".to_string(),
                    message,
                },
            });
        }

        let parsed: Response = serde_json::from_slice(&bytes).map_err(|err| EmbeddingError::UnexpectedResponse {
            provider: "ollama".to_string(),
            message: err.to_string(),
        })?;

        if parsed.embeddings.len() != documents.len() {
            return Err(EmbeddingError::UnexpectedResponse {
                provider: "ollama".to_string(),
                message: format!(
                    "expected {} embeddings, got {}",
                    documents.len(),
                    parsed.embeddings.len()
                ),
            });
        }

        Ok(parsed.embeddings.into_iter().map(Ok).collect())
    }

    fn limits(&self) -> ProviderLimits {
        ProviderLimits {
            max_chunks_per_batch: self.max_chunks_per_batch,
            max_tokens_per_batch: None,
        }
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn ensure_ready(&self) -> EmbeddingResult<()> {
        let tags_url = self.base_url.replace("/api/embed", "/api/tags");
        self.client.get(&tags_url).send().await.map_err(|err| EmbeddingError::ProviderTransient {
            provider: "ollama".to_string(),
            message: format!("ollama server unreachable: {err}"),
        })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn embeds_a_batch() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "embeddings": [[0.1, 0.1]]
            })))
            .mount(&server)
            .await;

        let embedder = OllamaEmbedder::new("http://ignored", "nomic-embed-text".to_string(), 2).with_base_url(server.uri());

        let results = embedder.embed_batch(&["doc".to_string()]).await.unwrap();
        assert_eq!(results[0].as_ref().unwrap(), &vec![0.1, 0.1]);
    }

    #[test]
    fn defaults_to_2048_without_env_override() {
        std::env::remove_var(MAX_BATCH_ENV_VAR);
        let embedder = OllamaEmbedder::new("http://localhost:11434", "nomic-embed-text".to_string(), 2);
        assert_eq!(embedder.limits().max_chunks_per_batch, 2048);
    }
}
