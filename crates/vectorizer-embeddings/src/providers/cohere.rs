//! Cohere embeddings provider (§4.C). Cohere's `embed` endpoint returns
//! embeddings positionally (no per-item index field), unlike OpenAI/Voyage.

use crate::error::{EmbeddingError, EmbeddingResult};
use crate::limits::{self, ProviderLimits};
use crate::providers::http::post_json_bearer;
use crate::traits::{ChunkResult, Embedder};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

const BASE_URL: &str = "https://api.cohere.com/v1/embed";

pub struct CohereEmbedder {
    client: reqwest::Client,
    api_key: String,
    model: String,
    input_type: String,
    dimensions: usize,
    base_url: String,
}

impl CohereEmbedder {
    #[must_use]
    pub fn new(api_key: String, model: String, dimensions: usize) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            model,
            input_type: "search_document".to_string(),
            dimensions,
            base_url: BASE_URL.to_string(),
        }
    }

    #[cfg(test)]
    fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    embeddings: Vec<Vec<f32>>,
}

#[async_trait]
impl Embedder for CohereEmbedder {
    async fn embed_batch(&self, documents: &[String]) -> EmbeddingResult<Vec<ChunkResult>> {
        if documents.is_empty() {
            return Ok(Vec::new());
        }

        #[derive(Serialize)]
        struct Request<'a> {
            model: &'a str,
            texts: &'a [String],
            input_type: &'a str,
        }

        let body = post_json_bearer(
            &self.client,
            "cohere",
            &self.base_url,
            &self.api_key,
            &Request {
                model: &self.model,
                texts: documents,
                input_type: &self.input_type,
            },
        )
        .await?;

        let parsed: EmbeddingResponse = serde_json::from_value(body).map_err(|err| EmbeddingError::UnexpectedResponse {
            provider: "cohere".to_string(),
            message: err.to_string(),
        })?;

        if parsed.embeddings.len() != documents.len() {
            return Err(EmbeddingError::UnexpectedResponse {
                provider: "cohere".to_string(),
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
        limits::for_provider("cohere")
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn embeds_a_batch_positionally() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "embeddings": [[0.1, 0.1], [0.2, 0.2]]
            })))
            .mount(&server)
            .await;

        let embedder =
            CohereEmbedder::new("key".to_string(), "embed-english-v3.0".to_string(), 2).with_base_url(server.uri());

        let results = embedder
            .embed_batch(&["first".to_string(), "second".to_string()])
            .await
            .unwrap();

        assert_eq!(results[0].as_ref().unwrap(), &vec![0.1, 0.1]);
        assert_eq!(results[1].as_ref().unwrap(), &vec![0.2, 0.2]);
    }
}
