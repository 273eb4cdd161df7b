//! HuggingFace Inference API embeddings provider (§4.C). The
//! feature-extraction endpoint returns a bare array of vectors aligned by
//! input order, with no batching metadata.

use crate::error::{EmbeddingError, EmbeddingResult};
use crate::limits::{self, ProviderLimits};
use crate::providers::http::post_json_bearer;
use crate::traits::{ChunkResult, Embedder};
use async_trait::async_trait;
use serde::Serialize;

pub struct HuggingFaceEmbedder {
    client: reqwest::Client,
    api_key: String,
    model: String,
    dimensions: usize,
    base_url: String,
}

impl HuggingFaceEmbedder {
    #[must_use]
    pub fn new(api_key: String, model: String, dimensions: usize) -> Self {
        let base_url = format!("https://api-inference.huggingface.co/models/{model}");
        Self {
            client: reqwest::Client::new(),
            api_key,
            model,
            dimensions,
            base_url,
        }
    }

    #[cfg(test)]
    fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }
}

#[async_trait]
impl Embedder for HuggingFaceEmbedder {
    async fn embed_batch(&self, documents: &[String]) -> EmbeddingResult<Vec<ChunkResult>> {
        if documents.is_empty() {
            return Ok(Vec::new());
        }

        #[derive(Serialize)]
        struct Request<'a> {
            inputs: &'a [String],
            options: RequestOptions,
        }

        #[derive(Serialize)]
        struct RequestOptions {
            wait_for_model: bool,
        }

        let body = post_json_bearer(
            &self.client,
            "huggingface",
            &self.base_url,
            &self.api_key,
            &Request {
                inputs: documents,
                options: RequestOptions { wait_for_model: true },
            },
        )
        .await?;

        let parsed: Vec<Vec<f32>> = serde_json::from_value(body).map_err(|err| EmbeddingError::UnexpectedResponse {
            provider: "huggingface".to_string(),
            message: err.to_string(),
        })?;

        if parsed.len() != documents.len() {
            return Err(EmbeddingError::UnexpectedResponse {
                provider: "huggingface".to_string(),
                message: format!("expected {} embeddings, got {}", documents.len(), parsed.len()),
            });
        }

        Ok(parsed.into_iter().map(Ok).collect())
    }

    fn limits(&self) -> ProviderLimits {
        limits::for_provider("huggingface")
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
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([[0.1, 0.1], [0.2, 0.2]])))
            .mount(&server)
            .await;

        let embedder = HuggingFaceEmbedder::new("key".to_string(), "sentence-transformers/all-MiniLM-L6-v2".to_string(), 2)
            .with_base_url(server.uri());

        let results = embedder
            .embed_batch(&["first".to_string(), "second".to_string()])
            .await
            .unwrap();

        assert_eq!(results[0].as_ref().unwrap(), &vec![0.1, 0.1]);
    }
}
