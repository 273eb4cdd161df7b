//! Voyage AI embeddings provider (§4.C).

use crate::error::{EmbeddingError, EmbeddingResult};
use crate::limits::{self, ProviderLimits};
use crate::providers::http::post_json_bearer;
use crate::traits::{ChunkResult, Embedder};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

const BASE_URL: &str = "https://api.voyageai.com/v1/embeddings";

pub struct VoyageEmbedder {
    client: reqwest::Client,
    api_key: String,
    model: String,
    dimensions: usize,
    base_url: String,
}

impl VoyageEmbedder {
    #[must_use]
    pub fn new(api_key: String, model: String, dimensions: usize) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            model,
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
struct EmbeddingDatum {
    embedding: Vec<f32>,
    index: usize,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingDatum>,
}

#[async_trait]
impl Embedder for VoyageEmbedder {
    async fn embed_batch(&self, documents: &[String]) -> EmbeddingResult<Vec<ChunkResult>> {
        if documents.is_empty() {
            return Ok(Vec::new());
        }

        #[derive(Serialize)]
        struct Request<'a> {
            model: &'a str,
            input: &'a [String],
        }

        let body = post_json_bearer(
            &self.client,
            "voyage",
            &self.base_url,
            &self.api_key,
            &Request {
                model: &self.model,
                input: documents,
            },
        )
        .await?;

        let parsed: EmbeddingResponse = serde_json::from_value(body).map_err(|err| EmbeddingError::UnexpectedResponse {
            provider: "voyage".to_string(),
            message: err.to_string(),
        })?;

        let mut results: Vec<ChunkResult> = vec![Err(String::new()); documents.len()];
        for datum in parsed.data {
            if let Some(slot) = results.get_mut(datum.index) {
                *slot = Ok(datum.embedding);
            }
        }
        Ok(results)
    }

    fn limits(&self) -> ProviderLimits {
        limits::for_provider("voyage")
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

        let embedder = VoyageEmbedder::new("key".to_string(), "voyage-3".to_string(), 2).with_base_url(server.uri());

        let results = embedder
            .embed_batch(&["first".to_string(), "second".to_string()])
            .await
            .unwrap();

        assert_eq!(results[0].as_ref().unwrap(), &vec![0.1, 0.1]);
        assert_eq!(results[1].as_ref().unwrap(), &vec![0.2, 0.2]);
    }
}
