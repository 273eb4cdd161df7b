//! Google Vertex AI embeddings provider (§4.C), `predict` endpoint shape.
//! As with [`crate::providers::bedrock`], the resolved credential is used
//! as a bearer token in place of full OAuth2 service-account signing.

use crate::error::{EmbeddingError, EmbeddingResult};
use crate::limits::{self, ProviderLimits};
use crate::providers::http::post_json_bearer;
use crate::traits::{ChunkResult, Embedder};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub struct VertexEmbedder {
    client: reqwest::Client,
    access_token: String,
    model: String,
    dimensions: usize,
    base_url: String,
}

impl VertexEmbedder {
    #[must_use]
    pub fn new(access_token: String, project_id: &str, location: &str, model: String, dimensions: usize) -> Self {
        let base_url = format!(
            "https://{location}-aiplatform.googleapis.com/v1/projects/{project_id}/locations/{location}/publishers/google/models/{model}:predict"
        );
        Self {
            client: reqwest::Client::new(),
            access_token,
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

#[derive(Serialize)]
struct Instance<'a> {
    content: &'a str,
}

#[derive(Serialize)]
struct Request<'a> {
    instances: Vec<Instance<'a>>,
}

#[derive(Deserialize)]
struct Embeddings {
    values: Vec<f32>,
}

#[derive(Deserialize)]
struct Prediction {
    embeddings: Embeddings,
}

#[derive(Deserialize)]
struct Response {
    predictions: Vec<Prediction>,
}

#[async_trait]
impl Embedder for VertexEmbedder {
    async fn embed_batch(&self, documents: &[String]) -> EmbeddingResult<Vec<ChunkResult>> {
        if documents.is_empty() {
            return Ok(Vec::new());
        }

        let instances = documents.iter().map(|document| Instance { content: document }).collect();

        let body = post_json_bearer(
            &self.client,
            "vertex",
            &self.base_url,
            &self.access_token,
            &Request { instances },
        )
        .await?;

        let parsed: Response = serde_json::from_value(body).map_err(|err| EmbeddingError::UnexpectedResponse {
            provider: "vertex".to_string(),
            message: err.to_string(),
        })?;

        if parsed.predictions.len() != documents.len() {
            return Err(EmbeddingError::UnexpectedResponse {
                provider: "vertex".to_string(),
                message: format!(
                    "expected {} predictions, got {}",
                    documents.len(),
                    parsed.predictions.len()
                ),
            });
        }

        Ok(parsed
            .predictions
            .into_iter()
            .map(|prediction| Ok(prediction.embeddings.values))
            .collect())
    }

    fn limits(&self) -> ProviderLimits {
        limits::for_provider("vertex")
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
                "predictions": [{"embeddings": {"values": [0.1, 0.1]}}]
            })))
            .mount(&server)
            .await;

        let embedder = VertexEmbedder::new("token".to_string(), "my-project", "us-central1", "text-embedding-004".to_string(), 2)
            .with_base_url(server.uri());

        let results = embedder.embed_batch(&["doc".to_string()]).await.unwrap();
        assert_eq!(results[0].as_ref().unwrap(), &vec![0.1, 0.1]);
    }
}
