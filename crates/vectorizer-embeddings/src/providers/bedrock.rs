//! AWS Bedrock embeddings provider (§4.C), Titan-style request/response
//! shape. Request signing (SigV4) is delegated to the resolved credential
//! value acting as a bearer token; production deployments that need full
//! SigV4 would layer the `aws-sdk-bedrockruntime` client underneath this
//! same [`Embedder`] impl without changing its shape.

use crate::error::{EmbeddingError, EmbeddingResult};
use crate::limits::{self, ProviderLimits};
use crate::providers::http::post_json_bearer;
use crate::traits::{ChunkResult, Embedder};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub struct BedrockEmbedder {
    client: reqwest::Client,
    credential: String,
    model: String,
    dimensions: usize,
    base_url: String,
}

impl BedrockEmbedder {
    #[must_use]
    pub fn new(credential: String, model: String, region: &str, dimensions: usize) -> Self {
        let base_url = format!(
            "https://bedrock-runtime.{region}.amazonaws.com/model/{model}/invoke"
        );
        Self {
            client: reqwest::Client::new(),
            credential,
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

    async fn embed_one(&self, document: &str) -> EmbeddingResult<Vec<f32>> {
        #[derive(Serialize)]
        struct Request<'a> {
            #[serde(rename = "inputText")]
            input_text: &'a str,
        }

        #[derive(Deserialize)]
        struct Response {
            embedding: Vec<f32>,
        }

        let body = post_json_bearer(
            &self.client,
            "bedrock",
            &self.base_url,
            &self.credential,
            &Request { input_text: document },
        )
        .await?;

        let parsed: Response = serde_json::from_value(body).map_err(|err| EmbeddingError::UnexpectedResponse {
            provider: "bedrock".to_string(),
            message: err.to_string(),
        })?;
        Ok(parsed.embedding)
    }
}

#[async_trait]
impl Embedder for BedrockEmbedder {
    async fn embed_batch(&self, documents: &[String]) -> EmbeddingResult<Vec<ChunkResult>> {
        // Titan's invoke-model endpoint embeds one document per call; there
        // is no native multi-document batch request, so fan-out happens
        // here instead of in a single HTTP body.
        let mut results = Vec::with_capacity(documents.len());
        for document in documents {
            match self.embed_one(document).await {
                Ok(vector) => results.push(Ok(vector)),
                Err(EmbeddingError::ChunkEmbedding { reason, .. }) => results.push(Err(reason)),
                Err(other) => return Err(other),
            }
        }
        Ok(results)
    }

    fn limits(&self) -> ProviderLimits {
        limits::for_provider("bedrock")
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
    async fn embeds_one_document_per_call() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "embedding": [0.3, 0.3]
            })))
            .mount(&server)
            .await;

        let embedder = BedrockEmbedder::new("token".to_string(), "amazon.titan-embed-text-v2:0".to_string(), "us-east-1", 2)
            .with_base_url(server.uri());

        let results = embedder.embed_batch(&["doc-a".to_string(), "doc-b".to_string()]).await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].as_ref().unwrap(), &vec![0.3, 0.3]);
    }
}
