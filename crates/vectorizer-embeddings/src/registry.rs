//! Builds an [`Embedder`] from a catalog-declared [`EmbedderSpec`] (§4.C
//! "Decorator-style registration" design note): callers depend on the
//! trait, not on any one provider crate, and adding a ninth provider means
//! adding one match arm and one module.

use crate::error::{EmbeddingError, EmbeddingResult};
use crate::providers::{bedrock, cohere, huggingface, mistral, ollama, openai, vertex, voyage};
use crate::secrets::SecretResolver;
use crate::token_counter::TiktokenCounter;
use crate::traits::Embedder;
use std::sync::Arc;
use vectorizer_config::EmbedderSpec;

/// Build the `cl100k_base` token counter shared by the token-aware
/// providers (OpenAI, Mistral), whose `limits()` set `max_tokens_per_batch`.
fn cl100k_counter(provider: &str, model: &str) -> EmbeddingResult<Arc<TiktokenCounter>> {
    TiktokenCounter::cl100k(model)
        .map(Arc::new)
        .map_err(|err| EmbeddingError::TokenizerInit {
            provider: provider.to_string(),
            message: err.to_string(),
        })
}

const AWS_BEARER_TOKEN_SECRET: &str = "AWS_BEARER_TOKEN_BEDROCK";
const GOOGLE_ACCESS_TOKEN_SECRET: &str = "GOOGLE_ACCESS_TOKEN";

/// Resolve secrets and construct the concrete [`Embedder`] described by
/// `spec`.
pub async fn build_embedder(spec: &EmbedderSpec, secrets: &SecretResolver) -> EmbeddingResult<Arc<dyn Embedder>> {
    let provider = spec.provider_name();
    let dimensions = spec.dimensions();
    let model = spec.model().to_string();

    let embedder: Arc<dyn Embedder> = match spec {
        EmbedderSpec::OpenAI { api_key_name, base_url, .. } => {
            let api_key = secrets.resolve(provider, api_key_name).await?;
            let counter = cl100k_counter(provider, &model)?;
            let mut embedder = openai::OpenAiEmbedder::new(api_key, model, dimensions).with_token_counter(counter);
            if let Some(base_url) = base_url {
                embedder = with_openai_base_url(embedder, base_url);
            }
            Arc::new(embedder)
        }
        EmbedderSpec::Voyage { api_key_name, .. } => {
            let api_key = secrets.resolve(provider, api_key_name).await?;
            Arc::new(voyage::VoyageEmbedder::new(api_key, model, dimensions))
        }
        EmbedderSpec::Cohere { api_key_name, .. } => {
            let api_key = secrets.resolve(provider, api_key_name).await?;
            Arc::new(cohere::CohereEmbedder::new(api_key, model, dimensions))
        }
        EmbedderSpec::Mistral { api_key_name, .. } => {
            let api_key = secrets.resolve(provider, api_key_name).await?;
            let counter = cl100k_counter(provider, &model)?;
            Arc::new(mistral::MistralEmbedder::new(api_key, model, dimensions).with_token_counter(counter))
        }
        EmbedderSpec::Bedrock { region, .. } => {
            let credential = secrets.resolve(provider, AWS_BEARER_TOKEN_SECRET).await?;
            Arc::new(bedrock::BedrockEmbedder::new(credential, model, region, dimensions))
        }
        EmbedderSpec::Vertex { project, location, .. } => {
            let access_token = secrets.resolve(provider, GOOGLE_ACCESS_TOKEN_SECRET).await?;
            Arc::new(vertex::VertexEmbedder::new(access_token, project, location, model, dimensions))
        }
        EmbedderSpec::HuggingFace { api_key_name, .. } => {
            let api_key = secrets.resolve(provider, api_key_name).await?;
            Arc::new(huggingface::HuggingFaceEmbedder::new(api_key, model, dimensions))
        }
        EmbedderSpec::Ollama { base_url, .. } => Arc::new(ollama::OllamaEmbedder::new(base_url, model, dimensions)),
    };

    embedder.ensure_ready().await.map_err(|err| match err {
        EmbeddingError::ProviderTransient { provider, message } => EmbeddingError::ProviderTransient {
            provider,
            message: format!("readiness check failed: {message}"),
        },
        other => other,
    })?;

    Ok(embedder)
}

fn with_openai_base_url(embedder: openai::OpenAiEmbedder, base_url: &str) -> openai::OpenAiEmbedder {
    embedder.with_base_url(base_url.to_string())
}
