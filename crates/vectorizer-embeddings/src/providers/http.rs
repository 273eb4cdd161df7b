//! Shared HTTP plumbing for the provider adapters: a single request/response
//! cycle with status-code-based [`Disposition`](vectorizer_common::Disposition)
//! classification, factored out so each provider only supplies its own
//! request body and response parsing.

use crate::error::EmbeddingError;
use serde::Serialize;
use serde_json::Value;
use vectorizer_common::classify_http_status;

/// POST `body` as JSON to `url` with the given bearer token, returning the
/// parsed JSON response. Non-2xx responses are classified by status code
/// into the appropriate [`EmbeddingError`] variant.
pub async fn post_json_bearer<B: Serialize + ?Sized>(
    client: &reqwest::Client,
    provider: &str,
    url: &str,
    bearer_token: &str,
    body: &B,
) -> Result<Value, EmbeddingError> {
    let response = client
        .post(url)
        .bearer_auth(bearer_token)
        .json(body)
        .send()
        .await
        .map_err(|err| EmbeddingError::ProviderTransient {
            provider: provider.to_string(),
            message: err.to_string(),
        })?;

    handle_response(provider, response).await
}

/// Same as [`post_json_bearer`], but with a custom header name instead of
/// `Authorization: Bearer` (providers such as Cohere and Voyage still use
/// bearer auth, but Vertex/Bedrock-style signed requests are dispatched
/// through provider-specific clients instead of this helper).
pub async fn post_json_header<B: Serialize + ?Sized>(
    client: &reqwest::Client,
    provider: &str,
    url: &str,
    header_name: &str,
    header_value: &str,
    body: &B,
) -> Result<Value, EmbeddingError> {
    let response = client
        .post(url)
        .header(header_name, header_value)
        .json(body)
        .send()
        .await
        .map_err(|err| EmbeddingError::ProviderTransient {
            provider: provider.to_string(),
            message: err.to_string(),
        })?;

    handle_response(provider, response).await
}

async fn handle_response(provider: &str, response: reqwest::Response) -> Result<Value, EmbeddingError> {
    let status = response.status();
    let bytes = response.bytes().await.map_err(|err| EmbeddingError::ProviderTransient {
        provider: provider.to_string(),
        message: err.to_string(),
    })?;

    let parsed: Value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);

    if status.is_success() {
        return Ok(parsed);
    }

    let message = extract_error_message(&parsed).unwrap_or_else(|| status.to_string());

    match classify_http_status(status.as_u16()) {
        vectorizer_common::Disposition::Fatal => Err(EmbeddingError::ProviderAuth {
            provider: provider.to_string(),
            message,
        }),
        _ => Err(EmbeddingError::ProviderTransient {
            provider: provider.to_string(),
            message,
        }),
    }
}

fn extract_error_message(body: &Value) -> Option<String> {
    body.get("error")
        .and_then(|err| err.get("message").or(Some(err)))
        .and_then(Value::as_str)
        .map(str::to_string)
        .or_else(|| body.get("message").and_then(Value::as_str).map(str::to_string))
}
