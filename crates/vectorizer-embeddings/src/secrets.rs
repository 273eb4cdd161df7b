//! API key resolution (§4.C "Authentication").
//!
//! Secrets are resolved from the environment first; a database
//! "reveal secret" call is supported as an optional fallback, injected as a
//! trait object so the default build carries no extra database dependency
//! and tests can supply a fake without touching real secret storage.

use crate::error::{EmbeddingError, EmbeddingResult};
use async_trait::async_trait;
use std::sync::Arc;

/// A source of last resort for secrets not present in the environment
/// (e.g. a catalog-backed "reveal secret" RPC).
#[async_trait]
pub trait DbSecretReveal: Send + Sync {
    async fn reveal(&self, secret_name: &str) -> EmbeddingResult<Option<String>>;
}

/// Resolves provider API keys by name.
#[derive(Clone, Default)]
pub struct SecretResolver {
    db_fallback: Option<Arc<dyn DbSecretReveal>>,
}

impl SecretResolver {
    #[must_use]
    pub fn new() -> Self {
        Self { db_fallback: None }
    }

    #[must_use]
    pub fn with_db_fallback(db_fallback: Arc<dyn DbSecretReveal>) -> Self {
        Self {
            db_fallback: Some(db_fallback),
        }
    }

    /// Resolve `secret_name` for `provider`, or `ApiKeyNotFound` (fatal to
    /// the vectorizer, §7) if neither source has it.
    pub async fn resolve(&self, provider: &str, secret_name: &str) -> EmbeddingResult<String> {
        if let Ok(value) = std::env::var(secret_name) {
            if !value.is_empty() {
                return Ok(value);
            }
        }

        if let Some(db) = &self.db_fallback {
            if let Some(value) = db.reveal(secret_name).await? {
                return Ok(value);
            }
        }

        Err(EmbeddingError::ApiKeyNotFound {
            provider: provider.to_string(),
            secret_name: secret_name.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct AlwaysMissing;

    #[async_trait]
    impl DbSecretReveal for AlwaysMissing {
        async fn reveal(&self, _secret_name: &str) -> EmbeddingResult<Option<String>> {
            Ok(None)
        }
    }

    #[tokio::test]
    async fn resolves_from_environment() {
        std::env::set_var("VECTORIZER_TEST_SECRET_A", "s3cr3t");
        let resolver = SecretResolver::new();
        let value = resolver.resolve("openai", "VECTORIZER_TEST_SECRET_A").await.unwrap();
        assert_eq!(value, "s3cr3t");
        std::env::remove_var("VECTORIZER_TEST_SECRET_A");
    }

    #[tokio::test]
    async fn missing_secret_is_fatal() {
        let resolver = SecretResolver::with_db_fallback(Arc::new(AlwaysMissing));
        let err = resolver
            .resolve("openai", "VECTORIZER_TEST_SECRET_MISSING")
            .await
            .unwrap_err();
        assert!(matches!(err, EmbeddingError::ApiKeyNotFound { .. }));
    }
}
