//! Provider batch-size registry (§4.C), keyed by provider name.
//!
//! A small, independently unit-testable lookup rather than limits
//! scattered across each provider module.

/// Batch-size limits for one provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProviderLimits {
    pub max_chunks_per_batch: usize,
    pub max_tokens_per_batch: Option<usize>,
}

const UNKNOWN_PROVIDER_LIMITS: ProviderLimits = ProviderLimits {
    max_chunks_per_batch: 5,
    max_tokens_per_batch: None,
};

/// Look up the initial batch-size limits for `provider` (§4.C's registry
/// table). Unknown providers get a conservative default.
#[must_use]
pub fn for_provider(provider: &str) -> ProviderLimits {
    match provider {
        "openai" => ProviderLimits {
            max_chunks_per_batch: 2048,
            max_tokens_per_batch: Some(300_000),
        },
        "voyage" => ProviderLimits {
            max_chunks_per_batch: 128,
            max_tokens_per_batch: None,
        },
        "cohere" => ProviderLimits {
            max_chunks_per_batch: 96,
            max_tokens_per_batch: None,
        },
        "mistral" => ProviderLimits {
            max_chunks_per_batch: 128,
            max_tokens_per_batch: Some(16_384),
        },
        "bedrock" => ProviderLimits {
            max_chunks_per_batch: 96,
            max_tokens_per_batch: None,
        },
        "vertex" => ProviderLimits {
            max_chunks_per_batch: 250,
            max_tokens_per_batch: None,
        },
        "huggingface" => ProviderLimits {
            max_chunks_per_batch: 2048,
            max_tokens_per_batch: None,
        },
        "ollama" => ProviderLimits {
            max_chunks_per_batch: 2048,
            max_tokens_per_batch: None,
        },
        _ => UNKNOWN_PROVIDER_LIMITS,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openai_has_the_documented_batch_cap() {
        assert_eq!(for_provider("openai").max_chunks_per_batch, 2048);
    }

    #[test]
    fn unknown_provider_gets_conservative_default() {
        assert_eq!(for_provider("no-such-provider"), UNKNOWN_PROVIDER_LIMITS);
    }
}
