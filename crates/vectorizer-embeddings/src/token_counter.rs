//! Token counting for the batching algorithm (§4.C).
//!
//! A small trait surface: `name`, `max_tokens`, `count`, `count_batch`.
//! Backed by `tiktoken-rs` for OpenAI/Mistral-style BPE tokenization and a
//! conservative chars/4 heuristic elsewhere.

use std::sync::Arc;
use tiktoken_rs::CoreBPE;

/// Counts tokens for a specific model's tokenizer.
pub trait TokenCounter: Send + Sync {
    fn name(&self) -> &str;
    fn count(&self, text: &str) -> usize;
    fn count_batch(&self, texts: &[&str]) -> Vec<usize> {
        texts.iter().map(|text| self.count(text)).collect()
    }
}

pub type TokenCounterRef = Arc<dyn TokenCounter>;

/// BPE-based counter for OpenAI and Mistral-family models (both use a
/// `cl100k_base`-compatible vocabulary closely enough for batching
/// purposes; exact parity with the provider's own tokenizer is not
/// required here, only a conservative estimate for batch-size decisions).
pub struct TiktokenCounter {
    name: String,
    bpe: CoreBPE,
}

impl TiktokenCounter {
    /// # Errors
    /// Returns an error if the `cl100k_base` encoding table cannot be loaded.
    pub fn cl100k(name: &str) -> Result<Self, anyhow::Error> {
        Ok(Self {
            name: name.to_string(),
            bpe: tiktoken_rs::cl100k_base()?,
        })
    }
}

impl TokenCounter for TiktokenCounter {
    fn name(&self) -> &str {
        &self.name
    }

    fn count(&self, text: &str) -> usize {
        if text.is_empty() {
            return 0;
        }
        self.bpe.encode_ordinary(text).len()
    }
}

/// Fast heuristic counter for providers with no published tokenizer:
/// ~4 characters per token for English-like text, with a small per-char
/// bump for punctuation, which tends to tokenize separately.
pub struct HeuristicCounter {
    name: String,
    chars_per_token: f64,
}

impl HeuristicCounter {
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            chars_per_token: 4.0,
        }
    }
}

impl TokenCounter for HeuristicCounter {
    fn name(&self) -> &str {
        &self.name
    }

    fn count(&self, text: &str) -> usize {
        if text.is_empty() {
            return 0;
        }

        let mut word_chars = 0usize;
        let mut punctuation = 0usize;
        let mut other = 0usize;
        for ch in text.chars() {
            if ch.is_alphanumeric() {
                word_chars += 1;
            } else if ch.is_ascii_punctuation() {
                punctuation += 1;
            } else if !ch.is_whitespace() {
                other += 1;
            }
        }

        let estimated =
            (word_chars as f64 / self.chars_per_token) + (punctuation as f64 * 0.8) + (other as f64 * 0.9);
        estimated.ceil().max(1.0) as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn heuristic_counts_nonzero_for_nonempty_text() {
        let counter = HeuristicCounter::new("test");
        assert!(counter.count("hello world") > 0);
        assert_eq!(counter.count(""), 0);
    }

    #[test]
    fn heuristic_punctuation_increases_count() {
        let counter = HeuristicCounter::new("test");
        let with = counter.count("Hello, world! How are you?");
        let without = counter.count("Hello world How are you");
        assert!(with > without);
    }
}
