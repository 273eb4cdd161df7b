//! `Chunker::apply`: dispatch to the variant-specific splitting algorithm.

use crate::error::ChunkingError;
use crate::{character, recursive};
use vectorizer_config::Chunker;

/// Extension trait implementing the pure `(config, payload) -> chunks`
/// contract of §4.B on the config-layer `Chunker` enum.
pub trait ChunkerExt {
    /// Split `payload` into an ordered list of chunk texts. Empty input
    /// yields an empty list (§4.B edge case).
    fn apply(&self, payload: &str) -> Result<Vec<String>, ChunkingError>;
}

impl ChunkerExt for Chunker {
    fn apply(&self, payload: &str) -> Result<Vec<String>, ChunkingError> {
        if payload.is_empty() {
            return Ok(Vec::new());
        }

        match self {
            Self::None => Ok(vec![payload.to_string()]),
            Self::CharacterTextSplitter {
                separator,
                chunk_size,
                chunk_overlap,
                is_separator_regex,
            } => character::split(payload, separator, *chunk_size, *chunk_overlap, *is_separator_regex),
            Self::RecursiveCharacterTextSplitter {
                separators,
                chunk_size,
                chunk_overlap,
                is_separator_regex,
            } => recursive::split(
                payload,
                separators,
                *chunk_size,
                *chunk_overlap,
                *is_separator_regex,
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn none_chunker_returns_single_chunk() {
        let chunker = Chunker::None;
        assert_eq!(chunker.apply("hello").unwrap(), vec!["hello"]);
    }

    #[test]
    fn empty_payload_yields_no_chunks_regardless_of_variant() {
        let chunker = Chunker::None;
        assert!(chunker.apply("").unwrap().is_empty());
    }
}
