//! `character_text_splitter`: split on one separator, then pack into
//! `chunk_size`-character windows with `chunk_overlap` carry.
//!
//! Grounded on `langchain_text_splitters.CharacterTextSplitter.split_text`.

use crate::error::ChunkingError;
use crate::merge::merge_splits;
use regex::Regex;

/// Split `text` on a literal or regex `separator`, dropping empty pieces,
/// then pack the pieces into chunks.
pub fn split(
    text: &str,
    separator: &str,
    chunk_size: usize,
    chunk_overlap: usize,
    is_separator_regex: bool,
) -> Result<Vec<String>, ChunkingError> {
    let pieces = split_on_separator(text, separator, is_separator_regex)?;
    Ok(merge_splits(&pieces, separator, chunk_size, chunk_overlap))
}

/// Split on `separator`, dropping empty pieces (matches the original's
/// `keep_separator=False` default: separators are discarded, not kept as
/// leading/trailing tokens of the pieces).
pub fn split_on_separator(
    text: &str,
    separator: &str,
    is_separator_regex: bool,
) -> Result<Vec<String>, ChunkingError> {
    if separator.is_empty() {
        return Ok(text.chars().map(String::from).filter(|s| !s.is_empty()).collect());
    }

    let pieces: Vec<String> = if is_separator_regex {
        let re = Regex::new(separator).map_err(|source| ChunkingError::InvalidSeparatorRegex {
            pattern: separator.to_string(),
            source,
        })?;
        re.split(text).map(str::to_string).collect()
    } else {
        text.split(separator).map(str::to_string).collect()
    };

    Ok(pieces.into_iter().filter(|s| !s.is_empty()).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn returns_single_chunk_when_under_chunk_size() {
        let chunks = split("hello world", "\n", 1000, 0, false).unwrap();
        assert_eq!(chunks, vec!["hello world"]);
    }

    #[test]
    fn splits_on_literal_separator_and_packs() {
        let text = "one\n\ntwo\n\nthree";
        let chunks = split(text, "\n\n", 8, 0, false).unwrap();
        assert_eq!(chunks, vec!["one\n\ntwo", "three"]);
    }

    #[test]
    fn regex_separator_splits_on_multiple_whitespace() {
        let text = "a   b\tc";
        let chunks = split(text, r"\s+", 1000, 0, true).unwrap();
        assert_eq!(chunks, vec!["a b c"]);
    }

    #[test]
    fn empty_text_yields_no_chunks() {
        let chunks = split("", "\n", 100, 0, false).unwrap();
        assert!(chunks.is_empty());
    }
}
