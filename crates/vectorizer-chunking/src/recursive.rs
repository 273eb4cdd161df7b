//! `recursive_character_text_splitter`: try each separator in turn, recursing
//! into any piece still larger than `chunk_size` with the remaining,
//! finer-grained separators.
//!
//! Grounded on `langchain_text_splitters.RecursiveCharacterTextSplitter._split_text`.

use crate::character::split_on_separator;
use crate::error::ChunkingError;
use crate::merge::merge_splits;
use regex::Regex;

pub fn split(
    text: &str,
    separators: &[String],
    chunk_size: usize,
    chunk_overlap: usize,
    is_separator_regex: bool,
) -> Result<Vec<String>, ChunkingError> {
    split_recursive(text, separators, chunk_size, chunk_overlap, is_separator_regex)
}

fn split_recursive(
    text: &str,
    separators: &[String],
    chunk_size: usize,
    chunk_overlap: usize,
    is_separator_regex: bool,
) -> Result<Vec<String>, ChunkingError> {
    // Pick the first separator (in priority order) that actually occurs in
    // `text`, falling back to the last (typically "") if none do.
    let mut chosen = separators.last().cloned().unwrap_or_default();
    let mut remaining: &[String] = &[];

    for (i, candidate) in separators.iter().enumerate() {
        if candidate.is_empty() {
            chosen = candidate.clone();
            remaining = &[];
            break;
        }
        let occurs = if is_separator_regex {
            Regex::new(candidate)
                .map_err(|source| ChunkingError::InvalidSeparatorRegex {
                    pattern: candidate.clone(),
                    source,
                })?
                .is_match(text)
        } else {
            text.contains(candidate.as_str())
        };
        if occurs {
            chosen = candidate.clone();
            remaining = &separators[i + 1..];
            break;
        }
    }

    let pieces = split_on_separator(text, &chosen, is_separator_regex)?;

    let mut final_chunks = Vec::new();
    let mut good_splits: Vec<String> = Vec::new();

    for piece in pieces {
        if piece.chars().count() < chunk_size {
            good_splits.push(piece);
        } else {
            if !good_splits.is_empty() {
                final_chunks.extend(merge_splits(&good_splits, &chosen, chunk_size, chunk_overlap));
                good_splits.clear();
            }
            if remaining.is_empty() {
                final_chunks.push(piece);
            } else {
                final_chunks.extend(split_recursive(
                    &piece,
                    remaining,
                    chunk_size,
                    chunk_overlap,
                    is_separator_regex,
                )?);
            }
        }
    }

    if !good_splits.is_empty() {
        final_chunks.extend(merge_splits(&good_splits, &chosen, chunk_size, chunk_overlap));
    }

    Ok(final_chunks)
}
