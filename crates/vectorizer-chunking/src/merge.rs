//! The window-packing step shared by the character and recursive splitters:
//! given an ordered list of already-split pieces and a separator that will
//! rejoin them, pack them into chunks of at most `chunk_size` characters
//! with `chunk_overlap` characters of trailing carry into the next chunk.
//!
//! Grounded on `langchain_text_splitters.TextSplitter._merge_splits`, the
//! shared base class both `CharacterTextSplitter` and
//! `RecursiveCharacterTextSplitter` build on in the original implementation.

pub fn merge_splits(splits: &[String], separator: &str, chunk_size: usize, chunk_overlap: usize) -> Vec<String> {
    let separator_len = separator.chars().count();
    let mut docs = Vec::new();
    let mut current: Vec<String> = Vec::new();
    let mut total = 0usize;

    for piece in splits {
        let len = piece.chars().count();
        let joiner = if current.is_empty() { 0 } else { separator_len };

        if total + len + joiner > chunk_size {
            if total > chunk_size {
                tracing::warn!(chunk_size, total, "chunk exceeds configured chunk_size");
            }
            if !current.is_empty() {
                docs.push(current.join(separator));

                while total > chunk_overlap
                    || (total + len + if current.len() > 1 { separator_len } else { 0 } > chunk_size
                        && total > 0)
                {
                    if current.is_empty() {
                        break;
                    }
                    let dropped_len = current[0].chars().count();
                    let drop_joiner = if current.len() > 1 { separator_len } else { 0 };
                    total = total.saturating_sub(dropped_len + drop_joiner);
                    current.remove(0);
                }
            }
        }

        current.push(piece.clone());
        let join_cost = if current.len() > 1 { separator_len } else { 0 };
        total += len + join_cost;
    }

    if !current.is_empty() {
        docs.push(current.join(separator));
    }

    docs
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn packs_pieces_under_chunk_size() {
        let splits = vec!["aaaa".to_string(), "bbbb".to_string(), "cccc".to_string()];
        let merged = merge_splits(&splits, " ", 9, 0);
        assert_eq!(merged, vec!["aaaa bbbb", "cccc"]);
    }

    #[test]
    fn single_oversize_piece_becomes_its_own_chunk() {
        let splits = vec!["a".repeat(20)];
        let merged = merge_splits(&splits, " ", 10, 0);
        assert_eq!(merged, vec!["a".repeat(20)]);
    }

    #[test]
    fn empty_input_yields_no_chunks() {
        let merged = merge_splits(&[], " ", 10, 0);
        assert!(merged.is_empty());
    }
}
