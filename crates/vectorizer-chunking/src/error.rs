//! Errors for chunking and formatting (§7 `ChunkingError`/`FormattingError`).

use thiserror::Error;

/// Failure while splitting a row's payload into chunks.
#[derive(Debug, Error)]
pub enum ChunkingError {
    #[error("invalid separator regex '{pattern}': {source}")]
    InvalidSeparatorRegex {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

/// Failure while formatting a chunk against its source row (§4.B).
#[derive(Debug, Error)]
pub enum FormattingError {
    #[error("template references unknown column '{column}'")]
    UnknownColumn { column: String },

    #[error("template has an unterminated '${{' placeholder")]
    UnterminatedPlaceholder,

    #[error("row column '{column}' is not a scalar value usable in a template")]
    NonScalarColumn { column: String },
}
