//! Builders for `Vectorizer` and source-row test data, so Executor/Worker
//! tests don't each hand-roll a config document (§4.L).

use vectorizer_catalog::{PkColumn, Vectorizer};
use vectorizer_config::{
    Chunker, ChunkingConfig, EmbedderSpec, EmbeddingConfig, Formatter, FormattingConfig,
    IndexingConfig, ProcessingConfig, SchedulingConfig, TextIndexingConfig, VectorizerConfig,
};

/// A minimal, valid `Vectorizer` catalog entry: single integer pk column
/// named `id`, no-op chunker/formatter, a mock embedder spec. Override
/// whatever fields the test actually cares about.
#[must_use]
pub fn sample_vectorizer(id: i64) -> Vectorizer {
    Vectorizer {
        id,
        source_schema: "public".to_string(),
        source_table: "documents".to_string(),
        pk_columns: vec![PkColumn {
            attname: "id".to_string(),
            typname: "int8".to_string(),
        }],
        payload_column: "body".to_string(),
        queue_schema: "ai".to_string(),
        queue_table: format!("_vectorizer_q_{id}"),
        dlq_schema: "ai".to_string(),
        dlq_table: format!("_vectorizer_dlq_{id}"),
        target_schema: "public".to_string(),
        target_table: format!("documents_embedding_store_{id}"),
        trigger_name: format!("_vectorizer_trg_{id}"),
        config: sample_config(),
        disabled: false,
    }
}

/// A config document matching [`sample_vectorizer`]: identity chunker,
/// raw-chunk formatter, a zero-cost mock embedder.
#[must_use]
pub fn sample_config() -> VectorizerConfig {
    VectorizerConfig {
        chunking: ChunkingConfig {
            config_type: None,
            implementation: Chunker::None,
        },
        formatting: FormattingConfig {
            config_type: None,
            implementation: Formatter::ChunkValue,
        },
        embedding: EmbeddingConfig {
            config_type: None,
            implementation: EmbedderSpec::Ollama {
                model: "nomic-embed-text".to_string(),
                dimensions: 768,
                base_url: "http://localhost:11434".to_string(),
            },
        },
        processing: ProcessingConfig::default(),
        indexing: IndexingConfig::default(),
        scheduling: SchedulingConfig::default(),
        text_indexing: TextIndexingConfig::default(),
    }
}

/// A source row with a single integer pk (`id`) and a text payload column
/// (`body`), matching [`sample_vectorizer`]'s `payload_column`.
#[must_use]
pub fn sample_row(id: i64, body: &str) -> serde_json::Value {
    serde_json::json!({ "id": id, "body": body })
}
