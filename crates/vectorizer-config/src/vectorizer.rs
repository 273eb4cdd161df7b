//! The per-vectorizer discriminated configuration tree
//!
//! This mirrors the catalog's `config` JSONB document: a handful of
//! sub-trees (chunking, formatting, embedding, processing, indexing,
//! scheduling, text_indexing), each a tagged union keyed by an
//! `implementation` field. `config_type` is carried on the wire for each
//! sub-tree but is redundant for dispatch (the field name already tells
//! us which sub-tree we're in) - kept only so documents round-trip.

use serde::{Deserialize, Serialize};

/// Top-level per-vectorizer configuration document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorizerConfig {
    pub chunking: ChunkingConfig,
    pub formatting: FormattingConfig,
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub processing: ProcessingConfig,
    #[serde(default)]
    pub indexing: IndexingConfig,
    #[serde(default)]
    pub scheduling: SchedulingConfig,
    #[serde(default)]
    pub text_indexing: TextIndexingConfig,
}

macro_rules! config_wrapper {
    ($wrapper:ident, $inner:ident) => {
        #[derive(Debug, Clone, Serialize, Deserialize)]
        pub struct $wrapper {
            /// Redundant for dispatch; present on the wire for compatibility
            /// with the source document format.
            #[serde(default)]
            pub config_type: Option<String>,
            #[serde(flatten)]
            pub implementation: $inner,
        }
    };
}

config_wrapper!(ChunkingConfig, Chunker);
config_wrapper!(FormattingConfig, Formatter);
config_wrapper!(EmbeddingConfig, EmbedderSpec);

/// Chunker variants (§4.B)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "implementation", rename_all = "snake_case")]
pub enum Chunker {
    None,
    CharacterTextSplitter {
        separator: String,
        chunk_size: usize,
        chunk_overlap: usize,
        #[serde(default)]
        is_separator_regex: bool,
    },
    RecursiveCharacterTextSplitter {
        separators: Vec<String>,
        chunk_size: usize,
        chunk_overlap: usize,
        #[serde(default)]
        is_separator_regex: bool,
    },
}

/// Formatter variants (§4.B)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "implementation", rename_all = "snake_case")]
pub enum Formatter {
    ChunkValue,
    PythonTemplate { template: String },
}

/// Embedder provider selection (§4.C). Holds provider-specific fields;
/// the model name, secret name, and declared vector dimension are common
/// to every variant because every provider needs them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "implementation", rename_all = "snake_case")]
pub enum EmbedderSpec {
    OpenAI {
        model: String,
        dimensions: usize,
        #[serde(default = "default_openai_secret")]
        api_key_name: String,
        #[serde(default)]
        base_url: Option<String>,
    },
    Voyage {
        model: String,
        dimensions: usize,
        #[serde(default = "default_voyage_secret")]
        api_key_name: String,
    },
    Cohere {
        model: String,
        dimensions: usize,
        #[serde(default = "default_cohere_secret")]
        api_key_name: String,
    },
    Mistral {
        model: String,
        dimensions: usize,
        #[serde(default = "default_mistral_secret")]
        api_key_name: String,
    },
    Bedrock {
        model: String,
        dimensions: usize,
        region: String,
    },
    Vertex {
        model: String,
        dimensions: usize,
        project: String,
        location: String,
    },
    HuggingFace {
        model: String,
        dimensions: usize,
        #[serde(default = "default_hf_secret")]
        api_key_name: String,
    },
    Ollama {
        model: String,
        dimensions: usize,
        #[serde(default = "default_ollama_base_url")]
        base_url: String,
    },
}

impl EmbedderSpec {
    /// Canonical provider name, used for the provider-limits lookup and
    /// for structured log fields - never the struct variant's Debug form.
    #[must_use]
    pub const fn provider_name(&self) -> &'static str {
        match self {
            Self::OpenAI { .. } => "openai",
            Self::Voyage { .. } => "voyage",
            Self::Cohere { .. } => "cohere",
            Self::Mistral { .. } => "mistral",
            Self::Bedrock { .. } => "bedrock",
            Self::Vertex { .. } => "vertex",
            Self::HuggingFace { .. } => "huggingface",
            Self::Ollama { .. } => "ollama",
        }
    }

    #[must_use]
    pub const fn dimensions(&self) -> usize {
        match self {
            Self::OpenAI { dimensions, .. }
            | Self::Voyage { dimensions, .. }
            | Self::Cohere { dimensions, .. }
            | Self::Mistral { dimensions, .. }
            | Self::Bedrock { dimensions, .. }
            | Self::Vertex { dimensions, .. }
            | Self::HuggingFace { dimensions, .. }
            | Self::Ollama { dimensions, .. } => *dimensions,
        }
    }

    #[must_use]
    pub fn model(&self) -> &str {
        match self {
            Self::OpenAI { model, .. }
            | Self::Voyage { model, .. }
            | Self::Cohere { model, .. }
            | Self::Mistral { model, .. }
            | Self::Bedrock { model, .. }
            | Self::Vertex { model, .. }
            | Self::HuggingFace { model, .. }
            | Self::Ollama { model, .. } => model,
        }
    }
}

fn default_openai_secret() -> String {
    "OPENAI_API_KEY".to_string()
}
fn default_voyage_secret() -> String {
    "VOYAGE_API_KEY".to_string()
}
fn default_cohere_secret() -> String {
    "COHERE_API_KEY".to_string()
}
fn default_mistral_secret() -> String {
    "MISTRAL_API_KEY".to_string()
}
fn default_hf_secret() -> String {
    "HUGGINGFACE_API_KEY".to_string()
}
fn default_ollama_base_url() -> String {
    "http://localhost:11434".to_string()
}

/// Processing (batch shape) configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessingConfig {
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
        }
    }
}

const fn default_batch_size() -> usize {
    50
}

/// Target-table indexing configuration. Index creation itself is out of
/// core scope (§1); this only records which strategy the installer used,
/// for observability.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(tag = "implementation", rename_all = "snake_case")]
pub enum IndexingConfig {
    #[default]
    None,
    Diskann,
    Hnsw,
}

/// External-scheduler hint. The core does not act on this (§1 Non-goals);
/// it is round-tripped for the external scheduler's benefit.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(tag = "implementation", rename_all = "snake_case")]
pub enum SchedulingConfig {
    #[default]
    None,
    TimescaleJob { interval_seconds: u64 },
}

/// Optional full-text index on the chunk column. Creation is out of core
/// scope; recorded for observability only.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(tag = "implementation", rename_all = "snake_case")]
pub enum TextIndexingConfig {
    #[default]
    None,
    Gin,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_chunker_tagged_union() {
        let json = serde_json::json!({
            "implementation": "character_text_splitter",
            "separator": "\n",
            "chunk_size": 800,
            "chunk_overlap": 50
        });
        let chunker: Chunker = serde_json::from_value(json).expect("valid chunker config");
        match chunker {
            Chunker::CharacterTextSplitter { chunk_size, .. } => assert_eq!(chunk_size, 800),
            other => panic!("unexpected variant: {other:?}"),
        }
    }

    #[test]
    fn embedder_spec_exposes_provider_name_and_dims() {
        let embedder = EmbedderSpec::OpenAI {
            model: "text-embedding-3-small".to_string(),
            dimensions: 1536,
            api_key_name: default_openai_secret(),
            base_url: None,
        };
        assert_eq!(embedder.provider_name(), "openai");
        assert_eq!(embedder.dimensions(), 1536);
    }

    #[test]
    fn full_document_round_trips_with_config_type_preserved() {
        let json = serde_json::json!({
            "chunking": {"config_type": "chunking", "implementation": "none"},
            "formatting": {"config_type": "formatting", "implementation": "chunk_value"},
            "embedding": {
                "config_type": "embedding",
                "implementation": "ollama",
                "model": "nomic-embed-text",
                "dimensions": 768
            }
        });
        let config: VectorizerConfig = serde_json::from_value(json).expect("valid document");
        assert_eq!(
            config.embedding.config_type.as_deref(),
            Some("embedding")
        );
        assert_eq!(config.processing.batch_size, 50);
    }
}
