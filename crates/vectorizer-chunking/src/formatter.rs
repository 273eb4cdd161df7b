//! `Formatter::format`: dispatch to the variant-specific formatting rule.

use crate::error::FormattingError;
use crate::template;
use vectorizer_config::Formatter;

/// Extension trait implementing the pure `(config, chunk, row) -> text`
/// contract of §4.B on the config-layer `Formatter` enum.
pub trait FormatterExt {
    /// Format `chunk` using the source `row`'s columns. A non-scalar
    /// column (array/object) is only an error if the template actually
    /// substitutes it; unreferenced columns pass through untouched.
    fn format(
        &self,
        chunk: &str,
        row: &serde_json::Map<String, serde_json::Value>,
    ) -> Result<String, FormattingError>;
}

impl FormatterExt for Formatter {
    fn format(
        &self,
        chunk: &str,
        row: &serde_json::Map<String, serde_json::Value>,
    ) -> Result<String, FormattingError> {
        match self {
            Self::ChunkValue => Ok(chunk.to_string()),
            Self::PythonTemplate { template } => {
                let mut values = row.clone();
                values.insert("chunk".to_string(), serde_json::Value::String(chunk.to_string()));
                template::render(template, &values)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn chunk_value_passes_through_unchanged() {
        let formatter = Formatter::ChunkValue;
        let row = serde_json::Map::new();
        assert_eq!(formatter.format("hello", &row).unwrap(), "hello");
    }

    #[test]
    fn python_template_substitutes_columns_and_chunk() {
        let formatter = Formatter::PythonTemplate {
            template: "$title: $chunk".to_string(),
        };
        let row = json!({"title": "My Post"}).as_object().unwrap().clone();
        assert_eq!(formatter.format("hello world", &row).unwrap(), "My Post: hello world");
    }

    #[test]
    fn non_scalar_column_referenced_by_template_is_an_error() {
        let formatter = Formatter::PythonTemplate {
            template: "$tags: $chunk".to_string(),
        };
        let row = json!({"tags": ["a", "b"]}).as_object().unwrap().clone();
        let err = formatter.format("hello", &row).unwrap_err();
        assert!(matches!(err, FormattingError::NonScalarColumn { column } if column == "tags"));
    }

    #[test]
    fn non_scalar_column_not_referenced_by_template_is_ignored() {
        let formatter = Formatter::PythonTemplate {
            template: "$title: $chunk".to_string(),
        };
        let row = json!({"title": "My Post", "tags": ["a", "b"]}).as_object().unwrap().clone();
        assert_eq!(formatter.format("hello world", &row).unwrap(), "My Post: hello world");
    }
}
