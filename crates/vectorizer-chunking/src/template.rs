//! `$`-substitution for the `python_template` formatter (§4.B).
//!
//! Despite the name inherited from the original's use of Python's
//! `string.Template`, this is a small dedicated substitution routine, not a
//! general templating engine (no loops, conditionals, or expressions):
//! `$identifier` and `${identifier}` are replaced with the matching key's
//! value; `$$` is a literal `$`. Unknown identifiers are a hard error,
//! matching `Template.substitute`'s strict (non-"safe") behavior.

use crate::error::FormattingError;
use serde_json::Value;

/// Render `template` against `values` (source-row columns plus `chunk`).
/// Only identifiers the template actually references are read, so a
/// non-scalar column (array/object) elsewhere in `values` never trips an
/// error - only one the template substitutes does.
pub fn render(template: &str, values: &serde_json::Map<String, Value>) -> Result<String, FormattingError> {
    let mut out = String::with_capacity(template.len());
    let chars: Vec<char> = template.chars().collect();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        if c != '$' {
            out.push(c);
            i += 1;
            continue;
        }

        i += 1;
        match chars.get(i) {
            Some('$') => {
                out.push('$');
                i += 1;
            }
            Some('{') => {
                let start = i + 1;
                let end = chars[start..]
                    .iter()
                    .position(|&c| c == '}')
                    .map(|p| start + p)
                    .ok_or(FormattingError::UnterminatedPlaceholder)?;
                let name: String = chars[start..end].iter().collect();
                out.push_str(&lookup(values, &name)?);
                i = end + 1;
            }
            Some(c) if is_identifier_start(*c) => {
                let start = i;
                while chars.get(i).is_some_and(|c| is_identifier_char(*c)) {
                    i += 1;
                }
                let name: String = chars[start..i].iter().collect();
                out.push_str(&lookup(values, &name)?);
            }
            _ => {
                // A lone '$' not followed by an identifier is passed through
                // literally, matching `string.Template`'s permissive default.
                out.push('$');
            }
        }
    }

    Ok(out)
}

fn lookup(values: &serde_json::Map<String, Value>, name: &str) -> Result<String, FormattingError> {
    let value = values.get(name).ok_or_else(|| FormattingError::UnknownColumn {
        column: name.to_string(),
    })?;
    scalar_to_string(value, name)
}

fn scalar_to_string(value: &Value, name: &str) -> Result<String, FormattingError> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        Value::Null => Ok(String::new()),
        Value::Array(_) | Value::Object(_) => Err(FormattingError::NonScalarColumn {
            column: name.to_string(),
        }),
    }
}

fn is_identifier_start(c: char) -> bool {
    c == '_' || c.is_ascii_alphabetic()
}

fn is_identifier_char(c: char) -> bool {
    c == '_' || c.is_ascii_alphanumeric()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values() -> serde_json::Map<String, Value> {
        serde_json::json!({"chunk": "hello world", "title": "My Post"})
            .as_object()
            .unwrap()
            .clone()
    }

    #[test]
    fn non_scalar_column_is_fine_when_not_referenced() {
        let mut row = values();
        row.insert("tags".to_string(), serde_json::json!(["a", "b"]));
        let out = render("$title: $chunk", &row).unwrap();
        assert_eq!(out, "My Post: hello world");
    }

    #[test]
    fn non_scalar_column_is_an_error_when_referenced() {
        let mut row = values();
        row.insert("tags".to_string(), serde_json::json!(["a", "b"]));
        let err = render("$tags", &row).unwrap_err();
        assert!(matches!(err, FormattingError::NonScalarColumn { column } if column == "tags"));
    }

    #[test]
    fn substitutes_bare_identifier() {
        let out = render("$title: $chunk", &values()).unwrap();
        assert_eq!(out, "My Post: hello world");
    }

    #[test]
    fn substitutes_braced_identifier() {
        let out = render("${title}-${chunk}", &values()).unwrap();
        assert_eq!(out, "My Post-hello world");
    }

    #[test]
    fn dollar_dollar_is_literal_dollar() {
        let out = render("cost: $$5 for $chunk", &values()).unwrap();
        assert_eq!(out, "cost: $5 for hello world");
    }

    #[test]
    fn unknown_column_is_an_error() {
        let err = render("$missing", &values()).unwrap_err();
        assert!(matches!(err, FormattingError::UnknownColumn { column } if column == "missing"));
    }

    #[test]
    fn unterminated_brace_is_an_error() {
        let err = render("${chunk", &values()).unwrap_err();
        assert!(matches!(err, FormattingError::UnterminatedPlaceholder));
    }
}
