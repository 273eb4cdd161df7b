//! Safe SQL identifier composition for the per-vectorizer dynamic tables.
//!
//! Every vectorizer owns its own queue, dead-letter, and target tables
//! (schema/name pairs stored in the catalog row rather than known at
//! compile time), so table and column names have to be spliced into SQL
//! text. This module is the single place that does that splicing, mirroring
//! `psycopg.sql.Identifier`'s quoting rules from the original implementation.

/// Quote a single identifier, doubling embedded double-quotes.
#[must_use]
pub fn quote(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Quote a `schema.table` pair.
#[must_use]
pub fn qualified(schema: &str, table: &str) -> String {
    format!("{}.{}", quote(schema), quote(table))
}

/// Comma-joined quoted column list, e.g. `"id", "tenant_id"`.
#[must_use]
pub fn column_list(columns: &[impl AsRef<str>]) -> String {
    columns
        .iter()
        .map(|c| quote(c.as_ref()))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quote_doubles_embedded_quotes() {
        assert_eq!(quote(r#"weird"name"#), "\"weird\"\"name\"");
    }

    #[test]
    fn qualified_joins_schema_and_table() {
        assert_eq!(qualified("public", "docs"), "\"public\".\"docs\"");
    }

    #[test]
    fn column_list_joins_with_commas() {
        let cols = vec!["id".to_string(), "tenant_id".to_string()];
        assert_eq!(column_list(&cols), "\"id\", \"tenant_id\"");
    }
}
