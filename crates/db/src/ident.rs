//! Quoting of SQL identifiers.
//!
//! Schema, table and column names come from configuration and from
//! `.dbf` headers, so they are always emitted as quoted identifiers.
//! Quoting keeps their case exactly as given.

use crate::error::DbError;

/// Quote `name` as a PostgreSQL identifier, doubling embedded quotes.
pub fn quote_ident(name: &str) -> Result<String, DbError> {
    if name.is_empty() || name.contains('\0') {
        return Err(DbError::InvalidIdentifier(name.to_owned()));
    }
    Ok(format!("\"{}\"", name.replace('"', "\"\"")))
}

/// `"schema"."table"`.
pub fn qualified(schema: &str, table: &str) -> Result<String, DbError> {
    Ok(format!("{}.{}", quote_ident(schema)?, quote_ident(table)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn case_is_preserved() {
        assert_eq!(quote_ident("SITIOERIAZO_13106").unwrap(), "\"SITIOERIAZO_13106\"");
        assert_eq!(
            qualified("entradas", "PRC13106").unwrap(),
            "\"entradas\".\"PRC13106\""
        );
    }

    #[test]
    fn embedded_quotes_are_doubled() {
        assert_eq!(quote_ident("a\"b").unwrap(), "\"a\"\"b\"");
    }

    #[test]
    fn empty_and_nul_names_are_rejected() {
        assert_matches!(quote_ident(""), Err(DbError::InvalidIdentifier(_)));
        assert_matches!(quote_ident("a\0b"), Err(DbError::InvalidIdentifier(_)));
    }
}
