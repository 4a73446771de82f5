//! SQL dialect abstractions for the supported target stores.
//!
//! Each dialect is implemented in its own file.

use crate::config::DialectKind;

mod duckdb;
mod postgres;
mod snowflake;

pub use duckdb::DuckDbDialect;
pub use postgres::PostgresDialect;
pub use snowflake::SnowflakeDialect;

/// Dialects render identifiers and placeholders.
/// Clause assembly lives in the renderer; the dialect only maps
/// primitive pieces to SQL fragments.
pub trait Dialect {
    fn name(&self) -> &'static str;

    /// Plain words pass through unquoted (so case-insensitive resolution is
    /// preserved); anything else is double-quoted.
    fn quote_ident(&self, ident: &str) -> String {
        if is_plain_ident(ident) {
            ident.to_string()
        } else {
            format!("\"{}\"", ident.replace('"', "\"\""))
        }
    }

    fn placeholder(&self, _idx: usize) -> String {
        "?".to_string()
    }
}

pub(crate) fn is_plain_ident(ident: &str) -> bool {
    let mut chars = ident.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Resolve a configured dialect to its static implementation.
pub fn for_kind(kind: DialectKind) -> &'static (dyn Dialect + Send + Sync) {
    match kind {
        DialectKind::Snowflake => &SnowflakeDialect,
        DialectKind::Duckdb => &DuckDbDialect,
        DialectKind::Postgres => &PostgresDialect,
    }
}
