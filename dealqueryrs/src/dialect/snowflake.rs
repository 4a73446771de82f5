//! Snowflake dialect implementation.

use super::Dialect;

/// The warehouse the transaction schema is published in. Unquoted
/// identifiers resolve case-insensitively, so plain names stay bare.
#[derive(Debug, Default, Clone, Copy)]
pub struct SnowflakeDialect;

impl Dialect for SnowflakeDialect {
    fn name(&self) -> &'static str {
        "snowflake"
    }
}
