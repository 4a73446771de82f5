//! Executor backends.
//!
//! The query builder never runs SQL; a backend takes a [`BuiltQuery`], binds
//! its operands to the placeholders and returns rows. Each backend lives in
//! its own file behind a feature flag.

use async_trait::async_trait;

use crate::dialect::Dialect;
use crate::error::Result;
use crate::executor::QueryResult;
use crate::query_builder::BuiltQuery;

/// Unified interface for all executor backends.
#[async_trait]
pub trait BackendConnection: Send + Sync {
    /// Dialect queries for this backend must be rendered in.
    fn dialect(&self) -> &(dyn Dialect + Send + Sync);

    /// Run a built query with its operands bound positionally.
    async fn execute(&self, query: &BuiltQuery) -> Result<QueryResult>;
}

#[cfg(feature = "duckdb")]
mod duckdb;
#[cfg(feature = "duckdb")]
pub use duckdb::DuckDbConnection;
