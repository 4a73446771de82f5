//! Dynamic query construction over the transaction catalog.
//!
//! A build moves through fixed stages, each a distinct type:
//! [`QueryBuilder`] (taking parameters) -> [`PatternResolved`] ->
//! [`JoinsResolved`] -> [`BuiltQuery`].

use crate::catalog::Catalog;
use crate::dialect::Dialect;
use crate::error::Result;

mod builders;
mod filters;
mod joins;
mod measures;
mod patterns;
mod plan;
mod render;
mod resolve;

pub use builders::QueryBuilder;
pub use filters::{translate, FilterOp};
pub use measures::Measure;
pub use plan::{JoinsResolved, PatternResolved};
pub use render::BuiltQuery;

pub(crate) use plan::VALUE_ALIAS;

pub struct SqlBuilder;

impl Default for SqlBuilder {
    fn default() -> Self {
        Self
    }
}

impl SqlBuilder {
    /// Build with the dialect configured on the catalog.
    pub fn build<I, K, V>(&self, catalog: &Catalog, params: I) -> Result<BuiltQuery>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        self.build_with_dialect(catalog, params, catalog.dialect())
    }

    /// Build SQL using a provided dialect (useful for tests).
    pub fn build_with_dialect<I, K, V>(
        &self,
        catalog: &Catalog,
        params: I,
        dialect: &dyn Dialect,
    ) -> Result<BuiltQuery>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let built = QueryBuilder::from_params(catalog, params)?
            .resolve_pattern()?
            .resolve_joins()
            .render(dialect);
        Ok(built)
    }
}
