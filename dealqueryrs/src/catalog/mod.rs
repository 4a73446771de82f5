//! Read-only reference data shared by every query build.
//!
//! A [`Catalog`] is loaded once at process start and handed to each
//! request-scoped builder by reference; nothing in it is mutated afterwards.

use std::path::Path;

use once_cell::sync::Lazy;

use crate::config::{DealQueryConfig, QueryConfig};
use crate::dialect::{self, Dialect};
use crate::error::Result;
use crate::vocabulary::Vocabulary;

mod fields;
mod joins;
mod patterns;

pub use fields::FieldMapping;
pub use joins::{JoinCatalog, JoinName, JoinSpec, BASE_ALIAS_TOKEN};
pub use patterns::{Expect, PatternName};

static BUILTIN: Lazy<Catalog> =
    Lazy::new(|| Catalog::assemble(&DealQueryConfig::default(), Vocabulary::builtin()));

#[derive(Debug, Clone)]
pub struct Catalog {
    query: QueryConfig,
    fields: FieldMapping,
    joins: JoinCatalog,
    default_statuses: Vec<i64>,
    vocabulary: Vocabulary,
}

impl Catalog {
    /// Build and validate a catalog from configuration.
    ///
    /// Join catalog problems (alias collisions, cycles, dangling
    /// prerequisites) are rejected here rather than patched per request.
    pub fn from_config(config: &DealQueryConfig) -> Result<Self> {
        let vocabulary = match &config.vocabulary_dir {
            Some(dir) => Vocabulary::load_from_dir(Path::new(dir))?,
            None => Vocabulary::builtin(),
        };
        let catalog = Self::assemble(config, vocabulary);
        catalog.joins.validate(&catalog.query.base_alias)?;
        tracing::info!(
            base_table = %catalog.query.base_table,
            base_alias = %catalog.query.base_alias,
            joins = catalog.joins.specs().len(),
            fields = catalog.fields.iter().count(),
            "catalog loaded"
        );
        Ok(catalog)
    }

    /// Process-wide catalog over the built-in tables and default settings.
    pub fn builtin() -> &'static Catalog {
        &BUILTIN
    }

    fn assemble(config: &DealQueryConfig, vocabulary: Vocabulary) -> Self {
        Self {
            fields: FieldMapping::builtin(&config.query.base_alias, &config.fields),
            joins: JoinCatalog::default(),
            default_statuses: config.status.default_included.clone(),
            query: config.query.clone(),
            vocabulary,
        }
    }

    pub fn query_config(&self) -> &QueryConfig {
        &self.query
    }

    pub fn base_table(&self) -> &str {
        &self.query.base_table
    }

    pub fn base_alias(&self) -> &str {
        &self.query.base_alias
    }

    /// Configured schema, `None` when tables are unqualified.
    pub fn schema(&self) -> Option<&str> {
        Some(self.query.schema.as_str()).filter(|s| !s.is_empty())
    }

    pub fn fields(&self) -> &FieldMapping {
        &self.fields
    }

    pub fn joins(&self) -> &JoinCatalog {
        &self.joins
    }

    pub fn vocabulary(&self) -> &Vocabulary {
        &self.vocabulary
    }

    pub fn default_statuses(&self) -> &[i64] {
        &self.default_statuses
    }

    /// Physical reference of the status field.
    pub fn status_column(&self) -> String {
        self.fields.resolve("status")
    }

    pub fn dialect(&self) -> &'static (dyn Dialect + Send + Sync) {
        dialect::for_kind(self.query.dialect)
    }

    /// Parameter keys treated as filters: known fields and join names.
    pub fn is_filter_key(&self, key: &str) -> bool {
        self.fields.contains(key) || key.parse::<JoinName>().is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_catalog_defaults() {
        let catalog = Catalog::builtin();
        assert_eq!(catalog.base_alias(), "tr");
        assert_eq!(catalog.schema(), None);
        assert_eq!(catalog.status_column(), "tr.statusId");
        assert_eq!(catalog.default_statuses(), &[1, 2, 3, 8, 9, 10]);
        assert!(catalog.is_filter_key("industry"));
        assert!(catalog.is_filter_key("transaction_company_rel"));
        assert!(!catalog.is_filter_key("format"));
    }

    #[test]
    fn config_overrides_flow_into_catalog() {
        let config = DealQueryConfig::from_toml(
            r#"
[query]
schema = "CIQ"
base_alias = "t"
dialect = "postgres"

[status]
default_included = [2]

[fields]
dealValue = "{base}.transactionSize"
"#,
        )
        .unwrap();
        let catalog = Catalog::from_config(&config).unwrap();
        assert_eq!(catalog.schema(), Some("CIQ"));
        assert_eq!(catalog.status_column(), "t.statusId");
        assert_eq!(catalog.fields().resolve("dealValue"), "t.transactionSize");
        assert_eq!(catalog.default_statuses(), &[2]);
        assert_eq!(catalog.dialect().name(), "postgres");
    }

    #[test]
    fn base_alias_colliding_with_a_join_is_rejected() {
        let mut config = DealQueryConfig::default();
        config.query.base_alias = "c".to_string();
        let err = Catalog::from_config(&config).unwrap_err();
        assert!(err.to_string().contains("base alias"));
    }
}
