//! Configuration system for dealquery.
//!
//! TOML-based, with every section optional and defaulted.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{DealQueryError, Result};

/// Root configuration structure.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DealQueryConfig {
    pub query: QueryConfig,
    pub status: StatusConfig,
    /// Extra logical field name -> physical `alias.column` mappings.
    /// Entries here win over the built-in field table.
    pub fields: BTreeMap<String, String>,
    pub executor: ExecutorConfig,
    /// Default tracing filter for the CLI (overridden by `DEALQUERY_LOG`).
    pub log_level: String,
    /// Optional directory of vocabulary YAML files.
    pub vocabulary_dir: Option<String>,
}

/// Query construction configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct QueryConfig {
    /// Schema prefixed to every table (empty = unqualified).
    pub schema: String,
    pub base_table: String,
    pub base_alias: String,
    /// Target dialect: `snowflake`, `duckdb` or `postgres`.
    pub dialect: DialectKind,
    /// Row limit applied when the request carries none (0 = no limit).
    pub default_row_limit: u64,
    /// Upper bound on requested limits (0 = unlimited).
    pub max_row_limit: u64,
}

/// Status defaults.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StatusConfig {
    /// Status ids injected when a request does not constrain the status field.
    pub default_included: Vec<i64>,
}

/// Executor configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ExecutorConfig {
    /// Maximum concurrent executions (default: 16).
    pub max_concurrency: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DialectKind {
    #[default]
    Snowflake,
    Duckdb,
    Postgres,
}

impl Default for DealQueryConfig {
    fn default() -> Self {
        Self {
            query: QueryConfig::default(),
            status: StatusConfig::default(),
            fields: BTreeMap::new(),
            executor: ExecutorConfig::default(),
            log_level: "info".to_string(),
            vocabulary_dir: None,
        }
    }
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            schema: String::new(),
            base_table: "ciqTransaction".to_string(),
            base_alias: "tr".to_string(),
            dialect: DialectKind::Snowflake,
            default_row_limit: 0,
            max_row_limit: 0, // 0 = unlimited
        }
    }
}

impl Default for StatusConfig {
    fn default() -> Self {
        Self {
            default_included: vec![1, 2, 3, 8, 9, 10],
        }
    }
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            max_concurrency: 16,
        }
    }
}

impl QueryConfig {
    /// Apply the configured default and ceiling to a requested limit.
    pub fn effective_limit(&self, requested: Option<u64>) -> Option<u64> {
        let limit = match requested {
            Some(v) => Some(v),
            None if self.default_row_limit > 0 => Some(self.default_row_limit),
            None => None,
        };
        match limit {
            Some(v) if self.max_row_limit > 0 && v > self.max_row_limit => {
                tracing::debug!(
                    requested = v,
                    max = self.max_row_limit,
                    "clamping limit to max_row_limit"
                );
                Some(self.max_row_limit)
            }
            other => other,
        }
    }
}

impl DealQueryConfig {
    /// Load configuration from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path.as_ref())
            .map_err(|e| DealQueryError::Config(format!("failed to read config file: {e}")))?;
        Self::from_toml(&contents)
    }

    /// Load configuration from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        toml::from_str(toml_str)
            .map_err(|e| DealQueryError::Config(format!("failed to parse config: {e}")))
    }

    /// Load from default locations (env var, cwd, user config dir, or defaults).
    ///
    /// Search order:
    /// 1. `DEALQUERY_CONFIG` environment variable
    /// 2. `./dealquery.toml` (current directory)
    /// 3. `~/.config/dealquery/config.toml` (user config dir)
    /// 4. Built-in defaults
    pub fn load_default() -> Self {
        if let Ok(path) = std::env::var("DEALQUERY_CONFIG") {
            match Self::from_file(&path) {
                Ok(cfg) => {
                    tracing::info!(path = %path, "loaded config from DEALQUERY_CONFIG");
                    return cfg;
                }
                Err(e) => {
                    tracing::warn!(path = %path, error = %e, "ignoring unreadable DEALQUERY_CONFIG")
                }
            }
        }

        if let Ok(cfg) = Self::from_file("dealquery.toml") {
            tracing::info!("loaded config from ./dealquery.toml");
            return cfg;
        }

        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("dealquery").join("config.toml");
            if let Ok(cfg) = Self::from_file(&user_config) {
                tracing::info!(path = %user_config.display(), "loaded config from user config dir");
                return cfg;
            }
        }

        tracing::debug!("no config file found, using defaults");
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let cfg = DealQueryConfig::default();
        assert_eq!(cfg.query.base_table, "ciqTransaction");
        assert_eq!(cfg.query.base_alias, "tr");
        assert_eq!(cfg.query.dialect, DialectKind::Snowflake);
        assert_eq!(cfg.status.default_included, vec![1, 2, 3, 8, 9, 10]);
        assert_eq!(cfg.executor.max_concurrency, 16);
    }

    #[test]
    fn test_parse_toml() {
        let toml = r#"
log_level = "debug"

[query]
schema = "CIQ"
dialect = "postgres"
max_row_limit = 500

[status]
default_included = [2]

[fields]
dealValue = "tr.transactionSize"
"#;
        let cfg = DealQueryConfig::from_toml(toml).unwrap();
        assert_eq!(cfg.query.schema, "CIQ");
        assert_eq!(cfg.query.dialect, DialectKind::Postgres);
        assert_eq!(cfg.query.base_alias, "tr");
        assert_eq!(cfg.status.default_included, vec![2]);
        assert_eq!(cfg.fields.get("dealValue").unwrap(), "tr.transactionSize");
        assert_eq!(cfg.log_level, "debug");
    }

    #[test]
    fn test_rejects_unknown_dialect() {
        let err = DealQueryConfig::from_toml("[query]\ndialect = \"oracle\"\n").unwrap_err();
        assert!(matches!(err, DealQueryError::Config(_)));
    }

    #[test]
    fn test_effective_limit() {
        let mut query = QueryConfig::default();
        assert_eq!(query.effective_limit(None), None);
        assert_eq!(query.effective_limit(Some(5)), Some(5));

        query.default_row_limit = 100;
        query.max_row_limit = 50;
        assert_eq!(query.effective_limit(None), Some(50));
        assert_eq!(query.effective_limit(Some(10)), Some(10));
        assert_eq!(query.effective_limit(Some(1000)), Some(50));
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dealquery.toml");
        std::fs::write(&path, "[executor]\nmax_concurrency = 4\n").unwrap();
        let cfg = DealQueryConfig::from_file(&path).unwrap();
        assert_eq!(cfg.executor.max_concurrency, 4);
        assert!(DealQueryConfig::from_file(dir.path().join("missing.toml")).is_err());
    }
}
