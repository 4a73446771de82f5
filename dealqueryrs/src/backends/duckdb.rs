//! DuckDB backend implementation.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use tokio::sync::{Mutex, Semaphore, SemaphorePermit};

use crate::config::ExecutorConfig;
use crate::dialect::DuckDbDialect;
use crate::error::{DealQueryError, Result};
use crate::executor::{duck_value_to_json, json_to_duck_value, ColumnMeta, QueryResult};
use crate::query_builder::BuiltQuery;

use super::BackendConnection;

/// DuckDB connection implementing the unified backend trait.
#[derive(Clone)]
pub struct DuckDbConnection {
    database_path: PathBuf,
    dialect: DuckDbDialect,
    limiter: Arc<Semaphore>,
    pool: Arc<Mutex<Vec<duckdb::Connection>>>,
}

impl DuckDbConnection {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self::with_config(path, &ExecutorConfig::default())
    }

    pub fn with_config<P: AsRef<Path>>(path: P, config: &ExecutorConfig) -> Self {
        let path = path.as_ref().to_path_buf();
        let max_in_flight = config.max_concurrency.max(1);
        tracing::info!(
            path = %path.display(),
            max_concurrency = max_in_flight,
            "creating DuckDB connection"
        );
        Self {
            database_path: path,
            dialect: DuckDbDialect,
            limiter: Arc::new(Semaphore::new(max_in_flight)),
            pool: Arc::new(Mutex::new(Vec::new())),
        }
    }

    async fn acquire_slot(&self) -> Result<SemaphorePermit<'_>> {
        if self.limiter.available_permits() == 0 {
            tracing::debug!("all DuckDB slots in use, waiting for permit");
        }
        self.limiter
            .acquire()
            .await
            .map_err(|e| DealQueryError::Execution(format!("limiter closed: {e}")))
    }

    async fn checkout_connection(&self) -> Result<duckdb::Connection> {
        let mut guard = self.pool.lock().await;
        if let Some(conn) = guard.pop() {
            let pool_size = guard.len();
            drop(guard);
            tracing::trace!(pool_remaining = pool_size, "reusing pooled DuckDB connection");
            return Ok(conn);
        }
        drop(guard);
        tracing::debug!(path = %self.database_path.display(), "opening new DuckDB connection");
        duckdb::Connection::open(self.database_path.clone())
            .map_err(|e| DealQueryError::Execution(format!("open duckdb: {e}")))
    }

    async fn checkin_connection(&self, conn: duckdb::Connection) {
        self.pool.lock().await.push(conn);
    }
}

fn run_statement(
    conn: &duckdb::Connection,
    sql: &str,
    params: &[duckdb::types::Value],
) -> Result<QueryResult> {
    let mut stmt = conn.prepare(sql)?;
    let mut rows_iter = stmt.query(duckdb::params_from_iter(params.iter()))?;
    let stmt_ref = rows_iter
        .as_ref()
        .ok_or_else(|| DealQueryError::Execution("statement missing".to_string()))?;
    let mut column_names = Vec::new();
    for idx in 0..stmt_ref.column_count() {
        let name = stmt_ref
            .column_name(idx)
            .map_err(|e| DealQueryError::Execution(e.to_string()))?;
        column_names.push(name.to_string());
    }

    let mut rows = Vec::new();
    while let Some(row) = rows_iter.next()? {
        let mut map = serde_json::Map::new();
        for (idx, name) in column_names.iter().enumerate() {
            map.insert(name.clone(), duck_value_to_json(row.get_ref(idx)?.to_owned()));
        }
        rows.push(map);
    }

    let columns = column_names
        .into_iter()
        .map(|name| ColumnMeta { name })
        .collect();
    Ok(QueryResult { columns, rows })
}

#[async_trait]
impl BackendConnection for DuckDbConnection {
    fn dialect(&self) -> &(dyn crate::dialect::Dialect + Send + Sync) {
        &self.dialect
    }

    async fn execute(&self, query: &BuiltQuery) -> Result<QueryResult> {
        let sql = query.sql.clone();
        let params: Vec<duckdb::types::Value> =
            query.params.iter().map(json_to_duck_value).collect();
        let _permit = self.acquire_slot().await?;
        let conn = self.checkout_connection().await?;

        let (result, conn) = tokio::task::spawn_blocking(move || {
            let start = Instant::now();
            let result = run_statement(&conn, &sql, &params);
            if let Ok(ref res) = result {
                tracing::debug!(
                    rows = res.rows.len(),
                    columns = res.columns.len(),
                    ms = start.elapsed().as_millis(),
                    "duckdb execute"
                );
            }
            (result, conn)
        })
        .await
        .map_err(|e| DealQueryError::Execution(format!("task join error: {e}")))?;

        self.checkin_connection(conn).await;
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;
    use crate::config::DealQueryConfig;
    use crate::query_builder::SqlBuilder;

    fn seed(path: &Path) {
        let conn = duckdb::Connection::open(path).unwrap();
        conn.execute_batch(
            r#"
CREATE TABLE ciqTransaction (transactionId INTEGER, companyId INTEGER, transactionIdTypeId INTEGER,
    statusId INTEGER, announcedYear INTEGER, transactionSize DOUBLE, currencyId INTEGER);
CREATE TABLE ciqTransactionType (transactionIdTypeId INTEGER, transactionIdTypeName VARCHAR);
INSERT INTO ciqTransactionType VALUES (2, 'M&A Transaction'), (14, 'Buyback');
INSERT INTO ciqTransaction VALUES
    (1, 10, 14, 2, 2021, 5.0, 1),
    (2, 11, 14, 4, 2021, 7.0, 1),
    (3, 12, 2, 1, 2019, 9.0, 1);
"#,
        )
        .unwrap();
    }

    #[tokio::test]
    async fn executes_with_bound_operands() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("deals.duckdb");
        seed(&path);

        let mut config = DealQueryConfig::default();
        config.query.dialect = crate::config::DialectKind::Duckdb;
        let catalog = Catalog::from_config(&config).unwrap();
        let connection = DuckDbConnection::new(&path);

        let built = SqlBuilder
            .build_with_dialect(
                &catalog,
                [("select", "transactionId"), ("orderBy", "transactionId:desc")],
                connection.dialect(),
            )
            .unwrap();
        let result = connection.execute(&built).await.unwrap();
        assert_eq!(built.params.len(), 6);
        // status 4 is outside the default active set
        assert_eq!(
            result.column("transactionId"),
            vec![&serde_json::json!(3), &serde_json::json!(1)]
        );
    }
}
