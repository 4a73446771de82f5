use serde_json::{Map, Value};
use tracing_subscriber::EnvFilter;

use crate::backends::BackendConnection;
use crate::catalog::Catalog;
use crate::error::{DealQueryError, Result};
use crate::executor::QueryResult;
use crate::presets;
use crate::query_builder::{BuiltQuery, SqlBuilder};

/// Environment variable holding a tracing filter directive.
pub const LOG_ENV: &str = "DEALQUERY_LOG";

/// Build a query in the connection's dialect and execute it.
///
/// Build failures come back as client faults, store failures as server
/// faults (see [`crate::error::DealQueryError::fault`]).
pub async fn run_query<I, K, V>(
    catalog: &Catalog,
    connection: &dyn BackendConnection,
    params: I,
) -> Result<(BuiltQuery, QueryResult)>
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    let built = SqlBuilder.build_with_dialect(catalog, params, connection.dialect())?;
    let result = connection.execute(&built).await?;
    tracing::info!(
        rows = result.len(),
        pattern = ?built.pattern,
        "query executed"
    );
    Ok((built, result))
}

/// Fetch one transaction as a labelled record.
///
/// `relationships` and `advisors` arrays are attached when requested. A
/// transaction the store does not return is a [`DealQueryError::NotFound`].
pub async fn fetch_transaction(
    catalog: &Catalog,
    connection: &dyn BackendConnection,
    id: &str,
    include_relationships: bool,
    include_advisors: bool,
) -> Result<Map<String, Value>> {
    let queries = presets::transaction_queries(
        catalog,
        connection.dialect(),
        id,
        include_relationships,
        include_advisors,
    )?;
    let vocabulary = catalog.vocabulary();

    let result = connection.execute(&queries.transaction).await?;
    let Some(mut record) = result.rows.into_iter().next() else {
        return Err(DealQueryError::NotFound(format!(
            "transaction with id {} not found",
            id.trim()
        )));
    };
    vocabulary.label_row(&mut record);

    for (key, query) in [
        ("relationships", queries.relationships),
        ("advisors", queries.advisors),
    ] {
        let Some(query) = query else {
            continue;
        };
        let rows = connection
            .execute(&query)
            .await?
            .rows
            .into_iter()
            .map(|mut row| {
                vocabulary.label_row(&mut row);
                Value::Object(row)
            })
            .collect();
        record.insert(key.to_string(), Value::Array(rows));
    }
    tracing::info!(
        transaction_id = id.trim(),
        include_relationships,
        include_advisors,
        "transaction fetched"
    );
    Ok(record)
}

/// Install a stderr `fmt` subscriber; `DEALQUERY_LOG` wins over `default_level`.
pub fn init_tracing(default_level: &str) {
    let filter =
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
