use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use clap::Parser;
use dealquery::config::{DealQueryConfig, DialectKind};
use dealquery::runtime::init_tracing;
use dealquery::{presets, Catalog, SqlBuilder};

/// Print the SQL and bound operands for a set of request parameters.
#[derive(Parser)]
#[command(name = "print_sql", version, about = "Render a transaction query without running it")]
struct Cli {
    /// Config file; defaults to the usual search locations.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the configured dialect (snowflake, duckdb, postgres).
    #[arg(long)]
    dialect: Option<String>,

    /// Execute against this DuckDB database and print the rows.
    #[arg(long)]
    duckdb: Option<PathBuf>,

    /// Look up a single transaction by id instead of building from params.
    #[arg(long)]
    transaction: Option<String>,

    /// With --transaction, include the related companies.
    #[arg(long)]
    relationships: bool,

    /// With --transaction, include the advisors.
    #[arg(long)]
    advisors: bool,

    /// Request parameters as key=value.
    params: Vec<String>,
}

fn parse_dialect(raw: &str) -> anyhow::Result<DialectKind> {
    match raw.to_ascii_lowercase().as_str() {
        "snowflake" => Ok(DialectKind::Snowflake),
        "duckdb" => Ok(DialectKind::Duckdb),
        "postgres" | "postgresql" => Ok(DialectKind::Postgres),
        other => bail!("unknown dialect {other}"),
    }
}

fn parse_params(raw: &[String]) -> anyhow::Result<Vec<(String, String)>> {
    raw.iter()
        .map(|pair| {
            pair.split_once('=')
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .with_context(|| format!("expected key=value, got {pair}"))
        })
        .collect()
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => DealQueryConfig::from_file(path)?,
        None => DealQueryConfig::load_default(),
    };
    init_tracing(&config.log_level);
    if let Some(dialect) = &cli.dialect {
        config.query.dialect = parse_dialect(dialect)?;
    }

    let catalog = Catalog::from_config(&config)?;
    let params = parse_params(&cli.params)?;

    if let Some(id) = &cli.transaction {
        return match &cli.duckdb {
            Some(path) => {
                fetch(&catalog, &config, path, id, cli.relationships, cli.advisors).await
            }
            None => {
                let queries =
                    presets::transaction_by_id(&catalog, id, cli.relationships, cli.advisors)?;
                for built in [Some(queries.transaction), queries.relationships, queries.advisors]
                    .into_iter()
                    .flatten()
                {
                    println!("{}", built.sql);
                    println!("{}", serde_json::to_string(&built.params)?);
                }
                Ok(())
            }
        };
    }

    if let Some(path) = &cli.duckdb {
        return execute(&catalog, &config, path, params).await;
    }

    let built = SqlBuilder.build(&catalog, params)?;
    println!("{}", built.sql);
    println!("{}", serde_json::to_string(&built.params)?);
    if let Some(pattern) = built.pattern {
        eprintln!("pattern: {pattern}");
    }
    Ok(())
}

#[cfg(feature = "duckdb")]
async fn execute(
    catalog: &Catalog,
    config: &DealQueryConfig,
    path: &Path,
    params: Vec<(String, String)>,
) -> anyhow::Result<()> {
    let connection = dealquery::DuckDbConnection::with_config(path, &config.executor);
    let (built, result) = dealquery::runtime::run_query(catalog, &connection, params).await?;
    println!("{}", built.sql);
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

#[cfg(not(feature = "duckdb"))]
async fn execute(
    _catalog: &Catalog,
    _config: &DealQueryConfig,
    path: &Path,
    _params: Vec<(String, String)>,
) -> anyhow::Result<()> {
    bail!("cannot run against {}: built without the duckdb feature", path.display())
}

#[cfg(feature = "duckdb")]
async fn fetch(
    catalog: &Catalog,
    config: &DealQueryConfig,
    path: &Path,
    id: &str,
    include_relationships: bool,
    include_advisors: bool,
) -> anyhow::Result<()> {
    let connection = dealquery::DuckDbConnection::with_config(path, &config.executor);
    let record = dealquery::runtime::fetch_transaction(
        catalog,
        &connection,
        id,
        include_relationships,
        include_advisors,
    )
    .await?;
    println!("{}", serde_json::to_string_pretty(&record)?);
    Ok(())
}

#[cfg(not(feature = "duckdb"))]
async fn fetch(
    _catalog: &Catalog,
    _config: &DealQueryConfig,
    path: &Path,
    _id: &str,
    _include_relationships: bool,
    _include_advisors: bool,
) -> anyhow::Result<()> {
    bail!("cannot run against {}: built without the duckdb feature", path.display())
}
