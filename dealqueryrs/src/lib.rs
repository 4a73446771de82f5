pub mod backends;
pub mod catalog;
pub mod config;
pub mod dialect;
pub mod error;
pub mod executor;
pub mod pagination;
pub mod presets;
pub mod query_builder;
pub mod runtime;
pub mod sql_ast;
pub mod vocabulary;

pub use backends::BackendConnection;
#[cfg(feature = "duckdb")]
pub use backends::DuckDbConnection;
pub use catalog::{Catalog, JoinName, PatternName};
pub use config::DealQueryConfig;
pub use error::{BuildError, DealQueryError, Fault, Result};
pub use executor::QueryResult;
pub use pagination::Cursor;
pub use query_builder::{BuiltQuery, QueryBuilder, SqlBuilder};
pub use vocabulary::Vocabulary;
