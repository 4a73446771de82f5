use thiserror::Error;

pub type Result<T> = std::result::Result<T, DealQueryError>;

/// Raised synchronously while translating request parameters into a query.
///
/// Every variant is a caller-input fault; none is retried internally.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildError {
    #[error("invalid numeric value for {param}: {value}")]
    InvalidNumber { param: String, value: String },
    #[error("invalid BETWEEN format: {0}")]
    InvalidBetween(String),
    #[error("invalid sort direction: {0}")]
    InvalidDirection(String),
    #[error("{0}")]
    MissingParameter(String),
    #[error("unknown measure {0}")]
    UnknownMeasure(String),
    #[error("invalid cursor: {0}")]
    InvalidCursor(String),
}

#[derive(Debug, Error)]
pub enum DealQueryError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("yaml parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("config error: {0}")]
    Config(String),
    #[error("catalog error: {0}")]
    Catalog(String),
    #[error("query build error: {0}")]
    Build(#[from] BuildError),
    #[error("execution error: {0}")]
    Execution(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[cfg(feature = "duckdb")]
    #[error("duckdb error: {0}")]
    DuckDb(#[from] duckdb::Error),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Which side of the service boundary an error belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    /// The request was malformed or named a missing record; report it back
    /// to the caller.
    Client,
    /// Configuration, catalog or store failure.
    Server,
}

impl DealQueryError {
    pub fn fault(&self) -> Fault {
        match self {
            DealQueryError::Build(_) | DealQueryError::NotFound(_) => Fault::Client,
            _ => Fault::Server,
        }
    }
}
