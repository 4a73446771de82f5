use std::sync::Mutex;

use dealquery::backends::BackendConnection;
use dealquery::dialect::{Dialect, PostgresDialect};
use dealquery::runtime::{fetch_transaction, run_query};
use dealquery::{BuiltQuery, Catalog, DealQueryError, Fault, QueryResult};
use serde_json::{json, Value};

/// Records every query it is asked to run and answers each with the same
/// canned rows.
struct FakeConnection {
    seen: Mutex<Vec<BuiltQuery>>,
    rows: Vec<serde_json::Map<String, Value>>,
}

impl FakeConnection {
    fn returning(rows: Vec<Value>) -> Self {
        let rows = rows
            .into_iter()
            .map(|row| match row {
                Value::Object(map) => map,
                other => panic!("fake rows must be objects, got {other}"),
            })
            .collect();
        Self {
            seen: Mutex::new(Vec::new()),
            rows,
        }
    }

    fn seen(&self) -> Vec<BuiltQuery> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl BackendConnection for FakeConnection {
    fn dialect(&self) -> &(dyn Dialect + Send + Sync) {
        &PostgresDialect
    }

    async fn execute(&self, query: &BuiltQuery) -> dealquery::Result<QueryResult> {
        self.seen.lock().unwrap().push(query.clone());
        Ok(QueryResult {
            columns: Vec::new(),
            rows: self.rows.clone(),
        })
    }
}

#[tokio::test]
async fn run_query_renders_in_the_backend_dialect() {
    let connection = FakeConnection::returning(vec![json!({"value": 42})]);
    let (built, result) = run_query(
        Catalog::builtin(),
        &connection,
        [("year", "2021"), ("groupBy", "type")],
    )
    .await
    .unwrap();

    assert!(built.sql.contains("tr.announcedYear = $1"));
    assert_eq!(result.column("value"), vec![&json!(42)]);
    assert_eq!(connection.seen(), vec![built]);
}

#[tokio::test]
async fn build_failures_never_reach_the_backend() {
    let connection = FakeConnection::returning(vec![json!({"value": 42})]);
    let err = run_query(Catalog::builtin(), &connection, [("limit", "-5")])
        .await
        .unwrap_err();

    assert!(matches!(err, DealQueryError::Build(_)));
    assert_eq!(err.fault(), Fault::Client);
    assert!(connection.seen().is_empty());
}

#[tokio::test]
async fn transaction_record_is_labelled_and_carries_its_parties() {
    let connection = FakeConnection::returning(vec![json!({
        "transactionId": 7,
        "statusId": 2,
        "transactionIdTypeId": 14,
        "transactionIdTypeName": "Share Repurchase",
        "transactionToCompRelTypeId": 1,
        "advisorTypeId": 1,
    })]);

    let record = fetch_transaction(Catalog::builtin(), &connection, "7", true, true)
        .await
        .unwrap();

    assert_eq!(record["statusName"], "Completed");
    assert_eq!(record["transactionIdTypeName"], "Share Repurchase");
    assert_eq!(record["relationships"][0]["relationshipType"], "Acquirer");
    assert_eq!(record["advisors"][0]["advisorTypeName"], "Financial Advisor");

    let seen = connection.seen();
    assert_eq!(seen.len(), 3);
    for query in &seen {
        assert!(query.sql.ends_with("WHERE tr.transactionId = $1"));
        assert_eq!(query.params, vec![json!("7")]);
    }
}

#[tokio::test]
async fn transaction_parts_are_only_fetched_on_request() {
    let connection = FakeConnection::returning(vec![json!({"transactionId": 7})]);
    let record = fetch_transaction(Catalog::builtin(), &connection, "7", false, true)
        .await
        .unwrap();

    assert!(!record.contains_key("relationships"));
    assert!(record["advisors"].is_array());
    assert_eq!(connection.seen().len(), 2);
}

#[tokio::test]
async fn missing_transaction_is_not_found() {
    let connection = FakeConnection::returning(Vec::new());
    let err = fetch_transaction(Catalog::builtin(), &connection, "404", true, true)
        .await
        .unwrap_err();

    assert!(matches!(err, DealQueryError::NotFound(_)));
    assert_eq!(err.fault(), Fault::Client);
    // parties are never looked up for a missing deal
    assert_eq!(connection.seen().len(), 1);
}

#[cfg(feature = "duckdb")]
mod duckdb_backend {
    use super::*;
    use dealquery::config::{DealQueryConfig, DialectKind};
    use dealquery::presets;
    use dealquery::DuckDbConnection;

    fn seed(path: &std::path::Path) {
        let conn = duckdb::Connection::open(path).unwrap();
        conn.execute_batch(
            r#"
CREATE TABLE ciqTransaction (transactionId INTEGER, companyId INTEGER, transactionIdTypeId INTEGER,
    statusId INTEGER, announcedYear INTEGER, announcedMonth INTEGER, transactionSize DOUBLE,
    currencyId INTEGER);
CREATE TABLE ciqCompany (companyId INTEGER, companyName VARCHAR, simpleIndustryId INTEGER,
    countryId INTEGER);
CREATE TABLE ciqSimpleIndustry (simpleIndustryId INTEGER, simpleIndustryDescription VARCHAR);
CREATE TABLE ciqTransactionType (transactionIdTypeId INTEGER, transactionIdTypeName VARCHAR);
INSERT INTO ciqTransactionType VALUES (14, 'Buyback'), (2, 'M&A Transaction');
INSERT INTO ciqCompany VALUES
    (10, 'Northwind', 60, 76), (11, 'Contoso', 60, 76), (12, 'Fabrikam', 32, 37);
INSERT INTO ciqSimpleIndustry VALUES (60, 'Software'), (32, 'Pharmaceuticals');
INSERT INTO ciqTransaction VALUES
    (1, 10, 14, 2, 2021, 3, 5.0, 1),
    (2, 11, 14, 2, 2021, 4, 7.0, 1),
    (3, 12, 2, 1, 2021, 5, 9.0, 1),
    (4, 12, 2, 5, 2021, 6, 11.0, 1);
"#,
        )
        .unwrap();
    }

    fn duckdb_catalog() -> Catalog {
        let mut config = DealQueryConfig::default();
        config.query.dialect = DialectKind::Duckdb;
        Catalog::from_config(&config).unwrap()
    }

    #[tokio::test]
    async fn groups_active_deals_by_industry() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("deals.duckdb");
        seed(&path);
        let catalog = duckdb_catalog();
        let connection = DuckDbConnection::new(&path);

        let (built, result) = run_query(
            &catalog,
            &connection,
            [
                ("select", "si.simpleIndustryDescription AS industry, COUNT(tr.transactionId) AS deals"),
                ("groupBy", "si.simpleIndustryDescription"),
                ("orderBy", "deals:desc"),
            ],
        )
        .await
        .unwrap();

        assert_eq!(built.params.len(), 6);
        // deal 4 is terminated and drops out under the default statuses
        assert_eq!(
            result.column("industry"),
            vec![&json!("Software"), &json!("Pharmaceuticals")]
        );
        assert_eq!(result.column("deals"), vec![&json!(2), &json!(1)]);
    }

    #[tokio::test]
    async fn distinct_values_preset_runs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("deals.duckdb");
        seed(&path);
        let catalog = duckdb_catalog();
        let connection = DuckDbConnection::new(&path);

        let built =
            presets::distinct_values(&catalog, "industry", Vec::<(String, String)>::new()).unwrap();
        let result = connection.execute(&built).await.unwrap();
        assert_eq!(
            result.column("value"),
            vec![&json!("Pharmaceuticals"), &json!("Software")]
        );
    }

    #[tokio::test]
    async fn fetches_one_transaction_by_id() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("deals.duckdb");
        seed(&path);
        let catalog = duckdb_catalog();
        let connection = DuckDbConnection::new(&path);

        let record = fetch_transaction(&catalog, &connection, "3", false, false)
            .await
            .unwrap();
        assert_eq!(record["companyName"], "Fabrikam");
        assert_eq!(record["transactionIdTypeName"], "M&A Transaction");
        assert_eq!(record["statusName"], "Announced");
        assert_eq!(
            record["simpleIndustryDescription"],
            "Pharmaceuticals & Biotechnology"
        );

        let err = fetch_transaction(&catalog, &connection, "99", false, false)
            .await
            .unwrap_err();
        assert!(matches!(err, DealQueryError::NotFound(_)));
    }
}
