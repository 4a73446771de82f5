//! Integration tests for SQL AST rendering.
//!
//! These tests exercise the SqlRenderer directly and through catalogs with
//! non-default table settings.

use dealquery::config::{DealQueryConfig, DialectKind};
use dealquery::dialect::{Dialect, DuckDbDialect, PostgresDialect, SnowflakeDialect};
use dealquery::sql_ast::{
    Condition, Join, Operand, OrderItem, Predicate, PredicateOp, SelectItem, SelectQuery,
    SortDirection, SqlRenderer, TableRef,
};
use dealquery::{Catalog, SqlBuilder};
use serde_json::json;

fn table(name: &str, alias: &str) -> TableRef {
    TableRef {
        schema: None,
        name: name.to_string(),
        alias: Some(alias.to_string()),
    }
}

fn sample_query() -> SelectQuery {
    SelectQuery {
        select: vec![
            SelectItem::expr("geo.country"),
            SelectItem::aliased("SUM(tr.transactionSize)", "total value"),
        ],
        from: table("ciqTransaction", "tr"),
        joins: vec![Join {
            table: table("ciqCountryGeo", "geo"),
            on: "c.countryId = geo.countryId".to_string(),
        }],
        filters: vec![
            Condition::Predicate(Predicate::eq("tr.announcedYear", Operand::Integer(2021))),
            Condition::AnyOf(vec![
                Predicate::eq("tr.statusId", Operand::text("2")),
                Predicate {
                    column: "tr.transactionSize".to_string(),
                    op: PredicateOp::Between {
                        low: Operand::text("1"),
                        high: Operand::text("5"),
                    },
                },
            ]),
        ],
        group_by: vec!["geo.country".to_string()],
        order_by: vec![OrderItem {
            expr: "geo.country".to_string(),
            direction: SortDirection::Desc,
        }],
        limit: Some(10),
        offset: Some(30),
    }
}

#[test]
fn renders_join_group_order_and_paging() {
    let rendered = SqlRenderer::new(&DuckDbDialect).render_select(&sample_query());
    assert_eq!(
        rendered.sql,
        "SELECT geo.country, SUM(tr.transactionSize) AS \"total value\" \
         FROM ciqTransaction tr JOIN ciqCountryGeo geo ON c.countryId = geo.countryId \
         WHERE tr.announcedYear = ? AND (tr.statusId = ? OR tr.transactionSize BETWEEN ? AND ?) \
         GROUP BY geo.country ORDER BY geo.country DESC LIMIT 10 OFFSET 30"
    );
    assert_eq!(
        rendered.params,
        vec![json!(2021), json!("2"), json!("1"), json!("5")]
    );
}

#[test]
fn postgres_numbers_placeholders_in_clause_order() {
    let rendered = SqlRenderer::new(&PostgresDialect).render_select(&sample_query());
    assert!(rendered
        .sql
        .contains("WHERE tr.announcedYear = $1 AND (tr.statusId = $2 OR tr.transactionSize BETWEEN $3 AND $4)"));
}

#[test]
fn inline_display_quotes_text_literals() {
    let predicate = Predicate::eq("c.companyName", Operand::text("O'Brien"));
    assert_eq!(predicate.to_string(), "c.companyName = 'O''Brien'");
    let condition = Condition::AnyOf(vec![
        Predicate::in_list("tr.statusId", vec![Operand::Integer(1), Operand::Integer(2)]),
        Predicate {
            column: "tr.transactionSize".to_string(),
            op: PredicateOp::IsNull,
        },
    ]);
    assert_eq!(
        condition.to_string(),
        "(tr.statusId IN (1, 2) OR tr.transactionSize IS NULL)"
    );
}

#[test]
fn identifiers_are_quoted_only_when_needed() {
    for dialect in [
        &SnowflakeDialect as &dyn Dialect,
        &DuckDbDialect,
        &PostgresDialect,
    ] {
        assert_eq!(dialect.quote_ident("ciqTransaction"), "ciqTransaction");
        assert_eq!(dialect.quote_ident("deal \"size\""), "\"deal \"\"size\"\"\"");
    }
}

#[test]
fn schema_qualifies_base_and_join_tables() {
    let mut config = DealQueryConfig::default();
    config.query.schema = "ciq".to_string();
    config.query.dialect = DialectKind::Postgres;
    let catalog = Catalog::from_config(&config).unwrap();

    let built = SqlBuilder
        .build(&catalog, [("country", "76"), ("limit", "3")])
        .unwrap();
    assert_eq!(
        built.sql,
        "SELECT tr.* FROM ciq.ciqTransaction tr \
         JOIN ciq.ciqCompany c ON tr.companyId = c.companyId \
         JOIN ciq.ciqCountryGeo geo ON c.countryId = geo.countryId \
         WHERE geo.countryId = $1 AND tr.statusId IN ($2, $3, $4, $5, $6, $7) LIMIT 3"
    );
}

#[test]
fn base_alias_is_configurable() {
    let mut config = DealQueryConfig::default();
    config.query.base_table = "deals".to_string();
    config.query.base_alias = "d".to_string();
    let catalog = Catalog::from_config(&config).unwrap();

    let built = SqlBuilder
        .build(&catalog, [("type", "3"), ("select", "year")])
        .unwrap();
    assert_eq!(
        built.sql,
        "SELECT d.announcedYear FROM deals d \
         JOIN ciqTransactionType tt ON d.transactionIdTypeId = tt.transactionIdTypeId \
         WHERE d.transactionIdTypeId = ? AND d.statusId IN (?, ?, ?, ?, ?, ?)"
    );
}
