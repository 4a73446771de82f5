//! Fixed-shape queries built on top of [`QueryBuilder`].
//!
//! Presets always group or summarise, so they neither detect a request
//! shape nor inject the default status filter.

use std::collections::BTreeMap;

use tracing::debug;

use crate::catalog::{Catalog, JoinName};
use crate::dialect::Dialect;
use crate::error::{BuildError, Result};
use crate::query_builder::{BuiltQuery, Measure, QueryBuilder, VALUE_ALIAS};

/// Filter keys honoured by `distinct_values` and `aggregate`.
const PRESET_FILTERS: [&str; 4] = ["type", "year", "country", "industry"];

/// Field measured by `aggregate` when none is given.
const DEFAULT_AGGREGATE_FIELD: &str = "transactionSize";

/// Human-readable column behind a logical field, for listings.
fn label_field(field: &str) -> &str {
    match field {
        "industry" => "industryDescription",
        "country" => "countryName",
        "type" => "typeName",
        "company" => "companyName",
        "status" => "statusName",
        other => other,
    }
}

fn collect<I, K, V>(params: I) -> BTreeMap<String, String>
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    params
        .into_iter()
        .map(|(k, v)| (k.as_ref().to_string(), v.as_ref().to_string()))
        .collect()
}

fn preset_builder(catalog: &Catalog) -> QueryBuilder<'_> {
    let mut builder = QueryBuilder::new(catalog);
    builder.without_pattern();
    builder.without_default_status();
    builder
}

fn apply_filters(builder: &mut QueryBuilder<'_>, params: &BTreeMap<String, String>) -> Result<()> {
    for (key, value) in params {
        if PRESET_FILTERS.contains(&key.as_str()) || key == "limit" {
            builder.apply(key, value)?;
        } else {
            debug!(key = key.as_str(), "preset ignores parameter");
        }
    }
    Ok(())
}

fn finish(builder: QueryBuilder<'_>, catalog: &Catalog) -> Result<BuiltQuery> {
    finish_in(builder, catalog.dialect())
}

fn finish_in(builder: QueryBuilder<'_>, dialect: &dyn Dialect) -> Result<BuiltQuery> {
    Ok(builder.resolve_pattern()?.resolve_joins().render(dialect))
}

/// Distinct values of one field, ascending, for filter dropdowns.
pub fn distinct_values<I, K, V>(catalog: &Catalog, field: &str, filters: I) -> Result<BuiltQuery>
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    let column = catalog.fields().resolve(label_field(field));
    let mut builder = preset_builder(catalog);
    builder.apply("select", &format!("DISTINCT({column}) AS {VALUE_ALIAS}"))?;
    apply_filters(&mut builder, &collect(filters))?;
    builder.apply("orderBy", &format!("{VALUE_ALIAS}:asc"))?;
    finish(builder, catalog)
}

/// One aggregate per category: `groupBy` and `measure` are required,
/// `field` defaults to the transaction size.
pub fn aggregate<I, K, V>(catalog: &Catalog, params: I) -> Result<BuiltQuery>
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    let params = collect(params);
    let (Some(group), Some(measure)) = (params.get("groupBy"), params.get("measure")) else {
        return Err(BuildError::MissingParameter(
            "groupBy and measure parameters are required".to_string(),
        )
        .into());
    };
    let measure: Measure = measure.parse()?;
    let field = params
        .get("field")
        .map(String::as_str)
        .unwrap_or(DEFAULT_AGGREGATE_FIELD);

    let fields = catalog.fields();
    let group_column = fields.resolve(label_field(group.trim()));
    let value = match field {
        "size" | "transactionSize" => measure.apply(&fields.resolve("size")),
        "count" => measure.apply(&fields.resolve("transactionId")),
        other => measure.apply(&fields.resolve(other)),
    };

    let mut builder = preset_builder(catalog);
    builder.apply(
        "select",
        &format!("{group_column} AS category, {value} AS {VALUE_ALIAS}"),
    )?;
    builder.apply("groupBy", &group_column)?;
    apply_filters(&mut builder, &params)?;
    builder.apply("orderBy", &format!("{VALUE_ALIAS}:desc"))?;
    finish(builder, catalog)
}

/// Totals for one announcement year. `country` and `industry` filter on the
/// primary company, `type` on the transaction.
pub fn year_summary<I, K, V>(catalog: &Catalog, year: i64, filters: I) -> Result<BuiltQuery>
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    let fields = catalog.fields();
    let year_column = fields.resolve("year");
    let id = fields.resolve("transactionId");
    let size = fields.resolve("size");
    let company_id = fields.resolve("companyId");
    let select = [
        year_column.clone(),
        format!("{} AS totalTransactions", Measure::Count.apply(&id)),
        format!("{} AS totalValue", Measure::Sum.apply(&size)),
        format!("{} AS averageValue", Measure::Avg.apply(&size)),
        format!("{} AS minValue", Measure::Min.apply(&size)),
        format!("{} AS maxValue", Measure::Max.apply(&size)),
        format!(
            "{} AS uniqueCompanies",
            Measure::CountDistinct.apply(&company_id)
        ),
    ]
    .join(", ");

    let mut builder = preset_builder(catalog);
    builder.apply("select", &select)?;
    builder.filter(&year_column, &year.to_string())?;

    let company = JoinName::Company.spec().alias;
    for (key, value) in collect(filters) {
        let column = match key.as_str() {
            "country" => format!("{company}.countryId"),
            "industry" => format!("{company}.simpleIndustryId"),
            "type" => fields.resolve("type"),
            other => {
                debug!(key = other, "year summary ignores parameter");
                continue;
            }
        };
        builder.filter(&column, &value)?;
    }
    builder.apply("groupBy", &year_column)?;
    finish(builder, catalog)
}

/// Queries behind a single transaction's detail record.
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionQueries {
    /// The transaction row with its company and type names.
    pub transaction: BuiltQuery,
    /// Companies related to the deal and the role each played.
    pub relationships: Option<BuiltQuery>,
    /// Advisors on the deal and their advisory role.
    pub advisors: Option<BuiltQuery>,
}

/// Look up one transaction by id, optionally with its related companies and
/// advisors. Each part is a separate query on the same id.
pub fn transaction_by_id(
    catalog: &Catalog,
    id: &str,
    include_relationships: bool,
    include_advisors: bool,
) -> Result<TransactionQueries> {
    transaction_queries(
        catalog,
        catalog.dialect(),
        id,
        include_relationships,
        include_advisors,
    )
}

pub(crate) fn transaction_queries(
    catalog: &Catalog,
    dialect: &dyn Dialect,
    id: &str,
    include_relationships: bool,
    include_advisors: bool,
) -> Result<TransactionQueries> {
    let id = id.trim();
    if id.parse::<i64>().is_err() {
        return Err(BuildError::InvalidNumber {
            param: "transactionId".to_string(),
            value: id.to_string(),
        }
        .into());
    }

    let by_id = |select: String| -> Result<BuiltQuery> {
        let mut builder = preset_builder(catalog);
        builder.select(&select);
        builder.filter("transactionId", id)?;
        finish_in(builder, dialect)
    };
    let alias = |join: JoinName| join.spec().alias;

    let transaction = by_id(format!(
        "{base}.*, {company}.companyName, {company}.simpleIndustryId, {types}.transactionIdTypeName",
        base = catalog.base_alias(),
        company = alias(JoinName::Company),
        types = alias(JoinName::TransactionType),
    ))?;

    let relationships = if include_relationships {
        let (tcr, crt, rc) = (
            alias(JoinName::TransactionCompanyRel),
            alias(JoinName::CompRelType),
            alias(JoinName::RelatedCompany),
        );
        Some(by_id(format!(
            "{crt}.transactionToCompanyRelType AS relationshipType, \
             {tcr}.transactionToCompRelTypeId, {rc}.companyId, {rc}.companyName, \
             {tcr}.leadInvestorFlag, {tcr}.individualEquity, {tcr}.percentAcquired"
        ))?)
    } else {
        None
    };

    let advisors = if include_advisors {
        let (tadv, kind, advisor) = (
            alias(JoinName::TransactionToAdvisor),
            alias(JoinName::AdvisorType),
            alias(JoinName::AdvisorCompany),
        );
        Some(by_id(format!(
            "{kind}.advisorTypeName, {tadv}.advisorTypeId, {advisor}.companyId, {advisor}.companyName"
        ))?)
    } else {
        None
    };

    debug!(
        transaction_id = id,
        include_relationships, include_advisors, "transaction lookup built"
    );
    Ok(TransactionQueries {
        transaction,
        relationships,
        advisors,
    })
}
