//! Parameter intake: the accumulating stage of a build.

use std::collections::BTreeMap;

use tracing::{debug, warn};

use crate::catalog::{Catalog, JoinName, PatternName};
use crate::error::BuildError;
use crate::pagination::{Cursor, PAGINATION_KEYS};
use crate::sql_ast::{
    CompareOp, Operand, OrderItem, Predicate, PredicateOp, SelectItem, SortDirection,
};

use super::filters::translate;
use super::joins::ActiveJoins;
use super::measures::Measure;
use super::resolve::{qualifiers, split_alias, split_top_level};

/// Prefix on `status`/`industry` values naming a vocabulary group.
const GROUP_PREFIX: &str = "group:";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum PatternHint {
    Detect,
    Explicit(PatternName),
    /// No shape: an unrecognised `pattern` value, or detection switched off.
    Skip,
}

/// Everything one build accumulates. Owned by exactly one stage at a time.
#[derive(Debug)]
pub(super) struct BuilderState<'c> {
    pub(super) catalog: &'c Catalog,
    pub(super) select: Vec<SelectItem>,
    pub(super) explicit_select: bool,
    pub(super) distinct: bool,
    pub(super) filters: Vec<Predicate>,
    pub(super) or_group: Vec<Predicate>,
    pub(super) group_by: Vec<String>,
    pub(super) order_by: Vec<OrderItem>,
    pub(super) limit: Option<u64>,
    pub(super) offset: Option<u64>,
    pub(super) cursor: Option<Cursor>,
    pub(super) joins: ActiveJoins,
    /// Equality/membership values per filter key, for shape detection.
    pub(super) known_filters: BTreeMap<String, String>,
    pub(super) pattern: PatternHint,
    pub(super) measure: Option<Measure>,
    pub(super) measure_field: Option<String>,
    pub(super) count_only: bool,
    pub(super) default_status: bool,
    /// Parameters that define the query, for cursor hashing.
    pub(super) defining_params: BTreeMap<String, String>,
}

impl<'c> BuilderState<'c> {
    fn new(catalog: &'c Catalog) -> Self {
        Self {
            catalog,
            select: Vec::new(),
            explicit_select: false,
            distinct: false,
            filters: Vec::new(),
            or_group: Vec::new(),
            group_by: Vec::new(),
            order_by: Vec::new(),
            limit: None,
            offset: None,
            cursor: None,
            joins: ActiveJoins::default(),
            known_filters: BTreeMap::new(),
            pattern: PatternHint::Detect,
            measure: None,
            measure_field: None,
            count_only: false,
            default_status: true,
            defining_params: BTreeMap::new(),
        }
    }

    /// Activate whatever joins back the qualifiers used in `expr`.
    pub(super) fn reference(&mut self, expr: &str) {
        let catalog = self.catalog;
        for qualifier in qualifiers(expr) {
            self.joins
                .require_alias(catalog.joins(), catalog.base_alias(), qualifier);
        }
    }

    pub(super) fn require(&mut self, join: JoinName) {
        let catalog = self.catalog;
        self.joins.require(catalog.joins(), join);
    }

    pub(super) fn resolve(&self, field: &str) -> String {
        self.catalog.fields().resolve(field)
    }
}

/// A build that is still taking parameters.
///
/// Created empty per request; the only way forward is
/// [`QueryBuilder::resolve_pattern`], which consumes it.
#[derive(Debug)]
pub struct QueryBuilder<'c> {
    pub(super) state: BuilderState<'c>,
}

impl<'c> QueryBuilder<'c> {
    pub fn new(catalog: &'c Catalog) -> Self {
        Self {
            state: BuilderState::new(catalog),
        }
    }

    /// Feed every parameter, in iteration order.
    pub fn from_params<I, K, V>(catalog: &'c Catalog, params: I) -> Result<Self, BuildError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut builder = Self::new(catalog);
        for (key, value) in params {
            builder.apply(key.as_ref(), value.as_ref())?;
        }
        Ok(builder)
    }

    /// Classify one parameter and fold it into the state.
    pub fn apply(&mut self, key: &str, value: &str) -> Result<(), BuildError> {
        if !PAGINATION_KEYS.contains(&key) {
            self.state
                .defining_params
                .insert(key.to_string(), value.to_string());
        }
        debug!(key, value, "parameter");
        match key {
            "select" => self.select(value),
            "groupBy" => self.group_by(value),
            "orderBy" => self.order_by(value)?,
            "limit" => self.state.limit = Some(parse_count(key, value)?),
            "offset" => self.state.offset = Some(parse_count(key, value)?),
            "or" => self.or_group(value),
            "pattern" => self.pattern(value),
            "measure" => self.state.measure = Some(value.parse()?),
            "field" => self.state.measure_field = Some(value.trim().to_string()),
            "count_only" => self.state.count_only = parse_flag(value),
            "cursor" => self.state.cursor = Some(Cursor::decode(value)?),
            _ if self.state.catalog.is_filter_key(key) => self.filter(key, value)?,
            _ => debug!(key, "ignoring unrecognised parameter"),
        }
        Ok(())
    }

    /// Comma separated select items; plain names are resolved, expressions
    /// pass through with their table qualifiers activated.
    pub fn select(&mut self, value: &str) {
        let state = &mut self.state;
        for item in split_top_level(value, ',') {
            state.explicit_select = true;
            if item.to_ascii_uppercase().contains("DISTINCT") {
                state.distinct = true;
            }
            let (expr, alias) = split_alias(item);
            let expr = state.resolve(expr);
            state.reference(&expr);
            state.select.push(SelectItem {
                expr,
                alias: alias.map(str::to_string),
            });
        }
    }

    pub fn group_by(&mut self, value: &str) {
        let state = &mut self.state;
        for field in split_top_level(value, ',') {
            let column = state.resolve(field);
            state.reference(&column);
            if !state.select.iter().any(|item| item.expr == column) {
                state.select.push(SelectItem::expr(column.clone()));
            }
            state.group_by.push(column);
        }
    }

    /// `field[:asc|desc]` entries; the direction defaults to ascending.
    pub fn order_by(&mut self, value: &str) -> Result<(), BuildError> {
        let state = &mut self.state;
        for entry in split_top_level(value, ',') {
            let (field, direction) = match entry.rsplit_once(':') {
                Some((field, direction)) => (field.trim(), parse_direction(direction)?),
                None => (entry, SortDirection::Asc),
            };
            let column = state.resolve(field);
            state.reference(&column);
            state.order_by.push(OrderItem {
                expr: column,
                direction,
            });
        }
        Ok(())
    }

    /// `field=value;field=value` pairs, ORed together at finalize.
    pub fn or_group(&mut self, value: &str) {
        let state = &mut self.state;
        for pair in value.split(';') {
            let Some((field, raw)) = pair.split_once('=') else {
                continue;
            };
            let column = state.resolve(field.trim());
            state.reference(&column);
            state
                .or_group
                .push(Predicate::eq(column, Operand::text(raw.trim())));
        }
    }

    pub fn pattern(&mut self, value: &str) {
        self.state.pattern = match value.trim().parse::<PatternName>() {
            Ok(pattern) => PatternHint::Explicit(pattern),
            Err(_) => {
                warn!(pattern = value, "unknown pattern; shape detection skipped");
                PatternHint::Skip
            }
        };
    }

    /// Leave the request shape undetected; no pattern joins are added.
    pub fn without_pattern(&mut self) {
        self.state.pattern = PatternHint::Skip;
    }

    /// Do not inject the default status filter at finalize.
    pub fn without_default_status(&mut self) {
        self.state.default_status = false;
    }

    /// Filter on a field name, join name or physical `alias.column`.
    pub fn filter(&mut self, key: &str, raw: &str) -> Result<(), BuildError> {
        let state = &mut self.state;
        let column = state.resolve(key);
        let predicate = match expand_group(state.catalog, key, &column, raw) {
            Some(predicate) => predicate,
            None => translate(&column, raw)?,
        };

        if let Ok(join) = key.parse::<JoinName>() {
            state.require(join);
        }
        for join in JoinName::implied_by_filter(key) {
            state.require(*join);
        }
        state.reference(&column);

        if let Some(value) = known_value(&predicate) {
            state.known_filters.insert(key.to_string(), value);
        }
        debug!(key, predicate = %predicate, "filter");
        state.filters.push(predicate);
        Ok(())
    }
}

fn expand_group(catalog: &Catalog, key: &str, column: &str, raw: &str) -> Option<Predicate> {
    let name = raw.strip_prefix(GROUP_PREFIX)?;
    match catalog.vocabulary().group(key, name.trim()) {
        Some(ids) => {
            let values = ids.iter().map(|id| Operand::text(id.to_string())).collect();
            Some(Predicate::in_list(column, values))
        }
        None => {
            warn!(key, group = name, "unknown group; filtering on the raw value");
            None
        }
    }
}

/// Value of an equality or membership predicate as the caller wrote it.
fn known_value(predicate: &Predicate) -> Option<String> {
    let text = |operand: &Operand| match operand {
        Operand::Text(s) => s.clone(),
        Operand::Integer(i) => i.to_string(),
    };
    match &predicate.op {
        PredicateOp::Compare {
            op: CompareOp::Eq,
            value,
        } => Some(text(value)),
        PredicateOp::InList(values) => Some(values.iter().map(text).collect::<Vec<_>>().join(",")),
        _ => None,
    }
}

fn parse_count(param: &str, value: &str) -> Result<u64, BuildError> {
    value
        .trim()
        .parse::<u64>()
        .map_err(|_| BuildError::InvalidNumber {
            param: param.to_string(),
            value: value.to_string(),
        })
}

/// An empty direction (`year:`) sorts ascending, as the store would.
fn parse_direction(raw: &str) -> Result<SortDirection, BuildError> {
    let raw = raw.trim();
    if raw.is_empty() || raw.eq_ignore_ascii_case("asc") {
        Ok(SortDirection::Asc)
    } else if raw.eq_ignore_ascii_case("desc") {
        Ok(SortDirection::Desc)
    } else {
        Err(BuildError::InvalidDirection(raw.to_string()))
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "true" | "1" | "yes"
    )
}
