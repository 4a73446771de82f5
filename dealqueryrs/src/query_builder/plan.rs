//! Finalization stages between parameter intake and rendering.
//!
//! Each stage consumes the previous one, so a build can neither skip a
//! stage nor be resumed once it has moved on.

use tracing::debug;

use crate::catalog::{JoinName, PatternName};
use crate::error::BuildError;
use crate::pagination::compute_query_hash;
use crate::sql_ast::{Condition, Operand, Predicate, SelectItem};

use super::builders::{BuilderState, PatternHint, QueryBuilder};
use super::measures::{Measure, DEFAULT_MEASURE_FIELD};
use super::patterns::detect;

/// Output alias of the aggregate added to grouped selections.
pub(crate) const VALUE_ALIAS: &str = "value";
const COUNT_ALIAS: &str = "count";

/// Parameters are consumed and the request shape is settled.
#[derive(Debug)]
pub struct PatternResolved<'c> {
    pub(super) state: BuilderState<'c>,
    pub(super) pattern: Option<PatternName>,
    pub(super) query_hash: u64,
}

/// Final join order and WHERE conditions are fixed; only rendering remains.
#[derive(Debug)]
pub struct JoinsResolved<'c> {
    pub(super) state: BuilderState<'c>,
    pub(super) pattern: Option<PatternName>,
    pub(super) query_hash: u64,
    pub(super) joins: Vec<JoinName>,
    pub(super) conditions: Vec<Condition>,
}

impl<'c> QueryBuilder<'c> {
    /// Close parameter intake, then detect the request shape unless one was
    /// named explicitly, merging its recommended joins.
    pub fn resolve_pattern(self) -> Result<PatternResolved<'c>, BuildError> {
        let mut state = self.state;
        let query_hash = compute_query_hash(&state.defining_params);
        finish_params(&mut state, query_hash)?;

        let pattern = match state.pattern {
            PatternHint::Detect => detect(&state.known_filters),
            PatternHint::Explicit(pattern) => Some(pattern),
            PatternHint::Skip => None,
        };
        if let Some(pattern) = pattern {
            debug!(pattern = %pattern, "request shape");
            for join in pattern.recommended_joins() {
                state.require(*join);
            }
        }
        Ok(PatternResolved {
            state,
            pattern,
            query_hash,
        })
    }
}

fn finish_params(state: &mut BuilderState<'_>, query_hash: u64) -> Result<(), BuildError> {
    if let Some(cursor) = state.cursor {
        cursor.validate_query_hash(query_hash)?;
        state.offset = Some(cursor.offset);
    }

    let id_column = state.resolve("transactionId");
    match state.measure {
        Some(_) if state.group_by.is_empty() => {
            return Err(BuildError::MissingParameter(
                "measure requires a groupBy parameter".to_string(),
            ));
        }
        Some(measure) => {
            let field = state
                .measure_field
                .clone()
                .unwrap_or_else(|| DEFAULT_MEASURE_FIELD.to_string());
            let expr = measure.over_field(&field, |f| state.resolve(f), &id_column);
            state.reference(&expr);
            state.select.push(SelectItem::aliased(expr, VALUE_ALIAS));
        }
        None if !state.explicit_select && !state.group_by.is_empty() => {
            state.select.push(SelectItem::aliased(
                Measure::Count.apply(&id_column),
                VALUE_ALIAS,
            ));
        }
        None => {}
    }

    if state.count_only && !state.distinct {
        let mut select: Vec<SelectItem> = state
            .group_by
            .iter()
            .map(|column| SelectItem::expr(column.clone()))
            .collect();
        select.push(SelectItem::aliased(
            Measure::Count.apply(&id_column),
            COUNT_ALIAS,
        ));
        state.select = select;
        state.order_by.clear();
    }

    if state.select.is_empty() {
        let base = format!("{}.*", state.catalog.base_alias());
        state.select.push(SelectItem::expr(base));
    }

    state.limit = state.catalog.query_config().effective_limit(state.limit);
    Ok(())
}

impl<'c> PatternResolved<'c> {
    pub fn pattern(&self) -> Option<PatternName> {
        self.pattern
    }

    /// Fold the OR group into the conditions, inject the default status
    /// filter when nothing constrains status, and order the active joins.
    pub fn resolve_joins(self) -> JoinsResolved<'c> {
        let mut state = self.state;
        let mut conditions: Vec<Condition> = std::mem::take(&mut state.filters)
            .into_iter()
            .map(Condition::Predicate)
            .collect();
        if !state.or_group.is_empty() {
            conditions.push(Condition::AnyOf(std::mem::take(&mut state.or_group)));
        }

        let status_column = state.catalog.status_column();
        let constrained = conditions
            .iter()
            .flat_map(Condition::predicates)
            .any(|p| p.column == status_column);
        let defaults = state.catalog.default_statuses();
        if state.default_status && !constrained && !defaults.is_empty() {
            let values = defaults.iter().copied().map(Operand::Integer).collect();
            state.reference(&status_column);
            conditions.push(Condition::Predicate(Predicate::in_list(
                status_column,
                values,
            )));
        }

        let joins = state.joins.ordered(state.catalog.joins());
        debug!(joins = ?joins, "join order");
        JoinsResolved {
            state,
            pattern: self.pattern,
            query_hash: self.query_hash,
            joins,
            conditions,
        }
    }
}

impl JoinsResolved<'_> {
    pub fn joins(&self) -> &[JoinName] {
        &self.joins
    }

    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }
}
