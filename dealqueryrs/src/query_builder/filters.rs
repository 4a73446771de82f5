use crate::error::BuildError;
use crate::sql_ast::{CompareOp, Operand, Predicate, PredicateOp};

/// Operator tokens accepted as a `<op>:` prefix on filter values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    Gte,
    Lte,
    Gt,
    Lt,
    Ne,
    Like,
    ILike,
    Null,
    NotNull,
    Between,
}

impl FilterOp {
    /// Matching priority; the first token that prefixes the value wins.
    pub const PRIORITY: [FilterOp; 10] = [
        FilterOp::Gte,
        FilterOp::Lte,
        FilterOp::Gt,
        FilterOp::Lt,
        FilterOp::Ne,
        FilterOp::Like,
        FilterOp::ILike,
        FilterOp::Null,
        FilterOp::NotNull,
        FilterOp::Between,
    ];

    pub fn token(self) -> &'static str {
        match self {
            FilterOp::Gte => "gte",
            FilterOp::Lte => "lte",
            FilterOp::Gt => "gt",
            FilterOp::Lt => "lt",
            FilterOp::Ne => "ne",
            FilterOp::Like => "like",
            FilterOp::ILike => "ilike",
            FilterOp::Null => "null",
            FilterOp::NotNull => "notnull",
            FilterOp::Between => "between",
        }
    }

    /// Split `raw` into its operator and the remainder after `<op>:`.
    pub fn strip(raw: &str) -> Option<(FilterOp, &str)> {
        FilterOp::PRIORITY.into_iter().find_map(|op| {
            raw.strip_prefix(op.token())
                .and_then(|rest| rest.strip_prefix(':'))
                .map(|rest| (op, rest))
        })
    }
}

/// Translate one raw filter value on `column` into a predicate.
///
/// Without an operator prefix a comma makes the value a membership list of
/// trimmed tokens; anything else is an equality on the value as given.
pub fn translate(column: &str, raw: &str) -> Result<Predicate, BuildError> {
    let column = column.to_string();
    let Some((op, rest)) = FilterOp::strip(raw) else {
        if raw.contains(',') {
            let values = raw.split(',').map(|v| Operand::text(v.trim())).collect();
            return Ok(Predicate::in_list(column, values));
        }
        return Ok(Predicate::eq(column, Operand::text(raw)));
    };

    let compare = |op| PredicateOp::Compare {
        op,
        value: Operand::text(rest),
    };
    let op = match op {
        FilterOp::Null => PredicateOp::IsNull,
        FilterOp::NotNull => PredicateOp::IsNotNull,
        FilterOp::Between => {
            let bounds: Vec<&str> = rest.split(',').map(str::trim).collect();
            match bounds.as_slice() {
                [low, high] if !low.is_empty() && !high.is_empty() => PredicateOp::Between {
                    low: Operand::text(*low),
                    high: Operand::text(*high),
                },
                _ => return Err(BuildError::InvalidBetween(rest.to_string())),
            }
        }
        FilterOp::Gte => compare(CompareOp::Gte),
        FilterOp::Lte => compare(CompareOp::Lte),
        FilterOp::Gt => compare(CompareOp::Gt),
        FilterOp::Lt => compare(CompareOp::Lt),
        FilterOp::Ne => compare(CompareOp::Neq),
        FilterOp::Like => compare(CompareOp::Like),
        FilterOp::ILike => compare(CompareOp::ILike),
    };
    Ok(Predicate { column, op })
}
