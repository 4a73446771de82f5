use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::dialect::Dialect;

/// A typed value bound to a placeholder at execution time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Operand {
    Integer(i64),
    Text(String),
}

impl Operand {
    pub fn text(value: impl Into<String>) -> Self {
        Operand::Text(value.into())
    }

    pub fn to_value(&self) -> Value {
        match self {
            Operand::Integer(i) => Value::from(*i),
            Operand::Text(s) => Value::String(s.clone()),
        }
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Integer(i) => write!(f, "{i}"),
            Operand::Text(s) => write!(f, "'{}'", s.replace('\'', "''")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Neq,
    Gt,
    Gte,
    Lt,
    Lte,
    Like,
    ILike,
}

impl CompareOp {
    pub fn as_sql(self) -> &'static str {
        match self {
            CompareOp::Eq => "=",
            CompareOp::Neq => "!=",
            CompareOp::Gt => ">",
            CompareOp::Gte => ">=",
            CompareOp::Lt => "<",
            CompareOp::Lte => "<=",
            CompareOp::Like => "LIKE",
            CompareOp::ILike => "ILIKE",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PredicateOp {
    Compare { op: CompareOp, value: Operand },
    Between { low: Operand, high: Operand },
    InList(Vec<Operand>),
    IsNull,
    IsNotNull,
}

/// One boolean condition over a physical column reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Predicate {
    pub column: String,
    pub op: PredicateOp,
}

impl Predicate {
    pub fn eq(column: impl Into<String>, value: Operand) -> Self {
        Predicate {
            column: column.into(),
            op: PredicateOp::Compare {
                op: CompareOp::Eq,
                value,
            },
        }
    }

    pub fn in_list(column: impl Into<String>, values: Vec<Operand>) -> Self {
        Predicate {
            column: column.into(),
            op: PredicateOp::InList(values),
        }
    }

    /// Operands in the order their placeholders appear.
    pub fn operands(&self) -> Vec<&Operand> {
        match &self.op {
            PredicateOp::Compare { value, .. } => vec![value],
            PredicateOp::Between { low, high } => vec![low, high],
            PredicateOp::InList(values) => values.iter().collect(),
            PredicateOp::IsNull | PredicateOp::IsNotNull => Vec::new(),
        }
    }

    fn render_with(&self, mut operand: impl FnMut(&Operand) -> String) -> String {
        match &self.op {
            PredicateOp::Compare { op, value } => {
                format!("{} {} {}", self.column, op.as_sql(), operand(value))
            }
            PredicateOp::Between { low, high } => {
                let low = operand(low);
                let high = operand(high);
                format!("{} BETWEEN {low} AND {high}", self.column)
            }
            PredicateOp::InList(values) => {
                let rendered: Vec<String> = values.iter().map(&mut operand).collect();
                format!("{} IN ({})", self.column, rendered.join(", "))
            }
            PredicateOp::IsNull => format!("{} IS NULL", self.column),
            PredicateOp::IsNotNull => format!("{} IS NOT NULL", self.column),
        }
    }
}

/// Inline rendering with quoted literals, for logs and tests only.
impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render_with(|v| v.to_string()))
    }
}

/// A WHERE clause entry: predicates are ANDed, an `AnyOf` group is one
/// parenthesized disjunction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Condition {
    Predicate(Predicate),
    AnyOf(Vec<Predicate>),
}

impl Condition {
    pub fn predicates(&self) -> &[Predicate] {
        match self {
            Condition::Predicate(p) => std::slice::from_ref(p),
            Condition::AnyOf(items) => items,
        }
    }

    fn render_with(&self, mut operand: impl FnMut(&Operand) -> String) -> String {
        match self {
            Condition::Predicate(p) => p.render_with(operand),
            Condition::AnyOf(items) => {
                let parts: Vec<String> =
                    items.iter().map(|p| p.render_with(&mut operand)).collect();
                format!("({})", parts.join(" OR "))
            }
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render_with(|v| v.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectItem {
    pub expr: String,
    pub alias: Option<String>,
}

impl SelectItem {
    pub fn expr(expr: impl Into<String>) -> Self {
        Self {
            expr: expr.into(),
            alias: None,
        }
    }

    pub fn aliased(expr: impl Into<String>, alias: impl Into<String>) -> Self {
        Self {
            expr: expr.into(),
            alias: Some(alias.into()),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct TableRef {
    pub schema: Option<String>,
    pub name: String,
    pub alias: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Join {
    pub table: TableRef,
    pub on: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderItem {
    pub expr: String,
    pub direction: SortDirection,
}

#[derive(Debug, Clone, Default)]
pub struct SelectQuery {
    pub select: Vec<SelectItem>,
    pub from: TableRef,
    pub joins: Vec<Join>,
    pub filters: Vec<Condition>,
    pub group_by: Vec<String>,
    pub order_by: Vec<OrderItem>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

/// SQL text plus the operands for its placeholders, in order.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedSql {
    pub sql: String,
    pub params: Vec<Value>,
}

pub struct SqlRenderer<'d> {
    dialect: &'d dyn Dialect,
}

impl<'d> SqlRenderer<'d> {
    pub fn new(dialect: &'d dyn Dialect) -> Self {
        Self { dialect }
    }

    pub fn render_select(&self, query: &SelectQuery) -> RenderedSql {
        let mut params: Vec<Value> = Vec::new();

        let select_items: Vec<String> = query
            .select
            .iter()
            .map(|item| match &item.alias {
                Some(alias) => format!("{} AS {}", item.expr, self.dialect.quote_ident(alias)),
                None => item.expr.clone(),
            })
            .collect();

        let mut sql = format!(
            "SELECT {} FROM {}",
            select_items.join(", "),
            self.render_table_ref(&query.from)
        );

        for join in &query.joins {
            sql.push_str(&format!(
                " JOIN {} ON {}",
                self.render_table_ref(&join.table),
                join.on
            ));
        }

        if !query.filters.is_empty() {
            let filters: Vec<String> = query
                .filters
                .iter()
                .map(|c| {
                    c.render_with(|operand| {
                        let placeholder = self.dialect.placeholder(params.len());
                        params.push(operand.to_value());
                        placeholder
                    })
                })
                .collect();
            sql.push_str(&format!(" WHERE {}", filters.join(" AND ")));
        }

        if !query.group_by.is_empty() {
            sql.push_str(&format!(" GROUP BY {}", query.group_by.join(", ")));
        }

        if !query.order_by.is_empty() {
            let orders: Vec<String> = query
                .order_by
                .iter()
                .map(|o| {
                    let dir = match o.direction {
                        SortDirection::Asc => "ASC",
                        SortDirection::Desc => "DESC",
                    };
                    format!("{} {dir}", o.expr)
                })
                .collect();
            sql.push_str(&format!(" ORDER BY {}", orders.join(", ")));
        }

        if let Some(limit) = query.limit {
            sql.push_str(&format!(" LIMIT {limit}"));
            if let Some(offset) = query.offset {
                sql.push_str(&format!(" OFFSET {offset}"));
            }
        }

        RenderedSql { sql, params }
    }

    fn render_table_ref(&self, table: &TableRef) -> String {
        let name = match &table.schema {
            Some(schema) if !schema.is_empty() => format!(
                "{}.{}",
                self.dialect.quote_ident(schema),
                self.dialect.quote_ident(&table.name)
            ),
            _ => self.dialect.quote_ident(&table.name),
        };
        match &table.alias {
            Some(alias) => format!("{name} {}", self.dialect.quote_ident(alias)),
            None => name,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::{PostgresDialect, SnowflakeDialect};

    #[test]
    fn operand_display_escapes_quotes() {
        assert_eq!(Operand::text("O'Brien").to_string(), "'O''Brien'");
        assert_eq!(Operand::Integer(7).to_string(), "7");
    }

    #[test]
    fn any_of_renders_parenthesized_disjunction() {
        let cond = Condition::AnyOf(vec![
            Predicate::eq("target.companyId", Operand::text("24937")),
            Predicate::eq("acquirer.companyId", Operand::text("24937")),
        ]);
        assert_eq!(
            cond.to_string(),
            "(target.companyId = '24937' OR acquirer.companyId = '24937')"
        );
    }

    #[test]
    fn placeholders_follow_operand_order() {
        let query = SelectQuery {
            select: vec![SelectItem::expr("tr.*")],
            from: TableRef {
                schema: Some("CIQ".to_string()),
                name: "ciqTransaction".to_string(),
                alias: Some("tr".to_string()),
            },
            filters: vec![
                Condition::Predicate(Predicate {
                    column: "tr.announcedYear".to_string(),
                    op: PredicateOp::Between {
                        low: Operand::text("2019"),
                        high: Operand::text("2021"),
                    },
                }),
                Condition::Predicate(Predicate::in_list(
                    "tr.statusId",
                    vec![Operand::Integer(1), Operand::Integer(2)],
                )),
            ],
            limit: Some(10),
            offset: Some(20),
            ..Default::default()
        };

        let rendered = SqlRenderer::new(&PostgresDialect).render_select(&query);
        assert_eq!(
            rendered.sql,
            "SELECT tr.* FROM CIQ.ciqTransaction tr WHERE tr.announcedYear BETWEEN $1 AND $2 \
             AND tr.statusId IN ($3, $4) LIMIT 10 OFFSET 20"
        );
        assert_eq!(
            rendered.params,
            vec![
                serde_json::json!("2019"),
                serde_json::json!("2021"),
                serde_json::json!(1),
                serde_json::json!(2)
            ]
        );
    }

    #[test]
    fn offset_without_limit_is_omitted() {
        let query = SelectQuery {
            select: vec![SelectItem::expr("tr.*")],
            from: TableRef {
                schema: None,
                name: "ciqTransaction".to_string(),
                alias: Some("tr".to_string()),
            },
            offset: Some(5),
            ..Default::default()
        };
        let rendered = SqlRenderer::new(&SnowflakeDialect).render_select(&query);
        assert_eq!(rendered.sql, "SELECT tr.* FROM ciqTransaction tr");
        assert!(rendered.params.is_empty());
    }
}
