use serde_json::Value;
use tracing::info;

use crate::catalog::{JoinName, PatternName};
use crate::dialect::Dialect;
use crate::error::Result;
use crate::pagination::Cursor;
use crate::sql_ast::{Join, SelectQuery, SqlRenderer, TableRef};

use super::plan::JoinsResolved;

/// A rendered query and everything an executor needs to run and page it.
#[derive(Debug, Clone, PartialEq)]
pub struct BuiltQuery {
    pub sql: String,
    /// Operands for the placeholders in `sql`, in order.
    pub params: Vec<Value>,
    pub pattern: Option<PatternName>,
    /// Joins in emitted order.
    pub joins: Vec<JoinName>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
    pub query_hash: u64,
}

impl BuiltQuery {
    /// Cursor for the following page, when a limit is set and this page
    /// came back full. An offset past `u64::MAX` has no next page.
    pub fn next_cursor(&self, rows_returned: usize) -> Result<Option<String>> {
        let next_offset = match self.limit {
            Some(limit) if limit > 0 && rows_returned as u64 >= limit => {
                self.offset.unwrap_or(0).checked_add(limit)
            }
            _ => None,
        };
        match next_offset {
            Some(offset) => Cursor::new(offset, self.query_hash).encode().map(Some),
            None => Ok(None),
        }
    }
}

impl JoinsResolved<'_> {
    /// Render the final statement. Consumes the build.
    pub fn render(self, dialect: &dyn Dialect) -> BuiltQuery {
        let state = self.state;
        let catalog = state.catalog;
        let base_alias = catalog.base_alias();
        let schema = catalog.schema().map(str::to_string);

        let joins = self
            .joins
            .iter()
            .filter_map(|name| catalog.joins().get(*name))
            .map(|spec| Join {
                table: TableRef {
                    schema: schema.clone(),
                    name: spec.table.to_string(),
                    alias: Some(spec.alias.to_string()),
                },
                on: spec.condition_for(base_alias),
            })
            .collect();

        let query = SelectQuery {
            select: state.select,
            from: TableRef {
                schema,
                name: catalog.base_table().to_string(),
                alias: Some(base_alias.to_string()),
            },
            joins,
            filters: self.conditions,
            group_by: state.group_by,
            order_by: state.order_by,
            limit: state.limit,
            offset: state.offset,
        };
        let rendered = SqlRenderer::new(dialect).render_select(&query);
        info!(
            dialect = dialect.name(),
            sql = %rendered.sql,
            params = rendered.params.len(),
            pattern = ?self.pattern,
            "built query"
        );

        BuiltQuery {
            sql: rendered.sql,
            params: rendered.params,
            pattern: self.pattern,
            joins: self.joins,
            limit: query.limit,
            offset: query.offset,
            query_hash: self.query_hash,
        }
    }
}
