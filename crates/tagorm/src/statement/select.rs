//! SELECT builder.

use super::{SqlWriter, Statement, check_error};
use crate::condition::Condition;
use crate::dialect::Dialect;
use crate::error::{OrmError, OrmResult};
use crate::value::Value;

/// Join type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    Inner,
    Left,
    Right,
    Full,
    Cross,
}

impl JoinKind {
    fn keyword(self) -> &'static str {
        match self {
            JoinKind::Inner => "INNER JOIN",
            JoinKind::Left => "LEFT JOIN",
            JoinKind::Right => "RIGHT JOIN",
            JoinKind::Full => "FULL OUTER JOIN",
            JoinKind::Cross => "CROSS JOIN",
        }
    }
}

/// One JOIN clause.
#[derive(Debug, Clone)]
pub struct Join {
    pub kind: JoinKind,
    pub table: String,
    pub alias: Option<String>,
    pub on: Option<Condition>,
}

#[derive(Debug, Clone)]
enum Source {
    Table { name: String, alias: Option<String> },
    Raw(String),
}

/// SELECT query builder.
#[derive(Debug, Clone, Default)]
pub struct Select {
    distinct: bool,
    columns: Vec<String>,
    from: Option<Source>,
    joins: Vec<Join>,
    filters: Vec<Condition>,
    group_by: Vec<String>,
    having: Vec<Condition>,
    order_by: Vec<String>,
    limit: Option<u64>,
    offset: Option<u64>,
    suffixes: Vec<Condition>,
    build_error: Option<String>,
}

impl Select {
    pub fn new() -> Self {
        Self::default()
    }

    /// SELECT DISTINCT.
    pub fn distinct(mut self) -> Self {
        self.distinct = true;
        self
    }

    /// Append select expressions (emitted as given).
    pub fn columns<S: AsRef<str>>(mut self, columns: &[S]) -> Self {
        self.columns
            .extend(columns.iter().map(|c| c.as_ref().to_string()));
        self
    }

    /// Append one select expression.
    pub fn column(mut self, column: impl Into<String>) -> Self {
        self.columns.push(column.into());
        self
    }

    /// FROM a table (quoted).
    pub fn from(mut self, table: &str) -> Self {
        self.from = Some(Source::Table {
            name: table.to_string(),
            alias: None,
        });
        self
    }

    /// FROM a table with an alias.
    pub fn from_as(mut self, table: &str, alias: &str) -> Self {
        self.from = Some(Source::Table {
            name: table.to_string(),
            alias: Some(alias.to_string()),
        });
        self
    }

    /// FROM an arbitrary expression (subquery, function call).
    pub fn from_raw(mut self, expr: &str) -> Self {
        self.from = Some(Source::Raw(expr.to_string()));
        self
    }

    /// Add a JOIN.
    pub fn join(
        mut self,
        kind: JoinKind,
        table: &str,
        alias: Option<&str>,
        on: Option<Condition>,
    ) -> Self {
        if kind != JoinKind::Cross && on.is_none() && self.build_error.is_none() {
            self.build_error = Some(format!(
                "{} {table} requires an ON condition",
                kind.keyword()
            ));
        }
        self.joins.push(Join {
            kind,
            table: table.to_string(),
            alias: alias.map(str::to_string),
            on,
        });
        self
    }

    pub fn inner_join(self, table: &str, alias: &str, on: Condition) -> Self {
        self.join(JoinKind::Inner, table, Some(alias), Some(on))
    }

    pub fn left_join(self, table: &str, alias: &str, on: Condition) -> Self {
        self.join(JoinKind::Left, table, Some(alias), Some(on))
    }

    /// Add a WHERE condition; all conditions are ANDed.
    pub fn filter(mut self, cond: Condition) -> Self {
        self.filters.push(cond);
        self
    }

    pub fn group_by<S: AsRef<str>>(mut self, columns: &[S]) -> Self {
        self.group_by
            .extend(columns.iter().map(|c| c.as_ref().to_string()));
        self
    }

    /// Add a HAVING condition. Rendering fails without GROUP BY.
    pub fn having(mut self, cond: Condition) -> Self {
        self.having.push(cond);
        self
    }

    /// Append an ORDER BY item, e.g. `"created_at DESC"`.
    pub fn order_by(mut self, item: impl Into<String>) -> Self {
        self.order_by.push(item.into());
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Append a trailing fragment such as `FOR UPDATE`.
    pub fn suffix(mut self, suffix: Condition) -> Self {
        self.suffixes.push(suffix);
        self
    }

    pub fn has_order_by(&self) -> bool {
        !self.order_by.is_empty()
    }

    pub fn has_joins(&self) -> bool {
        !self.joins.is_empty()
    }

    fn write_body(&self, w: &mut SqlWriter, dialect: &dyn Dialect) -> OrmResult<()> {
        match &self.from {
            Some(Source::Table { name, alias }) => {
                w.clause("FROM ").push(&dialect.quote_qualified(name));
                if let Some(alias) = alias {
                    w.clause(&dialect.quote(alias));
                }
            }
            Some(Source::Raw(expr)) => {
                w.clause("FROM ").push(expr);
            }
            None => return Err(OrmError::build("select requires a FROM table")),
        }

        for join in &self.joins {
            w.clause(join.kind.keyword())
                .clause(&dialect.quote_qualified(&join.table));
            if let Some(alias) = &join.alias {
                w.clause(&dialect.quote(alias));
            }
            if let Some(on) = &join.on {
                w.clause("ON ");
                w.condition(on)?;
            }
        }

        w.filters("WHERE", &self.filters)?;

        if !self.group_by.is_empty() {
            w.clause("GROUP BY ").push(&self.group_by.join(", "));
        }
        if !self.having.is_empty() {
            if self.group_by.is_empty() {
                return Err(OrmError::build("HAVING requires GROUP BY"));
            }
            w.filters("HAVING", &self.having)?;
        }
        Ok(())
    }

    fn write_head(&self, w: &mut SqlWriter) -> OrmResult<()> {
        if self.columns.is_empty() {
            return Err(OrmError::build("select requires at least one column"));
        }
        w.push(if self.distinct {
            "SELECT DISTINCT "
        } else {
            "SELECT "
        })
        .push(&self.columns.join(", "));
        Ok(())
    }

    /// Render `SELECT COUNT(*)` over the same rows, ignoring ORDER BY, LIMIT
    /// and OFFSET. Grouped or distinct queries are wrapped in a subquery.
    pub fn to_count_sql(&self, dialect: &dyn Dialect) -> OrmResult<(String, Vec<Value>)> {
        check_error(&self.build_error)?;
        let mut w = SqlWriter::new();
        if self.distinct || !self.group_by.is_empty() {
            let mut inner = SqlWriter::new();
            self.write_head(&mut inner)?;
            self.write_body(&mut inner, dialect)?;
            let (sql, args) = inner.finish();
            w.push("SELECT COUNT(*) FROM (")
                .push(&sql)
                .push(") AS ")
                .push(&dialect.quote("counted"))
                .args(args);
        } else {
            w.push("SELECT COUNT(*)");
            self.write_body(&mut w, dialect)?;
        }
        Ok(w.finish())
    }
}

impl Statement for Select {
    fn render(&self, dialect: &dyn Dialect) -> OrmResult<(String, Vec<Value>)> {
        check_error(&self.build_error)?;
        let mut w = SqlWriter::new();
        self.write_head(&mut w)?;
        self.write_body(&mut w, dialect)?;

        let mut offset = self.offset;
        if self.limit.is_some() && dialect.requires_order_for_limit() {
            if self.order_by.is_empty() {
                return Err(OrmError::build(format!(
                    "{} requires ORDER BY with LIMIT",
                    dialect.name()
                )));
            }
            offset.get_or_insert(0);
        }

        if !self.order_by.is_empty() {
            w.clause("ORDER BY ").push(&self.order_by.join(", "));
        }

        let limit = self.limit.map(|n| dialect.build_limit(n));
        let offset = offset.map(|n| dialect.build_offset(n));
        let paging = if dialect.is_offset_first() {
            [offset, limit]
        } else {
            [limit, offset]
        };
        for (fragment, args) in paging.into_iter().flatten() {
            w.clause(&fragment).args(args);
        }

        w.suffixes(&self.suffixes)?;
        Ok(w.finish())
    }

    fn returns_rows(&self) -> bool {
        true
    }
}
