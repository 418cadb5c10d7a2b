//! INSERT builder.

use super::{SqlWriter, Statement, placeholder_group, quote_all, returning_refs};
use crate::condition::Condition;
use crate::dialect::{Dialect, ReturningPosition};
use crate::error::{OrmError, OrmResult};
use crate::value::Value;

/// INSERT query builder.
///
/// Every value row must have exactly one value per column.
#[derive(Debug, Clone, Default)]
pub struct Insert {
    table: String,
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
    returning: Vec<String>,
    suffixes: Vec<Condition>,
}

impl Insert {
    pub fn new(table: &str) -> Self {
        Self {
            table: table.to_string(),
            ..Self::default()
        }
    }

    /// Append column names (quoted on render).
    pub fn columns<S: AsRef<str>>(mut self, columns: &[S]) -> Self {
        self.columns
            .extend(columns.iter().map(|c| c.as_ref().to_string()));
        self
    }

    /// Append one row of values.
    pub fn values(mut self, row: Vec<Value>) -> Self {
        self.rows.push(row);
        self
    }

    /// Columns to return from the inserted rows.
    pub fn returning<S: AsRef<str>>(mut self, columns: &[S]) -> Self {
        self.returning
            .extend(columns.iter().map(|c| c.as_ref().to_string()));
        self
    }

    /// Append a trailing fragment such as `ON CONFLICT DO NOTHING`.
    pub fn suffix(mut self, suffix: Condition) -> Self {
        self.suffixes.push(suffix);
        self
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    fn validate(&self) -> OrmResult<()> {
        if self.table.is_empty() {
            return Err(OrmError::build("insert requires a table"));
        }
        if self.columns.is_empty() {
            return Err(OrmError::build("insert requires at least one column"));
        }
        if self.rows.is_empty() {
            return Err(OrmError::build("insert requires at least one row of values"));
        }
        for (i, row) in self.rows.iter().enumerate() {
            if row.len() != self.columns.len() {
                return Err(OrmError::build(format!(
                    "insert row {} has {} values, expected {}",
                    i + 1,
                    row.len(),
                    self.columns.len()
                )));
            }
        }
        Ok(())
    }
}

impl Statement for Insert {
    fn render(&self, dialect: &dyn Dialect) -> OrmResult<(String, Vec<Value>)> {
        self.validate()?;

        let returning = if self.returning.is_empty() {
            None
        } else {
            let refs = returning_refs(&self.returning);
            Some(dialect.returning_clause(&refs).ok_or_else(|| {
                OrmError::build(format!("{} does not support returning clauses", dialect.name()))
            })?)
        };

        let mut w = SqlWriter::new();
        w.push("INSERT INTO ")
            .push(&dialect.quote_qualified(&self.table))
            .push(" (")
            .push(&quote_all(dialect, &self.columns))
            .push(")");
        if let Some((clause, ReturningPosition::BeforeValues)) = &returning {
            w.clause(clause);
        }

        let group = placeholder_group(self.columns.len());
        w.clause("VALUES ");
        for (i, row) in self.rows.iter().enumerate() {
            if i > 0 {
                w.push(", ");
            }
            w.push(&group).args(row.iter().cloned());
        }

        if let Some((clause, ReturningPosition::End)) = &returning {
            w.clause(clause);
        }
        w.suffixes(&self.suffixes)?;
        Ok(w.finish())
    }

    fn returns_rows(&self) -> bool {
        !self.returning.is_empty()
    }
}
